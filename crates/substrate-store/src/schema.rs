// crates/substrate-store/src/schema.rs
// ============================================================================
// Module: Decision Store Schema
// Description: DDL and schema-version bookkeeping for the SQLite-backed
// Decision Store.
// Purpose: Create and validate the on-disk schema on open.
// Dependencies: rusqlite
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::SqliteStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the Decision Store.
pub const SCHEMA_VERSION: i64 = 1;

// ============================================================================
// SECTION: Schema Initialization
// ============================================================================

/// Creates the schema on a fresh database, or validates `PRAGMA user_version`
/// against [`SCHEMA_VERSION`] on an existing one.
pub fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: i64 = tx
        .query_row("PRAGMA user_version", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?
        .unwrap_or(0);

    match version {
        0 => {
            tx.execute_batch(
                "CREATE TABLE pipeline_runs (
                    id INTEGER PRIMARY KEY,
                    methodology TEXT NOT NULL,
                    current_phase TEXT NOT NULL,
                    status TEXT NOT NULL,
                    parent_run_id INTEGER REFERENCES pipeline_runs(id),
                    config_json TEXT NOT NULL,
                    token_usage_json TEXT NOT NULL
                );
                CREATE TABLE decisions (
                    id INTEGER PRIMARY KEY,
                    pipeline_run_id INTEGER NOT NULL REFERENCES pipeline_runs(id),
                    phase TEXT NOT NULL,
                    category TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value_json TEXT NOT NULL,
                    rationale TEXT,
                    superseded_by INTEGER REFERENCES decisions(id)
                );
                CREATE INDEX idx_decisions_run ON decisions (pipeline_run_id);
                CREATE INDEX idx_decisions_phase ON decisions (phase);
                CREATE INDEX idx_decisions_run_phase_category_key
                    ON decisions (pipeline_run_id, phase, category, key);
                CREATE TABLE requirements (
                    id INTEGER PRIMARY KEY,
                    pipeline_run_id INTEGER NOT NULL REFERENCES pipeline_runs(id),
                    source TEXT NOT NULL,
                    requirement_type TEXT NOT NULL,
                    description TEXT NOT NULL,
                    priority TEXT NOT NULL,
                    status TEXT NOT NULL
                );
                CREATE INDEX idx_requirements_run ON requirements (pipeline_run_id);
                CREATE TABLE constraints (
                    id INTEGER PRIMARY KEY,
                    pipeline_run_id INTEGER NOT NULL REFERENCES pipeline_runs(id),
                    category TEXT NOT NULL,
                    description TEXT NOT NULL,
                    source TEXT NOT NULL
                );
                CREATE INDEX idx_constraints_run ON constraints (pipeline_run_id);
                CREATE TABLE artifacts (
                    id INTEGER PRIMARY KEY,
                    pipeline_run_id INTEGER NOT NULL REFERENCES pipeline_runs(id),
                    phase TEXT NOT NULL,
                    artifact_type TEXT NOT NULL,
                    path TEXT NOT NULL,
                    content_hash TEXT,
                    summary TEXT
                );
                CREATE INDEX idx_artifacts_run ON artifacts (pipeline_run_id);
                CREATE INDEX idx_artifacts_run_phase_type
                    ON artifacts (pipeline_run_id, phase, artifact_type);
                CREATE TABLE token_usage (
                    id INTEGER PRIMARY KEY,
                    pipeline_run_id INTEGER NOT NULL REFERENCES pipeline_runs(id),
                    phase TEXT NOT NULL,
                    agent TEXT NOT NULL,
                    input_tokens INTEGER NOT NULL,
                    output_tokens INTEGER NOT NULL,
                    cost_cents INTEGER NOT NULL
                );
                CREATE INDEX idx_token_usage_run_phase_agent
                    ON token_usage (pipeline_run_id, phase, agent);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        v if v == SCHEMA_VERSION => {}
        v => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {v}"
            )));
        }
    }

    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    #[test]
    fn initializes_fresh_database_to_current_version() {
        let mut connection = Connection::open_in_memory().expect("open");
        initialize_schema(&mut connection).expect("init");
        let version: i64 =
            connection.query_row("PRAGMA user_version", params![], |row| row.get(0)).expect("version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn reopening_an_initialized_database_is_a_no_op() {
        let mut connection = Connection::open_in_memory().expect("open");
        initialize_schema(&mut connection).expect("init");
        initialize_schema(&mut connection).expect("re-init");
    }

    #[test]
    fn future_schema_version_is_rejected() {
        let mut connection = Connection::open_in_memory().expect("open");
        connection.pragma_update(None, "user_version", 999_i64).expect("set version");
        assert!(initialize_schema(&mut connection).is_err());
    }
}
