// crates/substrate-store/src/store.rs
// ============================================================================
// Module: Decision Store
// Description: Public DecisionStore trait and its SQLite-backed implementation.
// Purpose: Give orchestrators durable, append-only access to pipeline runs,
// decisions, requirements, constraints, artifacts, and token usage.
// Dependencies: substrate-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteDecisionStore`] opens one read-write connection (handed to the
//! background writer thread) and a round-robin pool of read-only connections
//! for the calling thread to read from directly, mirroring
//! `decision-gate-store-sqlite`'s split between `write_connection` and
//! `read_connections`/`read_cursor`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;

use substrate_core::Artifact;
use substrate_core::Constraint;
use substrate_core::Decision;
use substrate_core::DecisionId;
use substrate_core::PersistenceError;
use substrate_core::PipelineRun;
use substrate_core::Requirement;
use substrate_core::RequirementId;
use substrate_core::RequirementStatus;
use substrate_core::RunConfig;
use substrate_core::RunId;
use substrate_core::RunStatus;
use substrate_core::TokenUsage;
use substrate_core::TokenUsageAggregate;
use substrate_core::TokenUsageTotals;

use crate::config::SqliteStoreConfig;
use crate::error::SqliteStoreError;
use crate::mapping::deserialize_enum_str;
use crate::schema::initialize_schema;
use crate::types::DecisionFilter;
use crate::types::DecisionPatch;
use crate::types::NewArtifact;
use crate::types::NewConstraint;
use crate::types::NewDecision;
use crate::types::NewPipelineRun;
use crate::types::NewRequirement;
use crate::types::PipelineRunPatch;
use crate::writer::WriteCommand;
use crate::writer::WriteGateway;
use crate::writer::spawn_writer;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Durable storage for pipeline runs, decisions, requirements, constraints,
/// artifacts, and token usage (spec.md §4.1).
///
/// # Invariants
/// - Writes are serialized per-database.
/// - Reads after a confirmed write observe the write.
pub trait DecisionStore: Send + Sync {
    /// Creates a new pipeline run in [`RunStatus::Running`].
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O or constraint failure.
    fn create_pipeline_run(&self, input: NewPipelineRun) -> Result<PipelineRun, PersistenceError>;

    /// Applies a partial update to a pipeline run. A patch with every field
    /// `None` is a no-op.
    ///
    /// # Errors
    /// Returns [`PersistenceError::NotFound`] if `id` does not exist.
    fn update_pipeline_run(&self, id: RunId, patch: PipelineRunPatch) -> Result<(), PersistenceError>;

    /// Loads a pipeline run by id.
    ///
    /// # Errors
    /// Returns [`PersistenceError::NotFound`] if `id` does not exist, or
    /// [`PersistenceError::Corrupt`] if its stored config/token-usage JSON
    /// cannot be parsed.
    fn get_pipeline_run(&self, id: RunId) -> Result<PipelineRun, PersistenceError>;

    /// Records a new append-only decision.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O or constraint failure.
    fn create_decision(&self, input: NewDecision) -> Result<Decision, PersistenceError>;

    /// Looks up the active (non-superseded) decision for a `(run, phase,
    /// category, key)` coordinate, if one exists.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_decision_by_key(
        &self,
        run_id: RunId,
        phase: &substrate_core::PhaseName,
        category: &substrate_core::Category,
        key: &substrate_core::DecisionKey,
    ) -> Result<Option<Decision>, PersistenceError>;

    /// Returns every decision recorded under `phase` across all runs,
    /// newest first, primarily used by the Amendment Engine to find
    /// supersession candidates across a run's ancestry.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_decisions_by_phase(&self, phase: &substrate_core::PhaseName) -> Result<Vec<Decision>, PersistenceError>;

    /// Returns every decision recorded under `phase` for one run.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_decisions_by_phase_for_run(
        &self,
        run_id: RunId,
        phase: &substrate_core::PhaseName,
    ) -> Result<Vec<Decision>, PersistenceError>;

    /// Applies a partial update to a decision's value/rationale.
    ///
    /// # Errors
    /// Returns [`PersistenceError::NotFound`] if `id` does not exist.
    fn update_decision(&self, id: DecisionId, patch: DecisionPatch) -> Result<(), PersistenceError>;

    /// Marks `original_id` as superseded by `superseding_id`. Idempotent-safe:
    /// calling this again on an already-superseded decision returns
    /// [`PersistenceError::Conflict`], which callers may treat as
    /// per-row recoverable via [`PersistenceError::is_recoverable`].
    ///
    /// # Errors
    /// Returns [`PersistenceError::NotFound`] or [`PersistenceError::Conflict`].
    fn supersede_decision(&self, original_id: DecisionId, superseding_id: DecisionId) -> Result<(), PersistenceError>;

    /// Returns every decision matching `filter` whose `superseded_by` is
    /// `NULL`.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_active_decisions(&self, filter: &DecisionFilter) -> Result<Vec<Decision>, PersistenceError>;

    /// Records a new requirement.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O or constraint failure.
    fn create_requirement(&self, input: NewRequirement) -> Result<Requirement, PersistenceError>;

    /// Returns every requirement recorded for a run.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_requirements_by_run(&self, run_id: RunId) -> Result<Vec<Requirement>, PersistenceError>;

    /// Transitions a requirement's lifecycle status.
    ///
    /// # Errors
    /// Returns [`PersistenceError::NotFound`] if `id` does not exist.
    fn update_requirement_status(&self, id: RequirementId, status: RequirementStatus) -> Result<(), PersistenceError>;

    /// Records a new constraint.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O or constraint failure.
    fn create_constraint(&self, input: NewConstraint) -> Result<Constraint, PersistenceError>;

    /// Returns every constraint recorded for a run.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_constraints_by_run(&self, run_id: RunId) -> Result<Vec<Constraint>, PersistenceError>;

    /// Registers a phase artifact, hashing `content` if supplied.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O or constraint failure.
    fn register_artifact(&self, input: NewArtifact) -> Result<Artifact, PersistenceError>;

    /// Looks up an artifact by `(run, phase, type)`, the coordinate entry/exit
    /// gates use.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_artifact_by_type_for_run(
        &self,
        run_id: RunId,
        phase: &substrate_core::PhaseName,
        artifact_type: &substrate_core::ArtifactType,
    ) -> Result<Option<Artifact>, PersistenceError>;

    /// Returns every artifact recorded for a run.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_artifacts_by_run(&self, run_id: RunId) -> Result<Vec<Artifact>, PersistenceError>;

    /// Appends one token-usage record to the durable ledger.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O or constraint failure.
    fn add_token_usage(&self, input: TokenUsage) -> Result<(), PersistenceError>;

    /// Returns token usage aggregated by `(phase, agent)` for a run.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] on I/O failure.
    fn get_token_usage_summary(&self, run_id: RunId) -> Result<Vec<TokenUsageAggregate>, PersistenceError>;
}

// ============================================================================
// SECTION: SQLite Implementation
// ============================================================================

/// `SQLite`-backed [`DecisionStore`].
///
/// # Invariants
/// - Exactly one read-write connection exists, owned exclusively by the
///   background writer thread.
/// - Reads use a round-robin pool of read-only connections opened
///   independently of the writer.
pub struct SqliteDecisionStore {
    read_connections: Vec<Mutex<Connection>>,
    read_cursor: AtomicUsize,
    writer: WriteGateway,
}

impl SqliteDecisionStore {
    /// Opens (creating if necessary) a `SQLite`-backed Decision Store at
    /// `config.path`, initializing the schema and spawning the writer thread.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] if the database cannot be opened,
    /// the schema cannot be initialized, or `config.read_pool_size == 0`.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        if config.read_pool_size == 0 {
            return Err(SqliteStoreError::Db("read_pool_size must be greater than zero".to_string()));
        }

        let mut write_connection = open_connection(&config)?;
        initialize_schema(&mut write_connection)?;

        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0..config.read_pool_size {
            let mut read_connection = open_connection(&config)?;
            initialize_schema(&mut read_connection)?;
            read_connections.push(Mutex::new(read_connection));
        }

        let write_connection = Arc::new(Mutex::new(write_connection));
        let writer = spawn_writer(config, write_connection);

        Ok(Self {
            read_connections,
            read_cursor: AtomicUsize::new(0),
            writer,
        })
    }

    fn read_connection(&self) -> &Mutex<Connection> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        &self.read_connections[index]
    }

    fn with_read_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, PersistenceError> {
        let guard = self
            .read_connection()
            .lock()
            .map_err(|_| PersistenceError::Io("decision store read connection mutex poisoned".to_string()))?;
        f(&guard).map_err(Into::into)
    }

    fn submit<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<Result<T, PersistenceError>>) -> WriteCommand,
    ) -> Result<T, PersistenceError> {
        let (response, receiver) = mpsc::channel();
        self.writer.submit(build(response)).map_err(Into::<PersistenceError>::into)?;
        receiver
            .recv()
            .map_err(|_| PersistenceError::Io("decision store writer dropped the response channel".to_string()))?
    }
}

impl DecisionStore for SqliteDecisionStore {
    fn create_pipeline_run(&self, input: NewPipelineRun) -> Result<PipelineRun, PersistenceError> {
        self.submit(|response| WriteCommand::CreatePipelineRun { input, response })
    }

    fn update_pipeline_run(&self, id: RunId, patch: PipelineRunPatch) -> Result<(), PersistenceError> {
        self.submit(|response| WriteCommand::UpdatePipelineRun { id, patch, response })
    }

    fn get_pipeline_run(&self, id: RunId) -> Result<PipelineRun, PersistenceError> {
        self.with_read_connection(|conn| read_pipeline_run(conn, id))
    }

    fn create_decision(&self, input: NewDecision) -> Result<Decision, PersistenceError> {
        self.submit(|response| WriteCommand::CreateDecision { input, response })
    }

    fn get_decision_by_key(
        &self,
        run_id: RunId,
        phase: &substrate_core::PhaseName,
        category: &substrate_core::Category,
        key: &substrate_core::DecisionKey,
    ) -> Result<Option<Decision>, PersistenceError> {
        self.with_read_connection(|conn| {
            conn.query_row(
                "SELECT id, pipeline_run_id, phase, category, key, value_json, rationale, superseded_by
                 FROM decisions
                 WHERE pipeline_run_id = ?1 AND phase = ?2 AND category = ?3 AND key = ?4
                   AND superseded_by IS NULL",
                params![run_id.get(), phase.as_str(), category.as_str(), key.as_str()],
                row_to_decision,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    fn get_decisions_by_phase(&self, phase: &substrate_core::PhaseName) -> Result<Vec<Decision>, PersistenceError> {
        self.with_read_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pipeline_run_id, phase, category, key, value_json, rationale, superseded_by
                 FROM decisions WHERE phase = ?1 ORDER BY id DESC",
            )?;
            let rows = stmt.query_map(params![phase.as_str()], row_to_decision)?;
            collect_rows(rows)
        })
    }

    fn get_decisions_by_phase_for_run(
        &self,
        run_id: RunId,
        phase: &substrate_core::PhaseName,
    ) -> Result<Vec<Decision>, PersistenceError> {
        self.with_read_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pipeline_run_id, phase, category, key, value_json, rationale, superseded_by
                 FROM decisions WHERE pipeline_run_id = ?1 AND phase = ?2 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![run_id.get(), phase.as_str()], row_to_decision)?;
            collect_rows(rows)
        })
    }

    fn update_decision(&self, id: DecisionId, patch: DecisionPatch) -> Result<(), PersistenceError> {
        self.submit(|response| WriteCommand::UpdateDecision { id, patch, response })
    }

    fn supersede_decision(&self, original_id: DecisionId, superseding_id: DecisionId) -> Result<(), PersistenceError> {
        self.submit(|response| WriteCommand::SupersedeDecision { original_id, superseding_id, response })
    }

    fn get_active_decisions(&self, filter: &DecisionFilter) -> Result<Vec<Decision>, PersistenceError> {
        self.with_read_connection(|conn| {
            // Each filter column uses a NULL-safe "unconstrained unless bound"
            // condition so every placeholder is always present in the SQL
            // text regardless of which filter fields are set.
            let mut stmt = conn.prepare(
                "SELECT id, pipeline_run_id, phase, category, key, value_json, rationale, superseded_by
                 FROM decisions
                 WHERE superseded_by IS NULL
                   AND (?1 IS NULL OR pipeline_run_id = ?1)
                   AND (?2 IS NULL OR phase = ?2)
                   AND (?3 IS NULL OR category = ?3)
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(
                params![
                    filter.run_id.map(RunId::get),
                    filter.phase.as_ref().map(substrate_core::PhaseName::as_str),
                    filter.category.as_ref().map(substrate_core::Category::as_str)
                ],
                row_to_decision,
            )?;
            collect_rows(rows)
        })
    }

    fn create_requirement(&self, input: NewRequirement) -> Result<Requirement, PersistenceError> {
        self.submit(|response| WriteCommand::CreateRequirement { input, response })
    }

    fn get_requirements_by_run(&self, run_id: RunId) -> Result<Vec<Requirement>, PersistenceError> {
        self.with_read_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pipeline_run_id, source, requirement_type, description, priority, status
                 FROM requirements WHERE pipeline_run_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![run_id.get()], row_to_requirement)?;
            collect_rows(rows)
        })
    }

    fn update_requirement_status(&self, id: RequirementId, status: RequirementStatus) -> Result<(), PersistenceError> {
        self.submit(|response| WriteCommand::UpdateRequirementStatus { id, status, response })
    }

    fn create_constraint(&self, input: NewConstraint) -> Result<Constraint, PersistenceError> {
        self.submit(|response| WriteCommand::CreateConstraint { input, response })
    }

    fn get_constraints_by_run(&self, run_id: RunId) -> Result<Vec<Constraint>, PersistenceError> {
        self.with_read_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pipeline_run_id, category, description, source
                 FROM constraints WHERE pipeline_run_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![run_id.get()], row_to_constraint)?;
            collect_rows(rows)
        })
    }

    fn register_artifact(&self, input: NewArtifact) -> Result<Artifact, PersistenceError> {
        self.submit(|response| WriteCommand::RegisterArtifact { input, response })
    }

    fn get_artifact_by_type_for_run(
        &self,
        run_id: RunId,
        phase: &substrate_core::PhaseName,
        artifact_type: &substrate_core::ArtifactType,
    ) -> Result<Option<Artifact>, PersistenceError> {
        self.with_read_connection(|conn| {
            conn.query_row(
                "SELECT id, pipeline_run_id, phase, artifact_type, path, content_hash, summary
                 FROM artifacts WHERE pipeline_run_id = ?1 AND phase = ?2 AND artifact_type = ?3
                 ORDER BY id DESC LIMIT 1",
                params![run_id.get(), phase.as_str(), artifact_type.as_str()],
                row_to_artifact,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    fn get_artifacts_by_run(&self, run_id: RunId) -> Result<Vec<Artifact>, PersistenceError> {
        self.with_read_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pipeline_run_id, phase, artifact_type, path, content_hash, summary
                 FROM artifacts WHERE pipeline_run_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![run_id.get()], row_to_artifact)?;
            collect_rows(rows)
        })
    }

    fn add_token_usage(&self, input: TokenUsage) -> Result<(), PersistenceError> {
        self.submit(|response| WriteCommand::AddTokenUsage { input, response })
    }

    fn get_token_usage_summary(&self, run_id: RunId) -> Result<Vec<TokenUsageAggregate>, PersistenceError> {
        self.with_read_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT phase, agent, SUM(input_tokens), SUM(output_tokens), SUM(cost_cents)
                 FROM token_usage WHERE pipeline_run_id = ?1
                 GROUP BY phase, agent ORDER BY phase ASC, agent ASC",
            )?;
            let rows = stmt.query_map(params![run_id.get()], |row| {
                Ok(TokenUsageAggregate {
                    phase: substrate_core::PhaseName::new(row.get::<_, String>(0)?),
                    agent: substrate_core::AgentName::new(row.get::<_, String>(1)?),
                    input_tokens: row.get(2)?,
                    output_tokens: row.get(3)?,
                    cost_cents: row.get(4)?,
                })
            })?;
            collect_rows(rows)
        })
    }
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags =
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection.execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection.execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(SqliteStoreError::from)?;
    Ok(())
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

fn collect_rows<T>(rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>>) -> Result<Vec<T>, SqliteStoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn read_pipeline_run(conn: &Connection, id: RunId) -> Result<PipelineRun, SqliteStoreError> {
    conn.query_row(
        "SELECT id, methodology, current_phase, status, parent_run_id, config_json, token_usage_json
         FROM pipeline_runs WHERE id = ?1",
        params![id.get()],
        row_to_pipeline_run,
    )
    .optional()?
    .ok_or_else(|| SqliteStoreError::NotFound(format!("pipeline run {id}")))
}

fn row_to_pipeline_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<PipelineRun> {
    let raw_id: i64 = row.get(0)?;
    let status_text: String = row.get(3)?;
    let parent_raw: Option<i64> = row.get(4)?;
    let config_json: String = row.get(5)?;
    let token_usage_json: String = row.get(6)?;

    let status = deserialize_enum_str::<RunStatus>(&status_text)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(err)))?;
    let config = RunConfig::from_json_lenient(&config_json);
    let token_usage: TokenUsageTotals = serde_json::from_str(&token_usage_json).unwrap_or_default();

    Ok(PipelineRun {
        id: id_from_row(raw_id, "pipeline run")?,
        methodology: row.get(1)?,
        current_phase: substrate_core::PhaseName::new(row.get::<_, String>(2)?),
        status,
        parent_run_id: parent_raw.and_then(|raw| RunId::from_raw(u64::try_from(raw).unwrap_or_default())),
        config,
        token_usage,
    })
}

fn row_to_decision(row: &rusqlite::Row<'_>) -> rusqlite::Result<Decision> {
    let raw_id: i64 = row.get(0)?;
    let run_raw: i64 = row.get(1)?;
    let value_json: String = row.get(5)?;
    let superseded_raw: Option<i64> = row.get(7)?;

    let value = serde_json::from_str(&value_json)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(err)))?;

    Ok(Decision {
        id: id_from_row(raw_id, "decision")?,
        pipeline_run_id: id_from_row(run_raw, "pipeline run")?,
        phase: substrate_core::PhaseName::new(row.get::<_, String>(2)?),
        category: substrate_core::Category::new(row.get::<_, String>(3)?),
        key: substrate_core::DecisionKey::new(row.get::<_, String>(4)?),
        value,
        rationale: row.get(6)?,
        superseded_by: superseded_raw.and_then(|raw| DecisionId::from_raw(u64::try_from(raw).unwrap_or_default())),
    })
}

fn row_to_requirement(row: &rusqlite::Row<'_>) -> rusqlite::Result<Requirement> {
    let raw_id: i64 = row.get(0)?;
    let run_raw: i64 = row.get(1)?;
    let type_text: String = row.get(3)?;
    let priority_text: String = row.get(5)?;
    let status_text: String = row.get(6)?;

    Ok(Requirement {
        id: id_from_row(raw_id, "requirement")?,
        pipeline_run_id: id_from_row(run_raw, "pipeline run")?,
        source: row.get(2)?,
        requirement_type: deserialize_enum_str(&type_text)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(err)))?,
        description: row.get(4)?,
        priority: deserialize_enum_str(&priority_text)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(err)))?,
        status: deserialize_enum_str(&status_text)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(err)))?,
    })
}

fn row_to_constraint(row: &rusqlite::Row<'_>) -> rusqlite::Result<Constraint> {
    let raw_id: i64 = row.get(0)?;
    let run_raw: i64 = row.get(1)?;

    Ok(Constraint {
        id: id_from_row(raw_id, "constraint")?,
        pipeline_run_id: id_from_row(run_raw, "pipeline run")?,
        category: row.get(2)?,
        description: row.get(3)?,
        source: row.get(4)?,
    })
}

fn row_to_artifact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Artifact> {
    let raw_id: i64 = row.get(0)?;
    let run_raw: i64 = row.get(1)?;
    let content_hash: Option<String> = row.get(5)?;

    Ok(Artifact {
        id: id_from_row(raw_id, "artifact")?,
        pipeline_run_id: id_from_row(run_raw, "pipeline run")?,
        phase: substrate_core::PhaseName::new(row.get::<_, String>(2)?),
        artifact_type: substrate_core::ArtifactType::new(row.get::<_, String>(3)?),
        path: row.get(4)?,
        content_hash: content_hash
            .map(|hex| {
                serde_json::from_value::<substrate_core::HashDigest>(serde_json::Value::String(hex))
            })
            .transpose()
            .map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(err))
            })?,
        summary: row.get(6)?,
    })
}

fn id_from_row<T>(raw: i64, label: &str) -> rusqlite::Result<T>
where
    T: IdFromRaw,
{
    T::from_raw_checked(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Integer,
            Box::new(SqliteStoreError::Corrupt(format!("stored zero {label} id"))),
        )
    })
}

trait IdFromRaw: Sized {
    fn from_raw_checked(raw: i64) -> Option<Self>;
}

impl IdFromRaw for RunId {
    fn from_raw_checked(raw: i64) -> Option<Self> {
        Self::from_raw(u64::try_from(raw).ok()?)
    }
}

impl IdFromRaw for DecisionId {
    fn from_raw_checked(raw: i64) -> Option<Self> {
        Self::from_raw(u64::try_from(raw).ok()?)
    }
}

impl IdFromRaw for RequirementId {
    fn from_raw_checked(raw: i64) -> Option<Self> {
        Self::from_raw(u64::try_from(raw).ok()?)
    }
}

impl IdFromRaw for substrate_core::ConstraintId {
    fn from_raw_checked(raw: i64) -> Option<Self> {
        Self::from_raw(u64::try_from(raw).ok()?)
    }
}

impl IdFromRaw for substrate_core::ArtifactId {
    fn from_raw_checked(raw: i64) -> Option<Self> {
        Self::from_raw(u64::try_from(raw).ok()?)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use substrate_core::Category;
    use substrate_core::DecisionKey;
    use substrate_core::PhaseName;
    use tempfile::tempdir;

    use super::*;
    use crate::types::NewDecision;
    use crate::types::NewPipelineRun;

    fn open_test_store() -> (tempfile::TempDir, SqliteDecisionStore) {
        let dir = tempdir().expect("tempdir");
        let mut config = SqliteStoreConfig::new(dir.path().join("store.db"));
        config.read_pool_size = 2;
        let store = SqliteDecisionStore::open(config).expect("open store");
        (dir, store)
    }

    #[test]
    fn creates_and_reads_back_a_pipeline_run() {
        let (_dir, store) = open_test_store();
        let created = store
            .create_pipeline_run(NewPipelineRun {
                methodology: "bmad".to_string(),
                concept: "build a thing".to_string(),
                start_phase: PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create");
        let loaded = store.get_pipeline_run(created.id).expect("load");
        assert_eq!(loaded.methodology, "bmad");
        assert_eq!(loaded.status, RunStatus::Running);
        assert_eq!(loaded.config.concept, "build a thing");
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let (_dir, store) = open_test_store();
        let created = store
            .create_pipeline_run(NewPipelineRun {
                methodology: "bmad".to_string(),
                concept: "x".to_string(),
                start_phase: PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create");
        store.update_pipeline_run(created.id, PipelineRunPatch::default()).expect("no-op update");
        let loaded = store.get_pipeline_run(created.id).expect("load");
        assert_eq!(loaded.current_phase.as_str(), "analysis");
    }

    #[test]
    fn get_pipeline_run_reports_not_found() {
        let (_dir, store) = open_test_store();
        let missing = RunId::from_raw(999).expect("id");
        let err = store.get_pipeline_run(missing).unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[test]
    fn supersede_decision_is_idempotent_safe() {
        let (_dir, store) = open_test_store();
        let run = store
            .create_pipeline_run(NewPipelineRun {
                methodology: "bmad".to_string(),
                concept: "x".to_string(),
                start_phase: PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create run");
        let original = store
            .create_decision(NewDecision {
                pipeline_run_id: run.id,
                phase: PhaseName::new("architecture"),
                category: Category::new("database"),
                key: DecisionKey::new("engine"),
                value: serde_json::Value::String("postgres".to_string()),
                rationale: None,
            })
            .expect("create decision");
        let amendment = store
            .create_decision(NewDecision {
                pipeline_run_id: run.id,
                phase: PhaseName::new("architecture"),
                category: Category::new("database"),
                key: DecisionKey::new("engine"),
                value: serde_json::Value::String("sqlite".to_string()),
                rationale: None,
            })
            .expect("create amendment decision");

        store.supersede_decision(original.id, amendment.id).expect("first supersede");
        let err = store.supersede_decision(original.id, amendment.id).unwrap_err();
        assert!(matches!(err, PersistenceError::Conflict(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn active_decisions_excludes_superseded_rows() {
        let (_dir, store) = open_test_store();
        let run = store
            .create_pipeline_run(NewPipelineRun {
                methodology: "bmad".to_string(),
                concept: "x".to_string(),
                start_phase: PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create run");
        let original = store
            .create_decision(NewDecision {
                pipeline_run_id: run.id,
                phase: PhaseName::new("architecture"),
                category: Category::new("database"),
                key: DecisionKey::new("engine"),
                value: serde_json::Value::String("postgres".to_string()),
                rationale: None,
            })
            .expect("create decision");
        let amendment = store
            .create_decision(NewDecision {
                pipeline_run_id: run.id,
                phase: PhaseName::new("architecture"),
                category: Category::new("database"),
                key: DecisionKey::new("engine"),
                value: serde_json::Value::String("sqlite".to_string()),
                rationale: None,
            })
            .expect("create amendment");
        store.supersede_decision(original.id, amendment.id).expect("supersede");

        let active = store.get_active_decisions(&DecisionFilter { run_id: Some(run.id), ..Default::default() }).expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, amendment.id);
    }

    #[test]
    fn token_usage_aggregates_by_phase_and_agent() {
        let (_dir, store) = open_test_store();
        let run = store
            .create_pipeline_run(NewPipelineRun {
                methodology: "bmad".to_string(),
                concept: "x".to_string(),
                start_phase: PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create run");
        for cost in [10, 20] {
            store
                .add_token_usage(TokenUsage {
                    pipeline_run_id: run.id,
                    phase: PhaseName::new("analysis"),
                    agent: substrate_core::AgentName::new("analyst"),
                    input_tokens: 100,
                    output_tokens: 50,
                    cost_cents: cost,
                })
                .expect("add usage");
        }
        let summary = store.get_token_usage_summary(run.id).expect("summary");
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].cost_cents, 30);
        assert_eq!(summary[0].input_tokens, 200);
    }
}
