// crates/substrate-store/src/error.rs
// ============================================================================
// Module: Decision Store Errors
// Description: SQLite-specific error taxonomy, converted at the trait
// boundary into substrate_core::PersistenceError.
// Purpose: Keep rusqlite error shapes out of the public DecisionStore API.
// Dependencies: substrate-core, thiserror
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use substrate_core::PersistenceError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite`-specific store errors, mapped onto [`PersistenceError`] at the
/// [`crate::DecisionStore`] boundary.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// I/O or connection-setup failure.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine or query-execution failure.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Row not found for the requested lookup.
    #[error("not found: {0}")]
    NotFound(String),
    /// Uniqueness/foreign-key constraint violation.
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// Requested transition conflicts with the row's current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Stored data failed to deserialize or violates an invariant on load.
    #[error("corrupt data: {0}")]
    Corrupt(String),
    /// On-disk schema version does not match [`crate::schema::SCHEMA_VERSION`].
    #[error("schema version mismatch: {0}")]
    VersionMismatch(String),
}

impl From<SqliteStoreError> for PersistenceError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => Self::Io(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Constraint(message) => Self::Constraint(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(message)
            }
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}
