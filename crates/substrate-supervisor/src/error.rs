// crates/substrate-supervisor/src/error.rs
// ============================================================================
// Module: Supervisor Errors
// Description: Failure modes for spawning and reading the supervised
// pipeline process.
// Purpose: Give the tick loop a typed error distinct from the Decision
// Store's PersistenceError, since a spawn/read failure is an OS-level
// concern, not a storage one.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while supervising a pipeline process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The pipeline process could not be spawned.
    #[error("failed to spawn pipeline process: {0}")]
    Spawn(String),
    /// The pipeline process's stdout could not be read or was not piped.
    #[error("failed to read pipeline stdout: {0}")]
    Io(String),
}
