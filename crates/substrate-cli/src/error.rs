// crates/substrate-cli/src/error.rs
// ============================================================================
// Module: CLI Error / Exit Code Taxonomy
// Description: Maps CLI failures onto the exit code taxonomy in spec.md
// §6.1: 0 success, 1 partial failure or generic error, 2 usage/validation
// error, 4 all retried tasks failed.
// Purpose: Give every command handler one place to report a typed failure
// and let `main` translate it into a process exit code.
// Dependencies: anyhow, std
// ============================================================================

use std::process::ExitCode;

/// A CLI-level failure, carrying the exit code its kind maps to.
#[derive(Debug)]
pub struct CliError {
    message: String,
    kind: CliErrorKind,
}

/// Exit code category for a [`CliError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorKind {
    /// Generic or partial failure.
    Generic,
    /// Usage or validation error (bad arguments, malformed config).
    Usage,
    /// All retried work failed (every story escalated).
    AllFailed,
}

impl CliError {
    /// Builds a generic-failure error (exit code 1).
    #[must_use]
    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: CliErrorKind::Generic,
        }
    }

    /// Builds a usage/validation error (exit code 2).
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: CliErrorKind::Usage,
        }
    }

    /// Builds an all-failed error (exit code 4).
    #[must_use]
    pub fn all_failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: CliErrorKind::AllFailed,
        }
    }

    /// The message to print to stderr.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Maps this error onto the spec.md §6.1 exit code taxonomy.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self.kind {
            CliErrorKind::Generic => ExitCode::from(1),
            CliErrorKind::Usage => ExitCode::from(2),
            CliErrorKind::AllFailed => ExitCode::from(4),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        Self::generic(error.to_string())
    }
}

impl From<substrate_config::ConfigError> for CliError {
    fn from(error: substrate_config::ConfigError) -> Self {
        Self::usage(error.to_string())
    }
}

impl From<substrate_store::SqliteStoreError> for CliError {
    fn from(error: substrate_store::SqliteStoreError) -> Self {
        Self::generic(error.to_string())
    }
}

impl From<substrate_core::PersistenceError> for CliError {
    fn from(error: substrate_core::PersistenceError) -> Self {
        Self::generic(error.to_string())
    }
}

impl From<substrate_orchestrator::PhaseOrchestratorError> for CliError {
    fn from(error: substrate_orchestrator::PhaseOrchestratorError) -> Self {
        Self::generic(error.to_string())
    }
}

impl From<substrate_orchestrator::AmendmentError> for CliError {
    fn from(error: substrate_orchestrator::AmendmentError) -> Self {
        Self::generic(error.to_string())
    }
}

/// CLI result alias for fallible command handlers.
pub type CliResult<T> = Result<T, CliError>;
