// crates/substrate-core/src/error.rs
// ============================================================================
// Module: Substrate Core Errors
// Description: Shared error taxonomy reused by downstream crates.
// Purpose: Give every persistence/validation failure a stable, matchable shape.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! `CoreError` is the lowest common error type in the workspace. Downstream
//! crates define their own `thiserror` enums and convert into or wrap this
//! type at their boundary, following the teacher's pattern of narrow,
//! per-module error enums composed via `#[from]`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Persistence Errors
// ============================================================================

/// Errors raised by the Decision Store and propagated as fatal to the
/// current phase by orchestrators (spec.md §4.1, §7).
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// No row matched the requested lookup.
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness or foreign-key constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// The requested state transition conflicts with the row's current state
    /// (e.g. superseding an already-superseded decision).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Underlying I/O or driver failure.
    #[error("storage io error: {0}")]
    Io(String),
    /// Stored data failed to deserialize or violates an invariant on load.
    #[error("corrupt data: {0}")]
    Corrupt(String),
}

impl PersistenceError {
    /// Returns true when the surrounding operation may safely continue
    /// iterating over other rows (per-row recoverable), per spec.md §4.1's
    /// `supersedeDecision` idempotent-safe contract.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::NotFound(_))
    }
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
    fn conflict_and_not_found_are_recoverable() {
        assert!(PersistenceError::Conflict("x".into()).is_recoverable());
        assert!(PersistenceError::NotFound("x".into()).is_recoverable());
        assert!(!PersistenceError::Corrupt("x".into()).is_recoverable());
        assert!(!PersistenceError::Io("x".into()).is_recoverable());
    }
}
