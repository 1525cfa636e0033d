// crates/substrate-store/src/config.rs
// ============================================================================
// Module: Decision Store Configuration
// Description: SQLite connection and writer-batching configuration.
// Purpose: Expose the pragma/journal/writer-queue knobs substrate-config
// layers on top of, without substrate-store depending on substrate-config.
// Dependencies: serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

const fn default_writer_queue_capacity() -> usize {
    256
}

const fn default_batch_max_ops() -> usize {
    32
}

const fn default_batch_max_wait_ms() -> u64 {
    10
}

const fn default_read_pool_size() -> usize {
    4
}

// ============================================================================
// SECTION: Pragma Enums
// ============================================================================

/// `SQLite` journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended; allows concurrent readers).
    #[default]
    Wal,
    /// Delete journal mode (legacy, rollback-journal based).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest, default).
    #[default]
    Full,
    /// Normal synchronous mode (balanced; safe under WAL).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

// ============================================================================
// SECTION: Store Config
// ============================================================================

/// Configuration for [`crate::SqliteDecisionStore`].
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds, applied to every connection.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Bounded channel capacity between callers and the writer thread.
    #[serde(default = "default_writer_queue_capacity")]
    pub writer_queue_capacity: usize,
    /// Maximum number of write commands committed in a single transaction.
    #[serde(default = "default_batch_max_ops")]
    pub batch_max_ops: usize,
    /// Maximum time the writer waits to fill a batch before committing it.
    #[serde(default = "default_batch_max_wait_ms")]
    pub batch_max_wait_ms: u64,
    /// Number of pooled read-only connections used for round-robin reads.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Builds a config pointing at `path` with every other field defaulted.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            writer_queue_capacity: default_writer_queue_capacity(),
            batch_max_ops: default_batch_max_ops(),
            batch_max_wait_ms: default_batch_max_wait_ms(),
            read_pool_size: default_read_pool_size(),
        }
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
    fn new_applies_defaults() {
        let config = SqliteStoreConfig::new(PathBuf::from("/tmp/x.db"));
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert_eq!(config.journal_mode, SqliteStoreMode::Wal);
        assert_eq!(config.sync_mode, SqliteSyncMode::Full);
        assert_eq!(config.read_pool_size, 4);
    }

    #[test]
    fn pragma_values_match_sqlite_keywords() {
        assert_eq!(SqliteStoreMode::Wal.pragma_value(), "wal");
        assert_eq!(SqliteStoreMode::Delete.pragma_value(), "delete");
        assert_eq!(SqliteSyncMode::Full.pragma_value(), "full");
        assert_eq!(SqliteSyncMode::Normal.pragma_value(), "normal");
    }
}
