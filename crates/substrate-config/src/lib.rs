// crates/substrate-config/src/lib.rs
// ============================================================================
// Module: Substrate Configuration
// Description: Layered TOML configuration with fail-closed path/size validation.
// Purpose: Provide typed knobs for concurrency, review cycles, supervisor
// thresholds, and the conflict-detector module-classification table.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration load guards mirror the teacher's `decision-gate-config`
//! contract (path length, path component length, file size cap, UTF-8
//! validity) inferred from its retained test suite. Loading is fail-closed:
//! any guard violation is a [`ConfigError`], never a silent default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum total config path length accepted by [`SubstrateConfig::load`].
pub const MAX_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum config file size accepted by [`SubstrateConfig::load`].
pub const MAX_FILE_BYTES: u64 = 1_048_576;

// ============================================================================
// SECTION: Config Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
///
/// # Invariants
/// - Variants are stable for programmatic handling and carry a
///   human-readable message for CLI surfacing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config path exceeds [`MAX_PATH_LENGTH`].
    #[error("config path exceeds max length")]
    PathTooLong,
    /// A path component exceeds [`MAX_PATH_COMPONENT_LENGTH`].
    #[error("config path component too long")]
    PathComponentTooLong,
    /// Config file exceeds [`MAX_FILE_BYTES`].
    #[error("config file exceeds size limit")]
    FileTooLarge,
    /// Config file is not valid UTF-8.
    #[error("config file must be utf-8")]
    NotUtf8,
    /// Underlying filesystem I/O failure.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing failure.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A parsed value failed semantic validation.
    #[error("config validation error: {0}")]
    Validation(String),
}

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Typed Substrate configuration.
///
/// # Invariants
/// - `max_concurrency >= 1`.
/// - `max_review_cycles >= 1`.
/// - `max_restarts >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    /// Filesystem path to the decision-store database file.
    pub store_path: String,
    /// Maximum number of conflict groups running in parallel.
    pub max_concurrency: u32,
    /// Maximum review cycles before a story escalates.
    pub max_review_cycles: u32,
    /// Supervisor stall threshold, in seconds.
    pub stall_threshold_secs: u64,
    /// Maximum supervisor restarts before aborting.
    pub max_restarts: u32,
    /// Per-dispatch timeout, in seconds. `0` means no timeout.
    pub dispatch_timeout_secs: u64,
    /// Dispatcher prompt token ceiling.
    pub token_ceiling: u64,
    /// Conflict Detector module-classification table, keyed by story key
    /// (e.g. `"10-1"`). An epic id (e.g. `"10"`) is also accepted as a
    /// coarser fallback key covering every story under that epic.
    pub module_classification: BTreeMap<String, Vec<String>>,
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            store_path: ".substrate/decisions.sqlite3".to_string(),
            max_concurrency: 4,
            max_review_cycles: 3,
            stall_threshold_secs: 600,
            max_restarts: 2,
            dispatch_timeout_secs: 900,
            token_ceiling: 32_000,
            module_classification: BTreeMap::new(),
        }
    }
}

impl SubstrateConfig {
    /// Loads configuration from `path`, or returns defaults when `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is too long, a component is too
    /// long, the file is too large, the file is not UTF-8, the file cannot
    /// be read, the TOML fails to parse, or semantic validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        Self::validate_path_shape(path)?;

        let metadata = std::fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_FILE_BYTES {
            return Err(ConfigError::FileTooLarge);
        }

        let bytes = std::fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|_| ConfigError::NotUtf8)?;

        let config: Self = toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate_path_shape(path: &Path) -> Result<(), ConfigError> {
        let rendered = path.to_string_lossy();
        if rendered.len() > MAX_PATH_LENGTH {
            return Err(ConfigError::PathTooLong);
        }
        for component in path.components() {
            let component_str = component.as_os_str().to_string_lossy();
            if component_str.len() > MAX_PATH_COMPONENT_LENGTH {
                return Err(ConfigError::PathComponentTooLong);
            }
        }
        Ok(())
    }

    /// Validates semantic invariants not expressible in the type system.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a numeric knob is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Validation("max_concurrency must be >= 1".to_string()));
        }
        if self.max_review_cycles == 0 {
            return Err(ConfigError::Validation("max_review_cycles must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Returns the configured modules touched by `story_key`.
    ///
    /// Looks up `story_key` verbatim first (spec.md §9's "source-defined,
    /// hard-coded per story-key prefix" table), then falls back to its epic
    /// id for a coarser per-epic classification, then to a singleton module
    /// named after the story key itself so two unclassified stories under
    /// the same epic never collapse into one conflict group by accident.
    #[must_use]
    pub fn modules_for_story(&self, story_key: &str) -> Vec<String> {
        if let Some(modules) = self.module_classification.get(story_key) {
            return modules.clone();
        }
        let epic_id = story_key.split('-').next().unwrap_or(story_key);
        if let Some(modules) = self.module_classification.get(epic_id) {
            return modules.clone();
        }
        vec![format!("story:{story_key}")]
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
    use std::io::Write;

    #[test]
    fn load_none_returns_defaults() {
        let config = SubstrateConfig::load(None).expect("default load");
        assert_eq!(config, SubstrateConfig::default());
    }

    #[test]
    fn load_rejects_path_too_long() {
        let long_path = "a".repeat(5_000);
        let path = Path::new(&long_path);
        let err = SubstrateConfig::load(Some(path)).expect_err("should fail");
        assert!(matches!(err, ConfigError::PathTooLong));
    }

    #[test]
    fn load_rejects_path_component_too_long() {
        let long_component = "a".repeat(300);
        let path = Path::new(&long_component);
        let err = SubstrateConfig::load(Some(path)).expect_err("should fail");
        assert!(matches!(err, ConfigError::PathComponentTooLong));
    }

    #[test]
    fn load_rejects_oversized_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        let payload = vec![b'a'; 1_048_577];
        file.write_all(&payload).expect("write");
        let err = SubstrateConfig::load(Some(file.path())).expect_err("should fail");
        assert!(matches!(err, ConfigError::FileTooLarge));
    }

    #[test]
    fn load_rejects_non_utf8_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(&[0xFF, 0xFE, 0xFF]).expect("write");
        let err = SubstrateConfig::load(Some(file.path())).expect_err("should fail");
        assert!(matches!(err, ConfigError::NotUtf8));
    }

    #[test]
    fn load_parses_valid_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "max_concurrency = 8\nmax_review_cycles = 5").expect("write");
        let config = SubstrateConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.max_review_cycles, 5);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = SubstrateConfig::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn modules_for_story_falls_back_to_singleton() {
        let config = SubstrateConfig::default();
        assert_eq!(config.modules_for_story("10-1"), vec!["story:10-1".to_string()]);
    }

    #[test]
    fn modules_for_story_prefers_story_key_over_epic() {
        let mut config = SubstrateConfig::default();
        config.module_classification.insert("10".to_string(), vec!["epic-wide".to_string()]);
        config.module_classification.insert("10-1".to_string(), vec!["billing".to_string()]);
        assert_eq!(config.modules_for_story("10-1"), vec!["billing".to_string()]);
        assert_eq!(config.modules_for_story("10-2"), vec!["epic-wide".to_string()]);
    }

    #[test]
    fn modules_for_story_falls_back_to_epic_id() {
        let mut config = SubstrateConfig::default();
        config.module_classification.insert("10".to_string(), vec!["billing".to_string()]);
        assert_eq!(config.modules_for_story("10-1"), vec!["billing".to_string()]);
    }
}
