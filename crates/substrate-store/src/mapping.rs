// crates/substrate-store/src/mapping.rs
// ============================================================================
// Module: Enum/TEXT Column Mapping
// Description: Round-trips unit-variant enums through a plain TEXT column
// via their serde string representation, without the surrounding JSON quotes
// a naive `serde_json::to_string` call would leave in the column.
// Purpose: Let `RunStatus`, `RequirementType`, `RequirementPriority`, and
// `RequirementStatus` live as readable TEXT values rather than opaque blobs.
// Dependencies: serde, serde_json
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SqliteStoreError;

/// Serializes a unit-variant enum to its bare string representation, e.g.
/// `RunStatus::Running` becomes `"running"` rather than `"\"running\""`.
pub(crate) fn serialize_enum_str<T: Serialize>(value: &T) -> Result<String, SqliteStoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(text)) => Ok(text),
        Ok(other) => Err(SqliteStoreError::Corrupt(format!(
            "expected a string-serializable enum, got {other}"
        ))),
        Err(err) => Err(SqliteStoreError::Corrupt(err.to_string())),
    }
}

/// Inverse of [`serialize_enum_str`]: parses a bare TEXT column value back
/// into its enum, reusing the type's own serde `Deserialize` impl.
pub(crate) fn deserialize_enum_str<T: DeserializeOwned>(text: &str) -> Result<T, SqliteStoreError> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|err| SqliteStoreError::Corrupt(format!("invalid enum column value {text:?}: {err}")))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use substrate_core::RunStatus;

    use super::*;

    #[test]
    fn round_trips_through_bare_text() {
        let text = serialize_enum_str(&RunStatus::Running).expect("serialize");
        assert_eq!(text, "running");
        let back: RunStatus = deserialize_enum_str(&text).expect("deserialize");
        assert_eq!(back, RunStatus::Running);
    }

    #[test]
    fn rejects_unknown_text() {
        assert!(deserialize_enum_str::<RunStatus>("not-a-status").is_err());
    }
}
