// crates/substrate-core/src/hashing.rs
// ============================================================================
// Module: Substrate Content Hashing
// Description: Canonical JSON hashing for artifacts and decision content.
// Purpose: Provide stable content digests independent of field ordering.
// Dependencies: serde_json, sha2
// ============================================================================

//! ## Overview
//! Content hashes are computed over canonical JSON bytes: object keys
//! sorted, no insignificant whitespace. This keeps `content_hash` stable
//! across serializers and languages for the same logical value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// A hex-encoded SHA-256 content digest.
///
/// # Invariants
/// - Always 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HashDigest(String);

impl HashDigest {
    /// Returns the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors raised while canonicalizing or hashing a value.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The value could not be serialized to JSON.
    #[error("failed to serialize value for hashing: {0}")]
    Serialize(String),
}

/// Serializes `value` to canonical JSON bytes (sorted object keys).
///
/// # Errors
///
/// Returns [`HashError::Serialize`] when `value` cannot be serialized.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    let raw = serde_json::to_value(value).map_err(|err| HashError::Serialize(err.to_string()))?;
    let sorted = sort_value_keys(raw);
    serde_json::to_vec(&sorted).map_err(|err| HashError::Serialize(err.to_string()))
}

/// Hashes raw bytes with SHA-256, returning a hex digest.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> HashDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    HashDigest(hex_encode(&digest))
}

/// Serializes `value` to canonical JSON and hashes the result.
///
/// # Errors
///
/// Returns [`HashError::Serialize`] when `value` cannot be serialized.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Recursively sorts object keys so that serialization is deterministic
/// regardless of struct field declaration order or map insertion order.
fn sort_value_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            for key in keys {
                if let Some(inner) = map.get(&key) {
                    sorted.insert(key, sort_value_keys(inner.clone()));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_value_keys).collect())
        }
        other => other,
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_across_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        let hash_a = hash_canonical_json(&a).expect("hash a");
        let hash_b = hash_canonical_json(&b).expect("hash b");
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn digest_is_64_hex_chars() {
        let digest = hash_bytes(b"substrate");
        assert_eq!(digest.as_str().len(), 64);
        assert!(digest.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_values_hash_differently() {
        let a = hash_canonical_json(&json!({"x": 1})).expect("hash");
        let b = hash_canonical_json(&json!({"x": 2})).expect("hash");
        assert_ne!(a, b);
    }
}
