// crates/substrate-core/src/time.rs
// ============================================================================
// Module: Substrate Time Model
// Description: Canonical timestamp representation for runs, decisions, and events.
// Purpose: Provide a deterministic, serializable ISO-8601 timestamp type.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! Substrate represents every durable timestamp (phase history entries,
//! decisions, token usage rows, event payloads) as [`Timestamp`], an
//! RFC3339 wall-clock value. Core types never read the clock implicitly;
//! callers supply timestamps explicitly so replay and tests stay
//! deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical ISO-8601 (RFC3339) timestamp used across Substrate records.
///
/// # Invariants
/// - Always serializes as an RFC3339 string.
/// - No validation is performed beyond RFC3339 parseability; monotonicity
///   is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Builds a timestamp from the current wall clock.
    ///
    /// Callers at the process boundary (CLI, supervisor tick loop) are
    /// expected to call this; library code should accept a `Timestamp`
    /// parameter instead of calling this directly.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Builds a timestamp from a Unix epoch second count.
    #[must_use]
    pub fn from_unix_seconds(seconds: i64) -> Self {
        Self(OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    /// Returns the Unix epoch second count.
    #[must_use]
    pub fn unix_seconds(self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Parses an RFC3339 string into a timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampParseError`] when the string is not valid RFC3339.
    pub fn parse(value: &str) -> Result<Self, TimestampParseError> {
        OffsetDateTime::parse(value, &Rfc3339)
            .map(Self)
            .map_err(|_| TimestampParseError {
                value: value.to_string(),
            })
    }

    /// Returns the number of whole seconds elapsed between `self` and
    /// `later`. Negative when `later` precedes `self`.
    #[must_use]
    pub fn elapsed_seconds_until(self, later: Self) -> i64 {
        (later.0 - self.0).whole_seconds()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.0.format(&Rfc3339).unwrap_or_else(|_| String::from("invalid-timestamp"));
        f.write_str(&rendered)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let rendered = self
            .0
            .format(&Rfc3339)
            .map_err(|err| serde::ser::Error::custom(err.to_string()))?;
        serializer.serialize_str(&rendered)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|err| serde::de::Error::custom(err.to_string()))
    }
}

/// Error returned when a timestamp string fails RFC3339 parsing.
#[derive(Debug, thiserror::Error)]
#[error("invalid RFC3339 timestamp: {value}")]
pub struct TimestampParseError {
    /// The raw value that failed to parse.
    pub value: String,
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
    fn round_trips_through_rfc3339() {
        let ts = Timestamp::from_unix_seconds(1_700_000_000);
        let rendered = ts.to_string();
        let parsed = Timestamp::parse(&rendered).expect("parse");
        assert_eq!(ts, parsed);
    }

    #[test]
    fn elapsed_seconds_until_is_nonnegative_for_later_timestamp() {
        let earlier = Timestamp::from_unix_seconds(1_000);
        let later = Timestamp::from_unix_seconds(1_660);
        assert_eq!(earlier.elapsed_seconds_until(later), 660);
        assert_eq!(later.elapsed_seconds_until(earlier), -660);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Timestamp::parse("not-a-timestamp").is_err());
    }

    #[test]
    fn serde_round_trip() {
        let ts = Timestamp::from_unix_seconds(42);
        let json = serde_json::to_string(&ts).expect("serialize");
        let back: Timestamp = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(ts, back);
    }
}
