// crates/substrate-core/src/identifiers.rs
// ============================================================================
// Module: Substrate Identifiers
// Description: Canonical opaque identifiers for pipeline runs, decisions, and stories.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout Substrate. Numeric
//! identifiers are `NonZeroU64`-backed and enforce non-zero, 1-based
//! invariants at construction boundaries. Textual identifiers are opaque
//! strings with no normalization applied by this module.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Numeric Identifiers
// ============================================================================

macro_rules! numeric_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        ///
        /// # Invariants
        /// - Always >= 1 (non-zero, 1-based).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Creates a new identifier from a non-zero value.
            #[must_use]
            pub const fn new(id: NonZeroU64) -> Self {
                Self(id)
            }

            /// Creates an identifier from a raw value (returns `None` if zero).
            #[must_use]
            pub fn from_raw(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map(Self)
            }

            /// Returns the raw identifier value (always >= 1).
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.get().fmt(f)
            }
        }
    };
}

numeric_id!(RunId, "Pipeline run identifier.");
numeric_id!(DecisionId, "Decision row identifier.");
numeric_id!(RequirementId, "Requirement row identifier.");
numeric_id!(ConstraintId, "Constraint row identifier.");
numeric_id!(ArtifactId, "Artifact row identifier.");

/// Monotonic allocator for numeric identifiers within a single process.
///
/// # Invariants
/// - Never yields zero.
/// - Strictly increasing across calls from the same allocator instance.
#[derive(Debug, Default)]
pub struct IdAllocator {
    /// Next raw value to hand out.
    next: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocates the next raw identifier value.
    #[must_use]
    pub fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

// ============================================================================
// SECTION: Textual Identifiers
// ============================================================================

macro_rules! textual_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

textual_id!(PhaseName, "Name of a registered methodology phase.");
textual_id!(Category, "Decision category within a phase.");
textual_id!(DecisionKey, "Decision key within a phase/category.");
textual_id!(ArtifactType, "Artifact type within a phase.");
textual_id!(AgentName, "Name of a sub-agent invoked by the dispatcher.");

/// Story key of the form `<epicId>-<seq>[-<suffix>]`.
///
/// # Invariants
/// - Always contains at least one `-` separator; [`StoryKey::epic_id`]
///   returns the segment before the first `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryKey(String);

impl StoryKey {
    /// Creates a new story key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the story key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the epic id, derived by splitting on `-` and taking the
    /// first segment.
    #[must_use]
    pub fn epic_id(&self) -> &str {
        self.0.split('-').next().unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for StoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for StoryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StoryKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_key_splits_epic_id() {
        let key = StoryKey::new("10-1");
        assert_eq!(key.epic_id(), "10");
        let key = StoryKey::new("10-1-a");
        assert_eq!(key.epic_id(), "10");
    }

    #[test]
    fn story_key_without_separator_returns_whole_string() {
        let key = StoryKey::new("lonekey");
        assert_eq!(key.epic_id(), "lonekey");
    }

    #[test]
    fn numeric_id_rejects_zero() {
        assert!(RunId::from_raw(0).is_none());
        assert!(RunId::from_raw(1).is_some());
    }

    #[test]
    fn id_allocator_is_monotonic_and_nonzero() {
        let allocator = IdAllocator::new();
        let a = allocator.next_raw();
        let b = allocator.next_raw();
        assert!(a >= 1);
        assert!(b > a);
    }
}
