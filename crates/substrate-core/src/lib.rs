// crates/substrate-core/src/lib.rs
// ============================================================================
// Module: Substrate Core Library
// Description: Shared identifiers, time, hashing, data model, and error types.
// Purpose: Provide the backend-agnostic vocabulary every other crate builds on.
// Dependencies: serde, serde_json, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! `substrate-core` has no dependency on the Decision Store, the Event Bus,
//! or the dispatcher — it only defines the value types and identifiers that
//! those crates exchange. This mirrors `decision-gate-core`'s role as the
//! dependency-free hub of the workspace.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::PersistenceError;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use identifiers::AgentName;
pub use identifiers::ArtifactId;
pub use identifiers::ArtifactType;
pub use identifiers::Category;
pub use identifiers::ConstraintId;
pub use identifiers::DecisionId;
pub use identifiers::DecisionKey;
pub use identifiers::IdAllocator;
pub use identifiers::PhaseName;
pub use identifiers::RequirementId;
pub use identifiers::RunId;
pub use identifiers::StoryKey;
pub use model::Artifact;
pub use model::Constraint;
pub use model::Decision;
pub use model::GateResult;
pub use model::PhaseHistoryEntry;
pub use model::PipelineRun;
pub use model::Requirement;
pub use model::RequirementPriority;
pub use model::RequirementStatus;
pub use model::RequirementType;
pub use model::RunConfig;
pub use model::RunStatus;
pub use model::Story;
pub use model::StoryPhase;
pub use model::SupersessionLogEntry;
pub use model::TokenUsage;
pub use model::TokenUsageAggregate;
pub use model::TokenUsageTotals;
pub use time::Timestamp;
pub use time::TimestampParseError;
