// crates/substrate-store/src/lib.rs
// ============================================================================
// Module: Decision Store Library
// Description: SQLite-backed Decision Store (spec.md §4.1).
// Purpose: Durable, append-only storage for pipeline runs, decisions,
// requirements, constraints, artifacts, and token usage.
// Dependencies: substrate-core, rusqlite, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! `substrate-store` is the only crate in the workspace that talks to
//! `SQLite` directly. Every other crate depends on the [`DecisionStore`]
//! trait, not on [`SqliteDecisionStore`] or `rusqlite`, mirroring how
//! `decision-gate-store-sqlite` sits behind `decision-gate-core`'s storage
//! traits in the teacher workspace.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod config;
mod error;
mod mapping;
mod schema;
mod store;
mod types;
mod writer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::SqliteStoreConfig;
pub use config::SqliteStoreMode;
pub use config::SqliteSyncMode;
pub use error::SqliteStoreError;
pub use schema::SCHEMA_VERSION;
pub use store::DecisionStore;
pub use store::SqliteDecisionStore;
pub use types::DecisionFilter;
pub use types::DecisionPatch;
pub use types::NewArtifact;
pub use types::NewConstraint;
pub use types::NewDecision;
pub use types::NewPipelineRun;
pub use types::NewRequirement;
pub use types::PipelineRunPatch;
