// crates/substrate-events/src/lib.rs
// ============================================================================
// Module: Substrate Events Library
// Description: Synchronous in-process typed publish/subscribe event bus and
// event payload catalog shared by the dispatcher, orchestrator, and
// supervisor.
// Purpose: Decouple event producers from the CLI's NDJSON stream and any
// other consumer.
// Dependencies: substrate-core, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! `substrate-events` is the one place every other component crate reaches
//! for to announce what just happened. It does not know about processes,
//! SQLite, or the CLI — just a name, a timestamp, and a payload.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bus;
pub mod payload;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bus::EventBus;
pub use bus::SubscriptionId;
pub use payload::Event;
pub use payload::EventPayload;
pub use payload::ORCHESTRATOR_COMPLETE;
pub use payload::ORCHESTRATOR_STORY_ESCALATED;
pub use payload::PIPELINE_COMPLETE;
pub use payload::PIPELINE_HEARTBEAT;
pub use payload::PIPELINE_START;
pub use payload::STORY_DONE;
pub use payload::STORY_ESCALATION;
pub use payload::STORY_LOG;
pub use payload::STORY_PHASE;
pub use payload::STORY_STALL;
pub use payload::STORY_WARN;
pub use payload::SUPERVISOR_ABORT;
pub use payload::SUPERVISOR_KILL;
pub use payload::SUPERVISOR_RESTART;
pub use payload::SUPERVISOR_SUMMARY;
pub use payload::TASK_READY;
pub use payload::WORKTREE_CONFLICT;
pub use payload::WORKTREE_CREATED;
pub use payload::WORKTREE_MERGED;
pub use payload::WORKTREE_REMOVED;
