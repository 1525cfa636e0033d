// crates/substrate-dispatcher/src/lib.rs
// ============================================================================
// Module: Substrate Dispatcher Library
// Description: Sub-agent process lifecycle — prompt assembly invocation,
// spawn, capture, parse, token accounting, cooperative cancellation.
// Purpose: Implement spec.md §4.3.
// Dependencies: substrate-core, substrate-contract, substrate-events, tokio
// ============================================================================

//! ## Overview
//! `substrate-dispatcher` is the only crate that spawns operating-system
//! processes. Everything upstream of it (phase runners, the Implementation
//! Orchestrator) depends on the [`Dispatcher`] type and never touches
//! `tokio::process` directly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod agent_process;
pub mod dispatcher;
pub mod schema;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use agent_process::AgentProcess;
pub use agent_process::AgentProcessError;
pub use agent_process::RawAgentOutput;
pub use agent_process::TokioAgentProcess;
pub use dispatcher::DispatchRejected;
pub use dispatcher::Dispatcher;
pub use schema::extract_json;
pub use schema::validate_parsed;
pub use types::DispatchId;
pub use types::DispatchOutcome;
pub use types::DispatchRequest;
pub use types::DispatchStatus;
