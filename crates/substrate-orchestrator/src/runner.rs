// crates/substrate-orchestrator/src/runner.rs
// ============================================================================
// Module: Phase Runner Seam
// Description: Shared trait and context for phase runners (spec.md §4.5).
// Purpose: `runPhase(deps, {runId, ...}) -> {result, tokenUsage, error?}`.
// Dependencies: substrate-core, substrate-store, substrate-dispatcher,
// substrate-events
// ============================================================================

//! ## Overview
//! Every phase runner loads active prior-phase decisions, optionally
//! injects amendment context when the run has a parent, dispatches one or
//! more sub-agent tasks in sequence, persists each as a typed decision,
//! registers a phase artifact, and accumulates token usage. A missing
//! required prior-phase input produces a failed report with no artifact
//! registered, never a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use substrate_core::PhaseName;
use substrate_core::RunId;
use substrate_core::TokenUsageTotals;
use substrate_dispatcher::Dispatcher;
use substrate_events::EventBus;
use substrate_store::DecisionStore;

use crate::amendment::AmendmentContextHandler;

/// Shared dependencies a phase runner needs: the store, the dispatcher, the
/// event bus, the run being advanced, and optional amendment context.
pub struct RunnerContext {
    /// Decision Store handle.
    pub store: Arc<dyn DecisionStore>,
    /// Dispatcher used to run sub-agent tasks.
    pub dispatcher: Arc<Dispatcher>,
    /// Event bus for progress events.
    pub event_bus: Arc<EventBus>,
    /// The run this phase execution belongs to.
    pub run_id: RunId,
    /// Present only when `run_id` is an amendment run.
    pub amendment: Option<AmendmentContextHandler>,
}

/// Outcome of a single phase runner execution.
#[derive(Debug, Clone)]
pub struct PhaseRunnerReport {
    /// `true` when the phase's sub-agent work completed and its artifact
    /// was registered.
    pub result: PhaseRunResult,
    /// Accumulated token usage across every sub-agent dispatch this run made.
    pub token_usage: TokenUsageTotals,
    /// Populated when `result` is [`PhaseRunResult::Failed`].
    pub error: Option<String>,
}

/// Terminal result of a phase runner execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseRunResult {
    /// The phase's work completed and its artifact is registered.
    Success,
    /// The phase could not run, usually for a missing required input.
    Failed,
}

/// A phase runner: drives one phase's sub-agent work to completion.
#[async_trait::async_trait]
pub trait PhaseRunner: Send + Sync {
    /// The phase name this runner drives.
    fn phase(&self) -> PhaseName;

    /// Runs this phase's sub-agent work for `ctx.run_id`.
    async fn run(&self, ctx: &RunnerContext) -> PhaseRunnerReport;
}

impl PhaseRunnerReport {
    /// Builds a failed report carrying no token usage, for a missing
    /// required prior-phase input (spec.md §4.5).
    #[must_use]
    pub fn missing_input(reason: impl Into<String>) -> Self {
        Self {
            result: PhaseRunResult::Failed,
            token_usage: TokenUsageTotals::default(),
            error: Some(reason.into()),
        }
    }

    /// Builds a successful report with the given accumulated token usage.
    #[must_use]
    pub fn success(token_usage: TokenUsageTotals) -> Self {
        Self {
            result: PhaseRunResult::Success,
            token_usage,
            error: None,
        }
    }
}
