// crates/substrate-orchestrator/src/phases/mod.rs
// ============================================================================
// Module: Concrete Phase Runners
// Description: analysis, planning, and solutioning phase runners.
// Purpose: Implements the phase runner shape (spec.md §4.5) for the three
// built-in phases that precede implementation.
// Dependencies: substrate-core, substrate-contract, substrate-dispatcher,
// substrate-store
// ============================================================================

mod analysis;
mod implementation;
mod planning;
mod solutioning;

pub use analysis::AnalysisRunner;
pub use implementation::ImplementationRunner;
pub use planning::PlanningRunner;
pub use solutioning::SolutioningRunner;

use serde_json::Value;
use substrate_contract::PromptSection;
use substrate_contract::SectionPriority;
use substrate_contract::TaskType;
use substrate_core::TokenUsage;
use substrate_core::TokenUsageTotals;
use substrate_dispatcher::DispatchRequest;
use substrate_dispatcher::DispatchStatus;

use crate::runner::PhaseRunnerReport;
use crate::runner::RunnerContext;

/// Builds the amendment-context prompt section for `phase`, if `ctx` is
/// running as part of an amendment run. Returns `None` for a normal run.
fn amendment_section(ctx: &RunnerContext, phase: &substrate_core::PhaseName) -> Option<PromptSection> {
    let amendment = ctx.amendment.as_ref()?;
    Some(PromptSection::new(
        "amendment_context",
        SectionPriority::Important,
        amendment.load_context_for_phase(phase),
    ))
}

/// Dispatches a single sub-agent task and folds its token usage into
/// `ctx`'s Decision Store, returning the parsed output on success.
///
/// On any non-success outcome (timeout, non-zero exit, parse failure,
/// rejection), returns a failed [`PhaseRunnerReport`] with no further
/// mutation.
async fn dispatch_and_record(
    ctx: &RunnerContext,
    phase: substrate_core::PhaseName,
    task_type: TaskType,
    template: String,
    sections: Vec<PromptSection>,
    token_ceiling: u64,
) -> Result<Value, PhaseRunnerReport> {
    let request = DispatchRequest {
        task_type,
        template,
        sections,
        token_ceiling,
        agent: None,
        model: None,
        timeout_secs: None,
    };

    let outcome = ctx
        .dispatcher
        .dispatch(request)
        .await
        .map_err(|_| PhaseRunnerReport::missing_input("dispatcher-shutting-down"))?;

    if outcome.status != DispatchStatus::Completed {
        return Err(PhaseRunnerReport {
            result: crate::runner::PhaseRunResult::Failed,
            token_usage: token_usage_totals(&outcome.token_estimate),
            error: Some(outcome.parse_error.clone().unwrap_or_else(|| format!("{:?}", outcome.status))),
        });
    }

    let parsed = outcome.parsed.clone().ok_or_else(|| PhaseRunnerReport {
        result: crate::runner::PhaseRunResult::Failed,
        token_usage: token_usage_totals(&outcome.token_estimate),
        error: Some(outcome.parse_error.clone().unwrap_or_else(|| "no-structured-output".to_string())),
    })?;

    let agent = substrate_core::AgentName::new("default");
    if let Err(error) = ctx.store.add_token_usage(TokenUsage {
        pipeline_run_id: ctx.run_id,
        phase,
        agent,
        input_tokens: outcome.token_estimate.input,
        output_tokens: outcome.token_estimate.output,
        cost_cents: 0,
    }) {
        tracing::warn!(%error, "failed to record token usage");
    }

    Ok(parsed)
}

fn token_usage_totals(estimate: &substrate_contract::TokenEstimate) -> TokenUsageTotals {
    TokenUsageTotals {
        input_tokens: estimate.input,
        output_tokens: estimate.output,
        cost_cents: 0,
    }
}
