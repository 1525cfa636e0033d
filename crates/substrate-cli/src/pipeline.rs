// crates/substrate-cli/src/pipeline.rs
// ============================================================================
// Module: Pipeline Drive Loop
// Description: Runs a pipeline run's phases to completion or to a
// `--stop-after` boundary, interleaving phase-runner execution with
// `PhaseOrchestrator::advance_phase`.
// Purpose: `PhaseOrchestrator` only walks already-satisfied gates; it never
// invokes a phase runner itself (spec.md §4.4). This is the missing half:
// the loop `auto run`/`auto resume`/`auto amend` all share.
// Dependencies: substrate-orchestrator, substrate-store, substrate-events
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use substrate_core::PhaseName;
use substrate_core::RunId;
use substrate_core::RunStatus;
use substrate_core::TokenUsage;
use substrate_events::EventPayload;
use substrate_orchestrator::AmendmentContextHandler;
use substrate_orchestrator::PhaseOrchestrator;
use substrate_orchestrator::PhaseRunResult;
use substrate_orchestrator::PhaseRunner;
use substrate_orchestrator::PhaseRunnerReport;
use substrate_orchestrator::RunnerContext;
use substrate_orchestrator::write_back_supersessions;
use substrate_store::PipelineRunPatch;

use crate::context::AppContext;
use crate::error::CliError;

/// Supervisor stall detection treats silence past this interval as a
/// possible hang; the pipeline emits a heartbeat on this cadence whenever
/// a phase runner is in flight so a long, quiet dispatch is never mistaken
/// for a stall.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of driving a run through [`drive_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveOutcome {
    /// Phase the run ended on.
    pub final_phase: PhaseName,
    /// Whether the run reached its last phase's exit gates and was marked
    /// `Completed`, as opposed to stopping at a `--stop-after` boundary or
    /// a gate failure.
    pub completed: bool,
    /// Every phase successfully driven this invocation, in order.
    pub phases_run: Vec<PhaseName>,
}

/// Drives `run_id` through its registered phases.
///
/// For each phase in turn: invokes the matching runner, records its token
/// usage, and (for amendment runs) writes back supersessions against the
/// parent snapshot; then calls `advance_phase`. Stops when a gate blocks
/// advancement, when `stop_after` is reached, or when the last phase's exit
/// gates pass with no further phase to enter — the latter marks the run
/// `Completed`, since `PhaseOrchestrator` itself never does.
///
/// # Errors
///
/// Returns [`CliError`] on a Decision Store failure, an unregistered phase
/// name, or a runner reporting failure.
pub async fn drive_run(
    ctx: &AppContext,
    orchestrator: &PhaseOrchestrator,
    registry: &HashMap<PhaseName, Box<dyn PhaseRunner>>,
    run_id: RunId,
    amendment: Option<AmendmentContextHandler>,
    stop_after: Option<PhaseName>,
) -> Result<DriveOutcome, CliError> {
    let dispatcher = ctx.dispatcher_for(run_id);
    let runner_ctx = RunnerContext {
        store: Arc::clone(&ctx.store),
        dispatcher,
        event_bus: Arc::clone(&ctx.event_bus),
        run_id,
        amendment,
    };

    let mut phases_run = Vec::new();
    let mut final_phase = orchestrator.get_run_status(run_id)?.current_phase;

    loop {
        let view = orchestrator.get_run_status(run_id)?;
        let phase = view.current_phase.clone();
        final_phase = phase.clone();

        let runner = registry
            .get(&phase)
            .ok_or_else(|| CliError::generic(format!("no runner registered for phase '{phase}'")))?;

        let report = run_phase_with_heartbeat(ctx, &runner_ctx, runner.as_ref(), run_id).await;
        if report.result == PhaseRunResult::Failed {
            let reason = report.error.unwrap_or_else(|| "phase runner failed".to_string());
            return Err(CliError::generic(format!("phase '{phase}' failed: {reason}")));
        }
        record_token_usage(ctx, run_id, &phase, &report.token_usage)?;
        phases_run.push(phase.clone());

        if let Some(handler) = &runner_ctx.amendment {
            let _ = write_back_supersessions(ctx.store.as_ref(), handler, run_id, &phase);
        }

        if stop_after.as_ref() == Some(&phase) {
            return Ok(DriveOutcome {
                final_phase: phase,
                completed: false,
                phases_run,
            });
        }

        let outcome = orchestrator.advance_phase(run_id)?;
        if outcome.advanced {
            continue;
        }

        if outcome.gate_failures.is_empty() {
            mark_completed(ctx, run_id)?;
            return Ok(DriveOutcome {
                final_phase: outcome.phase,
                completed: true,
                phases_run,
            });
        }

        let failures: Vec<String> = outcome
            .gate_failures
            .iter()
            .map(|result| format!("{}: {}", result.gate, result.error.clone().unwrap_or_default()))
            .collect();
        return Err(CliError::generic(format!(
            "phase '{final_phase}' blocked by gate failures: {}",
            failures.join(", ")
        )));
    }
}

/// Runs `runner` against `runner_ctx`, emitting `PipelineHeartbeat` on a
/// fixed [`HEARTBEAT_INTERVAL`] cadence for as long as the runner is still
/// in flight. A single slow sub-agent dispatch can otherwise leave the
/// event stream silent well past the Supervisor's stall threshold even
/// though the phase is healthy.
async fn run_phase_with_heartbeat(ctx: &AppContext, runner_ctx: &RunnerContext, runner: &dyn PhaseRunner, run_id: RunId) -> PhaseRunnerReport {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut run_future = runner.run(runner_ctx);
    loop {
        tokio::select! {
            report = &mut run_future => return report,
            _ = ticker.tick() => {
                ctx.event_bus.emit(EventPayload::PipelineHeartbeat { run_id });
            }
        }
    }
}

fn record_token_usage(ctx: &AppContext, run_id: RunId, phase: &PhaseName, totals: &substrate_core::TokenUsageTotals) -> Result<(), CliError> {
    if totals.input_tokens == 0 && totals.output_tokens == 0 {
        return Ok(());
    }
    ctx.store.add_token_usage(TokenUsage {
        pipeline_run_id: run_id,
        phase: phase.clone(),
        agent: substrate_core::AgentName::new("default"),
        input_tokens: totals.input_tokens,
        output_tokens: totals.output_tokens,
        cost_cents: totals.cost_cents,
    })?;
    Ok(())
}

fn mark_completed(ctx: &AppContext, run_id: RunId) -> Result<(), CliError> {
    ctx.store.update_pipeline_run(
        run_id,
        PipelineRunPatch {
            status: Some(RunStatus::Completed),
            ..PipelineRunPatch::default()
        },
    )?;
    ctx.event_bus.emit(EventPayload::PipelineComplete {
        run_id,
        status: "completed".to_string(),
    });
    Ok(())
}
