// crates/substrate-cli/src/commands/status.rs
// ============================================================================
// Module: `auto status`
// Description: Reports a run's current phase, per-phase status, token
// totals, decision count, and story count.
// Purpose: spec.md §6.1's status payload contract.
// ============================================================================

use substrate_contract::BUILTIN_PHASES;
use substrate_core::PhaseName;
use substrate_core::RunId;

use crate::cli::OutputFormat;
use crate::cli::StatusArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::error::CliResult;
use crate::output::write_json_line;
use crate::output::write_stdout_line;

const STORY_CATEGORY: &str = "story";

/// Executes `auto status`.
///
/// # Errors
///
/// Returns [`CliError`] when bootstrap fails, the run id is unknown, or no
/// `--run-id` is given and no run exists yet.
pub fn execute(config_path: Option<&std::path::Path>, args: StatusArgs) -> CliResult<std::process::ExitCode> {
    let ctx = AppContext::bootstrap(config_path)?;
    let orchestrator = ctx.phase_orchestrator();

    let run_id = resolve_run_id(&ctx, args.run_id)?;
    let view = orchestrator.get_run_status(run_id)?;

    let mut decisions_count = 0usize;
    let mut stories_count = 0usize;
    for phase in BUILTIN_PHASES {
        let phase_name = PhaseName::new(phase);
        let decisions = ctx.store.get_decisions_by_phase_for_run(run_id, &phase_name)?;
        decisions_count += decisions.len();
        stories_count += decisions.iter().filter(|d| d.category.as_str() == STORY_CATEGORY).count();
    }

    let phase_statuses: Vec<(&str, &str)> = BUILTIN_PHASES
        .iter()
        .map(|&phase| {
            let name = PhaseName::new(phase);
            let status = if view.completed_phases.contains(&name) {
                "complete"
            } else if name == view.current_phase {
                "running"
            } else {
                "pending"
            };
            (phase, status)
        })
        .collect();

    let totals = ctx.store.get_token_usage_summary(run_id)?;
    let input_tokens: u64 = totals.iter().map(|a| a.input_tokens).sum();
    let output_tokens: u64 = totals.iter().map(|a| a.output_tokens).sum();
    let cost_cents: u64 = totals.iter().map(|a| a.cost_cents).sum();

    match args.output_format {
        OutputFormat::Json => write_json_line(&serde_json::json!({
            "run_id": run_id.get(),
            "current_phase": view.current_phase.as_str(),
            "phases": phase_statuses.iter().cloned().collect::<std::collections::BTreeMap<_, _>>(),
            "total_tokens": {
                "input": input_tokens,
                "output": output_tokens,
                "cost_usd": cost_cents as f64 / 100.0,
            },
            "decisions_count": decisions_count,
            "stories_count": stories_count,
        })),
        OutputFormat::Human => {
            write_stdout_line(&format!("run {}: {:?}, current phase '{}'", run_id.get(), view.status, view.current_phase))?;
            for (phase, status) in &phase_statuses {
                write_stdout_line(&format!("  {phase}: {status}"))?;
            }
            write_stdout_line(&format!(
                "tokens: {input_tokens} in / {output_tokens} out (${:.2}), {decisions_count} decisions, {stories_count} stories",
                cost_cents as f64 / 100.0
            ))
        }
    }?;

    Ok(std::process::ExitCode::SUCCESS)
}

/// Resolves the run to report on.
///
/// `DecisionStore` has no "list runs" operation, so `--run-id` cannot be
/// defaulted to the most recently created run from inside this crate; it
/// must be passed explicitly.
fn resolve_run_id(_ctx: &AppContext, run_id: Option<u64>) -> CliResult<RunId> {
    let raw = run_id.ok_or_else(|| CliError::usage("--run-id is required (the store has no run-listing operation to default from)"))?;
    RunId::from_raw(raw).ok_or_else(|| CliError::usage(format!("invalid run id '{raw}'")))
}
