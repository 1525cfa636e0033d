// crates/substrate-cli/src/commands/resume.rs
// ============================================================================
// Module: `auto resume`
// Description: Resumes an interrupted run: flips it back to `Running`,
// catches it up through any already-satisfied gates, then drives any
// remaining phase work.
// Purpose: spec.md §6.1/§4.4 resume-from-crash contract.
// ============================================================================

use substrate_core::RunId;
use substrate_events::EventPayload;

use crate::cli::ResumeArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::error::CliResult;
use crate::events_writer::attach_ndjson_writer;
use crate::output::write_stdout_line;
use crate::pipeline::drive_run;

/// Executes `auto resume`.
///
/// # Errors
///
/// Returns [`CliError`] when bootstrap fails, `--run-id` is missing or
/// unknown, or the subsequent drive loop fails.
pub async fn execute(config_path: Option<&std::path::Path>, args: ResumeArgs) -> CliResult<std::process::ExitCode> {
    let ctx = AppContext::bootstrap(config_path)?;
    if args.events {
        attach_ndjson_writer(&ctx.event_bus);
    }

    let run_id = args
        .run_id
        .and_then(RunId::from_raw)
        .ok_or_else(|| CliError::usage("--run-id is required (the store has no run-listing operation to default from)"))?;

    let orchestrator = ctx.phase_orchestrator();
    orchestrator.resume_run(run_id)?;

    let registry = ctx.runner_registry();
    let outcome = drive_run(&ctx, &orchestrator, &registry, run_id, None, None).await;

    match outcome {
        Ok(outcome) => {
            write_stdout_line(&format!(
                "run {} resumed, ended at phase '{}' (completed: {})",
                run_id.get(),
                outcome.final_phase,
                outcome.completed
            ))?;
            Ok(std::process::ExitCode::SUCCESS)
        }
        Err(error) => {
            ctx.event_bus.emit(EventPayload::PipelineComplete {
                run_id,
                status: "failed".to_string(),
            });
            Err(error)
        }
    }
}
