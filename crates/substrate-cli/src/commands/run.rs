// crates/substrate-cli/src/commands/run.rs
// ============================================================================
// Module: `auto run`
// Description: Starts a new pipeline run and drives it to completion or to
// a `--stop-after` boundary.
// Purpose: spec.md §6.1's primary automation entry point.
// ============================================================================

use substrate_core::PhaseName;
use substrate_core::StoryKey;
use substrate_events::EventPayload;

use crate::cli::OutputFormat;
use crate::cli::RunArgs;
use crate::context::AppContext;
use crate::error::CliResult;
use crate::events_writer::attach_ndjson_writer;
use crate::output::write_json_line;
use crate::output::write_stdout_line;
use crate::pipeline::drive_run;

/// Executes `auto run`.
///
/// # Errors
///
/// Returns [`CliError`] when config/store bootstrap fails, the requested
/// `--from`/`--stop-after` phase is unregistered, or a phase runner fails.
pub async fn execute(config_path: Option<&std::path::Path>, args: RunArgs) -> CliResult<std::process::ExitCode> {
    if args.help_agent {
        write_stdout_line("substrate auto run drives concept -> product-brief -> prd -> architecture -> stories -> shippable code through four gated phases.")?;
        return Ok(std::process::ExitCode::SUCCESS);
    }

    let ctx = AppContext::bootstrap(config_path)?;
    if args.events {
        attach_ndjson_writer(&ctx.event_bus);
    }

    let story_filter = args.stories.as_ref().map(|stories| stories.iter().map(|key| StoryKey::new(key.as_str())).collect::<Vec<_>>());

    let orchestrator = ctx.phase_orchestrator();
    let registry = ctx.runner_registry_with_options(args.concurrency, story_filter);

    let start_phase = args.from.map(PhaseName::new);
    let stop_after = args.stop_after.map(PhaseName::new);
    let methodology = args.pack.clone().unwrap_or_else(|| "default".to_string());

    let run_id = orchestrator.start_run(methodology, args.concept.clone(), start_phase)?;
    ctx.event_bus.emit(EventPayload::PipelineStart {
        run_id,
        concept: args.concept,
    });

    let outcome = drive_run(&ctx, &orchestrator, &registry, run_id, None, stop_after).await;

    match outcome {
        Ok(outcome) => {
            render_success(run_id, &outcome, args.output_format)?;
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

fn render_success(run_id: substrate_core::RunId, outcome: &crate::pipeline::DriveOutcome, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => write_json_line(&serde_json::json!({
            "run_id": run_id.get(),
            "final_phase": outcome.final_phase.as_str(),
            "completed": outcome.completed,
            "phases_run": outcome.phases_run.iter().map(PhaseName::as_str).collect::<Vec<_>>(),
        })),
        OutputFormat::Human => {
            let state = if outcome.completed { "completed" } else { "stopped" };
            write_stdout_line(&format!(
                "run {} {} at phase '{}' ({} phase(s) driven this invocation)",
                run_id.get(),
                state,
                outcome.final_phase,
                outcome.phases_run.len()
            ))
        }
    }
}
