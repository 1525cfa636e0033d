// crates/substrate-cli/src/commands/amend.rs
// ============================================================================
// Module: `auto amend`
// Description: Creates an amendment run against a completed parent, drives
// it with the parent's decision snapshot injected as context, and writes a
// delta document on completion.
// Purpose: spec.md §4.8/§6.1's amendment workflow.
// ============================================================================

use substrate_contract::PHASE_ANALYSIS;
use substrate_contract::PHASE_SOLUTIONING;
use substrate_core::PhaseName;
use substrate_core::RunId;
use substrate_events::EventPayload;
use substrate_orchestrator::AmendmentContextHandler;
use substrate_orchestrator::STORY_DECISION_CATEGORY;
use substrate_orchestrator::create_amendment_run;
use substrate_orchestrator::format_delta_document;
use substrate_orchestrator::generate_delta_document;

use crate::cli::AmendArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::error::CliResult;
use crate::events_writer::attach_ndjson_writer;
use crate::output::write_stdout_line;
use crate::pipeline::drive_run;

/// Executes `auto amend`.
///
/// # Errors
///
/// Returns [`CliError`] when bootstrap fails, the parent run is unknown or
/// not completed, or the subsequent drive loop or delta-document generation
/// fails.
pub async fn execute(config_path: Option<&std::path::Path>, args: AmendArgs) -> CliResult<std::process::ExitCode> {
    let ctx = AppContext::bootstrap(config_path)?;
    if args.events {
        attach_ndjson_writer(&ctx.event_bus);
    }

    let parent_run_id = RunId::from_raw(args.parent_run_id).ok_or_else(|| CliError::usage(format!("invalid parent run id '{}'", args.parent_run_id)))?;

    let start_phase = args.from.map_or_else(|| PhaseName::new(PHASE_ANALYSIS), PhaseName::new);
    let run_id = create_amendment_run(ctx.store.as_ref(), parent_run_id, start_phase, args.concept.clone())?;
    ctx.event_bus.emit(EventPayload::PipelineStart {
        run_id,
        concept: args.concept.unwrap_or_default(),
    });

    let handler = AmendmentContextHandler::new(ctx.store.as_ref(), parent_run_id, None, None)?;

    let orchestrator = ctx.phase_orchestrator();
    let registry = ctx.runner_registry();
    let outcome = drive_run(&ctx, &orchestrator, &registry, run_id, Some(handler), None).await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(error) => {
            ctx.event_bus.emit(EventPayload::PipelineComplete {
                run_id,
                status: "failed".to_string(),
            });
            return Err(error);
        }
    };

    let handler = AmendmentContextHandler::new(ctx.store.as_ref(), parent_run_id, None, None)?;
    let new_stories = ctx
        .store
        .get_decisions_by_phase_for_run(run_id, &PhaseName::new(PHASE_SOLUTIONING))?
        .into_iter()
        .filter(|decision| decision.category.as_str() == STORY_DECISION_CATEGORY)
        .map(|decision| decision.key.as_str().to_string())
        .collect();

    let delta = generate_delta_document(ctx.store.as_ref(), &handler, run_id, new_stories, None, Vec::new())?;
    let report = format_delta_document(&delta);

    write_stdout_line(&format!(
        "amendment run {} ended at phase '{}' (completed: {})",
        run_id.get(),
        outcome.final_phase,
        outcome.completed
    ))?;
    write_stdout_line(&report)?;

    Ok(std::process::ExitCode::SUCCESS)
}
