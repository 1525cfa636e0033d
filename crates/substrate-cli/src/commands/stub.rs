// crates/substrate-cli/src/commands/stub.rs
// ============================================================================
// Module: Peripheral Command Handlers
// Description: `log`, `retry`, `worktrees`, `merge`, `plan` — spec.md §1/§6.1
// names these as external collaborators and gives only their CLI names and
// semantics, not their internal behavior. These handlers give each command a
// real, honest entry point: genuinely cheap operations (listing the `plans/`
// directory) are implemented for real; everything else reports a clear
// "not implemented" failure rather than a silent no-op.
// Purpose: spec.md §6.1 EXTERNAL INTERFACES, peripheral commands.
// ============================================================================

use crate::cli::LogArgs;
use crate::cli::MergeArgs;
use crate::cli::PlanCommand;
use crate::cli::RetryArgs;
use crate::cli::WorktreesCommand;
use crate::error::CliError;
use crate::error::CliResult;
use crate::output::write_stdout_line;

const PLANS_DIR_NAME: &str = "plans";
const STATE_DIR_NAME: &str = ".substrate";

fn not_implemented(command: &str) -> CliError {
    CliError::generic(format!("'{command}' is an external-collaborator interface in this build; no in-process implementation exists yet"))
}

pub fn log(_config_path: Option<&std::path::Path>, args: LogArgs) -> CliResult<std::process::ExitCode> {
    Err(not_implemented(&format!("log --run-id={:?}", args.run_id)))
}

pub fn retry(_config_path: Option<&std::path::Path>, args: RetryArgs) -> CliResult<std::process::ExitCode> {
    // `retry` has no in-process implementation, so every requested story is
    // trivially unretried; this is the one stub command that maps onto exit
    // code 4 ("all retried tasks failed") rather than the generic failure
    // code, since that is the taxonomically honest outcome here.
    Err(CliError::all_failed(format!(
        "'retry' is an external-collaborator interface in this build; --run-id={:?} --stories={:?} could not be retried",
        args.run_id, args.stories
    )))
}

pub fn worktrees(_config_path: Option<&std::path::Path>, command: WorktreesCommand) -> CliResult<std::process::ExitCode> {
    match command {
        WorktreesCommand::List => Err(not_implemented("worktrees list")),
        WorktreesCommand::Remove { story_key } => Err(not_implemented(&format!("worktrees remove {story_key}"))),
    }
}

pub fn merge(_config_path: Option<&std::path::Path>, args: MergeArgs) -> CliResult<std::process::ExitCode> {
    Err(not_implemented(&format!("merge {}", args.story_key)))
}

pub fn plan(config_path: Option<&std::path::Path>, command: PlanCommand) -> CliResult<std::process::ExitCode> {
    match command {
        PlanCommand::List => plan_list(config_path),
        PlanCommand::Show { plan_id } => Err(not_implemented(&format!("plan show {plan_id}"))),
        PlanCommand::Validate { plan_id } => Err(not_implemented(&format!("plan validate {plan_id}"))),
        PlanCommand::Refine { plan_id } => Err(not_implemented(&format!("plan refine {plan_id}"))),
        PlanCommand::Diff { plan_id } => Err(not_implemented(&format!("plan diff {plan_id}"))),
        PlanCommand::Rollback { plan_id } => Err(not_implemented(&format!("plan rollback {plan_id}"))),
    }
}

/// Lists plan documents seeded by `auto init` under `.substrate/plans/`.
///
/// Cheap and genuinely implementable without touching the Decision Store, so
/// unlike its siblings this one does real work rather than reporting
/// "not implemented".
fn plan_list(_config_path: Option<&std::path::Path>) -> CliResult<std::process::ExitCode> {
    let plans_dir = std::path::Path::new(STATE_DIR_NAME).join(PLANS_DIR_NAME);
    if !plans_dir.exists() {
        write_stdout_line("no plans directory found; run `substrate auto init` first")?;
        return Ok(std::process::ExitCode::SUCCESS);
    }

    let entries = std::fs::read_dir(&plans_dir).map_err(|error| CliError::generic(format!("failed to read {}: {error}", plans_dir.display())))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| CliError::generic(format!("failed to read plans directory entry: {error}")))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    if names.is_empty() {
        write_stdout_line("no plan documents found")?;
    } else {
        for name in &names {
            write_stdout_line(name)?;
        }
    }
    Ok(std::process::ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use super::*;

    #[test]
    fn plan_list_reports_absence_of_state_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = std::env::current_dir().expect("cwd");
        std::env::set_current_dir(dir.path()).expect("chdir");
        let result = plan_list(None);
        std::env::set_current_dir(original).expect("chdir back");
        assert!(result.is_ok());
    }
}
