// crates/substrate-cli/src/cli.rs
// ============================================================================
// Module: CLI Argument Definitions
// Description: `clap::Parser`/`Subcommand` structure for `auto` and the
// peripheral, interfaces-only commands (spec.md §6.1).
// Purpose: Name and shape every command and flag the spec enumerates;
// command bodies live in `crate::commands`.
// Dependencies: clap
// ============================================================================

use std::path::PathBuf;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

/// Substrate command-line entry point.
#[derive(Parser, Debug)]
#[command(name = "substrate", disable_help_subcommand = true)]
pub struct Cli {
    /// Path to a substrate.toml config file (defaults to the built-in defaults).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output rendering mode shared by every `auto` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Plain, human-oriented text.
    #[default]
    Human,
    /// A single canonical JSON object.
    Json,
}

/// Top-level command set.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// The primary automation surface: run, status, resume, init, amend.
    Auto {
        #[command(subcommand)]
        command: AutoCommand,
    },
    /// Tails recorded progress log lines for a run (peripheral, interfaces only).
    Log(LogArgs),
    /// Retries escalated or failed stories for a run (peripheral, interfaces only).
    Retry(RetryArgs),
    /// Git worktree administration (peripheral, interfaces only).
    Worktrees {
        #[command(subcommand)]
        command: WorktreesCommand,
    },
    /// Merges a completed story's worktree (peripheral, interfaces only).
    Merge(MergeArgs),
    /// Plan document lifecycle (peripheral, interfaces only).
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
}

/// `auto` subcommands (spec.md §6.1).
#[derive(Subcommand, Debug)]
pub enum AutoCommand {
    /// Runs the primary pipeline.
    Run(RunArgs),
    /// Reports a run's current phase, token usage, and counts.
    Status(StatusArgs),
    /// Resumes the latest or a named run.
    Resume(ResumeArgs),
    /// Seeds a methodology pack and a fresh store.
    Init(InitArgs),
    /// Creates an amendment run against a completed parent and drives it.
    Amend(AmendArgs),
}

/// Arguments for `auto run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Natural-language concept to drive the pipeline from.
    #[arg(long)]
    pub concept: String,
    /// Switch stdout to newline-delimited JSON events.
    #[arg(long, action = ArgAction::SetTrue)]
    pub events: bool,
    /// Restrict the implementation phase to these comma-separated story keys.
    #[arg(long, value_delimiter = ',')]
    pub stories: Option<Vec<String>>,
    /// Methodology pack name to seed the run with.
    #[arg(long)]
    pub pack: Option<String>,
    /// Start the run at this phase instead of the first registered phase.
    #[arg(long)]
    pub from: Option<String>,
    /// Stop once this phase completes, without advancing further.
    #[arg(long = "stop-after")]
    pub stop_after: Option<String>,
    /// Maximum number of conflict groups running in parallel.
    #[arg(long)]
    pub concurrency: Option<u32>,
    /// Output rendering mode.
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,
    /// Print the methodology pack's agent-facing help text and exit.
    #[arg(long = "help-agent", action = ArgAction::SetTrue)]
    pub help_agent: bool,
}

/// Arguments for `auto status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Run id to report on (defaults to the most recently created run).
    #[arg(long = "run-id")]
    pub run_id: Option<u64>,
    /// Output rendering mode.
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,
}

/// Arguments for `auto resume`.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Run id to resume (defaults to the most recently created run).
    #[arg(long = "run-id")]
    pub run_id: Option<u64>,
    /// Switch stdout to newline-delimited JSON events.
    #[arg(long, action = ArgAction::SetTrue)]
    pub events: bool,
}

/// Arguments for `auto init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Methodology pack name to seed.
    #[arg(long)]
    pub pack: Option<String>,
    /// Project root to seed the hidden state folder under.
    #[arg(long = "project-root")]
    pub project_root: Option<PathBuf>,
}

/// Arguments for `auto amend`.
#[derive(Args, Debug)]
pub struct AmendArgs {
    /// Completed parent run id to amend.
    pub parent_run_id: u64,
    /// Amendment framing concept.
    #[arg(long)]
    pub concept: Option<String>,
    /// Phase to start the amendment run at (defaults to the parent's first phase).
    #[arg(long)]
    pub from: Option<String>,
    /// Switch stdout to newline-delimited JSON events.
    #[arg(long, action = ArgAction::SetTrue)]
    pub events: bool,
}

/// Arguments for `log` (peripheral, interfaces only).
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Run id to tail.
    #[arg(long = "run-id")]
    pub run_id: Option<u64>,
}

/// Arguments for `retry` (peripheral, interfaces only).
#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Run id whose escalated stories should be retried.
    #[arg(long = "run-id")]
    pub run_id: Option<u64>,
    /// Story keys to retry.
    #[arg(long, value_delimiter = ',')]
    pub stories: Option<Vec<String>>,
}

/// `worktrees` subcommands (peripheral, interfaces only).
#[derive(Subcommand, Debug)]
pub enum WorktreesCommand {
    /// Lists active worktrees.
    List,
    /// Removes a story's worktree.
    Remove {
        /// Story key whose worktree should be removed.
        story_key: String,
    },
}

/// Arguments for `merge` (peripheral, interfaces only).
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Story key whose worktree should be merged.
    pub story_key: String,
}

/// `plan` subcommands (peripheral, interfaces only).
#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    /// Validates a plan document.
    Validate {
        /// Plan id to validate.
        plan_id: String,
    },
    /// Lists stored plans.
    List,
    /// Shows a stored plan document.
    Show {
        /// Plan id to show.
        plan_id: String,
    },
    /// Refines a stored plan document.
    Refine {
        /// Plan id to refine.
        plan_id: String,
    },
    /// Diffs two plan document versions.
    Diff {
        /// Plan id to diff.
        plan_id: String,
    },
    /// Rolls a plan document back to a prior version.
    Rollback {
        /// Plan id to roll back.
        plan_id: String,
    },
}
