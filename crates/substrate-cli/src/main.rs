// crates/substrate-cli/src/main.rs
// ============================================================================
// Module: Substrate CLI Entry Point
// Description: Command dispatcher for the `substrate` binary: `auto`
// run/status/resume/init/amend plus the peripheral, interfaces-only
// log/retry/worktrees/merge/plan commands.
// Purpose: spec.md §6.1 EXTERNAL INTERFACES — CLI surface.
// Dependencies: clap, tokio, tracing, tracing-subscriber.
// ============================================================================

mod cli;
mod commands;
mod context;
mod error;
mod events_writer;
mod output;
mod pipeline;

use std::process::ExitCode;

use clap::Parser;

use cli::AutoCommand;
use cli::Cli;
use cli::Commands;
use error::CliResult;
use output::write_stderr_line;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(code) => code,
        Err(error) => {
            let _ = write_stderr_line(error.message());
            error.exit_code()
        }
    }
}

/// Initializes the stderr tracing subscriber, honoring `RUST_LOG` if set.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Auto { command } => dispatch_auto(config_path, command).await,
        Commands::Log(args) => commands::stub::log(config_path, args),
        Commands::Retry(args) => commands::stub::retry(config_path, args),
        Commands::Worktrees { command } => commands::stub::worktrees(config_path, command),
        Commands::Merge(args) => commands::stub::merge(config_path, args),
        Commands::Plan { command } => commands::stub::plan(config_path, command),
    }
}

async fn dispatch_auto(config_path: Option<&std::path::Path>, command: AutoCommand) -> CliResult<ExitCode> {
    match command {
        AutoCommand::Run(args) => commands::run::execute(config_path, args).await,
        AutoCommand::Status(args) => commands::status::execute(config_path, args),
        AutoCommand::Resume(args) => commands::resume::execute(config_path, args).await,
        AutoCommand::Init(args) => commands::init::execute(config_path, args),
        AutoCommand::Amend(args) => commands::amend::execute(config_path, args).await,
    }
}
