// crates/substrate-supervisor/src/lib.rs
// ============================================================================
// Module: Substrate Supervisor Library
// Description: Watchdog over a single pipeline run: stall detection,
// process-tree kill, restart-with-cap, terminal summary.
// Purpose: spec.md §4.9's supervisor/watchdog, run as a peer process that
// owns the pipeline child it spawns.
// Dependencies: substrate-core, substrate-events, substrate-store, sysinfo,
// tokio
// ============================================================================

//! ## Overview
//! The supervisor is deliberately not wired into `substrate-cli`'s own
//! subcommand set: an operator wraps it around an `auto run`/`auto resume`
//! invocation, the same way `decision-gate-broker`'s polling sources are
//! composed by their caller rather than hard-coded behind a CLI flag.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod error;
mod kill;
mod launcher;
mod supervisor;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::SupervisorError;
pub use kill::kill_process_tree;
pub use kill::process_tree;
pub use launcher::FixedCommandLauncher;
pub use launcher::PipelineLauncher;
pub use supervisor::Supervisor;
pub use supervisor::SupervisorOptions;
pub use supervisor::SupervisorOutcome;
