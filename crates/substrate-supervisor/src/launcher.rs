// crates/substrate-supervisor/src/launcher.rs
// ============================================================================
// Module: Pipeline Launcher
// Description: Builds the command used to start or resume the supervised
// pipeline process.
// Purpose: Let the supervisor spawn and respawn a peer process without
// depending on substrate-cli's binary or argument layout directly.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! A [`PipelineLauncher`] only builds a [`Command`]; it never spawns one
//! itself. [`crate::Supervisor`] owns every spawned child so it can read its
//! pid and stdout and kill it by pid on a stall.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tokio::process::Command;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Builds the command that starts or resumes a supervised pipeline run.
pub trait PipelineLauncher: Send + Sync {
    /// Builds the command to spawn. `resume` is `true` for every spawn after
    /// the first, following a stall-kill or an unexpected exit.
    fn build_command(&self, resume: bool) -> Command;
}

// ============================================================================
// SECTION: Fixed Launcher
// ============================================================================

/// A launcher invoking a fixed program, with a separate argument list for
/// the initial run and for every resume.
pub struct FixedCommandLauncher {
    program: String,
    run_args: Vec<String>,
    resume_args: Vec<String>,
}

impl FixedCommandLauncher {
    /// Creates a launcher invoking `program` with `run_args` on the first
    /// spawn and `resume_args` on every respawn.
    #[must_use]
    pub fn new(program: impl Into<String>, run_args: Vec<String>, resume_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            run_args,
            resume_args,
        }
    }
}

impl PipelineLauncher for FixedCommandLauncher {
    fn build_command(&self, resume: bool) -> Command {
        let mut command = Command::new(&self.program);
        if resume {
            command.args(&self.resume_args);
        } else {
            command.args(&self.run_args);
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_selects_the_resume_argument_list() {
        let launcher = FixedCommandLauncher::new(
            "substrate",
            vec!["auto".to_string(), "run".to_string(), "--events".to_string()],
            vec!["auto".to_string(), "resume".to_string(), "--events".to_string()],
        );
        let command = launcher.build_command(true);
        assert_eq!(command.as_std().get_program(), "substrate");
        let args: Vec<&str> = command.as_std().get_args().map(|arg| arg.to_str().unwrap_or_default()).collect();
        assert_eq!(args, vec!["auto", "resume", "--events"]);
    }
}
