// crates/substrate-dispatcher/src/agent_process.rs
// ============================================================================
// Module: Agent Process Trait Seam
// Description: Abstraction over spawning an external sub-agent process.
// Purpose: Let the dispatcher be tested against a fake agent binary instead
// of a real one, the way the teacher swaps evidence providers behind a trait.
// Dependencies: async-trait, tokio
// ============================================================================

//! ## Overview
//! `AgentProcess` is the single seam between [`crate::dispatcher::Dispatcher`]
//! and the operating system. The production implementation,
//! [`TokioAgentProcess`], shells out via `tokio::process::Command`; tests
//! substitute a process that echoes canned output instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use substrate_core::AgentName;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while spawning or communicating with a sub-agent process.
#[derive(Debug, Error)]
pub enum AgentProcessError {
    /// The agent binary could not be spawned.
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),
    /// Writing the prompt to the child's stdin failed.
    #[error("failed to write prompt to agent stdin: {0}")]
    WritePrompt(String),
    /// Reading the child's stdout/stderr failed.
    #[error("failed to read agent output: {0}")]
    ReadOutput(String),
    /// Waiting for the child to exit failed.
    #[error("failed to wait for agent process: {0}")]
    Wait(String),
}

// ============================================================================
// SECTION: Raw Output
// ============================================================================

/// Raw, unparsed output captured from a sub-agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAgentOutput {
    /// Process exit code, `None` if the process was killed rather than exiting.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// True when the invocation was stopped by the dispatch timeout rather
    /// than exiting on its own.
    pub timed_out: bool,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Seam over the operating-system process used to run a sub-agent.
///
/// # Invariants
/// - `run` never blocks past `timeout` once it elapses: the process is
///   force-killed and `timed_out` is reported `true`.
#[async_trait]
pub trait AgentProcess: Send + Sync {
    /// Runs `agent` (or an implementation-chosen default) with `prompt` on
    /// its stdin, optionally bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentProcessError`] when the process cannot be spawned or
    /// its streams cannot be read/written.
    async fn run(
        &self,
        agent: Option<&AgentName>,
        model: Option<&str>,
        prompt: &str,
        timeout: Option<Duration>,
    ) -> Result<RawAgentOutput, AgentProcessError>;
}

// ============================================================================
// SECTION: Tokio Implementation
// ============================================================================

/// Production [`AgentProcess`] backed by `tokio::process::Command`.
///
/// # Invariants
/// - `command` is the binary invoked for every agent unless a request's
///   `agent` names a distinct binary via [`TokioAgentProcess::with_agent_binaries`].
pub struct TokioAgentProcess {
    /// Default agent binary, e.g. `"claude"`.
    command: String,
    /// Extra fixed arguments passed before the prompt, e.g. `--print`.
    base_args: Vec<String>,
}

impl TokioAgentProcess {
    /// Creates a process runner that always invokes `command` with `base_args`.
    #[must_use]
    pub fn new(command: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            base_args,
        }
    }
}

#[async_trait]
impl AgentProcess for TokioAgentProcess {
    async fn run(
        &self,
        agent: Option<&AgentName>,
        model: Option<&str>,
        prompt: &str,
        timeout: Option<Duration>,
    ) -> Result<RawAgentOutput, AgentProcessError> {
        let binary = agent.map_or(self.command.as_str(), AgentName::as_str);

        let mut cmd = tokio::process::Command::new(binary);
        cmd.args(&self.base_args);
        if let Some(model) = model {
            cmd.arg("--model").arg(model);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|err| AgentProcessError::Spawn(err.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|err| AgentProcessError::WritePrompt(err.to_string()))?;
            stdin
                .shutdown()
                .await
                .map_err(|err| AgentProcessError::WritePrompt(err.to_string()))?;
        }

        let wait_and_collect = async {
            let mut stdout = String::new();
            let mut stderr = String::new();
            if let Some(mut out) = child.stdout.take() {
                out.read_to_string(&mut stdout)
                    .await
                    .map_err(|err| AgentProcessError::ReadOutput(err.to_string()))?;
            }
            if let Some(mut err_stream) = child.stderr.take() {
                err_stream
                    .read_to_string(&mut stderr)
                    .await
                    .map_err(|err| AgentProcessError::ReadOutput(err.to_string()))?;
            }
            let status = child.wait().await.map_err(|err| AgentProcessError::Wait(err.to_string()))?;
            Ok::<_, AgentProcessError>((status.code(), stdout, stderr))
        };

        match timeout {
            Some(duration) => match tokio::time::timeout(duration, wait_and_collect).await {
                Ok(result) => {
                    let (exit_code, stdout, stderr) = result?;
                    Ok(RawAgentOutput {
                        exit_code,
                        stdout,
                        stderr,
                        timed_out: false,
                    })
                }
                Err(_elapsed) => Ok(RawAgentOutput {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: "dispatch timed out".to_string(),
                    timed_out: true,
                }),
            },
            None => {
                let (exit_code, stdout, stderr) = wait_and_collect.await?;
                Ok(RawAgentOutput {
                    exit_code,
                    stdout,
                    stderr,
                    timed_out: false,
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    struct EchoAgent;

    #[async_trait]
    impl AgentProcess for EchoAgent {
        async fn run(
            &self,
            _agent: Option<&AgentName>,
            _model: Option<&str>,
            prompt: &str,
            _timeout: Option<Duration>,
        ) -> Result<RawAgentOutput, AgentProcessError> {
            Ok(RawAgentOutput {
                exit_code: Some(0),
                stdout: format!("echo:{prompt}"),
                stderr: String::new(),
                timed_out: false,
            })
        }
    }

    #[tokio::test]
    async fn fake_agent_roundtrips_prompt() {
        let agent = EchoAgent;
        let output = agent.run(None, None, "hello", None).await.expect("run");
        assert_eq!(output.stdout, "echo:hello");
        assert_eq!(output.exit_code, Some(0));
    }
}
