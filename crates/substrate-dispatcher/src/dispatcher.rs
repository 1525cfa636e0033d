// crates/substrate-dispatcher/src/dispatcher.rs
// ============================================================================
// Module: Dispatcher
// Description: Runs a single sub-agent invocation end to end: assemble
// prompt, spawn agent, capture output, parse structured response, emit
// lifecycle events.
// Purpose: Implement spec.md §4.3's `Dispatcher` contract.
// Dependencies: substrate-contract, substrate-events, tokio
// ============================================================================

//! ## Overview
//! `Dispatcher` owns no persistence: it hands the caller a fully formed
//! [`DispatchOutcome`] (including the token estimate), and the caller
//! (a phase runner, via the Decision Store) is responsible for recording a
//! `TokenUsage` row. This keeps `substrate-dispatcher` free of a dependency
//! on `substrate-store`, matching the teacher's narrow provider-registry
//! seam rather than wiring a persistence dependency into the process layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use substrate_contract::TokenEstimate;
use substrate_contract::assemble_prompt;
use substrate_contract::estimate_tokens;
use substrate_core::RunId;
use substrate_core::StoryKey;
use substrate_events::EventBus;
use substrate_events::EventPayload;
use tokio::task::AbortHandle;

use crate::agent_process::AgentProcess;
use crate::schema::validate_parsed;
use crate::types::DispatchId;
use crate::types::DispatchIdAllocator;
use crate::types::DispatchOutcome;
use crate::types::DispatchRequest;
use crate::types::DispatchStatus;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Runs sub-agent dispatches, one [`DispatchRequest`] at a time or many in
/// parallel via concurrent calls to [`Dispatcher::dispatch`].
///
/// # Invariants
/// - `shutdown` cancels every dispatch still running at the time it is
///   called; dispatches requested afterward are rejected with
///   [`DispatchRejected`].
pub struct Dispatcher {
    agent_process: Arc<dyn AgentProcess>,
    event_bus: Arc<EventBus>,
    run_id: RunId,
    ids: DispatchIdAllocator,
    running: Mutex<HashMap<DispatchId, AbortHandle>>,
    shutting_down: Mutex<bool>,
}

impl Dispatcher {
    /// Creates a dispatcher bound to `run_id`, publishing lifecycle events
    /// to `event_bus`.
    #[must_use]
    pub fn new(agent_process: Arc<dyn AgentProcess>, event_bus: Arc<EventBus>, run_id: RunId) -> Self {
        Self {
            agent_process,
            event_bus,
            run_id,
            ids: DispatchIdAllocator::default(),
            running: Mutex::new(HashMap::new()),
            shutting_down: Mutex::new(false),
        }
    }

    /// Returns the ids of dispatches currently running.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry mutex is poisoned.
    #[must_use]
    pub fn get_running(&self) -> Vec<DispatchId> {
        self.running
            .lock()
            .expect("dispatcher registry mutex poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Returns the ids of dispatches queued but not yet started. This
    /// dispatcher starts each dispatch immediately on call, so this is
    /// always empty; the method exists to satisfy the full §4.3 surface
    /// for callers that poll it unconditionally.
    #[must_use]
    pub fn get_pending(&self) -> Vec<DispatchId> {
        Vec::new()
    }

    /// Cancels every dispatch currently running and prevents new dispatches
    /// from starting.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex is poisoned.
    pub fn shutdown(&self) {
        *self.shutting_down.lock().expect("shutdown flag mutex poisoned") = true;
        let running = self.running.lock().expect("dispatcher registry mutex poisoned");
        for handle in running.values() {
            handle.abort();
        }
    }

    /// Runs `request` to completion: assembles the prompt, spawns the
    /// agent, captures its output, validates the result schema, and emits
    /// `dispatch` lifecycle events.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchRejected`] only when the dispatcher has already
    /// been shut down; all other failure modes (spawn failure, non-zero
    /// exit, parse failure) surface as `DispatchOutcome { status: Failed,
    /// .. }` per spec.md §4.3.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex is poisoned.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome, DispatchRejected> {
        if *self.shutting_down.lock().expect("shutdown flag mutex poisoned") {
            return Err(DispatchRejected);
        }

        let id = self.ids.next();
        let assembled = assemble_prompt(&request.template, &request.sections, request.token_ceiling);
        let started = Instant::now();

        tracing::info!(run_id = %self.run_id, dispatch_id = %id, task_type = %request.task_type, "dispatch starting");

        let agent_process = Arc::clone(&self.agent_process);
        let agent = request.agent.clone();
        let model = request.model.clone();
        let prompt = assembled.prompt.clone();
        let timeout = request.timeout_secs.map(Duration::from_secs);

        let join_handle =
            tokio::spawn(async move { agent_process.run(agent.as_ref(), model.as_deref(), &prompt, timeout).await });
        let abort_handle = join_handle.abort_handle();
        self.running.lock().expect("dispatcher registry mutex poisoned").insert(id, abort_handle);

        let raw_result = join_handle.await;
        self.running.lock().expect("dispatcher registry mutex poisoned").remove(&id);

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let input_tokens = assembled.token_count;

        let outcome = Self::build_outcome(id, request.task_type, raw_result, input_tokens, duration_ms);

        tracing::info!(
            run_id = %self.run_id,
            dispatch_id = %id,
            status = ?outcome.status,
            duration_ms,
            "dispatch finished"
        );
        self.event_bus.emit(EventPayload::StoryLog {
            run_id: self.run_id,
            story_key: StoryKey::new("n/a"),
            message: format!(
                "dispatch {id} {task_type} -> {status:?}",
                task_type = request.task_type,
                status = outcome.status
            ),
        });

        Ok(outcome)
    }

    fn build_outcome(
        id: DispatchId,
        task_type: substrate_contract::TaskType,
        raw_result: Result<Result<crate::agent_process::RawAgentOutput, crate::agent_process::AgentProcessError>, tokio::task::JoinError>,
        input_tokens: u64,
        duration_ms: u64,
    ) -> DispatchOutcome {
        let no_output_estimate = TokenEstimate {
            input: input_tokens,
            output: 0,
        };

        match raw_result {
            Ok(Ok(raw)) if raw.timed_out => DispatchOutcome {
                id,
                status: DispatchStatus::Failed,
                exit_code: None,
                output: raw.stdout,
                parsed: None,
                parse_error: Some("dispatch timed out".to_string()),
                duration_ms,
                token_estimate: no_output_estimate,
            },
            Ok(Ok(raw)) if raw.exit_code != Some(0) => DispatchOutcome {
                id,
                status: DispatchStatus::Failed,
                exit_code: raw.exit_code,
                parsed: None,
                parse_error: Some(format!("agent exited with {:?}: {}", raw.exit_code, raw.stderr)),
                token_estimate: TokenEstimate {
                    input: input_tokens,
                    output: estimate_tokens(&raw.stdout),
                },
                output: raw.stdout,
                duration_ms,
            },
            Ok(Ok(raw)) => {
                let token_estimate = TokenEstimate {
                    input: input_tokens,
                    output: estimate_tokens(&raw.stdout),
                };
                match validate_parsed(task_type, &raw.stdout) {
                    Ok(parsed) => DispatchOutcome {
                        id,
                        status: DispatchStatus::Completed,
                        exit_code: raw.exit_code,
                        output: raw.stdout,
                        parsed: Some(parsed),
                        parse_error: None,
                        duration_ms,
                        token_estimate,
                    },
                    Err(parse_error) => DispatchOutcome {
                        id,
                        status: DispatchStatus::Failed,
                        exit_code: raw.exit_code,
                        output: raw.stdout,
                        parsed: None,
                        parse_error: Some(parse_error),
                        duration_ms,
                        token_estimate,
                    },
                }
            }
            Ok(Err(spawn_error)) => DispatchOutcome {
                id,
                status: DispatchStatus::Failed,
                exit_code: None,
                output: String::new(),
                parsed: None,
                parse_error: Some(spawn_error.to_string()),
                duration_ms,
                token_estimate: no_output_estimate,
            },
            Err(join_error) if join_error.is_cancelled() => DispatchOutcome {
                id,
                status: DispatchStatus::Cancelled,
                exit_code: None,
                output: String::new(),
                parsed: None,
                parse_error: Some("dispatch cancelled".to_string()),
                duration_ms,
                token_estimate: no_output_estimate,
            },
            Err(join_error) => DispatchOutcome {
                id,
                status: DispatchStatus::Failed,
                exit_code: None,
                output: String::new(),
                parsed: None,
                parse_error: Some(join_error.to_string()),
                duration_ms,
                token_estimate: no_output_estimate,
            },
        }
    }
}

/// Error returned by [`Dispatcher::dispatch`] once the dispatcher has been
/// shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dispatcher has been shut down")]
pub struct DispatchRejected;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;
    use crate::agent_process::AgentProcessError;
    use crate::agent_process::RawAgentOutput;
    use async_trait::async_trait;
    use substrate_contract::PromptSection;
    use substrate_contract::SectionPriority;
    use substrate_contract::TaskType;

    struct StaticAgent {
        stdout: String,
        exit_code: Option<i32>,
    }

    #[async_trait]
    impl AgentProcess for StaticAgent {
        async fn run(
            &self,
            _agent: Option<&substrate_core::AgentName>,
            _model: Option<&str>,
            _prompt: &str,
            _timeout: Option<Duration>,
        ) -> Result<RawAgentOutput, AgentProcessError> {
            Ok(RawAgentOutput {
                exit_code: self.exit_code,
                stdout: self.stdout.clone(),
                stderr: String::new(),
                timed_out: false,
            })
        }
    }

    fn request(task_type: TaskType) -> DispatchRequest {
        DispatchRequest {
            task_type,
            template: "{{body}}".to_string(),
            sections: vec![PromptSection::new("body", SectionPriority::Required, "hello")],
            token_ceiling: 10_000,
            agent: None,
            model: None,
            timeout_secs: None,
        }
    }

    #[tokio::test]
    async fn dispatch_completes_and_validates_schema() {
        let agent = Arc::new(StaticAgent {
            stdout: r#"{"result": "success", "ac_met": [], "ac_failures": [], "files_modified": [], "tests": "pass", "tokenUsage": {"input": 1, "output": 1}}"#
                .to_string(),
            exit_code: Some(0),
        });
        let bus = Arc::new(EventBus::new());
        let dispatcher = Dispatcher::new(agent, bus, RunId::from_raw(1).unwrap());

        let outcome = dispatcher.dispatch(request(TaskType::DevStory)).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::Completed);
        assert!(outcome.parsed.is_some());
    }

    #[tokio::test]
    async fn dispatch_fails_on_nonzero_exit() {
        let agent = Arc::new(StaticAgent {
            stdout: String::new(),
            exit_code: Some(1),
        });
        let bus = Arc::new(EventBus::new());
        let dispatcher = Dispatcher::new(agent, bus, RunId::from_raw(1).unwrap());

        let outcome = dispatcher.dispatch(request(TaskType::Analysis)).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::Failed);
        assert!(outcome.parse_error.is_some());
    }

    #[tokio::test]
    async fn shutdown_rejects_subsequent_dispatches() {
        let agent = Arc::new(StaticAgent {
            stdout: "{}".to_string(),
            exit_code: Some(0),
        });
        let bus = Arc::new(EventBus::new());
        let dispatcher = Dispatcher::new(agent, bus, RunId::from_raw(1).unwrap());
        dispatcher.shutdown();

        let result = dispatcher.dispatch(request(TaskType::Analysis)).await;
        assert!(result.is_err());
    }
}
