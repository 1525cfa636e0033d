// crates/substrate-supervisor/src/supervisor.rs
// ============================================================================
// Module: Supervisor Tick Loop
// Description: Stall classification, process-tree kill, restart-with-cap,
// terminal summary for one pipeline run.
// Purpose: spec.md §4.9's supervisor/watchdog.
// Dependencies: substrate-core, substrate-events, substrate-store, tokio,
// serde_json
// ============================================================================

//! ## Overview
//! The supervisor owns the pipeline's child process directly: it spawns the
//! initial run, tails its stdout NDJSON event stream (the same stream
//! `substrate-cli --events` writes) for a last-progress timestamp, and on a
//! stall kills the process tree and respawns a `resume` of the same run, up
//! to a restart cap. `NO_PIPELINE_RUNNING` is classified by reading the run's
//! durable status from the Decision Store directly, the same store the
//! pipeline process itself writes to, rather than by waiting on the child's
//! own exit code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use substrate_core::PipelineRun;
use substrate_core::RunId;
use substrate_core::RunStatus;
use substrate_core::StoryKey;
use substrate_core::Timestamp;
use substrate_events::Event;
use substrate_events::EventBus;
use substrate_events::EventPayload;
use substrate_store::DecisionStore;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::process::Child;

use crate::error::SupervisorError;
use crate::kill::kill_process_tree;
use crate::launcher::PipelineLauncher;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Tuning knobs for the tick loop not already present on
/// [`substrate_config::SubstrateConfig`] (cadence and kill mechanics are
/// supervisor-internal, not pipeline config).
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// How often the tick loop checks staleness and run status.
    pub tick_interval: Duration,
    /// How long to wait after a graceful term before force-killing survivors.
    pub kill_grace: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            kill_grace: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Outcome of [`Supervisor::watch`] once the run reaches a terminal state or
/// the restart cap is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorOutcome {
    /// The run reached a terminal [`RunStatus`] on its own.
    Completed {
        /// Number of restarts performed along the way.
        restarts: u32,
    },
    /// The restart cap was exhausted after repeated stalls or crashes.
    Aborted {
        /// Number of restart attempts made before aborting.
        attempts: u32,
    },
}

type StoryOutcomeLists = (Vec<StoryKey>, Vec<StoryKey>, Vec<StoryKey>);

// ============================================================================
// SECTION: Supervisor
// ============================================================================

/// Watches one pipeline run, restarting it across stalls or crashes up to a
/// cap, then emits a terminal summary.
pub struct Supervisor {
    store: Arc<dyn DecisionStore>,
    event_bus: Arc<EventBus>,
    run_id: RunId,
    launcher: Box<dyn PipelineLauncher>,
    stall_threshold_secs: u64,
    max_restarts: u32,
    options: SupervisorOptions,
}

impl Supervisor {
    /// Creates a supervisor for `run_id`, using `launcher` to spawn and
    /// respawn the pipeline process. `stall_threshold_secs` and
    /// `max_restarts` are read from `substrate_config::SubstrateConfig` by
    /// the caller.
    #[must_use]
    pub fn new(
        store: Arc<dyn DecisionStore>,
        event_bus: Arc<EventBus>,
        run_id: RunId,
        launcher: Box<dyn PipelineLauncher>,
        stall_threshold_secs: u64,
        max_restarts: u32,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            store,
            event_bus,
            run_id,
            launcher,
            stall_threshold_secs,
            max_restarts,
            options,
        }
    }

    /// Drives the tick loop until the run reaches a terminal status or the
    /// restart cap is exhausted.
    ///
    /// # Errors
    /// Returns [`SupervisorError`] if the pipeline process cannot be spawned.
    pub async fn watch(mut self) -> Result<SupervisorOutcome, SupervisorError> {
        let mut restarts = 0u32;
        let mut child = self.spawn(false).await?;
        let started_at = Timestamp::now();
        let mut last_progress = started_at;
        let mut last_complete: Option<StoryOutcomeLists> = None;

        loop {
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| SupervisorError::Io("pipeline stdout not piped".to_string()))?;
            let mut lines = BufReader::new(stdout).lines();
            let mut ticker = tokio::time::interval(self.options.tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let stalled = loop {
                tokio::select! {
                    line = lines.next_line() => {
                        match line {
                            Ok(Some(text)) => {
                                if let Ok(event) = serde_json::from_str::<Event>(&text) {
                                    last_progress = event.ts;
                                    if let EventPayload::OrchestratorComplete { succeeded, escalated, failed, .. } = event.payload {
                                        last_complete = Some((succeeded, escalated, failed));
                                    }
                                }
                            }
                            Ok(None) | Err(_) => break false,
                        }
                    }
                    _ = ticker.tick() => {
                        if let Some(run) = self.terminal_run() {
                            let _ = child.wait().await;
                            return Ok(self.summarize(&run, restarts, last_complete, started_at));
                        }
                        let staleness = last_progress.elapsed_seconds_until(Timestamp::now());
                        if staleness >= i64::try_from(self.stall_threshold_secs).unwrap_or(i64::MAX) {
                            break true;
                        }
                    }
                }
            };

            if stalled {
                let pid = child.id().unwrap_or(0);
                let staleness = last_progress.elapsed_seconds_until(Timestamp::now());
                tracing::warn!(run_id = %self.run_id, staleness, "pipeline stalled, killing process tree");
                let pids = kill_process_tree(pid, self.options.kill_grace).await;
                self.event_bus.emit(EventPayload::SupervisorKill {
                    run_id: self.run_id,
                    reason: "stall".to_string(),
                    staleness_seconds: staleness,
                    pids,
                });
                let _ = child.wait().await;
            } else {
                let _ = child.wait().await;
                if let Some(run) = self.terminal_run() {
                    return Ok(self.summarize(&run, restarts, last_complete, started_at));
                }
            }

            if restarts >= self.max_restarts {
                tracing::error!(run_id = %self.run_id, attempts = restarts, "restart cap exceeded, aborting");
                self.event_bus.emit(EventPayload::SupervisorAbort {
                    run_id: self.run_id,
                    reason: "max_restarts_exceeded".to_string(),
                    attempts: restarts,
                });
                return Ok(SupervisorOutcome::Aborted { attempts: restarts });
            }

            restarts += 1;
            tracing::info!(run_id = %self.run_id, attempt = restarts, "respawning pipeline process");
            self.event_bus.emit(EventPayload::SupervisorRestart {
                run_id: self.run_id,
                attempt: restarts,
            });
            child = self.spawn(true).await?;
            last_progress = Timestamp::now();
        }
    }

    /// Reads the run's current status, returning it only when terminal
    /// (`Completed`, `Failed`, or `Stopped`).
    fn terminal_run(&self) -> Option<PipelineRun> {
        let run = self.store.get_pipeline_run(self.run_id).ok()?;
        matches!(run.status, RunStatus::Completed | RunStatus::Failed | RunStatus::Stopped).then_some(run)
    }

    fn summarize(
        &self,
        run: &PipelineRun,
        restarts: u32,
        last_complete: Option<StoryOutcomeLists>,
        started_at: Timestamp,
    ) -> SupervisorOutcome {
        let run_start = run.config.phase_history.first().map_or(started_at, |entry| entry.started_at);
        let elapsed_seconds = run_start.elapsed_seconds_until(Timestamp::now());
        let (succeeded, escalated, failed) = last_complete.unwrap_or_default();

        self.event_bus.emit(EventPayload::SupervisorSummary {
            run_id: self.run_id,
            succeeded,
            failed,
            escalated,
            elapsed_seconds,
            restarts,
        });

        SupervisorOutcome::Completed { restarts }
    }

    async fn spawn(&self, resume: bool) -> Result<Child, SupervisorError> {
        self.launcher
            .build_command(resume)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| SupervisorError::Spawn(error.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only panic-based assertions are permitted.")]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use substrate_core::PhaseName;
    use substrate_store::NewPipelineRun;
    use substrate_store::PipelineRunPatch;
    use substrate_store::SqliteDecisionStore;
    use substrate_store::SqliteStoreConfig;

    struct EchoLauncher;

    impl PipelineLauncher for EchoLauncher {
        fn build_command(&self, _resume: bool) -> tokio::process::Command {
            tokio::process::Command::new("true")
        }
    }

    fn open_store() -> Arc<dyn DecisionStore> {
        Arc::new(SqliteDecisionStore::open(SqliteStoreConfig::new(":memory:".into())).expect("open store"))
    }

    fn create_completed_run(store: &dyn DecisionStore) -> RunId {
        let run = store
            .create_pipeline_run(NewPipelineRun {
                methodology: "default".to_string(),
                concept: "concept".to_string(),
                start_phase: PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create run");
        store
            .update_pipeline_run(
                run.id,
                PipelineRunPatch {
                    status: Some(RunStatus::Completed),
                    ..PipelineRunPatch::default()
                },
            )
            .expect("patch run");
        run.id
    }

    #[test]
    fn terminal_run_is_none_while_running() {
        let store = open_store();
        let run = store
            .create_pipeline_run(NewPipelineRun {
                methodology: "default".to_string(),
                concept: "concept".to_string(),
                start_phase: PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create run");
        let supervisor = Supervisor::new(
            Arc::clone(&store),
            Arc::new(EventBus::new()),
            run.id,
            Box::new(EchoLauncher),
            600,
            2,
            SupervisorOptions::default(),
        );
        assert!(supervisor.terminal_run().is_none());
    }

    #[test]
    fn summarize_emits_a_supervisor_summary_event() {
        let store = open_store();
        let run_id = create_completed_run(store.as_ref());
        let bus = Arc::new(EventBus::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        bus.on(substrate_events::SUPERVISOR_SUMMARY, move |event| {
            received_clone.lock().expect("lock").push(event.clone());
        });

        let supervisor = Supervisor::new(Arc::clone(&store), Arc::clone(&bus), run_id, Box::new(EchoLauncher), 600, 2, SupervisorOptions::default());

        let run = store.get_pipeline_run(run_id).expect("run");
        let outcome = supervisor.summarize(&run, 1, None, Timestamp::now());
        assert_eq!(outcome, SupervisorOutcome::Completed { restarts: 1 });
        assert_eq!(received.lock().expect("lock").len(), 1);
    }
}
