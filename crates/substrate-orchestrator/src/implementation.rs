// crates/substrate-orchestrator/src/implementation.rs
// ============================================================================
// Module: Implementation Orchestrator
// Description: Drives create-story -> dev-story -> code-review -> fix* per
// story, scheduled by conflict group.
// Purpose: Implements spec.md §4.6.
// Dependencies: substrate-core, substrate-contract, substrate-config,
// substrate-dispatcher, substrate-events, substrate-store
// ============================================================================

//! ## Overview
//! Stories are held exclusively in memory for the lifetime of a `run` call
//! (`substrate_core::Story`'s own doc comment: "owned exclusively by the
//! Implementation Orchestrator"). Conflict groups (spec.md §4.7) run
//! concurrently up to `maxConcurrency`; within a group, stories are driven
//! strictly one at a time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use substrate_config::SubstrateConfig;
use substrate_contract::CodeReviewResult;
use substrate_contract::CreateStoryResult;
use substrate_contract::DevStoryResult;
use substrate_contract::PromptSection;
use substrate_contract::ResultStatus;
use substrate_contract::ReviewVerdict;
use substrate_contract::SectionPriority;
use substrate_contract::TaskType;
use substrate_contract::TestOutcome;
use substrate_core::RunId;
use substrate_core::Story;
use substrate_core::StoryKey;
use substrate_core::StoryPhase;
use substrate_dispatcher::DispatchRequest;
use substrate_dispatcher::DispatchStatus;
use substrate_dispatcher::Dispatcher;
use substrate_events::EventBus;
use substrate_events::EventPayload;
use tokio::sync::Mutex;
use tokio::sync::Semaphore;

use crate::conflict::detect_conflict_groups;

/// Maximum review-input size (bytes) before the full file list is replaced
/// with a diff-stat-style summary (spec.md §4.6 review input sizing).
const REVIEW_INPUT_SIZE_CEILING: usize = 4_000;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Terminal outcome of a single story's run through the implementation
/// state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryOutcome {
    /// Story key.
    pub key: StoryKey,
    /// Terminal story phase (`Complete`, `Escalated`, or `Failed`).
    pub phase: StoryPhase,
    /// Number of review cycles consumed.
    pub review_cycles: u32,
}

/// Lifecycle status of an [`ImplementationOrchestrator::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationRunStatus {
    /// A run is already in flight; this call did not start new work.
    Running,
    /// The run has finished (possibly with escalations/failures).
    Complete,
}

/// Aggregate result of driving a set of story keys to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationOutcome {
    /// Current status.
    pub status: ImplementationRunStatus,
    /// Story keys that completed successfully.
    pub succeeded: Vec<StoryKey>,
    /// Story keys that were escalated.
    pub escalated: Vec<StoryKey>,
    /// Story keys that failed unrecoverably.
    pub failed: Vec<StoryKey>,
}

enum RunState {
    NotStarted,
    Running,
    Completed(ImplementationOutcome),
}

// ============================================================================
// SECTION: ImplementationOrchestrator
// ============================================================================

/// Drives a set of stories through `create-story -> dev-story -> code-review
/// -> (fix -> code-review)*`, scheduled by conflict group.
pub struct ImplementationOrchestrator {
    dispatcher: Arc<Dispatcher>,
    event_bus: Arc<EventBus>,
    run_id: RunId,
    config: SubstrateConfig,
    state: Mutex<RunState>,
}

impl ImplementationOrchestrator {
    /// Creates a new orchestrator for `run_id`.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, event_bus: Arc<EventBus>, run_id: RunId, config: SubstrateConfig) -> Self {
        Self {
            dispatcher,
            event_bus,
            run_id,
            config,
            state: Mutex::new(RunState::NotStarted),
        }
    }

    /// Drives `story_keys` through the implementation state machine.
    ///
    /// Exclusive and idempotent: a call made while a prior call is still
    /// running returns [`ImplementationRunStatus::Running`] without
    /// starting new work; a call made after completion returns the cached
    /// completed outcome without restarting. `run(&[])` completes
    /// immediately with empty totals.
    pub async fn run(&self, story_keys: Vec<StoryKey>) -> ImplementationOutcome {
        {
            let mut guard = self.state.lock().await;
            match &*guard {
                RunState::Running => {
                    return ImplementationOutcome {
                        status: ImplementationRunStatus::Running,
                        succeeded: Vec::new(),
                        escalated: Vec::new(),
                        failed: Vec::new(),
                    };
                }
                RunState::Completed(outcome) => return outcome.clone(),
                RunState::NotStarted => *guard = RunState::Running,
            }
        }

        let outcome = self.run_uncached(story_keys).await;

        *self.state.lock().await = RunState::Completed(outcome.clone());
        outcome
    }

    async fn run_uncached(&self, story_keys: Vec<StoryKey>) -> ImplementationOutcome {
        if story_keys.is_empty() {
            self.event_bus.emit(EventPayload::OrchestratorComplete {
                run_id: self.run_id,
                succeeded: Vec::new(),
                escalated: Vec::new(),
                failed: Vec::new(),
            });
            return ImplementationOutcome {
                status: ImplementationRunStatus::Complete,
                succeeded: Vec::new(),
                escalated: Vec::new(),
                failed: Vec::new(),
            };
        }

        let groups = detect_conflict_groups(&story_keys, &self.config);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1) as usize));
        let mut handles = Vec::new();
        for group in groups {
            let permit_source = Arc::clone(&semaphore);
            let dispatcher = Arc::clone(&self.dispatcher);
            let event_bus = Arc::clone(&self.event_bus);
            let run_id = self.run_id;
            let max_review_cycles = self.config.max_review_cycles;
            let token_ceiling = self.config.token_ceiling;
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await.ok();
                let mut outcomes = Vec::with_capacity(group.len());
                for key in group {
                    outcomes.push(run_story(&dispatcher, &event_bus, run_id, max_review_cycles, token_ceiling, key).await);
                }
                outcomes
            }));
        }

        let mut succeeded = Vec::new();
        let mut escalated = Vec::new();
        let mut failed = Vec::new();
        for handle in handles {
            let Ok(group_outcomes) = handle.await else {
                continue;
            };
            for outcome in group_outcomes {
                match outcome.phase {
                    StoryPhase::Complete => succeeded.push(outcome.key),
                    StoryPhase::Escalated => escalated.push(outcome.key),
                    _ => failed.push(outcome.key),
                }
            }
        }

        self.event_bus.emit(EventPayload::OrchestratorComplete {
            run_id: self.run_id,
            succeeded: succeeded.clone(),
            escalated: escalated.clone(),
            failed: failed.clone(),
        });

        ImplementationOutcome {
            status: ImplementationRunStatus::Complete,
            succeeded,
            escalated,
            failed,
        }
    }
}

// ============================================================================
// SECTION: Per-Story State Machine
// ============================================================================

async fn dispatch_task(
    dispatcher: &Dispatcher,
    task_type: TaskType,
    template: String,
    sections: Vec<PromptSection>,
    token_ceiling: u64,
) -> Option<serde_json::Value> {
    let request = DispatchRequest {
        task_type,
        template,
        sections,
        token_ceiling,
        agent: None,
        model: None,
        timeout_secs: None,
    };
    let outcome = dispatcher.dispatch(request).await.ok()?;
    if outcome.status != DispatchStatus::Completed {
        return None;
    }
    outcome.parsed
}

fn emit_phase(event_bus: &EventBus, run_id: RunId, story_key: &StoryKey, phase: StoryPhase) {
    event_bus.emit(EventPayload::StoryPhase {
        run_id,
        story_key: story_key.clone(),
        phase: format!("{phase:?}"),
    });
}

fn build_review_input(files_modified: &[String]) -> String {
    let joined = files_modified.join("\n");
    if joined.len() <= REVIEW_INPUT_SIZE_CEILING {
        return joined;
    }
    format!("{} files modified (file list truncated):\n{}", files_modified.len(), files_modified.join(", "))
}

fn escalate(event_bus: &EventBus, run_id: RunId, key: &StoryKey, reason: &str, review_cycles: u32) -> StoryOutcome {
    event_bus.emit(EventPayload::OrchestratorStoryEscalated {
        run_id,
        story_key: key.clone(),
        last_verdict: reason.to_string(),
    });
    event_bus.emit(EventPayload::StoryEscalation {
        run_id,
        story_key: key.clone(),
        last_verdict: reason.to_string(),
    });
    StoryOutcome {
        key: key.clone(),
        phase: StoryPhase::Escalated,
        review_cycles,
    }
}

async fn run_story(
    dispatcher: &Dispatcher,
    event_bus: &EventBus,
    run_id: RunId,
    max_review_cycles: u32,
    token_ceiling: u64,
    key: StoryKey,
) -> StoryOutcome {
    let mut story = Story::new(key);
    let epic_id = story.key.epic_id().to_string();

    story.phase = StoryPhase::InStoryCreation;
    emit_phase(event_bus, run_id, &story.key, story.phase);

    let create_template = "Create a story file for {{story_key}} in epic {{epic_id}}.".to_string();
    let create_sections = vec![
        PromptSection::new("story_key", SectionPriority::Required, story.key.as_str()),
        PromptSection::new("epic_id", SectionPriority::Required, epic_id.clone()),
    ];
    let Some(parsed) = dispatch_task(dispatcher, TaskType::CreateStory, create_template, create_sections, token_ceiling).await else {
        return StoryOutcome {
            key: story.key,
            phase: StoryPhase::Failed,
            review_cycles: 0,
        };
    };
    let Ok(create_result) = serde_json::from_value::<CreateStoryResult>(parsed) else {
        return StoryOutcome {
            key: story.key,
            phase: StoryPhase::Failed,
            review_cycles: 0,
        };
    };

    let story_file = create_result.story_file.filter(|path| !path.is_empty());
    let Some(story_file) = story_file else {
        return escalate(event_bus, run_id, &story.key, "create-story-no-file", 0);
    };
    story.story_file_path = Some(story_file.clone());
    story.phase = StoryPhase::InDev;
    emit_phase(event_bus, run_id, &story.key, story.phase);

    let dev_template = "Develop the story at {{story_file}}.".to_string();
    let dev_sections = vec![PromptSection::new("story_file", SectionPriority::Required, story_file.clone())];
    let Some(parsed) = dispatch_task(dispatcher, TaskType::DevStory, dev_template, dev_sections, token_ceiling).await else {
        return StoryOutcome {
            key: story.key,
            phase: StoryPhase::Failed,
            review_cycles: 0,
        };
    };
    let Ok(dev_result) = serde_json::from_value::<DevStoryResult>(parsed) else {
        return StoryOutcome {
            key: story.key,
            phase: StoryPhase::Failed,
            review_cycles: 0,
        };
    };
    if dev_result.result == ResultStatus::Failed {
        return escalate(event_bus, run_id, &story.key, "dev-story-failed", 0);
    }
    if dev_result.tests == TestOutcome::Fail {
        event_bus.emit(EventPayload::StoryWarn {
            run_id,
            story_key: story.key.clone(),
            message: "dev-story reported failing tests; proceeding to review".to_string(),
        });
    }

    story.phase = StoryPhase::InReview;
    emit_phase(event_bus, run_id, &story.key, story.phase);
    let mut files_modified = dev_result.files_modified;

    loop {
        let review_template = "Review the changes to {{story_file}}.".to_string();
        let review_sections = vec![
            PromptSection::new("story_file", SectionPriority::Required, story_file.clone()),
            PromptSection::new("changes", SectionPriority::Important, build_review_input(&files_modified)),
        ];
        let Some(parsed) = dispatch_task(dispatcher, TaskType::CodeReview, review_template, review_sections, token_ceiling).await else {
            return StoryOutcome {
                key: story.key,
                phase: StoryPhase::Failed,
                review_cycles: story.review_cycles,
            };
        };
        let Ok(review_result) = serde_json::from_value::<CodeReviewResult>(parsed) else {
            return StoryOutcome {
                key: story.key,
                phase: StoryPhase::Failed,
                review_cycles: story.review_cycles,
            };
        };

        if review_result.verdict == ReviewVerdict::ShipIt {
            story.phase = StoryPhase::Complete;
            emit_phase(event_bus, run_id, &story.key, story.phase);
            event_bus.emit(EventPayload::StoryDone {
                run_id,
                story_key: story.key.clone(),
            });
            return StoryOutcome {
                key: story.key,
                phase: StoryPhase::Complete,
                review_cycles: story.review_cycles,
            };
        }

        if review_result.verdict == ReviewVerdict::NeedsMajorRework && story.review_cycles >= max_review_cycles {
            return escalate(event_bus, run_id, &story.key, "NEEDS_MAJOR_REWORK", story.review_cycles);
        }

        story.phase = StoryPhase::InFix;
        emit_phase(event_bus, run_id, &story.key, story.phase);
        let fix_template = "Apply the requested fixes to {{story_file}}.".to_string();
        let fix_sections = vec![PromptSection::new("story_file", SectionPriority::Required, story_file.clone())];
        let Some(parsed) = dispatch_task(dispatcher, TaskType::Fix, fix_template, fix_sections, token_ceiling).await else {
            return StoryOutcome {
                key: story.key,
                phase: StoryPhase::Failed,
                review_cycles: story.review_cycles,
            };
        };
        if let Ok(fix_result) = serde_json::from_value::<DevStoryResult>(parsed) {
            files_modified = fix_result.files_modified;
        }

        story.review_cycles += 1;
        story.phase = StoryPhase::InReview;
        emit_phase(event_bus, run_id, &story.key, story.phase);
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
    use std::sync::Mutex as StdMutex;
    use substrate_dispatcher::AgentProcess;
    use substrate_dispatcher::AgentProcessError;
    use substrate_dispatcher::RawAgentOutput;

    struct ScriptedAgent {
        responses: StdMutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl AgentProcess for ScriptedAgent {
        async fn run(
            &self,
            _agent: Option<&substrate_core::AgentName>,
            _model: Option<&str>,
            _prompt: &str,
            _timeout: Option<std::time::Duration>,
        ) -> Result<RawAgentOutput, AgentProcessError> {
            let stdout = self.responses.lock().expect("lock").remove(0);
            Ok(RawAgentOutput {
                exit_code: Some(0),
                stdout,
                stderr: String::new(),
                timed_out: false,
            })
        }
    }

    fn harness(responses: Vec<&str>) -> (Arc<Dispatcher>, Arc<EventBus>, RunId) {
        let agent = Arc::new(ScriptedAgent {
            responses: StdMutex::new(responses.into_iter().map(str::to_string).collect()),
        });
        let event_bus = Arc::new(EventBus::new());
        let run_id = RunId::new(std::num::NonZeroU64::new(1).expect("nonzero"));
        let dispatcher = Arc::new(Dispatcher::new(agent, event_bus.clone(), run_id));
        (dispatcher, event_bus, run_id)
    }

    #[tokio::test]
    async fn run_empty_story_keys_completes_immediately() {
        let (dispatcher, event_bus, run_id) = harness(vec![]);
        let orchestrator = ImplementationOrchestrator::new(dispatcher, event_bus, run_id, SubstrateConfig::default());
        let outcome = orchestrator.run(Vec::new()).await;
        assert_eq!(outcome.status, ImplementationRunStatus::Complete);
        assert!(outcome.succeeded.is_empty());
    }

    #[tokio::test]
    async fn happy_path_single_story_completes() {
        let responses = vec![
            r#"{"result":"success","story_file":"stories/epic1-1.md","story_key":"epic1-1","story_title":"t","tokenUsage":{"input":1,"output":1}}"#,
            r#"{"result":"success","ac_met":[],"ac_failures":[],"files_modified":["src/lib.rs"],"tests":"pass","tokenUsage":{"input":1,"output":1}}"#,
            r#"{"result":"success","verdict":"SHIP_IT","issues":0,"issue_list":[],"token_usage":{"input":1,"output":1}}"#,
        ];
        let (dispatcher, event_bus, run_id) = harness(responses);
        let orchestrator = ImplementationOrchestrator::new(dispatcher, event_bus, run_id, SubstrateConfig::default());
        let outcome = orchestrator.run(vec![StoryKey::new("epic1-1")]).await;
        assert_eq!(outcome.status, ImplementationRunStatus::Complete);
        assert_eq!(outcome.succeeded, vec![StoryKey::new("epic1-1")]);
    }

    #[tokio::test]
    async fn missing_story_file_escalates() {
        let responses = vec![r#"{"result":"success","story_file":"","story_key":"epic1-1","story_title":"t","tokenUsage":{"input":1,"output":1}}"#];
        let (dispatcher, event_bus, run_id) = harness(responses);
        let orchestrator = ImplementationOrchestrator::new(dispatcher, event_bus, run_id, SubstrateConfig::default());
        let outcome = orchestrator.run(vec![StoryKey::new("epic1-1")]).await;
        assert_eq!(outcome.escalated, vec![StoryKey::new("epic1-1")]);
    }

    #[tokio::test]
    async fn max_review_cycles_exceeded_escalates() {
        let mut responses = vec![
            r#"{"result":"success","story_file":"stories/epic1-1.md","story_key":"epic1-1","story_title":"t","tokenUsage":{"input":1,"output":1}}"#
                .to_string(),
            r#"{"result":"success","ac_met":[],"ac_failures":[],"files_modified":["src/lib.rs"],"tests":"pass","tokenUsage":{"input":1,"output":1}}"#
                .to_string(),
        ];
        for _ in 0..3 {
            responses.push(
                r#"{"result":"success","verdict":"NEEDS_MAJOR_REWORK","issues":1,"issue_list":[{"severity":"major","file":"src/lib.rs","desc":"x"}],"token_usage":{"input":1,"output":1}}"#
                    .to_string(),
            );
            responses.push(
                r#"{"result":"success","ac_met":[],"ac_failures":[],"files_modified":["src/lib.rs"],"tests":"pass","tokenUsage":{"input":1,"output":1}}"#
                    .to_string(),
            );
        }
        let responses: Vec<&str> = responses.iter().map(String::as_str).collect();
        let (dispatcher, event_bus, run_id) = harness(responses);
        let mut config = SubstrateConfig::default();
        config.max_review_cycles = 2;
        let orchestrator = ImplementationOrchestrator::new(dispatcher, event_bus, run_id, config);
        let outcome = orchestrator.run(vec![StoryKey::new("epic1-1")]).await;
        assert_eq!(outcome.escalated, vec![StoryKey::new("epic1-1")]);
    }
}
