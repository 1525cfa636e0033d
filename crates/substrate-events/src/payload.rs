// crates/substrate-events/src/payload.rs
// ============================================================================
// Module: Event Payload Catalog
// Description: Typed payloads for every event name enumerated in spec.md §4.2.
// Purpose: Give subscribers a matchable, value-typed payload per event.
// Dependencies: substrate-core, serde
// ============================================================================

//! ## Overview
//! Every event carries an ISO-8601 timestamp plus event-specific fields.
//! Payloads are value types: consumers receive a `&Event` and must not (and
//! structurally cannot, since there is no interior mutability here) mutate
//! it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use substrate_core::RunId;
use substrate_core::StoryKey;
use substrate_core::Timestamp;

// ============================================================================
// SECTION: Event Names
// ============================================================================

/// Pipeline started.
pub const PIPELINE_START: &str = "pipeline:start";
/// Pipeline completed (terminal).
pub const PIPELINE_COMPLETE: &str = "pipeline:complete";
/// Pipeline heartbeat, emitted every 30s absent other progress.
pub const PIPELINE_HEARTBEAT: &str = "pipeline:heartbeat";
/// Story entered a new phase.
pub const STORY_PHASE: &str = "story:phase";
/// Story reached a terminal success state.
pub const STORY_DONE: &str = "story:done";
/// Story escalated.
pub const STORY_ESCALATION: &str = "story:escalation";
/// Story-level warning.
pub const STORY_WARN: &str = "story:warn";
/// Story-level log line.
pub const STORY_LOG: &str = "story:log";
/// Story-level stall detected.
pub const STORY_STALL: &str = "story:stall";
/// Worktree created for a story.
pub const WORKTREE_CREATED: &str = "worktree:created";
/// Worktree merged back.
pub const WORKTREE_MERGED: &str = "worktree:merged";
/// Worktree merge conflict.
pub const WORKTREE_CONFLICT: &str = "worktree:conflict";
/// Worktree removed.
pub const WORKTREE_REMOVED: &str = "worktree:removed";
/// Task ready to start (conflict-group scheduling signal).
pub const TASK_READY: &str = "task:ready";
/// Orchestrator escalated a story.
pub const ORCHESTRATOR_STORY_ESCALATED: &str = "orchestrator:story-escalated";
/// Orchestrator run complete.
pub const ORCHESTRATOR_COMPLETE: &str = "orchestrator:complete";
/// Supervisor killed a pipeline process tree.
pub const SUPERVISOR_KILL: &str = "supervisor:kill";
/// Supervisor restarted a run.
pub const SUPERVISOR_RESTART: &str = "supervisor:restart";
/// Supervisor aborted after exceeding restart cap.
pub const SUPERVISOR_ABORT: &str = "supervisor:abort";
/// Supervisor emitted a terminal summary.
pub const SUPERVISOR_SUMMARY: &str = "supervisor:summary";

// ============================================================================
// SECTION: Event Payload
// ============================================================================

/// Typed payload for every event Substrate emits.
///
/// # Invariants
/// - [`EventPayload::name`] always returns one of the `EVENT_*`/name
///   constants in this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventPayload {
    /// See [`PIPELINE_START`].
    PipelineStart {
        /// Run identifier.
        run_id: RunId,
        /// Natural-language concept supplied at run start.
        concept: String,
    },
    /// See [`PIPELINE_COMPLETE`].
    PipelineComplete {
        /// Run identifier.
        run_id: RunId,
        /// Final run status label.
        status: String,
    },
    /// See [`PIPELINE_HEARTBEAT`].
    PipelineHeartbeat {
        /// Run identifier.
        run_id: RunId,
    },
    /// See [`STORY_PHASE`].
    StoryPhase {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
        /// New story phase label.
        phase: String,
    },
    /// See [`STORY_DONE`].
    StoryDone {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
    },
    /// See [`STORY_ESCALATION`].
    StoryEscalation {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
        /// Escalation reason, e.g. `create-story-no-file` or the last
        /// review verdict.
        last_verdict: String,
    },
    /// See [`STORY_WARN`].
    StoryWarn {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
        /// Warning message.
        message: String,
    },
    /// See [`STORY_LOG`].
    StoryLog {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
        /// Log message.
        message: String,
    },
    /// See [`STORY_STALL`].
    StoryStall {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
    },
    /// See [`WORKTREE_CREATED`].
    WorktreeCreated {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
        /// Worktree path.
        path: String,
    },
    /// See [`WORKTREE_MERGED`].
    WorktreeMerged {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
    },
    /// See [`WORKTREE_CONFLICT`].
    WorktreeConflict {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
        /// Conflict details.
        details: String,
    },
    /// See [`WORKTREE_REMOVED`].
    WorktreeRemoved {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
    },
    /// See [`TASK_READY`].
    TaskReady {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
    },
    /// See [`ORCHESTRATOR_STORY_ESCALATED`].
    OrchestratorStoryEscalated {
        /// Run identifier.
        run_id: RunId,
        /// Story key.
        story_key: StoryKey,
        /// Last review verdict or sub-phase failure reason.
        last_verdict: String,
    },
    /// See [`ORCHESTRATOR_COMPLETE`].
    OrchestratorComplete {
        /// Run identifier.
        run_id: RunId,
        /// Succeeded story keys.
        succeeded: Vec<StoryKey>,
        /// Escalated story keys.
        escalated: Vec<StoryKey>,
        /// Failed story keys.
        failed: Vec<StoryKey>,
    },
    /// See [`SUPERVISOR_KILL`].
    SupervisorKill {
        /// Run identifier.
        run_id: RunId,
        /// Kill reason, e.g. `stall`.
        reason: String,
        /// Seconds since the last observed progress event.
        staleness_seconds: i64,
        /// Process ids terminated.
        pids: Vec<u32>,
    },
    /// See [`SUPERVISOR_RESTART`].
    SupervisorRestart {
        /// Run identifier.
        run_id: RunId,
        /// 1-based restart attempt number.
        attempt: u32,
    },
    /// See [`SUPERVISOR_ABORT`].
    SupervisorAbort {
        /// Run identifier.
        run_id: RunId,
        /// Abort reason, e.g. `max_restarts_exceeded`.
        reason: String,
        /// Number of restart attempts made before aborting.
        attempts: u32,
    },
    /// See [`SUPERVISOR_SUMMARY`].
    SupervisorSummary {
        /// Run identifier.
        run_id: RunId,
        /// Succeeded story keys.
        succeeded: Vec<StoryKey>,
        /// Failed story keys.
        failed: Vec<StoryKey>,
        /// Escalated story keys.
        escalated: Vec<StoryKey>,
        /// Total elapsed seconds since run start.
        elapsed_seconds: i64,
        /// Number of restarts performed.
        restarts: u32,
    },
}

impl EventPayload {
    /// Returns the stable event name for this payload variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PipelineStart { .. } => PIPELINE_START,
            Self::PipelineComplete { .. } => PIPELINE_COMPLETE,
            Self::PipelineHeartbeat { .. } => PIPELINE_HEARTBEAT,
            Self::StoryPhase { .. } => STORY_PHASE,
            Self::StoryDone { .. } => STORY_DONE,
            Self::StoryEscalation { .. } => STORY_ESCALATION,
            Self::StoryWarn { .. } => STORY_WARN,
            Self::StoryLog { .. } => STORY_LOG,
            Self::StoryStall { .. } => STORY_STALL,
            Self::WorktreeCreated { .. } => WORKTREE_CREATED,
            Self::WorktreeMerged { .. } => WORKTREE_MERGED,
            Self::WorktreeConflict { .. } => WORKTREE_CONFLICT,
            Self::WorktreeRemoved { .. } => WORKTREE_REMOVED,
            Self::TaskReady { .. } => TASK_READY,
            Self::OrchestratorStoryEscalated { .. } => ORCHESTRATOR_STORY_ESCALATED,
            Self::OrchestratorComplete { .. } => ORCHESTRATOR_COMPLETE,
            Self::SupervisorKill { .. } => SUPERVISOR_KILL,
            Self::SupervisorRestart { .. } => SUPERVISOR_RESTART,
            Self::SupervisorAbort { .. } => SUPERVISOR_ABORT,
            Self::SupervisorSummary { .. } => SUPERVISOR_SUMMARY,
        }
    }
}

/// An emitted event: a payload paired with its emission timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Emission timestamp.
    pub ts: Timestamp,
    /// Event payload.
    pub payload: EventPayload,
}

impl Event {
    /// Creates a new event at the given timestamp.
    #[must_use]
    pub const fn new(ts: Timestamp, payload: EventPayload) -> Self {
        Self { ts, payload }
    }

    /// Returns the event's stable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.payload.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_name_matches_constant() {
        let payload = EventPayload::PipelineStart {
            run_id: RunId::from_raw(1).expect("id"),
            concept: "x".to_string(),
        };
        assert_eq!(payload.name(), PIPELINE_START);
    }

    #[test]
    fn ndjson_serialization_includes_event_tag() {
        let event = Event::new(
            Timestamp::now(),
            EventPayload::StoryDone {
                run_id: RunId::from_raw(1).expect("id"),
                story_key: StoryKey::new("10-1"),
            },
        );
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"event\":\"story_done\""));
    }
}
