// crates/substrate-core/src/model.rs
// ============================================================================
// Module: Substrate Data Model
// Description: Durable entities shared by the Decision Store and orchestrators.
// Purpose: Define PipelineRun, Decision, Requirement, Constraint, Artifact,
// TokenUsage, Story, and phase-history types.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! These types mirror spec.md §3 exactly. The Decision Store owns their
//! persistent lifecycle; orchestrators only see them through store
//! operations. Story is the one entity the Implementation Orchestrator owns
//! directly as in-memory state for the duration of a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ArtifactId;
use crate::identifiers::ArtifactType;
use crate::identifiers::Category;
use crate::identifiers::ConstraintId;
use crate::identifiers::DecisionId;
use crate::identifiers::DecisionKey;
use crate::identifiers::PhaseName;
use crate::identifiers::RequirementId;
use crate::identifiers::RunId;
use crate::identifiers::StoryKey;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Pipeline Run
// ============================================================================

/// Lifecycle status of a pipeline run.
///
/// # Invariants
/// - `Running` is the only entry state; all others are terminal or
///   suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is actively advancing through phases.
    Running,
    /// The run is suspended (e.g. supervisor-initiated pause before kill).
    Paused,
    /// The run completed its last phase successfully.
    Completed,
    /// The run failed and is not resumable without intervention.
    Failed,
    /// The run was stopped (supervisor kill without restart, or explicit abort).
    Stopped,
}

/// One gate evaluation outcome recorded in phase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name.
    pub gate: String,
    /// Whether the gate passed.
    pub passed: bool,
    /// Error message when the gate failed or raised.
    pub error: Option<String>,
}

/// One phase-history entry, appended on every phase enter and closed on
/// every phase exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseHistoryEntry {
    /// Phase name this entry covers.
    pub phase: PhaseName,
    /// Timestamp the phase was entered.
    pub started_at: Timestamp,
    /// Timestamp the phase was exited, if it has completed.
    pub completed_at: Option<Timestamp>,
    /// Gate results recorded for this phase's transition attempts.
    pub gate_results: Vec<GateResult>,
}

/// Structured config blob stored on a [`PipelineRun`].
///
/// # Invariants
/// - `phase_history` entries are ordered by `started_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Original natural-language concept supplied by the user.
    pub concept: String,
    /// Ordered phase-history log.
    pub phase_history: Vec<PhaseHistoryEntry>,
}

impl RunConfig {
    /// Creates a new config with a single open phase-history entry.
    #[must_use]
    pub fn new(concept: impl Into<String>, start_phase: PhaseName, started_at: Timestamp) -> Self {
        Self {
            concept: concept.into(),
            phase_history: vec![PhaseHistoryEntry {
                phase: start_phase,
                started_at,
                completed_at: None,
                gate_results: Vec::new(),
            }],
        }
    }

    /// Deserializes a phase-history blob, accepting either the current
    /// `{concept, phaseHistory}` shape or a legacy top-level array. Unknown
    /// or invalid JSON deserializes to an empty history with an empty
    /// concept, per spec.md §4.4.
    #[must_use]
    pub fn from_json_lenient(raw: &str) -> Self {
        if let Ok(config) = serde_json::from_str::<Self>(raw) {
            return config;
        }
        if let Ok(legacy) = serde_json::from_str::<Vec<PhaseHistoryEntry>>(raw) {
            return Self {
                concept: String::new(),
                phase_history: legacy,
            };
        }
        Self {
            concept: String::new(),
            phase_history: Vec::new(),
        }
    }
}

/// Aggregate token usage blob stored on a [`PipelineRun`], replaced wholesale
/// on each `updatePipelineRun` call (the durable ledger itself lives in the
/// append-only `TokenUsage` rows; this is a cached rollup).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageTotals {
    /// Total input tokens across all dispatches in the run.
    pub input_tokens: u64,
    /// Total output tokens across all dispatches in the run.
    pub output_tokens: u64,
    /// Total cost in integer-scaled USD cents.
    pub cost_cents: u64,
}

/// A single end-to-end pipeline execution.
///
/// # Invariants
/// - `parent_run_id.is_some()` implies the parent run has status
///   [`RunStatus::Completed`] (enforced by the store at amendment-run
///   creation time, not by this type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique run identifier.
    pub id: RunId,
    /// Methodology pack name driving this run.
    pub methodology: String,
    /// Current phase name.
    pub current_phase: PhaseName,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Parent run id, set only for amendment runs.
    pub parent_run_id: Option<RunId>,
    /// Structured config blob (concept + phase history).
    pub config: RunConfig,
    /// Cached token-usage rollup.
    pub token_usage: TokenUsageTotals,
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// A single phase decision recorded append-only within a run.
///
/// # Invariants
/// - `superseded_by` is set at most once.
/// - A decision never supersedes a decision in its own run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Decision row identifier.
    pub id: DecisionId,
    /// Owning pipeline run.
    pub pipeline_run_id: RunId,
    /// Phase this decision was recorded under.
    pub phase: PhaseName,
    /// Decision category (e.g. `architecture`).
    pub category: Category,
    /// Decision key within `(phase, category)`.
    pub key: DecisionKey,
    /// Decision value, opaque JSON.
    pub value: serde_json::Value,
    /// Optional rationale text.
    pub rationale: Option<String>,
    /// Id of the decision in an amendment run that supersedes this one.
    pub superseded_by: Option<DecisionId>,
}

impl Decision {
    /// Returns the `(phase, category, key)` triple used to match
    /// supersession candidates.
    #[must_use]
    pub fn triple(&self) -> (&str, &str, &str) {
        (self.phase.as_str(), self.category.as_str(), self.key.as_str())
    }
}

// ============================================================================
// SECTION: Requirement / Constraint
// ============================================================================

/// Requirement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    /// Functional requirement.
    Functional,
    /// Non-functional requirement.
    NonFunctional,
}

/// Requirement priority (MoSCoW).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    /// Must have.
    Must,
    /// Should have.
    Should,
    /// Could have.
    Could,
    /// Won't have (this iteration).
    Wont,
}

/// Requirement lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    /// Actively tracked.
    Active,
    /// Fulfilled by a shipped story.
    Done,
    /// Explicitly dropped from scope.
    Dropped,
}

/// A requirement extracted during the planning phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Requirement row identifier.
    pub id: RequirementId,
    /// Owning pipeline run.
    pub pipeline_run_id: RunId,
    /// Source of the requirement (e.g. `user`, `product-brief`).
    pub source: String,
    /// Requirement type.
    pub requirement_type: RequirementType,
    /// Free-text description.
    pub description: String,
    /// Priority.
    pub priority: RequirementPriority,
    /// Lifecycle status.
    pub status: RequirementStatus,
}

/// A constraint extracted during analysis or planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Constraint row identifier.
    pub id: ConstraintId,
    /// Owning pipeline run.
    pub pipeline_run_id: RunId,
    /// Constraint category (e.g. `technical`, `compliance`).
    pub category: String,
    /// Free-text description.
    pub description: String,
    /// Source of the constraint.
    pub source: String,
}

// ============================================================================
// SECTION: Artifact
// ============================================================================

/// A phase artifact reference.
///
/// # Invariants
/// - Entry/exit gates refer to artifacts by `(pipeline_run_id, phase, type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact row identifier.
    pub id: ArtifactId,
    /// Owning pipeline run.
    pub pipeline_run_id: RunId,
    /// Phase that produced this artifact.
    pub phase: PhaseName,
    /// Artifact type (e.g. `product-brief`, `prd`, `architecture`, `stories`).
    pub artifact_type: ArtifactType,
    /// Logical path or URI to the artifact content.
    pub path: String,
    /// Optional content hash.
    pub content_hash: Option<crate::hashing::HashDigest>,
    /// Optional human-readable summary.
    pub summary: Option<String>,
}

// ============================================================================
// SECTION: Token Usage
// ============================================================================

/// A single append-only token-usage record for one sub-agent dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Owning pipeline run.
    pub pipeline_run_id: RunId,
    /// Phase the dispatch ran under.
    pub phase: PhaseName,
    /// Agent name that was dispatched.
    pub agent: crate::identifiers::AgentName,
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
    /// Cost in integer-scaled USD cents.
    pub cost_cents: u64,
}

/// Aggregated token usage for a `(phase, agent)` pair, as returned by
/// `getTokenUsageSummary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageAggregate {
    /// Phase the aggregate covers.
    pub phase: PhaseName,
    /// Agent the aggregate covers.
    pub agent: crate::identifiers::AgentName,
    /// Summed input tokens.
    pub input_tokens: u64,
    /// Summed output tokens.
    pub output_tokens: u64,
    /// Summed cost in integer-scaled USD cents.
    pub cost_cents: u64,
}

// ============================================================================
// SECTION: Story
// ============================================================================

/// Implementation-phase story lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryPhase {
    /// Not yet started.
    Pending,
    /// `create-story` in flight.
    InStoryCreation,
    /// `dev-story` in flight.
    InDev,
    /// `code-review` in flight.
    InReview,
    /// `fix` in flight, pending re-review.
    InFix,
    /// Escalated to human intervention.
    Escalated,
    /// Completed successfully.
    Complete,
    /// Failed unrecoverably (persistence/dispatch error beyond retry).
    Failed,
}

/// In-memory state for a single story owned exclusively by the
/// Implementation Orchestrator for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Story key (`<epicId>-<seq>[-<suffix>]`).
    pub key: StoryKey,
    /// Current lifecycle phase.
    pub phase: StoryPhase,
    /// Number of review cycles consumed so far.
    pub review_cycles: u32,
    /// Path to the story file once `create-story` has produced one.
    pub story_file_path: Option<String>,
}

impl Story {
    /// Creates a new story in the `Pending` phase.
    #[must_use]
    pub const fn new(key: StoryKey) -> Self {
        Self {
            key,
            phase: StoryPhase::Pending,
            review_cycles: 0,
            story_file_path: None,
        }
    }

    /// Returns true when the story has reached a terminal phase.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.phase, StoryPhase::Complete | StoryPhase::Escalated | StoryPhase::Failed)
    }
}

// ============================================================================
// SECTION: Amendment Supersession Log
// ============================================================================

/// An in-memory supersession record observed during an amendment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersessionLogEntry {
    /// Id of the superseded parent decision.
    pub original_decision_id: DecisionId,
    /// Id of the superseding amendment decision.
    pub superseding_decision_id: DecisionId,
    /// Phase the decisions share.
    pub phase: PhaseName,
    /// Key the decisions share.
    pub key: DecisionKey,
    /// Optional reason recorded for the supersession.
    pub reason: Option<String>,
    /// Timestamp the writeback occurred.
    pub logged_at: Timestamp,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    #[test]
    fn run_config_lenient_parse_accepts_new_shape() {
        let config = RunConfig::new("concept", PhaseName::new("analysis"), Timestamp::now());
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed = RunConfig::from_json_lenient(&json);
        assert_eq!(parsed.concept, "concept");
        assert_eq!(parsed.phase_history.len(), 1);
    }

    #[test]
    fn run_config_lenient_parse_accepts_legacy_array() {
        let entry = PhaseHistoryEntry {
            phase: PhaseName::new("analysis"),
            started_at: Timestamp::now(),
            completed_at: None,
            gate_results: Vec::new(),
        };
        let legacy = serde_json::to_string(&vec![entry]).expect("serialize");
        let parsed = RunConfig::from_json_lenient(&legacy);
        assert_eq!(parsed.phase_history.len(), 1);
        assert!(parsed.concept.is_empty());
    }

    #[test]
    fn run_config_lenient_parse_falls_back_to_empty_on_garbage() {
        let parsed = RunConfig::from_json_lenient("not json at all");
        assert!(parsed.phase_history.is_empty());
        assert!(parsed.concept.is_empty());
    }

    #[test]
    fn story_is_terminal_only_in_terminal_phases() {
        let mut story = Story::new(StoryKey::new("10-1"));
        assert!(!story.is_terminal());
        story.phase = StoryPhase::Complete;
        assert!(story.is_terminal());
        story.phase = StoryPhase::Escalated;
        assert!(story.is_terminal());
        story.phase = StoryPhase::InReview;
        assert!(!story.is_terminal());
    }

    #[test]
    fn decision_triple_matches_fields() {
        let decision = Decision {
            id: DecisionId::from_raw(1).expect("id"),
            pipeline_run_id: RunId::from_raw(1).expect("id"),
            phase: PhaseName::new("analysis"),
            category: Category::new("architecture"),
            key: DecisionKey::new("database"),
            value: serde_json::Value::String("MySQL".to_string()),
            rationale: None,
            superseded_by: None,
        };
        assert_eq!(decision.triple(), ("analysis", "architecture", "database"));
    }
}
