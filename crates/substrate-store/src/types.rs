// crates/substrate-store/src/types.rs
// ============================================================================
// Module: Decision Store Request Types
// Description: Input/patch/filter shapes for every Decision Store operation.
// Purpose: Give callers typed constructors instead of positional arguments,
// matching spec.md §4.1's operation list.
// Dependencies: substrate-core, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use substrate_core::ArtifactType;
use substrate_core::Category;
use substrate_core::DecisionKey;
use substrate_core::PhaseName;
use substrate_core::RequirementPriority;
use substrate_core::RequirementStatus;
use substrate_core::RequirementType;
use substrate_core::RunConfig;
use substrate_core::RunId;
use substrate_core::RunStatus;
use substrate_core::TokenUsageTotals;

// ============================================================================
// SECTION: Pipeline Run
// ============================================================================

/// Input to `createPipelineRun`.
#[derive(Debug, Clone)]
pub struct NewPipelineRun {
    /// Methodology pack name driving this run.
    pub methodology: String,
    /// Natural-language concept supplied by the user.
    pub concept: String,
    /// Phase the run starts in.
    pub start_phase: PhaseName,
    /// Parent run id, set only for amendment runs.
    pub parent_run_id: Option<RunId>,
}

/// Patch applied by `updatePipelineRun`. Every field is optional; a patch
/// with every field `None` is a no-op per spec.md §4.1.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunPatch {
    /// Replacement current phase.
    pub current_phase: Option<PhaseName>,
    /// Replacement lifecycle status.
    pub status: Option<RunStatus>,
    /// Replacement config blob (concept + phase history), wholesale.
    pub config: Option<RunConfig>,
    /// Replacement token-usage rollup, wholesale.
    pub token_usage: Option<TokenUsageTotals>,
}

impl PipelineRunPatch {
    /// Returns true when every field is `None`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.current_phase.is_none()
            && self.status.is_none()
            && self.config.is_none()
            && self.token_usage.is_none()
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Input to `createDecision`.
#[derive(Debug, Clone)]
pub struct NewDecision {
    /// Owning pipeline run.
    pub pipeline_run_id: RunId,
    /// Phase this decision is recorded under.
    pub phase: PhaseName,
    /// Decision category.
    pub category: Category,
    /// Decision key within `(phase, category)`.
    pub key: DecisionKey,
    /// Decision value, opaque JSON.
    pub value: serde_json::Value,
    /// Optional rationale text.
    pub rationale: Option<String>,
}

/// Patch applied by `updateDecision`.
#[derive(Debug, Clone, Default)]
pub struct DecisionPatch {
    /// Replacement value.
    pub value: Option<serde_json::Value>,
    /// Replacement rationale.
    pub rationale: Option<String>,
}

impl DecisionPatch {
    /// Returns true when every field is `None`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.value.is_none() && self.rationale.is_none()
    }
}

/// Filter for `getActiveDecisions`. Every field narrows the result set;
/// `None` fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    /// Restrict to this pipeline run.
    pub run_id: Option<RunId>,
    /// Restrict to this phase.
    pub phase: Option<PhaseName>,
    /// Restrict to this category.
    pub category: Option<Category>,
}

// ============================================================================
// SECTION: Requirement / Constraint
// ============================================================================

/// Input to `createRequirement`.
#[derive(Debug, Clone)]
pub struct NewRequirement {
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
    /// Initial lifecycle status. Callers pass [`RequirementStatus::Active`]
    /// unless seeding from an amendment snapshot.
    pub status: RequirementStatus,
}

/// Input to `createConstraint`.
#[derive(Debug, Clone)]
pub struct NewConstraint {
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

/// Input to `registerArtifact`.
#[derive(Debug, Clone)]
pub struct NewArtifact {
    /// Owning pipeline run.
    pub pipeline_run_id: RunId,
    /// Phase that produced this artifact.
    pub phase: PhaseName,
    /// Artifact type (e.g. `product-brief`, `prd`, `architecture`, `stories`).
    pub artifact_type: ArtifactType,
    /// Logical path or URI to the artifact content.
    pub path: String,
    /// Raw content bytes, hashed with `substrate_core::hashing::hash_bytes`
    /// to populate `Artifact::content_hash`. `None` when the artifact is a
    /// reference to out-of-band content (e.g. a worktree path) rather than
    /// inline content the store can hash.
    pub content: Option<Vec<u8>>,
    /// Optional human-readable summary.
    pub summary: Option<String>,
}
