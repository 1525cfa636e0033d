// crates/substrate-orchestrator/src/builtin.rs
// ============================================================================
// Module: Built-in Phases
// Description: Registers the four built-in methodology phases (spec.md §4.4).
// Purpose: analysis -> planning -> solutioning -> implementation, wired with
// the artifact-existence gates and the solutioning readiness gate.
// Dependencies: substrate-core, substrate-contract, substrate-store
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use substrate_contract::phase::ARTIFACT_ARCHITECTURE;
use substrate_contract::phase::ARTIFACT_IMPLEMENTATION_COMPLETE;
use substrate_contract::phase::ARTIFACT_PRD;
use substrate_contract::phase::ARTIFACT_PRODUCT_BRIEF;
use substrate_contract::phase::ARTIFACT_STORIES;
use substrate_contract::phase::PHASE_ANALYSIS;
use substrate_contract::phase::PHASE_IMPLEMENTATION;
use substrate_contract::phase::PHASE_PLANNING;
use substrate_contract::phase::PHASE_SOLUTIONING;
use substrate_core::ArtifactType;
use substrate_core::Category;
use substrate_core::PhaseName;
use substrate_core::RequirementStatus;
use substrate_core::RequirementType;

use crate::gate::artifact_exists_gate;
use crate::gate::Gate;
use crate::gate::PhaseDefinition;
use crate::readiness::requirements_covered_by_stories;

/// The story-decision category solutioning writes one decision per story
/// under, keyed by story key, value `{"description": ...}` — this is the
/// data the readiness gate reads back.
pub const STORY_DECISION_CATEGORY: &str = "story";

fn solutioning_readiness_gate() -> Gate {
    Gate::new(
        "solutioning-readiness",
        |store, run_id| {
            let requirements = store.get_requirements_by_run(run_id).map_err(|err| err.to_string())?;
            // spec.md's readiness check scopes to "every persisted functional
            // requirement" — non-functional rows and requirements explicitly
            // dropped from scope never need a covering story.
            let functional_active: Vec<_> = requirements
                .into_iter()
                .filter(|requirement| requirement.requirement_type == RequirementType::Functional && requirement.status == RequirementStatus::Active)
                .collect();
            let decisions = store
                .get_decisions_by_phase_for_run(run_id, &PhaseName::new(PHASE_SOLUTIONING))
                .map_err(|err| err.to_string())?;
            let descriptions: Vec<String> = decisions
                .iter()
                .filter(|decision| decision.category == Category::new(STORY_DECISION_CATEGORY))
                .filter_map(|decision| decision.value.get("description").and_then(|v| v.as_str()).map(str::to_string))
                .collect();
            Ok(requirements_covered_by_stories(&functional_active, &descriptions))
        },
        "not every functional requirement is covered by a story",
    )
}

/// Registers the four built-in phases on `orchestrator`, in order.
pub fn register_builtin_phases(orchestrator: &mut crate::phase_orchestrator::PhaseOrchestrator) {
    let analysis = PhaseDefinition::new(PhaseName::new(PHASE_ANALYSIS), "Explore the concept and produce a product brief")
        .with_exit_gate(artifact_exists_gate(
            "analysis-has-product-brief",
            PhaseName::new(PHASE_ANALYSIS),
            ArtifactType::new(ARTIFACT_PRODUCT_BRIEF),
        ));

    let planning = PhaseDefinition::new(PhaseName::new(PHASE_PLANNING), "Turn the product brief into a PRD")
        .with_entry_gate(artifact_exists_gate(
            "planning-requires-product-brief",
            PhaseName::new(PHASE_ANALYSIS),
            ArtifactType::new(ARTIFACT_PRODUCT_BRIEF),
        ))
        .with_exit_gate(artifact_exists_gate(
            "planning-has-prd",
            PhaseName::new(PHASE_PLANNING),
            ArtifactType::new(ARTIFACT_PRD),
        ));

    let solutioning = PhaseDefinition::new(
        PhaseName::new(PHASE_SOLUTIONING),
        "Turn the PRD into an architecture and a story backlog",
    )
    .with_entry_gate(artifact_exists_gate(
        "solutioning-requires-prd",
        PhaseName::new(PHASE_PLANNING),
        ArtifactType::new(ARTIFACT_PRD),
    ))
    .with_exit_gate(artifact_exists_gate(
        "solutioning-has-architecture",
        PhaseName::new(PHASE_SOLUTIONING),
        ArtifactType::new(ARTIFACT_ARCHITECTURE),
    ))
    .with_exit_gate(artifact_exists_gate(
        "solutioning-has-stories",
        PhaseName::new(PHASE_SOLUTIONING),
        ArtifactType::new(ARTIFACT_STORIES),
    ))
    .with_exit_gate(solutioning_readiness_gate());

    let implementation = PhaseDefinition::new(PhaseName::new(PHASE_IMPLEMENTATION), "Drive each story through dev and review")
        .with_entry_gate(artifact_exists_gate(
            "implementation-requires-architecture",
            PhaseName::new(PHASE_SOLUTIONING),
            ArtifactType::new(ARTIFACT_ARCHITECTURE),
        ))
        .with_entry_gate(artifact_exists_gate(
            "implementation-requires-stories",
            PhaseName::new(PHASE_SOLUTIONING),
            ArtifactType::new(ARTIFACT_STORIES),
        ))
        .with_entry_gate(solutioning_readiness_gate())
        .with_exit_gate(artifact_exists_gate(
            "implementation-complete",
            PhaseName::new(PHASE_IMPLEMENTATION),
            ArtifactType::new(ARTIFACT_IMPLEMENTATION_COMPLETE),
        ));

    orchestrator.register_phase(analysis);
    orchestrator.register_phase(planning);
    orchestrator.register_phase(solutioning);
    orchestrator.register_phase(implementation);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;
    use crate::phase_orchestrator::PhaseOrchestrator;
    use std::sync::Arc;
    use substrate_store::SqliteDecisionStore;
    use substrate_store::SqliteStoreConfig;

    #[test]
    fn registers_four_phases_in_order() {
        let store = Arc::new(SqliteDecisionStore::open(SqliteStoreConfig::new(":memory:".into())).expect("open store"));
        let mut orchestrator = PhaseOrchestrator::new(store);
        register_builtin_phases(&mut orchestrator);
        let names: Vec<&str> = orchestrator.phases().into_iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec![PHASE_ANALYSIS, PHASE_PLANNING, PHASE_SOLUTIONING, PHASE_IMPLEMENTATION]);
    }
}
