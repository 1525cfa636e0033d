// crates/substrate-orchestrator/src/phases/planning.rs
// ============================================================================
// Module: Planning Phase Runner
// Description: Turns the product brief into a PRD.
// Purpose: spec.md §4.5 phase runner shape applied to the planning phase.
// Dependencies: substrate-core, substrate-contract, substrate-store
// ============================================================================

use substrate_contract::PromptSection;
use substrate_contract::SectionPriority;
use substrate_contract::TaskType;
use substrate_contract::phase::ARTIFACT_PRD;
use substrate_contract::phase::ARTIFACT_PRODUCT_BRIEF;
use substrate_contract::phase::PHASE_ANALYSIS;
use substrate_contract::phase::PHASE_PLANNING;
use substrate_core::PhaseName;
use substrate_store::NewArtifact;

use crate::runner::PhaseRunResult;
use crate::runner::PhaseRunner;
use crate::runner::PhaseRunnerReport;
use crate::runner::RunnerContext;

const PLANNING_TEMPLATE: &str = "Turn the following product brief into a PRD.\n\n{{product_brief}}{{amendment_context}}";

/// Drives the planning phase: reads the analysis phase's product brief
/// artifact, dispatches a single `Planning` task, and registers the PRD.
pub struct PlanningRunner {
    token_ceiling: u64,
}

impl PlanningRunner {
    /// Creates a runner with the given token ceiling for the prompt assembler.
    #[must_use]
    pub fn new(token_ceiling: u64) -> Self {
        Self { token_ceiling }
    }
}

#[async_trait::async_trait]
impl PhaseRunner for PlanningRunner {
    fn phase(&self) -> PhaseName {
        PhaseName::new(PHASE_PLANNING)
    }

    async fn run(&self, ctx: &RunnerContext) -> PhaseRunnerReport {
        let brief = match ctx.store.get_artifact_by_type_for_run(
            ctx.run_id,
            &PhaseName::new(PHASE_ANALYSIS),
            &substrate_core::ArtifactType::new(ARTIFACT_PRODUCT_BRIEF),
        ) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return PhaseRunnerReport::missing_input("missing_product_brief"),
            Err(error) => return PhaseRunnerReport::missing_input(format!("store-error: {error}")),
        };

        let brief_text = brief.summary.clone().unwrap_or_else(|| "(product brief text unavailable)".to_string());

        let mut sections = vec![PromptSection::new("product_brief", SectionPriority::Required, brief_text)];
        if let Some(section) = super::amendment_section(ctx, &self.phase()) {
            sections.push(section);
        }

        let parsed = match super::dispatch_and_record(
            ctx,
            self.phase(),
            TaskType::Planning,
            PLANNING_TEMPLATE.to_string(),
            sections,
            self.token_ceiling,
        )
        .await
        {
            Ok(parsed) => parsed,
            Err(report) => return report,
        };

        let Some(prd) = parsed.get("prd").and_then(|v| v.as_str()) else {
            return PhaseRunnerReport::missing_input("missing_prd");
        };

        if let Err(error) = ctx.store.register_artifact(NewArtifact {
            pipeline_run_id: ctx.run_id,
            phase: self.phase(),
            artifact_type: substrate_core::ArtifactType::new(ARTIFACT_PRD),
            path: "prd.md".into(),
            content: Some(prd.as_bytes().to_vec()),
            summary: Some(prd.to_string()),
        }) {
            return PhaseRunnerReport {
                result: PhaseRunResult::Failed,
                token_usage: substrate_core::TokenUsageTotals::default(),
                error: Some(error.to_string()),
            };
        }

        PhaseRunnerReport::success(substrate_core::TokenUsageTotals::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planning_runner_reports_its_phase_name() {
        let runner = PlanningRunner::new(32_000);
        assert_eq!(runner.phase(), PhaseName::new(PHASE_PLANNING));
    }
}
