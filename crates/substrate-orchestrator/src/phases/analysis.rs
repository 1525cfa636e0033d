// crates/substrate-orchestrator/src/phases/analysis.rs
// ============================================================================
// Module: Analysis Phase Runner
// Description: Explores the run's concept and produces a product brief.
// Purpose: spec.md §4.5 phase runner shape applied to the analysis phase.
// Dependencies: substrate-core, substrate-contract, substrate-store
// ============================================================================

use substrate_contract::PromptSection;
use substrate_contract::SectionPriority;
use substrate_contract::TaskType;
use substrate_contract::phase::ARTIFACT_PRODUCT_BRIEF;
use substrate_contract::phase::PHASE_ANALYSIS;
use substrate_core::PhaseName;
use substrate_core::RequirementPriority;
use substrate_core::RequirementStatus;
use substrate_core::RequirementType;
use substrate_store::NewArtifact;
use substrate_store::NewRequirement;

use crate::runner::PhaseRunResult;
use crate::runner::PhaseRunner;
use crate::runner::PhaseRunnerReport;
use crate::runner::RunnerContext;

const ANALYSIS_TEMPLATE: &str = "Produce a product brief for the following concept.\n\n{{concept}}{{amendment_context}}";

/// Drives the analysis phase: dispatches a single `Analysis` task and
/// registers its product brief as the phase artifact.
pub struct AnalysisRunner {
    token_ceiling: u64,
}

impl AnalysisRunner {
    /// Creates a runner with the given token ceiling for the prompt assembler.
    #[must_use]
    pub fn new(token_ceiling: u64) -> Self {
        Self { token_ceiling }
    }
}

#[async_trait::async_trait]
impl PhaseRunner for AnalysisRunner {
    fn phase(&self) -> PhaseName {
        PhaseName::new(PHASE_ANALYSIS)
    }

    async fn run(&self, ctx: &RunnerContext) -> PhaseRunnerReport {
        let run = match ctx.store.get_pipeline_run(ctx.run_id) {
            Ok(run) => run,
            Err(error) => return PhaseRunnerReport::missing_input(format!("unknown-run: {error}")),
        };

        let mut sections = vec![PromptSection::new(
            "concept",
            SectionPriority::Required,
            run.config.concept.clone(),
        )];
        if let Some(section) = super::amendment_section(ctx, &self.phase()) {
            sections.push(section);
        }

        let parsed = match super::dispatch_and_record(
            ctx,
            self.phase(),
            TaskType::Analysis,
            ANALYSIS_TEMPLATE.to_string(),
            sections,
            self.token_ceiling,
        )
        .await
        {
            Ok(parsed) => parsed,
            Err(report) => return report,
        };

        let Some(product_brief) = parsed.get("product_brief").and_then(|v| v.as_str()) else {
            return PhaseRunnerReport::missing_input("missing_product_brief");
        };

        if let Some(requirements) = parsed.get("requirements").and_then(|v| v.as_array()) {
            for item in requirements {
                let Some(description) = item.get("description").and_then(|v| v.as_str()) else {
                    continue;
                };
                let requirement_type = match item.get("type").and_then(|v| v.as_str()) {
                    Some("non_functional") => RequirementType::NonFunctional,
                    _ => RequirementType::Functional,
                };
                let priority = match item.get("priority").and_then(|v| v.as_str()) {
                    Some("should") => RequirementPriority::Should,
                    Some("could") => RequirementPriority::Could,
                    Some("wont") => RequirementPriority::Wont,
                    _ => RequirementPriority::Must,
                };
                if let Err(error) = ctx.store.create_requirement(NewRequirement {
                    pipeline_run_id: ctx.run_id,
                    source: "analysis".into(),
                    requirement_type,
                    description: description.to_string(),
                    priority,
                    status: RequirementStatus::Active,
                }) {
                    tracing::warn!(%error, "failed to persist requirement");
                }
            }
        }

        if let Err(error) = ctx.store.register_artifact(NewArtifact {
            pipeline_run_id: ctx.run_id,
            phase: self.phase(),
            artifact_type: substrate_core::ArtifactType::new(ARTIFACT_PRODUCT_BRIEF),
            path: "product-brief.md".into(),
            content: Some(product_brief.as_bytes().to_vec()),
            summary: Some(product_brief.to_string()),
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
    fn analysis_runner_reports_its_phase_name() {
        let runner = AnalysisRunner::new(32_000);
        assert_eq!(runner.phase(), PhaseName::new(PHASE_ANALYSIS));
    }
}
