// crates/substrate-orchestrator/src/phases/solutioning.rs
// ============================================================================
// Module: Solutioning Phase Runner
// Description: Turns the PRD into an architecture and a story backlog.
// Purpose: spec.md §4.5 phase runner shape applied to the solutioning phase.
// Dependencies: substrate-core, substrate-contract, substrate-store
// ============================================================================

use substrate_contract::PromptSection;
use substrate_contract::SectionPriority;
use substrate_contract::TaskType;
use substrate_contract::phase::ARTIFACT_ARCHITECTURE;
use substrate_contract::phase::ARTIFACT_PRD;
use substrate_contract::phase::ARTIFACT_STORIES;
use substrate_contract::phase::PHASE_PLANNING;
use substrate_contract::phase::PHASE_SOLUTIONING;
use substrate_core::Category;
use substrate_core::DecisionKey;
use substrate_core::PhaseName;
use substrate_store::NewArtifact;
use substrate_store::NewDecision;

use crate::builtin::STORY_DECISION_CATEGORY;
use crate::runner::PhaseRunResult;
use crate::runner::PhaseRunner;
use crate::runner::PhaseRunnerReport;
use crate::runner::RunnerContext;

const SOLUTIONING_TEMPLATE: &str = "Design an architecture and a story backlog for the following PRD.\n\n{{prd}}{{amendment_context}}";

/// Drives the solutioning phase: reads the planning phase's PRD artifact,
/// dispatches a single `Solutioning` task, persists one decision per story,
/// and registers both the architecture and stories artifacts.
pub struct SolutioningRunner {
    token_ceiling: u64,
}

impl SolutioningRunner {
    /// Creates a runner with the given token ceiling for the prompt assembler.
    #[must_use]
    pub fn new(token_ceiling: u64) -> Self {
        Self { token_ceiling }
    }
}

#[async_trait::async_trait]
impl PhaseRunner for SolutioningRunner {
    fn phase(&self) -> PhaseName {
        PhaseName::new(PHASE_SOLUTIONING)
    }

    async fn run(&self, ctx: &RunnerContext) -> PhaseRunnerReport {
        let prd = match ctx.store.get_artifact_by_type_for_run(
            ctx.run_id,
            &PhaseName::new(PHASE_PLANNING),
            &substrate_core::ArtifactType::new(ARTIFACT_PRD),
        ) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return PhaseRunnerReport::missing_input("missing_prd"),
            Err(error) => return PhaseRunnerReport::missing_input(format!("store-error: {error}")),
        };
        let prd_text = prd.summary.clone().unwrap_or_else(|| "(PRD text unavailable)".to_string());

        let mut sections = vec![PromptSection::new("prd", SectionPriority::Required, prd_text)];
        if let Some(section) = super::amendment_section(ctx, &self.phase()) {
            sections.push(section);
        }

        let parsed = match super::dispatch_and_record(
            ctx,
            self.phase(),
            TaskType::Solutioning,
            SOLUTIONING_TEMPLATE.to_string(),
            sections,
            self.token_ceiling,
        )
        .await
        {
            Ok(parsed) => parsed,
            Err(report) => return report,
        };

        let Some(architecture) = parsed.get("architecture").and_then(|v| v.as_str()) else {
            return PhaseRunnerReport::missing_input("missing_architecture");
        };
        let Some(stories) = parsed.get("stories").and_then(|v| v.as_array()) else {
            return PhaseRunnerReport::missing_input("missing_stories");
        };
        if stories.is_empty() {
            return PhaseRunnerReport::missing_input("missing_stories");
        }

        for story in stories {
            let (Some(key), Some(description)) = (
                story.get("key").and_then(|v| v.as_str()),
                story.get("description").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            if let Err(error) = ctx.store.create_decision(NewDecision {
                pipeline_run_id: ctx.run_id,
                phase: self.phase(),
                category: Category::new(STORY_DECISION_CATEGORY),
                key: DecisionKey::new(key),
                value: serde_json::json!({ "description": description }),
                rationale: None,
            }) {
                tracing::warn!(%error, "failed to persist story decision");
            }
        }

        if let Err(error) = ctx.store.register_artifact(NewArtifact {
            pipeline_run_id: ctx.run_id,
            phase: self.phase(),
            artifact_type: substrate_core::ArtifactType::new(ARTIFACT_ARCHITECTURE),
            path: "architecture.md".into(),
            content: Some(architecture.as_bytes().to_vec()),
            summary: Some(architecture.to_string()),
        }) {
            return PhaseRunnerReport {
                result: PhaseRunResult::Failed,
                token_usage: substrate_core::TokenUsageTotals::default(),
                error: Some(error.to_string()),
            };
        }

        let stories_json = serde_json::to_string(stories).unwrap_or_default();
        if let Err(error) = ctx.store.register_artifact(NewArtifact {
            pipeline_run_id: ctx.run_id,
            phase: self.phase(),
            artifact_type: substrate_core::ArtifactType::new(ARTIFACT_STORIES),
            path: "stories.json".into(),
            content: Some(stories_json.clone().into_bytes()),
            summary: Some(stories_json),
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
    fn solutioning_runner_reports_its_phase_name() {
        let runner = SolutioningRunner::new(32_000);
        assert_eq!(runner.phase(), PhaseName::new(PHASE_SOLUTIONING));
    }
}
