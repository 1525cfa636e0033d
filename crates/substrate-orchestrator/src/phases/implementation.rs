// crates/substrate-orchestrator/src/phases/implementation.rs
// ============================================================================
// Module: Implementation Phase Runner
// Description: Bridges the Decision Store to the Implementation Orchestrator.
// Purpose: spec.md §4.5 phase runner shape applied to the implementation
// phase, driving spec.md §4.6 to completion and registering its artifact.
// Dependencies: substrate-core, substrate-contract, substrate-config,
// substrate-store
// ============================================================================

use substrate_config::SubstrateConfig;
use substrate_contract::phase::ARTIFACT_IMPLEMENTATION_COMPLETE;
use substrate_contract::phase::PHASE_IMPLEMENTATION;
use substrate_contract::phase::PHASE_SOLUTIONING;
use substrate_core::ArtifactType;
use substrate_core::Category;
use substrate_core::PhaseName;
use substrate_core::StoryKey;
use substrate_core::TokenUsageTotals;
use substrate_store::NewArtifact;

use crate::builtin::STORY_DECISION_CATEGORY;
use crate::implementation::ImplementationOrchestrator;
use crate::implementation::ImplementationRunStatus;
use crate::runner::PhaseRunResult;
use crate::runner::PhaseRunner;
use crate::runner::PhaseRunnerReport;
use crate::runner::RunnerContext;

/// Drives the implementation phase: loads the story keys solutioning
/// persisted, runs them through the [`ImplementationOrchestrator`], and
/// registers the `implementation-complete` artifact once every story has
/// reached a terminal phase (succeeded, escalated, or failed unrecoverably
/// all count as terminal; escalations surface through events, not through
/// this gate).
pub struct ImplementationRunner {
    config: SubstrateConfig,
    story_filter: Option<Vec<StoryKey>>,
}

impl ImplementationRunner {
    /// Creates a runner driven by `config` (concurrency, review-cycle cap,
    /// and token ceiling for each story's sub-agent dispatches), with no
    /// restriction on which stories solutioning persisted are run.
    #[must_use]
    pub fn new(config: SubstrateConfig) -> Self {
        Self { config, story_filter: None }
    }

    /// Same as [`ImplementationRunner::new`], but restricts the phase to
    /// `story_filter`'s keys (`auto run --stories`). `None` runs every
    /// story solutioning persisted, matching [`ImplementationRunner::new`].
    #[must_use]
    pub fn with_story_filter(config: SubstrateConfig, story_filter: Option<Vec<StoryKey>>) -> Self {
        Self { config, story_filter }
    }
}

#[async_trait::async_trait]
impl PhaseRunner for ImplementationRunner {
    fn phase(&self) -> PhaseName {
        PhaseName::new(PHASE_IMPLEMENTATION)
    }

    async fn run(&self, ctx: &RunnerContext) -> PhaseRunnerReport {
        let decisions = match ctx.store.get_decisions_by_phase_for_run(ctx.run_id, &PhaseName::new(PHASE_SOLUTIONING)) {
            Ok(decisions) => decisions,
            Err(error) => return PhaseRunnerReport::missing_input(format!("store-error: {error}")),
        };

        let mut story_keys: Vec<StoryKey> = decisions
            .into_iter()
            .filter(|decision| decision.category == Category::new(STORY_DECISION_CATEGORY))
            .map(|decision| StoryKey::new(decision.key.as_str()))
            .collect();

        story_keys = apply_story_filter(story_keys, self.story_filter.as_deref());

        if story_keys.is_empty() {
            return PhaseRunnerReport::missing_input("missing_stories");
        }

        let orchestrator = ImplementationOrchestrator::new(
            std::sync::Arc::clone(&ctx.dispatcher),
            std::sync::Arc::clone(&ctx.event_bus),
            ctx.run_id,
            self.config.clone(),
        );
        let outcome = orchestrator.run(story_keys).await;

        if outcome.status != ImplementationRunStatus::Complete {
            return PhaseRunnerReport::missing_input("implementation-run-not-complete");
        }
        if !outcome.failed.is_empty() {
            return PhaseRunnerReport {
                result: PhaseRunResult::Failed,
                token_usage: TokenUsageTotals::default(),
                error: Some(format!("{} stories failed unrecoverably", outcome.failed.len())),
            };
        }

        let summary = serde_json::json!({
            "succeeded": outcome.succeeded,
            "escalated": outcome.escalated,
        })
        .to_string();

        if let Err(error) = ctx.store.register_artifact(NewArtifact {
            pipeline_run_id: ctx.run_id,
            phase: self.phase(),
            artifact_type: ArtifactType::new(ARTIFACT_IMPLEMENTATION_COMPLETE),
            path: "implementation-complete.json".into(),
            content: Some(summary.clone().into_bytes()),
            summary: Some(summary),
        }) {
            return PhaseRunnerReport {
                result: PhaseRunResult::Failed,
                token_usage: TokenUsageTotals::default(),
                error: Some(error.to_string()),
            };
        }

        PhaseRunnerReport::success(TokenUsageTotals::default())
    }
}

/// Restricts `story_keys` to `filter`'s keys (`auto run --stories`), in the
/// order solutioning persisted them. `None` returns `story_keys` unchanged.
fn apply_story_filter(story_keys: Vec<StoryKey>, filter: Option<&[StoryKey]>) -> Vec<StoryKey> {
    match filter {
        Some(allowed) => story_keys.into_iter().filter(|key| allowed.contains(key)).collect(),
        None => story_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implementation_runner_reports_its_phase_name() {
        let runner = ImplementationRunner::new(SubstrateConfig::default());
        assert_eq!(runner.phase(), PhaseName::new(PHASE_IMPLEMENTATION));
    }

    #[test]
    fn with_story_filter_restricts_construction() {
        let runner = ImplementationRunner::with_story_filter(SubstrateConfig::default(), Some(vec![StoryKey::new("10-1")]));
        assert_eq!(runner.phase(), PhaseName::new(PHASE_IMPLEMENTATION));
    }

    #[test]
    fn apply_story_filter_keeps_only_allowed_keys() {
        let keys = vec![StoryKey::new("10-1"), StoryKey::new("10-2"), StoryKey::new("10-4")];
        let filtered = apply_story_filter(keys, Some(&[StoryKey::new("10-1"), StoryKey::new("10-4")]));
        assert_eq!(filtered, vec![StoryKey::new("10-1"), StoryKey::new("10-4")]);
    }

    #[test]
    fn apply_story_filter_none_is_identity() {
        let keys = vec![StoryKey::new("10-1"), StoryKey::new("10-2")];
        let filtered = apply_story_filter(keys.clone(), None);
        assert_eq!(filtered, keys);
    }

    #[test]
    fn apply_story_filter_excluding_everything_yields_empty() {
        let keys = vec![StoryKey::new("10-1")];
        let filtered = apply_story_filter(keys, Some(&[StoryKey::new("99-1")]));
        assert!(filtered.is_empty());
    }
}
