// crates/substrate-orchestrator/src/phase_orchestrator.rs
// ============================================================================
// Module: Phase Orchestrator
// Description: Ordered phase registry, run lifecycle, gated advancement.
// Purpose: Implements the Phase Orchestrator contract (spec.md §4.4).
// Dependencies: substrate-core, substrate-store
// ============================================================================

//! ## Overview
//! `PhaseOrchestrator` owns the ordered list of [`PhaseDefinition`]s and
//! drives a run through them. Gate evaluation never short-circuits
//! ([`crate::gate::evaluate_gates`]); `onEnter`/`onExit` failures are logged,
//! never blocking, matching spec.md §4.4's exact wording.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use substrate_core::Artifact;
use substrate_core::PhaseHistoryEntry;
use substrate_core::PhaseName;
use substrate_core::PersistenceError;
use substrate_core::RunConfig;
use substrate_core::RunStatus;
use substrate_core::RunId;
use substrate_core::Timestamp;
use substrate_store::DecisionStore;
use substrate_store::NewPipelineRun;
use substrate_store::PipelineRunPatch;

use crate::gate::evaluate_gates;
use crate::gate::PhaseDefinition;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by [`PhaseOrchestrator`] operations.
#[derive(Debug, thiserror::Error)]
pub enum PhaseOrchestratorError {
    /// The store reported a failure.
    #[error(transparent)]
    Store(#[from] PersistenceError),
    /// No phase with this name is registered.
    #[error("unknown phase '{0}'")]
    UnknownPhase(String),
    /// `register_phase` or `start_run` was called with no phases registered.
    #[error("no phases registered")]
    NoPhasesRegistered,
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of [`PhaseOrchestrator::advance_phase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// Whether the run actually moved to the next phase.
    pub advanced: bool,
    /// The phase the run is in after this call (unchanged on failure).
    pub phase: PhaseName,
    /// Gate failures collected from the evaluation that blocked advancement.
    /// Empty when `advanced` is `true`.
    pub gate_failures: Vec<substrate_core::GateResult>,
}

/// Result of [`PhaseOrchestrator::get_run_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatusView {
    /// The run id.
    pub run_id: RunId,
    /// Current phase name.
    pub current_phase: PhaseName,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Phases the run has already completed (entries with a `completed_at`).
    pub completed_phases: Vec<PhaseName>,
    /// Artifacts registered for this run.
    pub artifacts: Vec<Artifact>,
}

// ============================================================================
// SECTION: PhaseOrchestrator
// ============================================================================

/// Drives pipeline runs through an ordered, gated sequence of phases.
pub struct PhaseOrchestrator {
    store: Arc<dyn DecisionStore>,
    phases: Vec<PhaseDefinition>,
}

impl PhaseOrchestrator {
    /// Creates an orchestrator with no phases registered.
    #[must_use]
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self {
            store,
            phases: Vec::new(),
        }
    }

    /// Registers a phase at the end of the ordered phase list.
    pub fn register_phase(&mut self, phase: PhaseDefinition) {
        self.phases.push(phase);
    }

    /// Returns the ordered list of registered phase names.
    #[must_use]
    pub fn phases(&self) -> Vec<&PhaseName> {
        self.phases.iter().map(|p| &p.name).collect()
    }

    fn index_of(&self, name: &PhaseName) -> Option<usize> {
        self.phases.iter().position(|p| &p.name == name)
    }

    fn definition(&self, name: &PhaseName) -> Result<&PhaseDefinition, PhaseOrchestratorError> {
        self.phases
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| PhaseOrchestratorError::UnknownPhase(name.as_str().to_string()))
    }

    /// Starts a new run at `start_phase` (defaulting to the first registered
    /// phase), writing the initial phase-history entry (spec.md §4.4).
    pub fn start_run(
        &self,
        methodology: impl Into<String>,
        concept: impl Into<String>,
        start_phase: Option<PhaseName>,
    ) -> Result<RunId, PhaseOrchestratorError> {
        let first = self
            .phases
            .first()
            .ok_or(PhaseOrchestratorError::NoPhasesRegistered)?;
        let start_phase = start_phase.unwrap_or_else(|| first.name.clone());
        if self.index_of(&start_phase).is_none() {
            return Err(PhaseOrchestratorError::UnknownPhase(start_phase.as_str().to_string()));
        }
        let run = self.store.create_pipeline_run(NewPipelineRun {
            methodology: methodology.into(),
            concept: concept.into(),
            start_phase,
            parent_run_id: None,
        })?;
        Ok(run.id)
    }

    /// Returns the current view of a run's status.
    pub fn get_run_status(&self, run_id: RunId) -> Result<RunStatusView, PhaseOrchestratorError> {
        let run = self.store.get_pipeline_run(run_id)?;
        let artifacts = self.store.get_artifacts_by_run(run_id)?;
        let completed_phases = run
            .config
            .phase_history
            .iter()
            .filter(|entry| entry.completed_at.is_some())
            .map(|entry| entry.phase.clone())
            .collect();
        Ok(RunStatusView {
            run_id,
            current_phase: run.current_phase,
            status: run.status,
            completed_phases,
            artifacts,
        })
    }

    /// Attempts to advance `run_id` past its current phase.
    ///
    /// Evaluates the current phase's exit gates first; any failure returns
    /// `{advanced: false, phase: current, gate_failures}` with no mutation.
    /// Otherwise evaluates the next phase's entry gates; any failure returns
    /// the same shape. Only when both pass does this close the current
    /// phase-history entry, open the next, and update `current_phase`.
    pub fn advance_phase(&self, run_id: RunId) -> Result<AdvanceOutcome, PhaseOrchestratorError> {
        let run = self.store.get_pipeline_run(run_id)?;
        let current = self.definition(&run.current_phase)?;
        let exit_results = evaluate_gates(&current.exit_gates, self.store.as_ref(), run_id);
        let exit_failures: Vec<_> = exit_results.into_iter().filter(|r| !r.passed).collect();
        if !exit_failures.is_empty() {
            return Ok(AdvanceOutcome {
                advanced: false,
                phase: run.current_phase.clone(),
                gate_failures: exit_failures,
            });
        }

        let current_index = self
            .index_of(&run.current_phase)
            .ok_or_else(|| PhaseOrchestratorError::UnknownPhase(run.current_phase.as_str().to_string()))?;
        let Some(next) = self.phases.get(current_index + 1) else {
            // Last phase: its exit gates passed, but there is no next phase
            // to enter. Treat as non-advancing with no failures — callers
            // decide what "pipeline complete" means at the top level.
            return Ok(AdvanceOutcome {
                advanced: false,
                phase: run.current_phase.clone(),
                gate_failures: Vec::new(),
            });
        };

        let entry_results = evaluate_gates(&next.entry_gates, self.store.as_ref(), run_id);
        let entry_failures: Vec<_> = entry_results.into_iter().filter(|r| !r.passed).collect();
        if !entry_failures.is_empty() {
            return Ok(AdvanceOutcome {
                advanced: false,
                phase: run.current_phase.clone(),
                gate_failures: entry_failures,
            });
        }

        if let Some(on_exit) = &current.on_exit {
            if let Err(error) = on_exit(self.store.as_ref(), run_id) {
                tracing::warn!(phase = %run.current_phase, %error, "onExit callback failed, continuing");
            }
        }

        let now = Timestamp::now();
        let mut phase_history = run.config.phase_history.clone();
        if let Some(last) = phase_history.last_mut() {
            last.completed_at = Some(now);
        }
        phase_history.push(PhaseHistoryEntry {
            phase: next.name.clone(),
            started_at: now,
            completed_at: None,
            gate_results: Vec::new(),
        });

        if let Some(on_enter) = &next.on_enter {
            if let Err(error) = on_enter(self.store.as_ref(), run_id) {
                tracing::warn!(phase = %next.name, %error, "onEnter callback failed, continuing");
            }
        }

        self.store.update_pipeline_run(
            run_id,
            PipelineRunPatch {
                current_phase: Some(next.name.clone()),
                status: None,
                config: Some(RunConfig {
                    concept: run.config.concept.clone(),
                    phase_history,
                }),
                token_usage: None,
            },
        )?;

        Ok(AdvanceOutcome {
            advanced: true,
            phase: next.name.clone(),
            gate_failures: Vec::new(),
        })
    }

    /// Resumes a paused or interrupted run: flips status to running, then
    /// greedily advances through already-satisfied exit/entry gates without
    /// invoking phase runners (spec.md §4.4). Stops at the first gate
    /// failure or when there is no further phase to enter.
    pub fn resume_run(&self, run_id: RunId) -> Result<RunStatusView, PhaseOrchestratorError> {
        self.store.update_pipeline_run(
            run_id,
            PipelineRunPatch {
                current_phase: None,
                status: Some(RunStatus::Running),
                config: None,
                token_usage: None,
            },
        )?;
        loop {
            let outcome = self.advance_phase(run_id)?;
            if !outcome.advanced {
                break;
            }
        }
        self.get_run_status(run_id)
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
    use crate::gate::artifact_exists_gate;
    use substrate_core::ArtifactType;
    use substrate_store::NewArtifact;
    use substrate_store::SqliteDecisionStore;
    use substrate_store::SqliteStoreConfig;

    fn orchestrator() -> (PhaseOrchestrator, Arc<SqliteDecisionStore>) {
        let store = Arc::new(SqliteDecisionStore::open(SqliteStoreConfig::new(":memory:".into())).expect("open store"));
        let mut orchestrator = PhaseOrchestrator::new(store.clone());
        orchestrator.register_phase(PhaseDefinition::new(PhaseName::new("analysis"), "analysis").with_exit_gate(
            artifact_exists_gate("has-brief", PhaseName::new("analysis"), ArtifactType::new("product-brief")),
        ));
        orchestrator.register_phase(PhaseDefinition::new(PhaseName::new("planning"), "planning"));
        (orchestrator, store)
    }

    #[test]
    fn advance_phase_blocks_without_mutation_when_exit_gate_fails() {
        let (orchestrator, _store) = orchestrator();
        let run_id = orchestrator
            .start_run("bmad", "a concept", None)
            .expect("start run");
        let outcome = orchestrator.advance_phase(run_id).expect("advance");
        assert!(!outcome.advanced);
        assert_eq!(outcome.phase, PhaseName::new("analysis"));
        assert_eq!(outcome.gate_failures.len(), 1);
    }

    #[test]
    fn advance_phase_succeeds_once_exit_gate_satisfied() {
        let (orchestrator, store) = orchestrator();
        let run_id = orchestrator
            .start_run("bmad", "a concept", None)
            .expect("start run");
        store
            .register_artifact(NewArtifact {
                pipeline_run_id: run_id,
                phase: PhaseName::new("analysis"),
                artifact_type: ArtifactType::new("product-brief"),
                path: "brief.md".into(),
                content: Some(b"brief".to_vec()),
                summary: None,
            })
            .expect("register artifact");
        let outcome = orchestrator.advance_phase(run_id).expect("advance");
        assert!(outcome.advanced);
        assert_eq!(outcome.phase, PhaseName::new("planning"));

        let status = orchestrator.get_run_status(run_id).expect("status");
        assert_eq!(status.completed_phases, vec![PhaseName::new("analysis")]);
    }

    #[test]
    fn get_run_status_reports_unknown_run() {
        let (orchestrator, _store) = orchestrator();
        let bogus = RunId::new(std::num::NonZeroU64::new(999).expect("nonzero"));
        assert!(orchestrator.get_run_status(bogus).is_err());
    }
}
