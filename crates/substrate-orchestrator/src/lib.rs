// crates/substrate-orchestrator/src/lib.rs
// ============================================================================
// Module: Orchestrator Library
// Description: Phase Orchestrator, phase runners, Conflict Detector,
// Implementation Orchestrator, Amendment Engine (spec.md §4.4-4.8).
// Purpose: Drives a pipeline run's concept through analysis, planning,
// solutioning, and implementation, dispatching sub-agent work and
// persisting results through `substrate-store`.
// Dependencies: substrate-core, substrate-contract, substrate-config,
// substrate-events, substrate-dispatcher, substrate-store
// ============================================================================

//! ## Overview
//! This crate contains no `SQLite` or process-spawning code of its own; it
//! composes `substrate-store::DecisionStore` and `substrate-dispatcher::Dispatcher`
//! behind the phase/runner/conflict/implementation/amendment seams, the same
//! layering the teacher workspace uses to keep `decision-gate-core` free of
//! I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod amendment;
mod builtin;
mod conflict;
mod gate;
mod implementation;
mod phase_orchestrator;
mod phases;
mod readiness;
mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use amendment::AmendmentContextHandler;
pub use amendment::AmendmentError;
pub use amendment::DeltaDocument;
pub use amendment::ImpactConfidence;
pub use amendment::ImpactFinding;
pub use amendment::create_amendment_run;
pub use amendment::format_delta_document;
pub use amendment::generate_delta_document;
pub use amendment::validate_delta_document;
pub use amendment::write_back_supersessions;
pub use builtin::STORY_DECISION_CATEGORY;
pub use builtin::register_builtin_phases;
pub use conflict::detect_conflict_groups;
pub use gate::Gate;
pub use gate::PhaseDefinition;
pub use gate::artifact_exists_gate;
pub use gate::evaluate_gates;
pub use implementation::ImplementationOrchestrator;
pub use implementation::ImplementationOutcome;
pub use implementation::ImplementationRunStatus;
pub use implementation::StoryOutcome;
pub use phase_orchestrator::AdvanceOutcome;
pub use phase_orchestrator::PhaseOrchestrator;
pub use phase_orchestrator::PhaseOrchestratorError;
pub use phase_orchestrator::RunStatusView;
pub use phases::AnalysisRunner;
pub use phases::ImplementationRunner;
pub use phases::PlanningRunner;
pub use phases::SolutioningRunner;
pub use runner::PhaseRunner;
pub use runner::PhaseRunnerReport;
pub use runner::RunnerContext;
