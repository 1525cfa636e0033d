// crates/substrate-orchestrator/src/gate.rs
// ============================================================================
// Module: Gate
// Description: Named precondition/postcondition checks attached to a phase.
// Purpose: Implement spec.md §4.4's non-short-circuiting gate evaluation.
// Dependencies: substrate-core, substrate-store
// ============================================================================

//! ## Overview
//! A [`Gate`] never mutates state (per the GLOSSARY: "does not mutate
//! state"). [`evaluate_gates`] runs every gate in the slice regardless of
//! earlier failures, mirroring `decision-gate-core`'s `EvidenceProvider`
//! trait seam: a fallible check reduces to a named result, not a short-circuit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use substrate_core::GateResult;
use substrate_core::RunId;
use substrate_store::DecisionStore;

// ============================================================================
// SECTION: Gate
// ============================================================================

type GateCheck = Box<dyn Fn(&dyn DecisionStore, RunId) -> Result<bool, String> + Send + Sync>;

/// A named precondition or postcondition attached to a phase.
pub struct Gate {
    name: String,
    check: GateCheck,
    error_message: String,
}

impl Gate {
    /// Creates a new gate. `check` returns `Ok(true)` when the gate passes,
    /// `Ok(false)` when it fails without an exceptional condition, or `Err`
    /// when the check itself raised (e.g. a store I/O failure).
    pub fn new<F>(name: impl Into<String>, check: F, error_message: impl Into<String>) -> Self
    where
        F: Fn(&dyn DecisionStore, RunId) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
            error_message: error_message.into(),
        }
    }

    /// Returns the gate's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates this gate, never panicking on a failing or erroring check.
    #[must_use]
    pub fn evaluate(&self, store: &dyn DecisionStore, run_id: RunId) -> GateResult {
        match (self.check)(store, run_id) {
            Ok(true) => GateResult {
                gate: self.name.clone(),
                passed: true,
                error: None,
            },
            Ok(false) => GateResult {
                gate: self.name.clone(),
                passed: false,
                error: Some(self.error_message.clone()),
            },
            Err(raised) => GateResult {
                gate: self.name.clone(),
                passed: false,
                error: Some(raised),
            },
        }
    }
}

/// Evaluates every gate in `gates` against `(store, run_id)`, never
/// short-circuiting on the first failure.
#[must_use]
pub fn evaluate_gates(gates: &[Gate], store: &dyn DecisionStore, run_id: RunId) -> Vec<GateResult> {
    gates.iter().map(|gate| gate.evaluate(store, run_id)).collect()
}

/// Builds a gate requiring an artifact of `artifact_type` to exist for
/// `(run, phase)`, the basis of every built-in exit/entry gate (spec.md §4.4).
#[must_use]
pub fn artifact_exists_gate(
    gate_name: impl Into<String>,
    phase: substrate_core::PhaseName,
    artifact_type: substrate_core::ArtifactType,
) -> Gate {
    let error_message = format!("missing required artifact '{}' for phase '{}'", artifact_type.as_str(), phase.as_str());
    Gate::new(
        gate_name,
        move |store, run_id| {
            store
                .get_artifact_by_type_for_run(run_id, &phase, &artifact_type)
                .map(|found| found.is_some())
                .map_err(|err| err.to_string())
        },
        error_message,
    )
}

/// A phase definition: name, description, entry/exit gates, and optional
/// enter/exit callbacks (spec.md §4.4).
pub struct PhaseDefinition {
    /// Phase name.
    pub name: substrate_core::PhaseName,
    /// Human-readable description.
    pub description: String,
    /// Gates evaluated before this phase may begin.
    pub entry_gates: Vec<Gate>,
    /// Gates evaluated before advancing past this phase.
    pub exit_gates: Vec<Gate>,
    /// Called on entering this phase. Errors are logged, never blocking.
    pub on_enter: Option<Box<dyn Fn(&dyn DecisionStore, RunId) -> Result<(), String> + Send + Sync>>,
    /// Called on exiting this phase. Errors are logged, never blocking.
    pub on_exit: Option<Box<dyn Fn(&dyn DecisionStore, RunId) -> Result<(), String> + Send + Sync>>,
}

impl PhaseDefinition {
    /// Creates a phase with no gates and no callbacks.
    #[must_use]
    pub fn new(name: substrate_core::PhaseName, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            entry_gates: Vec::new(),
            exit_gates: Vec::new(),
            on_enter: None,
            on_exit: None,
        }
    }

    /// Adds an entry gate, builder-style.
    #[must_use]
    pub fn with_entry_gate(mut self, gate: Gate) -> Self {
        self.entry_gates.push(gate);
        self
    }

    /// Adds an exit gate, builder-style.
    #[must_use]
    pub fn with_exit_gate(mut self, gate: Gate) -> Self {
        self.exit_gates.push(gate);
        self
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
    use std::num::NonZeroU64;
    use substrate_store::SqliteDecisionStore;

    fn test_store() -> SqliteDecisionStore {
        SqliteDecisionStore::open(substrate_store::SqliteStoreConfig::new(":memory:".into()))
            .expect("open in-memory store")
    }

    #[test]
    fn evaluate_gates_runs_every_gate_even_after_a_failure() {
        let gates = vec![
            Gate::new("always-fails", |_store, _run_id| Ok(false), "nope"),
            Gate::new("always-passes", |_store, _run_id| Ok(true), "unreachable"),
        ];
        let store = test_store();
        let run_id = RunId::new(NonZeroU64::new(1).expect("nonzero"));
        let results = evaluate_gates(&gates, &store, run_id);
        assert_eq!(results.len(), 2);
        assert!(!results[0].passed);
        assert!(results[1].passed);
    }

    #[test]
    fn artifact_exists_gate_fails_when_artifact_absent() {
        let store = test_store();
        let run = store
            .create_pipeline_run(substrate_store::NewPipelineRun {
                methodology: "bmad".into(),
                concept: "a concept".into(),
                start_phase: substrate_core::PhaseName::new("analysis"),
                parent_run_id: None,
            })
            .expect("create run");
        let gate = artifact_exists_gate(
            "has-product-brief",
            substrate_core::PhaseName::new("analysis"),
            substrate_core::ArtifactType::new("product-brief"),
        );
        let result = gate.evaluate(&store, run.id);
        assert!(!result.passed);
    }
}
