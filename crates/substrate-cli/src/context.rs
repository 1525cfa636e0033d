// crates/substrate-cli/src/context.rs
// ============================================================================
// Module: CLI Application Context
// Description: Wires config, store, event bus, dispatcher, and the phase
// orchestrator together for every `auto` subcommand.
// Purpose: One construction path so `run`, `resume`, `status`, and `amend`
// all see the same store/config/dispatcher wiring.
// Dependencies: substrate-config, substrate-store, substrate-events,
// substrate-dispatcher, substrate-orchestrator
// ============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use substrate_config::SubstrateConfig;
use substrate_core::PhaseName;
use substrate_core::StoryKey;
use substrate_dispatcher::AgentProcess;
use substrate_dispatcher::Dispatcher;
use substrate_dispatcher::TokioAgentProcess;
use substrate_events::EventBus;
use substrate_orchestrator::PhaseOrchestrator;
use substrate_orchestrator::PhaseRunner;
use substrate_orchestrator::register_builtin_phases;
use substrate_store::DecisionStore;
use substrate_store::SqliteDecisionStore;
use substrate_store::SqliteStoreConfig;

use crate::error::CliError;

/// Default external agent binary invoked by the dispatcher when a request
/// does not name one explicitly.
const DEFAULT_AGENT_BINARY: &str = "claude";

/// Shared dependencies assembled once per CLI invocation.
///
/// The dispatcher is built lazily via [`AppContext::dispatcher_for`] once a
/// run id is known: `run`, `resume`, and `amend` all discover or create
/// their run id after bootstrapping, so it cannot be a constructor argument.
pub struct AppContext {
    pub config: SubstrateConfig,
    pub store: Arc<dyn DecisionStore>,
    pub event_bus: Arc<EventBus>,
}

impl AppContext {
    /// Loads config from `config_path` (or defaults), opens the Decision
    /// Store at `config.store_path`, and builds an event bus.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] when config loading or validation, or opening
    /// the store, fails.
    pub fn bootstrap(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = SubstrateConfig::load(config_path)?;
        config.validate()?;

        let store_config = SqliteStoreConfig::new(config.store_path.clone().into());
        let store: Arc<dyn DecisionStore> = Arc::new(SqliteDecisionStore::open(store_config)?);

        let event_bus = Arc::new(EventBus::new());

        Ok(Self { config, store, event_bus })
    }

    /// Builds a dispatcher bound to `run_id`, invoking [`DEFAULT_AGENT_BINARY`]
    /// for every sub-agent dispatch unless a request names a distinct one.
    #[must_use]
    pub fn dispatcher_for(&self, run_id: substrate_core::RunId) -> Arc<Dispatcher> {
        let agent_process: Arc<dyn AgentProcess> = Arc::new(TokioAgentProcess::new(DEFAULT_AGENT_BINARY, Vec::new()));
        Arc::new(Dispatcher::new(agent_process, Arc::clone(&self.event_bus), run_id))
    }

    /// Builds a fresh `PhaseOrchestrator` with the four built-in phases
    /// registered, over this context's store.
    #[must_use]
    pub fn phase_orchestrator(&self) -> PhaseOrchestrator {
        let mut orchestrator = PhaseOrchestrator::new(Arc::clone(&self.store));
        register_builtin_phases(&mut orchestrator);
        orchestrator
    }

    /// Builds the phase-name-to-runner registry driving `auto run`/`auto
    /// resume`/`auto amend`. Each runner's token ceiling (or full config,
    /// for implementation) comes from this context's `config`.
    #[must_use]
    pub fn runner_registry(&self) -> HashMap<PhaseName, Box<dyn PhaseRunner>> {
        self.runner_registry_with_concurrency(None)
    }

    /// Same as [`AppContext::runner_registry`], but overrides
    /// `max_concurrency` for the implementation phase's conflict-group
    /// scheduling when `concurrency_override` is given (`--concurrency`).
    #[must_use]
    pub fn runner_registry_with_concurrency(&self, concurrency_override: Option<u32>) -> HashMap<PhaseName, Box<dyn PhaseRunner>> {
        self.runner_registry_with_options(concurrency_override, None)
    }

    /// Same as [`AppContext::runner_registry_with_concurrency`], but also
    /// restricts the implementation phase to `story_filter`'s keys
    /// (`auto run --stories`) when given.
    #[must_use]
    pub fn runner_registry_with_options(&self, concurrency_override: Option<u32>, story_filter: Option<Vec<StoryKey>>) -> HashMap<PhaseName, Box<dyn PhaseRunner>> {
        let ceiling = self.config.token_ceiling;
        let mut registry: HashMap<PhaseName, Box<dyn PhaseRunner>> = HashMap::new();
        let analysis = substrate_orchestrator::AnalysisRunner::new(ceiling);
        registry.insert(analysis.phase(), Box::new(analysis));
        let planning = substrate_orchestrator::PlanningRunner::new(ceiling);
        registry.insert(planning.phase(), Box::new(planning));
        let solutioning = substrate_orchestrator::SolutioningRunner::new(ceiling);
        registry.insert(solutioning.phase(), Box::new(solutioning));

        let mut implementation_config = self.config.clone();
        if let Some(concurrency) = concurrency_override {
            implementation_config.max_concurrency = concurrency;
        }
        let implementation = substrate_orchestrator::ImplementationRunner::with_story_filter(implementation_config, story_filter);
        registry.insert(implementation.phase(), Box::new(implementation));
        registry
    }
}
