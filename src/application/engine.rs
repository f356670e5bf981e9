//! Engine - Composition root and lifecycle of the interception engine.
//!
//! ```text
//! Engine::new(config) -> start() -> shutdown()
//! ```
//!
//! `new` builds every store and service from the config and registers the
//! built-in risk hook. `start` spawns the extraction timer. `shutdown`
//! stops the timer and waits for in-flight post-hook chains.
//!
//! Dispatchers get their collaborators from the engine instance they are
//! created from; nothing is global.

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::adapters::{
    ArcSwapPatternStore, InMemoryActionHistory, InMemoryEventBus, InMemoryExecutionHistory,
    InMemoryHookRegistry,
};
use crate::application::handlers::admin::AdminService;
use crate::application::handlers::coverage::CoverageAnalyzer;
use crate::application::handlers::dispatch::{GuardedDispatcher, PostHookTasks};
use crate::application::handlers::hooks::HookChainExecutor;
use crate::application::handlers::patterns::{PatternExtractor, SharedPfpConfig};
use crate::application::handlers::risk::{risk_hook_id, RiskAssessmentHook, RiskAssessor};
use crate::config::{EngineConfig, ValidationError};
use crate::domain::coverage::CatalogError;
use crate::domain::foundation::ErrorCode;
use crate::domain::hooks::{HookDefinition, HookPhase, HookRegistryError};
use crate::ports::{
    ActionExecutor, ActionHistoryStore, EventBus, ExecutionHistoryStore, HookRegistry,
    PatternStore,
};

/// Coverage domain of the built-in risk hook.
pub const RISK_HOOK_DOMAIN: &str = "calculation";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Failed to load event catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Registry(#[from] HookRegistryError),

    #[error("Engine already started")]
    AlreadyStarted,

    #[error("Engine has been shut down")]
    ShutDown,
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Config(e) => e.code(),
            EngineError::Catalog(e) => e.code(),
            EngineError::Registry(e) => e.code(),
            EngineError::AlreadyStarted | EngineError::ShutDown => ErrorCode::InternalError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Running,
    Stopped,
}

struct Lifecycle {
    state: EngineState,
    shutdown_tx: Option<watch::Sender<bool>>,
    extractor_task: Option<JoinHandle<()>>,
}

pub struct Engine {
    config: EngineConfig,
    registry: Arc<InMemoryHookRegistry>,
    bus: Arc<InMemoryEventBus>,
    actions: Arc<InMemoryActionHistory>,
    executions: Arc<InMemoryExecutionHistory>,
    patterns: Arc<ArcSwapPatternStore>,
    chains: Arc<HookChainExecutor>,
    extractor: Arc<PatternExtractor>,
    assessor: RiskAssessor,
    coverage: Arc<CoverageAnalyzer>,
    admin: Arc<AdminService>,
    post_hooks: Arc<PostHookTasks>,
    lifecycle: Mutex<Lifecycle>,
}

impl Engine {
    /// Builds an engine from a config.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the config is invalid or the configured
    /// event catalog cannot be loaded.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let catalog = config.coverage.load_catalog()?;

        let registry = Arc::new(InMemoryHookRegistry::with_temporary_disable_secs(
            config.chain.temporary_disable_secs,
        ));
        let bus = Arc::new(InMemoryEventBus::new(config.events.history_per_event));
        let actions = Arc::new(InMemoryActionHistory::new(config.history.action_capacity));
        let executions = Arc::new(InMemoryExecutionHistory::new(config.history.execution_capacity));
        let patterns = Arc::new(ArcSwapPatternStore::new());
        let pfp: SharedPfpConfig = Arc::new(ArcSwap::from_pointee(config.pfp.clone()));

        let chains = Arc::new(
            HookChainExecutor::new(registry.clone(), executions.clone(), &config.chain)
                .with_events(bus.clone()),
        );
        let extractor = Arc::new(PatternExtractor::new(
            actions.clone(),
            patterns.clone(),
            pfp.clone(),
        ));
        let assessor = RiskAssessor::new(patterns.clone(), pfp.clone());
        let coverage = Arc::new(CoverageAnalyzer::new(
            registry.clone(),
            bus.clone(),
            catalog,
            config.coverage.gap_thresholds(),
        ));
        let admin = Arc::new(AdminService::new(
            registry.clone(),
            chains.clone(),
            bus.clone(),
            executions.clone(),
            actions.clone(),
            extractor.clone(),
            assessor.clone(),
            coverage.clone(),
            pfp,
        ));

        if config.pfp.risk.hook_enabled {
            registry.register(
                HookDefinition::new(
                    risk_hook_id(),
                    config.pfp.risk.hook_event.clone(),
                    HookPhase::Before,
                    Arc::new(RiskAssessmentHook::new(assessor.clone())),
                )
                .with_priority(config.pfp.risk.hook_priority)
                .in_domain(RISK_HOOK_DOMAIN)
                .with_description("Blocks calls the learned failure patterns predict will fail"),
            )?;
        }

        tracing::info!(
            catalog_pairs = coverage.catalog().len(),
            hooks = registry.len(),
            "Engine created"
        );

        Ok(Self {
            config,
            registry,
            bus,
            actions,
            executions,
            patterns,
            chains,
            extractor,
            assessor,
            coverage,
            admin,
            post_hooks: Arc::new(PostHookTasks::new()),
            lifecycle: Mutex::new(Lifecycle {
                state: EngineState::Created,
                shutdown_tx: None,
                extractor_task: None,
            }),
        })
    }

    /// Spawns background work. Must be called inside a Tokio runtime.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        match lifecycle.state {
            EngineState::Running => return Err(EngineError::AlreadyStarted),
            EngineState::Stopped => return Err(EngineError::ShutDown),
            EngineState::Created => {}
        }

        let (tx, rx) = watch::channel(false);
        let extractor = Arc::clone(&self.extractor);
        lifecycle.extractor_task = Some(tokio::spawn(async move { extractor.run(rx).await }));
        lifecycle.shutdown_tx = Some(tx);
        lifecycle.state = EngineState::Running;

        tracing::info!(
            extraction_interval_secs = self.config.pfp.extraction_interval_secs,
            "Engine started"
        );
        Ok(())
    }

    /// Stops the extraction timer and drains post-hook chains.
    ///
    /// Safe to call more than once and on an engine that never started.
    pub async fn shutdown(&self) {
        let (tx, task) = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            if lifecycle.state == EngineState::Stopped {
                return;
            }
            lifecycle.state = EngineState::Stopped;
            (lifecycle.shutdown_tx.take(), lifecycle.extractor_task.take())
        };

        if let Some(tx) = tx {
            let _ = tx.send(true);
        }
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Pattern extractor task failed");
            }
        }
        self.post_hooks.drain().await;
        tracing::info!("Engine shut down");
    }

    pub fn state(&self) -> EngineState {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// A dispatcher named `name` fronting `executor` with this engine's
    /// hooks and telemetry.
    pub fn dispatcher(
        &self,
        name: impl Into<String>,
        executor: Arc<dyn ActionExecutor>,
    ) -> GuardedDispatcher {
        GuardedDispatcher::new(
            name,
            executor,
            self.chains.clone(),
            self.actions.clone(),
            self.post_hooks.clone(),
        )
        .with_events(self.bus.clone())
    }

    pub fn register_hook(&self, hook: HookDefinition) -> Result<(), HookRegistryError> {
        self.registry.register(hook)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<dyn HookRegistry> {
        self.registry.clone()
    }

    pub fn events(&self) -> Arc<dyn EventBus> {
        self.bus.clone()
    }

    pub fn action_history(&self) -> Arc<dyn ActionHistoryStore> {
        self.actions.clone()
    }

    pub fn execution_history(&self) -> Arc<dyn ExecutionHistoryStore> {
        self.executions.clone()
    }

    pub fn pattern_store(&self) -> Arc<dyn PatternStore> {
        self.patterns.clone()
    }

    pub fn chains(&self) -> &Arc<HookChainExecutor> {
        &self.chains
    }

    pub fn extractor(&self) -> &Arc<PatternExtractor> {
        &self.extractor
    }

    pub fn assessor(&self) -> &RiskAssessor {
        &self.assessor
    }

    pub fn coverage(&self) -> &Arc<CoverageAnalyzer> {
        &self.coverage
    }

    pub fn admin(&self) -> &Arc<AdminService> {
        &self.admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::risk::RISK_HOOK_ID;
    use crate::domain::foundation::HookId;

    #[test]
    fn new_registers_risk_hook() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let hook = engine.registry().get(&HookId::new(RISK_HOOK_ID).unwrap()).unwrap();

        assert_eq!(hook.event, "pre-calculation");
        assert_eq!(hook.priority, -1000);
        assert_eq!(hook.domain, RISK_HOOK_DOMAIN);
        assert_eq!(engine.state(), EngineState::Created);
    }

    #[test]
    fn risk_hook_can_be_disabled_by_config() {
        let mut config = EngineConfig::default();
        config.pfp.risk.hook_enabled = false;
        let engine = Engine::new(config).unwrap();
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.pfp.decay_factor = 1.5;
        let err = Engine::new(config).err().unwrap();
        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
    }

    #[test]
    fn missing_catalog_file_is_rejected() {
        let mut config = EngineConfig::default();
        config.coverage.catalog_path = Some("/nonexistent/prism-guard/catalog.yaml".into());
        assert!(matches!(Engine::new(config), Err(EngineError::Catalog(_))));
    }

    #[tokio::test]
    async fn lifecycle_runs_start_to_shutdown() {
        let engine = Engine::new(EngineConfig::default()).unwrap();

        engine.start().unwrap();
        assert!(engine.is_running());
        assert!(matches!(engine.start(), Err(EngineError::AlreadyStarted)));

        engine.shutdown().await;
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(matches!(engine.start(), Err(EngineError::ShutDown)));

        // Second shutdown is a no-op.
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_without_start_is_allowed() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.shutdown().await;
        assert_eq!(engine.state(), EngineState::Stopped);
    }
}
