//! AdminService - Operator surface over a running engine.
//!
//! Transport-agnostic: every operation takes and returns serializable
//! values so a CLI, HTTP or tool layer can sit on top.

use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::errors::AdminError;
use super::queries::{
    ActionHistoryQuery, EventQuery, EventTypeSummary, FailureQuery, PatternListing,
    PatternQuery, PerformanceQuery,
};
use crate::application::handlers::coverage::CoverageAnalyzer;
use crate::application::handlers::hooks::HookChainExecutor;
use crate::application::handlers::patterns::{
    ExtractionSummary, ExtractorStatus, PatternExtractor, SharedPfpConfig,
};
use crate::application::handlers::risk::RiskAssessor;
use crate::config::{PfpConfig, PfpConfigUpdate};
use crate::domain::action::ActionContext;
use crate::domain::coverage::{CoverageGap, CoverageReport, GapSeverity};
use crate::domain::foundation::{EventEnvelope, HookId};
use crate::domain::hooks::{
    ChainOptions, ChainResult, HookFilter, HookPhase, HookResult, HookSummary,
};
use crate::domain::risk::{RiskAssessment, RiskQuery};
use crate::domain::telemetry::{
    summarize_performance, ActionHistoryRecord, ExecutionFilter, ExecutionRecord,
    HookPerformance,
};
use crate::ports::{ActionHistoryStore, EventBus, ExecutionHistoryStore, HookRegistry};

/// Source recorded on events emitted by operators.
pub const ADMIN_EVENT_SOURCE: &str = "admin";

/// Failure records returned when a query sets no limit.
const DEFAULT_FAILURE_LIMIT: usize = 50;

pub struct AdminService {
    registry: Arc<dyn HookRegistry>,
    chains: Arc<HookChainExecutor>,
    events: Arc<dyn EventBus>,
    executions: Arc<dyn ExecutionHistoryStore>,
    actions: Arc<dyn ActionHistoryStore>,
    extractor: Arc<PatternExtractor>,
    assessor: RiskAssessor,
    coverage: Arc<CoverageAnalyzer>,
    pfp: SharedPfpConfig,
    pfp_update: Mutex<()>,
}

impl AdminService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn HookRegistry>,
        chains: Arc<HookChainExecutor>,
        events: Arc<dyn EventBus>,
        executions: Arc<dyn ExecutionHistoryStore>,
        actions: Arc<dyn ActionHistoryStore>,
        extractor: Arc<PatternExtractor>,
        assessor: RiskAssessor,
        coverage: Arc<CoverageAnalyzer>,
        pfp: SharedPfpConfig,
    ) -> Self {
        Self {
            registry,
            chains,
            events,
            executions,
            actions,
            extractor,
            assessor,
            coverage,
            pfp,
            pfp_update: Mutex::new(()),
        }
    }

    // ---- Hooks ----

    pub fn list_hooks(&self, filter: &HookFilter) -> Vec<HookSummary> {
        self.registry
            .list(filter)
            .iter()
            .map(|h| h.summary())
            .collect()
    }

    pub fn get_hook(&self, id: &str) -> Result<HookSummary, AdminError> {
        let id = HookId::new(id)?;
        self.registry
            .get(&id)
            .map(|h| h.summary())
            .ok_or_else(|| crate::domain::hooks::HookRegistryError::NotFound(id).into())
    }

    pub fn toggle_hook(&self, id: &str, enabled: bool) -> Result<HookSummary, AdminError> {
        let id = HookId::new(id)?;
        Ok(self.registry.toggle(&id, enabled)?.summary())
    }

    /// Enables or disables a hook with a recorded reason. A temporary
    /// disable lapses on its own.
    pub fn set_hook_enabled(
        &self,
        id: &str,
        enabled: bool,
        reason: Option<String>,
        temporary: bool,
    ) -> Result<HookSummary, AdminError> {
        let id = HookId::new(id)?;
        let hook = self.registry.set_enabled(&id, enabled, reason, temporary)?;
        Ok(hook.summary())
    }

    /// Runs one hook by id, even if disabled.
    pub async fn fire_hook(
        &self,
        id: &str,
        action: ActionContext,
        timeout: Option<Duration>,
    ) -> Result<HookResult, AdminError> {
        let id = HookId::new(id)?;
        action.validate()?;
        let hook = self
            .registry
            .get(&id)
            .ok_or(crate::domain::hooks::HookRegistryError::NotFound(id))?;
        tracing::info!(hook_id = %hook.id, "Hook fired manually");
        Ok(self.chains.execute_hook(hook, &action, timeout).await)
    }

    pub async fn fire_chain(
        &self,
        event: &str,
        phase: HookPhase,
        action: ActionContext,
        options: ChainOptions,
    ) -> Result<ChainResult, AdminError> {
        action.validate()?;
        tracing::info!(event, %phase, "Chain fired manually");
        Ok(self.chains.execute(event, phase, &action, options).await)
    }

    // ---- Events ----

    pub async fn emit_event(
        &self,
        event_type: &str,
        payload: JsonValue,
    ) -> Result<EventEnvelope, AdminError> {
        if event_type.trim().is_empty() {
            return Err(crate::domain::foundation::ValidationError::empty_field("event_type").into());
        }
        let envelope = EventEnvelope::new(event_type, ADMIN_EVENT_SOURCE, payload);
        self.events.publish(envelope.clone()).await?;
        Ok(envelope)
    }

    pub fn list_event_types(&self) -> Vec<EventTypeSummary> {
        let counts = self.events.fire_counts();
        self.events
            .event_types()
            .into_iter()
            .map(|event_type| EventTypeSummary {
                fire_count: counts.get(&event_type).copied().unwrap_or(0),
                event_type,
            })
            .collect()
    }

    pub fn query_events(&self, query: &EventQuery) -> Vec<EventEnvelope> {
        match &query.event_type {
            Some(event_type) => self.events.recent(event_type, query.limit),
            None => self.events.recent_all(query.limit),
        }
    }

    // ---- Coverage ----

    pub fn coverage(&self, domain: Option<&str>) -> CoverageReport {
        self.coverage.coverage(domain)
    }

    pub fn gaps(&self, domain: Option<&str>, min_severity: GapSeverity) -> Vec<CoverageGap> {
        self.coverage.gaps(domain, min_severity)
    }

    // ---- Hook analytics ----

    pub fn hook_performance(&self, query: &PerformanceQuery) -> Vec<HookPerformance> {
        let filter = ExecutionFilter {
            hook_id: query.hook_id.clone(),
            event: query.event.clone(),
            phase: query.phase,
            failures_only: false,
        };
        let records = self.executions.snapshot();
        summarize_performance(
            records.iter().filter(|r| filter.matches(r)),
            query.sort_by,
            query.limit,
        )
    }

    pub fn failure_records(&self, query: &FailureQuery) -> Vec<ExecutionRecord> {
        let filter = ExecutionFilter {
            hook_id: query.hook_id.clone(),
            event: query.event.clone(),
            phase: None,
            failures_only: true,
        };
        let records = self
            .executions
            .query(&filter, query.limit.unwrap_or(DEFAULT_FAILURE_LIMIT));
        if query.include_details {
            records
        } else {
            records.into_iter().map(ExecutionRecord::without_detail).collect()
        }
    }

    // ---- Patterns and risk ----

    pub async fn force_extract(&self) -> Result<ExtractionSummary, AdminError> {
        tracing::info!("Pattern extraction forced");
        Ok(self.extractor.force_extract().await?)
    }

    pub fn extractor_status(&self) -> ExtractorStatus {
        self.extractor.status()
    }

    pub fn list_patterns(&self, query: &PatternQuery) -> PatternListing {
        let snapshot = self.extractor.store().current();
        let mut patterns: Vec<_> = snapshot
            .patterns()
            .iter()
            .filter(|p| query.pattern_type.map_or(true, |t| p.pattern_type == t))
            .filter(|p| query.dispatcher.as_deref().map_or(true, |d| p.dispatcher == d))
            .filter(|p| query.action.as_deref().map_or(true, |a| p.action == a))
            .cloned()
            .collect();
        patterns.sort_by(|a, b| {
            b.contribution()
                .total_cmp(&a.contribution())
                .then_with(|| a.id.cmp(&b.id))
        });
        let total = patterns.len();
        if let Some(limit) = query.limit {
            patterns.truncate(limit);
        }
        PatternListing {
            generation: snapshot.generation(),
            total,
            patterns,
        }
    }

    pub fn action_history(&self, query: &ActionHistoryQuery) -> Vec<ActionHistoryRecord> {
        self.actions.query(&query.filter, query.limit)
    }

    /// Scores a hypothetical call without running anything.
    pub fn assess_risk(&self, query: &RiskQuery) -> RiskAssessment {
        self.assessor.assess(query)
    }

    // ---- PFP configuration ----

    pub fn pfp_config(&self) -> PfpConfig {
        self.pfp.load().as_ref().clone()
    }

    /// Applies a partial update. The merged config is validated as a whole
    /// and either fully published or fully rejected.
    pub fn update_pfp_config(&self, update: &PfpConfigUpdate) -> Result<PfpConfig, AdminError> {
        let _guard = self.pfp_update.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.pfp.load_full();
        if update.is_empty() {
            return Ok(current.as_ref().clone());
        }

        let next = update.apply(&current).map_err(|e| {
            tracing::warn!(error = %e, "Rejected PFP config update");
            e
        })?;
        self.pfp.store(Arc::new(next.clone()));
        tracing::info!(
            decay_factor = next.decay_factor,
            window_size = next.window_size,
            medium = next.risk.medium,
            high = next.risk.high,
            critical = next.risk.critical,
            "PFP config updated"
        );
        Ok(next)
    }
}
