//! Core hook types and traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::HookError;
use crate::domain::action::ActionContext;
use crate::domain::foundation::{ChainId, HookId, Timestamp, ValidationError};

/// When a hook runs relative to the guarded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    Before,
    After,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookPhase::Before => "before",
            HookPhase::After => "after",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for HookPhase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(HookPhase::Before),
            "after" => Ok(HookPhase::After),
            other => Err(ValidationError::invalid_format(
                "phase",
                format!("expected 'before' or 'after', got '{}'", other),
            )),
        }
    }
}

/// Cooperative cancellation signal handed to hook handlers.
///
/// The executor flips it when the chain deadline passes. Handlers doing
/// long I/O may poll `is_cancelled()` or await `cancelled()`; the executor
/// abandons them either way.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self(rx)
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested.
    ///
    /// If the sender is dropped without cancelling, this never resolves.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Context passed to hooks for one chain execution.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub chain_id: ChainId,
    pub event: String,
    pub phase: HookPhase,
    pub action: ActionContext,
    pub cancel: CancelSignal,
}

impl HookContext {
    pub fn new(event: impl Into<String>, phase: HookPhase, action: ActionContext) -> Self {
        Self {
            chain_id: ChainId::new(),
            event: event.into(),
            phase,
            action,
            cancel: CancelSignal::never(),
        }
    }
}

/// What a handler returns when it completes.
///
/// `blocked = true` is a control signal that vetoes the guarded action,
/// not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookOutput {
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl HookOutput {
    /// Let the action proceed.
    pub fn allow() -> Self {
        Self::default()
    }

    /// Veto the action.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            blocked: true,
            reason: Some(reason.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

/// Hook behaviour. Implementations may be I/O bound.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn run(&self, ctx: &HookContext) -> Result<HookOutput, HookError>;
}

/// Reverses the side effects of a hook that already ran.
#[async_trait]
pub trait HookCompensator: Send + Sync {
    async fn compensate(&self, ctx: &HookContext) -> Result<(), HookError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> HookHandler for FnHandler<F>
where
    F: Fn(&HookContext) -> Result<HookOutput, HookError> + Send + Sync,
{
    async fn run(&self, ctx: &HookContext) -> Result<HookOutput, HookError> {
        (self.0)(ctx)
    }
}

struct FnCompensator<F>(F);

#[async_trait]
impl<F> HookCompensator for FnCompensator<F>
where
    F: Fn(&HookContext) -> Result<(), HookError> + Send + Sync,
{
    async fn compensate(&self, ctx: &HookContext) -> Result<(), HookError> {
        (self.0)(ctx)
    }
}

/// Wraps a synchronous closure as a hook handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn HookHandler>
where
    F: Fn(&HookContext) -> Result<HookOutput, HookError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Wraps a synchronous closure as a compensator.
pub fn compensator_fn<F>(f: F) -> Arc<dyn HookCompensator>
where
    F: Fn(&HookContext) -> Result<(), HookError> + Send + Sync + 'static,
{
    Arc::new(FnCompensator(f))
}

/// Why and how a hook's enabled flag was last changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// A temporary disable lapses after the registry's TTL.
    pub temporary: bool,
    pub changed_at: Timestamp,
}

/// A registered hook.
///
/// Owned by the registry; executors work on clones that share the handler.
#[derive(Clone)]
pub struct HookDefinition {
    pub id: HookId,
    pub event: String,
    pub phase: HookPhase,
    /// Grouping used by coverage analysis.
    pub domain: String,
    /// Lower runs first.
    pub priority: i32,
    pub enabled: bool,
    /// Hooks sharing a group may run concurrently in parallel chains.
    pub parallel_group: Option<u32>,
    /// Per-hook limit, applied in addition to the chain deadline.
    pub timeout: Option<Duration>,
    pub description: Option<String>,
    pub toggle: Option<ToggleState>,
    handler: Arc<dyn HookHandler>,
    compensator: Option<Arc<dyn HookCompensator>>,
}

impl HookDefinition {
    /// Creates an enabled hook with priority 100 in the `"general"` domain.
    pub fn new(
        id: HookId,
        event: impl Into<String>,
        phase: HookPhase,
        handler: Arc<dyn HookHandler>,
    ) -> Self {
        Self {
            id,
            event: event.into(),
            phase,
            domain: "general".to_string(),
            priority: 100,
            enabled: true,
            parallel_group: None,
            timeout: None,
            description: None,
            toggle: None,
            handler,
            compensator: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_parallel_group(mut self, group: u32) -> Self {
        self.parallel_group = Some(group);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_compensator(mut self, compensator: Arc<dyn HookCompensator>) -> Self {
        self.compensator = Some(compensator);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn handler(&self) -> &Arc<dyn HookHandler> {
        &self.handler
    }

    pub fn compensator(&self) -> Option<&Arc<dyn HookCompensator>> {
        self.compensator.as_ref()
    }

    /// Whether the hook takes part in chains at `now`.
    ///
    /// A temporarily disabled hook counts as enabled again once
    /// `temporary_ttl_secs` have passed since it was disabled.
    pub fn is_active_at(&self, now: &Timestamp, temporary_ttl_secs: u64) -> bool {
        if self.enabled {
            return true;
        }
        match &self.toggle {
            Some(state) if state.temporary => {
                !state.changed_at.plus_secs(temporary_ttl_secs).is_after(now)
            }
            _ => false,
        }
    }

    /// Serializable view of the hook.
    pub fn summary(&self) -> HookSummary {
        HookSummary {
            id: self.id.clone(),
            event: self.event.clone(),
            phase: self.phase,
            domain: self.domain.clone(),
            priority: self.priority,
            enabled: self.enabled,
            parallel_group: self.parallel_group,
            timeout_ms: self.timeout.map(|t| t.as_millis() as u64),
            has_compensator: self.compensator.is_some(),
            description: self.description.clone(),
            toggle: self.toggle.clone(),
        }
    }
}

impl fmt::Debug for HookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("phase", &self.phase)
            .field("domain", &self.domain)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .field("parallel_group", &self.parallel_group)
            .field("has_compensator", &self.compensator.is_some())
            .finish()
    }
}

/// Serializable description of a registered hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSummary {
    pub id: HookId,
    pub event: String,
    pub phase: HookPhase,
    pub domain: String,
    pub priority: i32,
    pub enabled: bool,
    pub parallel_group: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub has_compensator: bool,
    pub description: Option<String>,
    pub toggle: Option<ToggleState>,
}

/// Filter for listing hooks. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookFilter {
    pub event: Option<String>,
    pub phase: Option<HookPhase>,
    pub domain: Option<String>,
    pub enabled: Option<bool>,
}

impl HookFilter {
    pub fn for_event(event: impl Into<String>, phase: HookPhase) -> Self {
        Self {
            event: Some(event.into()),
            phase: Some(phase),
            ..Default::default()
        }
    }

    pub fn in_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, hook: &HookDefinition) -> bool {
        self.event.as_deref().map_or(true, |e| hook.event == e)
            && self.phase.map_or(true, |p| hook.phase == p)
            && self.domain.as_deref().map_or(true, |d| hook.domain == d)
            && self.enabled.map_or(true, |en| hook.enabled == en)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::ActionParams;

    fn noop() -> Arc<dyn HookHandler> {
        handler_fn(|_| Ok(HookOutput::allow()))
    }

    fn hook(id: &str) -> HookDefinition {
        HookDefinition::new(HookId::new(id).unwrap(), "drill", HookPhase::Before, noop())
    }

    #[test]
    fn phase_parses_case_insensitive() {
        assert_eq!("BEFORE".parse::<HookPhase>().unwrap(), HookPhase::Before);
        assert_eq!("after".parse::<HookPhase>().unwrap(), HookPhase::After);
        assert!("during".parse::<HookPhase>().is_err());
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HookPhase::Before).unwrap(), "\"before\"");
    }

    #[test]
    fn definition_builder_sets_fields() {
        let def = hook("H1")
            .with_priority(1)
            .in_domain("machining")
            .with_parallel_group(2)
            .with_compensator(compensator_fn(|_| Ok(())));

        assert_eq!(def.priority, 1);
        assert_eq!(def.domain, "machining");
        assert_eq!(def.parallel_group, Some(2));
        assert!(def.compensator().is_some());
        assert!(def.summary().has_compensator);
    }

    #[test]
    fn filter_matches_all_fields() {
        let def = hook("H1").in_domain("machining");

        assert!(HookFilter::default().matches(&def));
        assert!(HookFilter::for_event("drill", HookPhase::Before).matches(&def));
        assert!(!HookFilter::for_event("drill", HookPhase::After).matches(&def));
        assert!(!HookFilter::in_domain("auth").matches(&def));
        assert!(!HookFilter {
            enabled: Some(false),
            ..Default::default()
        }
        .matches(&def));
    }

    #[test]
    fn permanently_disabled_hook_is_inactive() {
        let now = Timestamp::now();
        let mut def = hook("H1").disabled();
        def.toggle = Some(ToggleState {
            reason: Some("flaky".to_string()),
            temporary: false,
            changed_at: now.minus_secs(10_000),
        });
        assert!(!def.is_active_at(&now, 60));
    }

    #[test]
    fn temporary_disable_lapses_after_ttl() {
        let now = Timestamp::now();
        let mut def = hook("H1").disabled();
        def.toggle = Some(ToggleState {
            reason: None,
            temporary: true,
            changed_at: now.minus_secs(30),
        });

        assert!(!def.is_active_at(&now, 60));
        assert!(def.is_active_at(&now, 30));
    }

    #[tokio::test]
    async fn closure_handler_runs() {
        let handler = handler_fn(|ctx| {
            if ctx.action.params().get_f64("depth").unwrap_or(0.0) > 100.0 {
                Ok(HookOutput::block("too deep"))
            } else {
                Ok(HookOutput::allow())
            }
        });
        let action = ActionContext::new("d", "drill", ActionParams::new().with("depth", 150));
        let ctx = HookContext::new("drill", HookPhase::Before, action);

        let out = handler.run(&ctx).await.unwrap();
        assert!(out.blocked);
        assert_eq!(out.reason.as_deref(), Some("too deep"));
    }

    #[tokio::test]
    async fn cancel_signal_resolves_when_flipped() {
        let (tx, rx) = watch::channel(false);
        let mut signal = CancelSignal::new(rx);
        assert!(!signal.is_cancelled());

        tx.send(true).unwrap();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }
}
