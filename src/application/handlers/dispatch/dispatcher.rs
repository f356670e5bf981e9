//! GuardedDispatcher - The calling convention every action dispatcher uses.
//!
//! For each call:
//! 1. Build and validate the `ActionContext`
//! 2. Run the `pre-calculation` chain; a block returns without running
//!    the action
//! 3. Run the action, classifying errors and panics
//! 4. Record the outcome in action history
//! 5. Emit `action.completed`, then fire the `post-calculation` chain in
//!    the background
//!
//! Callers always get a `DispatchResponse`; no engine fault reaches them
//! as an error.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinSet;

use crate::application::handlers::hooks::HookChainExecutor;
use crate::domain::action::{
    ActionContext, ActionError, ActionOutcome, ActionOutput, ActionParams, ActionTarget,
};
use crate::domain::foundation::{EventEnvelope, HookId};
use crate::domain::hooks::{ChainOptions, HookPhase};
use crate::domain::telemetry::ActionHistoryRecord;
use crate::ports::{ActionExecutor, ActionHistoryStore, EventPublisher};

pub const PRE_CALCULATION_EVENT: &str = "pre-calculation";
pub const POST_CALCULATION_EVENT: &str = "post-calculation";
pub const ACTION_COMPLETED_EVENT: &str = "action.completed";
pub const ACTION_BLOCKED_EVENT: &str = "action.blocked";

/// Error class recorded when an action panics.
pub const PANIC_ERROR_CLASS: &str = "panic";
/// Error class returned when the request itself is invalid.
pub const VALIDATION_ERROR_CLASS: &str = "validation";

/// One call into a dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub action: String,
    #[serde(default)]
    pub params: ActionParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ActionTarget>,
    /// Assigned from the dispatcher's running count when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_number: Option<u32>,
    #[serde(default)]
    pub context_depth_percent: f64,
}

impl DispatchRequest {
    pub fn new(action: impl Into<String>, params: ActionParams) -> Self {
        Self {
            action: action.into(),
            params,
            operation: None,
            target: None,
            call_number: None,
            context_depth_percent: 0.0,
        }
    }

    pub fn with_call_number(mut self, call_number: u32) -> Self {
        self.call_number = Some(call_number);
        self
    }

    pub fn with_context_depth(mut self, percent: f64) -> Self {
        self.context_depth_percent = percent;
        self
    }

    pub fn with_target(mut self, target: ActionTarget) -> Self {
        self.target = Some(target);
        self
    }
}

/// What the caller of a dispatcher receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchResponse {
    Blocked {
        blocked: bool,
        blocker: Option<HookId>,
        reason: Option<String>,
        action: String,
    },
    Completed {
        success: bool,
        result: JsonValue,
    },
    Failed {
        error: String,
        error_class: String,
    },
}

impl DispatchResponse {
    pub fn is_blocked(&self) -> bool {
        matches!(self, DispatchResponse::Blocked { .. })
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }

    fn failed(error: impl ToString, error_class: impl Into<String>) -> Self {
        DispatchResponse::Failed {
            error: error.to_string(),
            error_class: error_class.into(),
        }
    }
}

/// Background post-hook chains, shared by every dispatcher of an engine.
///
/// Their results never reach the caller; failures are only logged.
#[derive(Default)]
pub struct PostHookTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl PostHookTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished tasks so the set stays small.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Waits for every task spawned so far.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Post-hook task aborted");
            }
        }
    }
}

/// Fronts one dispatcher's actions with hooks and telemetry.
pub struct GuardedDispatcher {
    name: String,
    executor: Arc<dyn ActionExecutor>,
    chains: Arc<HookChainExecutor>,
    history: Arc<dyn ActionHistoryStore>,
    events: Option<Arc<dyn EventPublisher>>,
    post_hooks: Arc<PostHookTasks>,
    calls: AtomicU32,
}

impl GuardedDispatcher {
    pub fn new(
        name: impl Into<String>,
        executor: Arc<dyn ActionExecutor>,
        chains: Arc<HookChainExecutor>,
        history: Arc<dyn ActionHistoryStore>,
        post_hooks: Arc<PostHookTasks>,
    ) -> Self {
        Self {
            name: name.into(),
            executor,
            chains,
            history,
            events: None,
            post_hooks,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchResponse {
        let ctx = self.build_context(request);
        if let Err(e) = ctx.validate() {
            tracing::warn!(dispatcher = %self.name, error = %e, "Rejected invalid dispatch");
            return DispatchResponse::failed(e, VALIDATION_ERROR_CLASS);
        }

        let pre = self
            .chains
            .execute(
                PRE_CALCULATION_EVENT,
                HookPhase::Before,
                &ctx,
                ChainOptions::default().stop_on_error(),
            )
            .await;

        if pre.blocked {
            tracing::info!(
                dispatcher = %self.name,
                action = %ctx.action(),
                blocker = ?pre.blocked_by,
                "Action blocked"
            );
            self.emit(
                ACTION_BLOCKED_EVENT,
                &ctx,
                json!({
                    "blocker": pre.blocked_by,
                    "reason": pre.block_reason,
                    "call_number": ctx.metadata.call_number,
                }),
            )
            .await;
            return DispatchResponse::Blocked {
                blocked: true,
                blocker: pre.blocked_by,
                reason: pre.block_reason,
                action: ctx.action().to_string(),
            };
        }
        if let Some(error) = &pre.error {
            tracing::warn!(
                dispatcher = %self.name,
                action = %ctx.action(),
                error = %error,
                "Pre-calculation chain halted on error"
            );
        }

        let started = Instant::now();
        let call = AssertUnwindSafe(self.executor.execute(ctx.action(), ctx.params())).catch_unwind();
        let executed: Result<ActionOutput, ActionError> = match call.await {
            Ok(result) => result,
            Err(_) => Err(ActionError::new(PANIC_ERROR_CLASS, "action panicked")),
        };
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let (outcome, error_class, response) = match executed {
            Ok(output) => (
                output.outcome(),
                None,
                DispatchResponse::Completed {
                    success: output.success,
                    result: output.value,
                },
            ),
            Err(e) => {
                tracing::warn!(
                    dispatcher = %self.name,
                    action = %ctx.action(),
                    error_class = %e.class,
                    error = %e.message,
                    "Action failed"
                );
                (
                    ActionOutcome::Error,
                    Some(e.class.clone()),
                    DispatchResponse::failed(&e.message, e.class),
                )
            }
        };

        self.history.record(ActionHistoryRecord::from_context(
            &ctx,
            outcome,
            duration_ms,
            error_class,
        ));
        self.emit(
            ACTION_COMPLETED_EVENT,
            &ctx,
            json!({
                "outcome": outcome,
                "duration_ms": duration_ms,
                "call_number": ctx.metadata.call_number,
            }),
        )
        .await;

        self.fire_post_hooks(ctx);
        response
    }

    fn build_context(&self, request: DispatchRequest) -> ActionContext {
        let counted = self.calls.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        let mut ctx = ActionContext::new(self.name.clone(), request.action, request.params)
            .with_call_number(request.call_number.unwrap_or(counted))
            .with_context_depth(request.context_depth_percent);
        if let Some(operation) = request.operation {
            ctx.operation = operation;
        }
        if let Some(target) = request.target {
            ctx = ctx.with_target(target);
        }
        ctx
    }

    fn fire_post_hooks(&self, ctx: ActionContext) {
        let chains = Arc::clone(&self.chains);
        self.post_hooks.spawn(async move {
            let post = chains
                .execute(POST_CALCULATION_EVENT, HookPhase::After, &ctx, ChainOptions::default())
                .await;
            if post.failure_count() > 0 || post.timed_out {
                tracing::warn!(
                    dispatcher = %ctx.dispatcher(),
                    action = %ctx.action(),
                    failures = post.failure_count(),
                    timed_out = post.timed_out,
                    "Post-calculation hooks failed"
                );
            }
        });
    }

    async fn emit(&self, event_type: &str, ctx: &ActionContext, payload: JsonValue) {
        let Some(events) = &self.events else {
            return;
        };
        let envelope = EventEnvelope::new(event_type, self.name.clone(), payload)
            .with_action(ctx.dispatcher(), ctx.action());
        if let Err(e) = events.publish(envelope).await {
            tracing::warn!(event = event_type, error = %e, "Failed to emit dispatcher event");
        }
    }
}
