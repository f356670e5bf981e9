//! HookChainExecutor - Runs the hooks resolved for one (event, phase).
//!
//! Hooks run in priority order. With `parallel` set, hooks sharing a
//! `parallel_group` form one batch that runs concurrently on a bounded
//! pool; the next batch starts only after the whole batch resolves.
//!
//! A parallel group runs at the position of its lowest-priority member.
//! Sequential hooks whose priority falls between two group members run
//! after the whole group.
//!
//! Halting:
//! - a block stops the chain; `results` ends with the blocker
//! - a timeout always stops the chain
//! - an error stops the chain when `stop_on_error` or `enable_rollback`
//!
//! On a halting error with `enable_rollback`, every hook that completed
//! successfully is compensated in reverse execution order. Compensation
//! errors are collected and never stop the remaining compensations.

use futures::future::join_all;
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;

use crate::config::ChainConfig;
use crate::domain::action::ActionContext;
use crate::domain::foundation::{panic_message, ChainId, EventEnvelope, HookId};
use crate::domain::hooks::{
    millis, CancelSignal, ChainOptions, ChainResult, CompensationError, HookContext,
    HookDefinition, HookError, HookPhase, HookResult,
};
use crate::domain::telemetry::ExecutionRecord;
use crate::ports::{EventPublisher, ExecutionHistoryStore, HookRegistry};

/// Source name on events emitted by chains.
pub const CHAIN_EVENT_SOURCE: &str = "chain";

/// Why a chain stopped early.
enum Halt {
    Blocked { hook_id: HookId, reason: Option<String> },
    Failed { hook_id: HookId, error: String },
    TimedOut { hook_id: Option<HookId> },
}

/// Result of one hook call plus the debug detail kept in execution history.
struct Invocation {
    hook: HookDefinition,
    result: HookResult,
    detail: Option<String>,
}

/// Executes hook chains.
pub struct HookChainExecutor {
    registry: Arc<dyn HookRegistry>,
    executions: Arc<dyn ExecutionHistoryStore>,
    events: Option<Arc<dyn EventPublisher>>,
    pool: Arc<Semaphore>,
    default_timeout: Option<Duration>,
    compensation_timeout: Duration,
}

impl HookChainExecutor {
    pub fn new(
        registry: Arc<dyn HookRegistry>,
        executions: Arc<dyn ExecutionHistoryStore>,
        config: &ChainConfig,
    ) -> Self {
        Self {
            registry,
            executions,
            events: None,
            pool: Arc::new(Semaphore::new(config.max_parallel_hooks.max(1))),
            default_timeout: config.default_timeout(),
            compensation_timeout: config.compensation_timeout(),
        }
    }

    /// Emit each chain's event name onto `events` after it runs.
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> &Arc<dyn HookRegistry> {
        &self.registry
    }

    /// Runs every active hook for (event, phase) against `action`.
    ///
    /// Never fails: hook errors, panics and timeouts end up in the
    /// returned `ChainResult`.
    pub async fn execute(
        &self,
        event: &str,
        phase: HookPhase,
        action: &ActionContext,
        options: ChainOptions,
    ) -> ChainResult {
        let started = StdInstant::now();
        let chain_id = ChainId::new();
        let deadline = options
            .timeout
            .or(self.default_timeout)
            .map(|t| Instant::now() + t);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ctx = HookContext {
            chain_id,
            event: event.to_string(),
            phase,
            action: action.clone(),
            cancel: CancelSignal::new(cancel_rx),
        };

        let hooks = self.registry.resolve(event, phase);
        let batches = batch(hooks, options.parallel);

        let mut chain = ChainResult::empty(chain_id, event, phase);
        let mut records = Vec::new();
        let mut completed: Vec<HookDefinition> = Vec::new();
        let mut halt: Option<Halt> = None;

        for members in batches {
            if deadline.map_or(false, |d| Instant::now() >= d) {
                halt = Some(Halt::TimedOut { hook_id: None });
                break;
            }

            let invocations = if members.len() > 1 {
                let pool = &self.pool;
                let ctx = &ctx;
                join_all(members.into_iter().map(|hook| async move {
                    let _permit = pool.acquire().await.ok();
                    invoke(hook, ctx, deadline).await
                }))
                .await
            } else {
                let mut out = Vec::with_capacity(1);
                for hook in members {
                    out.push(invoke(hook, &ctx, deadline).await);
                }
                out
            };

            // Member order decides which terminal signal wins.
            for inv in invocations {
                records.push(ExecutionRecord::from_result(
                    chain_id,
                    event,
                    phase,
                    action.dispatcher(),
                    action.action(),
                    &inv.result,
                    inv.detail.clone(),
                ));

                let succeeded = inv.result.success && !inv.result.blocked;
                if succeeded {
                    completed.push(inv.hook.clone());
                }

                let blocked_already = matches!(halt, Some(Halt::Blocked { .. }));
                if !blocked_already {
                    chain.results.push(inv.result.clone());
                }
                if halt.is_some() {
                    continue;
                }

                if inv.result.blocked {
                    halt = Some(Halt::Blocked {
                        hook_id: inv.result.hook_id.clone(),
                        reason: inv.result.reason.clone(),
                    });
                } else if inv.result.timed_out {
                    halt = Some(Halt::TimedOut {
                        hook_id: Some(inv.result.hook_id.clone()),
                    });
                } else if !inv.result.success {
                    let error = inv.result.error.clone().unwrap_or_default();
                    tracing::warn!(
                        hook_id = %inv.result.hook_id,
                        event,
                        %phase,
                        error = %error,
                        "Hook failed"
                    );
                    if options.stop_on_error || options.enable_rollback {
                        halt = Some(Halt::Failed {
                            hook_id: inv.result.hook_id.clone(),
                            error,
                        });
                    }
                }
            }

            if halt.is_some() {
                break;
            }
        }

        let mut roll_back = false;
        match halt {
            Some(Halt::Blocked { hook_id, reason }) => {
                tracing::debug!(hook_id = %hook_id, event, %phase, "Chain blocked");
                chain.blocked = true;
                chain.blocked_by = Some(hook_id);
                chain.block_reason = reason;
            }
            Some(Halt::Failed { hook_id, error }) => {
                chain.failed_by = Some(hook_id);
                chain.error = Some(error);
                roll_back = options.enable_rollback;
            }
            Some(Halt::TimedOut { hook_id }) => {
                let _ = cancel_tx.send(true);
                tracing::warn!(event, %phase, "Chain timed out");
                chain.timed_out = true;
                chain.failed_by = hook_id;
                chain.error = Some(HookError::Timeout.to_string());
                roll_back = options.enable_rollback;
            }
            None => {}
        }

        if roll_back {
            self.roll_back(&ctx, &completed, &mut chain).await;
        }

        self.executions.record_all(records);
        chain.duration_ms = millis(started.elapsed());

        tracing::debug!(
            chain_id = %chain_id,
            event,
            %phase,
            hooks = chain.results.len(),
            blocked = chain.blocked,
            rolled_back = chain.rolled_back,
            duration_ms = chain.duration_ms,
            "Chain completed"
        );

        self.emit(&chain, action).await;
        chain
    }

    /// Runs one hook outside any chain, recording its execution.
    pub async fn execute_hook(
        &self,
        hook: HookDefinition,
        action: &ActionContext,
        timeout: Option<Duration>,
    ) -> HookResult {
        let event = hook.event.clone();
        let phase = hook.phase;
        let ctx = HookContext::new(event.clone(), phase, action.clone());
        let deadline = timeout.or(self.default_timeout).map(|t| Instant::now() + t);

        let inv = invoke(hook, &ctx, deadline).await;
        self.executions.record(ExecutionRecord::from_result(
            ctx.chain_id,
            &event,
            phase,
            action.dispatcher(),
            action.action(),
            &inv.result,
            inv.detail,
        ));
        inv.result
    }

    async fn roll_back(
        &self,
        ctx: &HookContext,
        completed: &[HookDefinition],
        chain: &mut ChainResult,
    ) {
        // Compensations run even after a timeout, so they get a live context.
        let ctx = HookContext {
            cancel: CancelSignal::never(),
            ..ctx.clone()
        };

        for hook in completed.iter().rev() {
            let Some(compensator) = hook.compensator() else {
                continue;
            };
            chain.rollback_order.push(hook.id.clone());

            let call = AssertUnwindSafe(compensator.compensate(&ctx)).catch_unwind();
            let outcome = match tokio::time::timeout(self.compensation_timeout, call).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(e),
                Ok(Err(panic)) => Err(HookError::Panicked {
                    message: panic_message(panic.as_ref()),
                }),
                Err(_) => Err(HookError::Timeout),
            };

            if let Err(e) = outcome {
                tracing::warn!(hook_id = %hook.id, error = %e, "Compensation failed");
                chain
                    .compensation_errors
                    .push(CompensationError::new(hook.id.clone(), e.to_string()));
            }
        }
        chain.rolled_back = true;
        tracing::info!(
            event = %ctx.event,
            compensated = chain.rollback_order.len(),
            errors = chain.compensation_errors.len(),
            "Chain rolled back"
        );
    }

    async fn emit(&self, chain: &ChainResult, action: &ActionContext) {
        let Some(events) = &self.events else {
            return;
        };
        let envelope = EventEnvelope::new(
            chain.event.clone(),
            CHAIN_EVENT_SOURCE,
            json!({
                "chain_id": chain.chain_id,
                "phase": chain.phase,
                "hooks": chain.results.len(),
                "blocked": chain.blocked,
                "blocked_by": chain.blocked_by,
                "error": chain.error,
                "rolled_back": chain.rolled_back,
            }),
        )
        .with_correlation_id(chain.chain_id.to_string())
        .with_action(action.dispatcher(), action.action());

        if let Err(e) = events.publish(envelope).await {
            tracing::warn!(event = %chain.event, error = %e, "Failed to emit chain event");
        }
    }
}

/// Groups resolved hooks into execution batches.
///
/// Without `parallel` every hook is its own batch. With it, a group's
/// batch sits where its first (lowest priority) member sits.
fn batch(hooks: Vec<HookDefinition>, parallel: bool) -> Vec<Vec<HookDefinition>> {
    let mut batches: Vec<Vec<HookDefinition>> = Vec::new();
    let mut group_slot: Vec<(u32, usize)> = Vec::new();

    for hook in hooks {
        let group = if parallel { hook.parallel_group } else { None };
        match group {
            Some(g) => match group_slot.iter().find(|(id, _)| *id == g) {
                Some(&(_, slot)) => batches[slot].push(hook),
                None => {
                    group_slot.push((g, batches.len()));
                    batches.push(vec![hook]);
                }
            },
            None => batches.push(vec![hook]),
        }
    }
    batches
}

/// Runs one handler under the tighter of the chain deadline and the
/// hook's own timeout, isolating panics.
async fn invoke(hook: HookDefinition, ctx: &HookContext, deadline: Option<Instant>) -> Invocation {
    let started = StdInstant::now();
    let own = hook.timeout.map(|t| Instant::now() + t);
    let limit = match (deadline, own) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    let call = AssertUnwindSafe(hook.handler().run(ctx)).catch_unwind();
    let outcome = match limit {
        Some(at) => match tokio::time::timeout_at(at, call).await {
            Ok(r) => Some(r),
            Err(_) => None,
        },
        None => Some(call.await),
    };

    let (result, detail) = match outcome {
        Some(Ok(Ok(output))) => (
            HookResult::from_output(hook.id.clone(), output, started.elapsed()),
            None,
        ),
        Some(Ok(Err(e))) => (
            HookResult::from_error(hook.id.clone(), &e, started.elapsed()),
            Some(format!("{:?}", e)),
        ),
        Some(Err(panic)) => {
            let e = HookError::Panicked {
                message: panic_message(panic.as_ref()),
            };
            tracing::error!(hook_id = %hook.id, error = %e, "Hook panicked");
            let detail = format!("{:?}", e);
            (
                HookResult::from_error(hook.id.clone(), &e, started.elapsed()),
                Some(detail),
            )
        }
        None => {
            tracing::warn!(hook_id = %hook.id, "Hook timed out");
            (
                HookResult::from_error(hook.id.clone(), &HookError::Timeout, started.elapsed()),
                None,
            )
        }
    };

    Invocation {
        hook,
        result,
        detail,
    }
}
