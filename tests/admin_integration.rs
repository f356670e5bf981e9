//! Integration tests for the administrative surface.
//!
//! Exercises `AdminService` against a real engine:
//! 1. Hook listing, toggling and manual firing
//! 2. Event emission and queries
//! 3. Hook performance and failure analytics
//! 4. Pattern listings and action history
//! 5. Runtime PFP configuration updates
//!
//! Run with: `cargo test --test admin_integration`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prism_guard::application::handlers::admin::{
    ActionHistoryQuery, AdminError, EventQuery, FailureQuery, PatternQuery, PerformanceQuery,
};
use prism_guard::application::handlers::dispatch::DispatchRequest;
use prism_guard::application::Engine;
use prism_guard::config::{EngineConfig, PfpConfigUpdate};
use prism_guard::domain::action::{ActionContext, ActionError, ActionOutput, ActionParams};
use prism_guard::domain::foundation::{ErrorCode, HookId};
use prism_guard::domain::hooks::{
    handler_fn, ChainOptions, HookContext, HookDefinition, HookError, HookFilter, HookHandler,
    HookOutput, HookPhase,
};
use prism_guard::domain::patterns::PatternType;
use prism_guard::domain::risk::Recommendation;
use prism_guard::domain::telemetry::PerformanceMetric;
use prism_guard::ports::ActionExecutor;
use serde_json::json;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn engine() -> Engine {
    let mut config = EngineConfig::default();
    config.pfp.risk.hook_enabled = false;
    Engine::new(config).unwrap()
}

fn hook(id: &str, event: &str, output: HookOutput) -> HookDefinition {
    HookDefinition::new(
        HookId::new(id).unwrap(),
        event,
        HookPhase::Before,
        handler_fn(move |_| Ok(output.clone())),
    )
}

fn action() -> ActionContext {
    ActionContext::new("prism_admin", "inspect", ActionParams::new())
}

struct Sleepy(Duration);

#[async_trait]
impl HookHandler for Sleepy {
    async fn run(&self, _ctx: &HookContext) -> Result<HookOutput, HookError> {
        tokio::time::sleep(self.0).await;
        Ok(HookOutput::allow())
    }
}

/// Fails on the first three call numbers.
struct EarlyFailer;

#[async_trait]
impl ActionExecutor for EarlyFailer {
    async fn execute(&self, _action: &str, params: &ActionParams) -> Result<ActionOutput, ActionError> {
        let call = params.get_f64("call").unwrap_or(0.0);
        if call <= 3.0 {
            Ok(ActionOutput::failure(json!({ "call": call })))
        } else {
            Ok(ActionOutput::success(json!({ "call": call })))
        }
    }
}

// =============================================================================
// Hooks
// =============================================================================

#[tokio::test]
async fn list_and_get_hooks() {
    let engine = engine();
    engine
        .register_hook(hook("login-audit", "login", HookOutput::allow()).in_domain("auth"))
        .unwrap();
    engine
        .register_hook(hook("write-guard", "pre-write", HookOutput::allow()).in_domain("file"))
        .unwrap();

    let auth = engine.admin().list_hooks(&HookFilter::in_domain("auth"));
    assert_eq!(auth.len(), 1);
    assert_eq!(auth[0].id.as_str(), "login-audit");

    let summary = engine.admin().get_hook("write-guard").unwrap();
    assert_eq!(summary.event, "pre-write");
    assert!(summary.enabled);

    let err = engine.admin().get_hook("missing").unwrap_err();
    assert_eq!(err.code(), ErrorCode::HookNotFound);

    let err = engine.admin().get_hook("  ").unwrap_err();
    assert!(matches!(err, AdminError::InvalidRequest(_)));
}

#[tokio::test]
async fn set_enabled_records_reason_and_kind() {
    let engine = engine();
    engine
        .register_hook(hook("login-audit", "login", HookOutput::allow()))
        .unwrap();

    let summary = engine
        .admin()
        .set_hook_enabled("login-audit", false, Some("maintenance window".into()), true)
        .unwrap();

    assert!(!summary.enabled);
    let toggle = summary.toggle.unwrap();
    assert_eq!(toggle.reason.as_deref(), Some("maintenance window"));
    assert!(toggle.temporary);

    let enabled = engine.admin().list_hooks(&HookFilter {
        enabled: Some(true),
        ..Default::default()
    });
    assert!(enabled.is_empty());
}

#[tokio::test]
async fn fire_hook_runs_even_when_disabled() {
    let engine = engine();
    engine
        .register_hook(hook("veto", "pre-write", HookOutput::block("read only")).disabled())
        .unwrap();

    let result = engine.admin().fire_hook("veto", action(), None).await.unwrap();

    assert!(result.blocked);
    assert_eq!(result.reason.as_deref(), Some("read only"));
    assert_eq!(engine.execution_history().len(), 1);
}

#[tokio::test]
async fn fire_hook_honours_timeout() {
    let engine = engine();
    engine
        .register_hook(HookDefinition::new(
            HookId::new("sleepy").unwrap(),
            "pre-write",
            HookPhase::Before,
            Arc::new(Sleepy(Duration::from_secs(5))),
        ))
        .unwrap();

    let result = engine
        .admin()
        .fire_hook("sleepy", action(), Some(Duration::from_millis(50)))
        .await
        .unwrap();

    assert!(result.timed_out);
    assert_eq!(result.error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn fire_chain_rejects_invalid_context() {
    let engine = engine();
    let bad = ActionContext::new("prism_admin", "", ActionParams::new());

    let err = engine
        .admin()
        .fire_chain("pre-write", HookPhase::Before, bad, ChainOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationFailed);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test]
async fn emitted_events_are_queryable() {
    let engine = engine();
    engine.admin().emit_event("login", json!({ "user": "a" })).await.unwrap();
    engine.admin().emit_event("login", json!({ "user": "b" })).await.unwrap();
    engine.admin().emit_event("logout", json!({ "user": "a" })).await.unwrap();

    let types = engine.admin().list_event_types();
    let login = types.iter().find(|t| t.event_type == "login").unwrap();
    assert_eq!(login.fire_count, 2);

    let logins = engine.admin().query_events(&EventQuery {
        event_type: Some("login".into()),
        limit: 10,
    });
    assert_eq!(logins.len(), 2);
    assert_eq!(logins[0].payload["user"], "b");

    let latest = engine.admin().query_events(&EventQuery {
        event_type: None,
        limit: 1,
    });
    assert_eq!(latest[0].event_type, "logout");
    assert_eq!(latest[0].source, "admin");

    let err = engine.admin().emit_event(" ", json!({})).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
}

// =============================================================================
// Analytics
// =============================================================================

#[tokio::test]
async fn performance_sorts_by_requested_metric() {
    let engine = engine();
    engine
        .register_hook(hook("fast", "pre-write", HookOutput::allow()).with_priority(1))
        .unwrap();
    engine
        .register_hook(
            HookDefinition::new(
                HookId::new("slow").unwrap(),
                "pre-write",
                HookPhase::Before,
                Arc::new(Sleepy(Duration::from_millis(30))),
            )
            .with_priority(2),
        )
        .unwrap();
    engine
        .register_hook(
            HookDefinition::new(
                HookId::new("broken").unwrap(),
                "pre-write",
                HookPhase::Before,
                handler_fn(|_| Err(HookError::execution("bad state"))),
            )
            .with_priority(3),
        )
        .unwrap();

    for _ in 0..3 {
        engine
            .admin()
            .fire_chain("pre-write", HookPhase::Before, action(), ChainOptions::default())
            .await
            .unwrap();
    }

    let by_duration = engine.admin().hook_performance(&PerformanceQuery::default());
    assert_eq!(by_duration.len(), 3);
    assert_eq!(by_duration[0].hook_id.as_str(), "slow");
    assert_eq!(by_duration[0].executions, 3);

    let by_failures = engine.admin().hook_performance(&PerformanceQuery {
        sort_by: PerformanceMetric::FailureRate,
        limit: 1,
        ..Default::default()
    });
    assert_eq!(by_failures.len(), 1);
    assert_eq!(by_failures[0].hook_id.as_str(), "broken");
    assert_eq!(by_failures[0].failure_rate, 1.0);
}

#[tokio::test]
async fn failure_records_hide_details_unless_asked() {
    let engine = engine();
    engine
        .register_hook(HookDefinition::new(
            HookId::new("boom").unwrap(),
            "pre-write",
            HookPhase::Before,
            handler_fn(|_| panic!("hook exploded")),
        ))
        .unwrap();
    engine
        .admin()
        .fire_chain("pre-write", HookPhase::Before, action(), ChainOptions::default())
        .await
        .unwrap();

    let plain = engine.admin().failure_records(&FailureQuery::default());
    assert_eq!(plain.len(), 1);
    assert!(plain[0].error.is_some());
    assert!(plain[0].error_detail.is_none());

    let detailed = engine.admin().failure_records(&FailureQuery {
        include_details: true,
        ..Default::default()
    });
    assert!(detailed[0].error_detail.as_deref().unwrap().contains("hook exploded"));
}

// =============================================================================
// Patterns and History
// =============================================================================

#[tokio::test]
async fn pattern_listing_filters_and_limits() {
    let engine = engine();
    let dispatcher = engine.dispatcher("prism_toolpath", Arc::new(EarlyFailer));
    for round in 0..5 {
        for call in 1..=10u32 {
            dispatcher
                .dispatch(
                    DispatchRequest::new("params_calculate", ActionParams::new().with("call", call))
                        .with_call_number(call)
                        .with_context_depth(f64::from(round) * 5.0),
                )
                .await;
        }
    }

    let summary = engine.admin().force_extract().await.unwrap();
    assert!(summary.patterns >= 1);

    let status = engine.admin().extractor_status();
    assert_eq!(status.cycles, 1);
    assert_eq!(status.last_generation, summary.generation);

    let call_patterns = engine.admin().list_patterns(&PatternQuery {
        pattern_type: Some(PatternType::CallNumberCorrelation),
        ..Default::default()
    });
    assert_eq!(call_patterns.generation, summary.generation);
    assert!(call_patterns
        .patterns
        .iter()
        .all(|p| p.pattern_type == PatternType::CallNumberCorrelation));
    assert_eq!(call_patterns.patterns[0].confidence, 1.0);

    let limited = engine.admin().list_patterns(&PatternQuery {
        limit: Some(0),
        ..Default::default()
    });
    assert!(limited.patterns.is_empty());
    assert_eq!(limited.total, summary.patterns);

    let other = engine.admin().list_patterns(&PatternQuery {
        dispatcher: Some("prism_mill".into()),
        ..Default::default()
    });
    assert_eq!(other.total, 0);
}

#[tokio::test]
async fn action_history_is_newest_first_and_limited() {
    let engine = engine();
    let dispatcher = engine.dispatcher("prism_toolpath", Arc::new(EarlyFailer));
    for call in 1..=6u32 {
        dispatcher
            .dispatch(
                DispatchRequest::new("params_calculate", ActionParams::new().with("call", call))
                    .with_call_number(call),
            )
            .await;
    }

    let records = engine
        .admin()
        .action_history(&ActionHistoryQuery::for_dispatcher("prism_toolpath").with_limit(2));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].call_number, 6);
    assert_eq!(records[1].call_number, 5);
}

// =============================================================================
// PFP Configuration
// =============================================================================

#[tokio::test]
async fn invalid_update_leaves_config_untouched() {
    let engine = engine();
    let before = engine.admin().pfp_config();

    let err = engine
        .admin()
        .update_pfp_config(&PfpConfigUpdate {
            decay_factor: Some(0.5),
            medium_threshold: Some(0.9),
            ..Default::default()
        })
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidConfig);
    assert_eq!(engine.admin().pfp_config(), before);
}

#[tokio::test]
async fn valid_update_is_published_whole() {
    let engine = engine();

    let updated = engine
        .admin()
        .update_pfp_config(&PfpConfigUpdate {
            decay_factor: Some(0.5),
            high_action: Some(Recommendation::Block),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(updated.decay_factor, 0.5);
    assert_eq!(updated.risk.high_action, Recommendation::Block);
    assert_eq!(engine.admin().pfp_config(), updated);
    assert_eq!(engine.assessor().thresholds().high_action, Recommendation::Block);

    // An empty update changes nothing.
    let same = engine
        .admin()
        .update_pfp_config(&PfpConfigUpdate::default())
        .unwrap();
    assert_eq!(same, updated);
}
