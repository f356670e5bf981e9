//! Per-hook execution records and the analytics computed from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::foundation::{ChainId, ExecutionId, HookId, Timestamp, ValidationError};
use crate::domain::hooks::{HookPhase, HookResult};

/// One hook invocation as stored in the execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub chain_id: ChainId,
    pub hook_id: HookId,
    pub event: String,
    pub phase: HookPhase,
    pub success: bool,
    pub blocked: bool,
    pub timed_out: bool,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Debug rendering of the underlying error (panic payload, error chain).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub dispatcher: String,
    pub action: String,
    pub recorded_at: Timestamp,
}

impl ExecutionRecord {
    pub fn from_result(
        chain_id: ChainId,
        event: &str,
        phase: HookPhase,
        dispatcher: &str,
        action: &str,
        result: &HookResult,
        error_detail: Option<String>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            chain_id,
            hook_id: result.hook_id.clone(),
            event: event.to_string(),
            phase,
            success: result.success,
            blocked: result.blocked,
            timed_out: result.timed_out,
            duration_ms: result.duration_ms,
            error: result.error.clone(),
            error_detail,
            dispatcher: dispatcher.to_string(),
            action: action.to_string(),
            recorded_at: Timestamp::now(),
        }
    }

    /// Copy without the error detail.
    pub fn without_detail(mut self) -> Self {
        self.error_detail = None;
        self
    }
}

/// Filter for execution history queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFilter {
    pub hook_id: Option<HookId>,
    pub event: Option<String>,
    pub phase: Option<HookPhase>,
    pub failures_only: bool,
}

impl ExecutionFilter {
    pub fn for_hook(hook_id: HookId) -> Self {
        Self {
            hook_id: Some(hook_id),
            ..Default::default()
        }
    }

    pub fn failures() -> Self {
        Self {
            failures_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        self.hook_id.as_ref().map_or(true, |id| &record.hook_id == id)
            && self.event.as_deref().map_or(true, |e| record.event == e)
            && self.phase.map_or(true, |p| record.phase == p)
            && (!self.failures_only || !record.success)
    }
}

/// Aggregated performance of one hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookPerformance {
    pub hook_id: HookId,
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub blocks: u64,
    pub timeouts: u64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: f64,
    pub failure_rate: f64,
}

/// Sort key for performance listings. Always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    #[default]
    AvgDuration,
    MaxDuration,
    Executions,
    FailureRate,
}

impl FromStr for PerformanceMetric {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg_duration" => Ok(PerformanceMetric::AvgDuration),
            "max_duration" => Ok(PerformanceMetric::MaxDuration),
            "executions" => Ok(PerformanceMetric::Executions),
            "failure_rate" => Ok(PerformanceMetric::FailureRate),
            other => Err(ValidationError::invalid_format(
                "sort_by",
                format!("unknown metric '{}'", other),
            )),
        }
    }
}

/// Aggregates records per hook, sorted by `metric` descending, ties by id.
pub fn summarize_performance<'a, I>(
    records: I,
    metric: PerformanceMetric,
    limit: usize,
) -> Vec<HookPerformance>
where
    I: IntoIterator<Item = &'a ExecutionRecord>,
{
    let mut by_hook: HashMap<&HookId, HookPerformance> = HashMap::new();
    let mut totals: HashMap<&HookId, f64> = HashMap::new();

    for rec in records {
        let perf = by_hook.entry(&rec.hook_id).or_insert_with(|| HookPerformance {
            hook_id: rec.hook_id.clone(),
            executions: 0,
            successes: 0,
            failures: 0,
            blocks: 0,
            timeouts: 0,
            avg_duration_ms: 0.0,
            max_duration_ms: 0.0,
            failure_rate: 0.0,
        });
        perf.executions += 1;
        if rec.success {
            perf.successes += 1;
        } else {
            perf.failures += 1;
        }
        if rec.blocked {
            perf.blocks += 1;
        }
        if rec.timed_out {
            perf.timeouts += 1;
        }
        perf.max_duration_ms = perf.max_duration_ms.max(rec.duration_ms);
        *totals.entry(&rec.hook_id).or_insert(0.0) += rec.duration_ms;
    }

    let mut out: Vec<HookPerformance> = by_hook
        .into_iter()
        .map(|(id, mut perf)| {
            let n = perf.executions as f64;
            perf.avg_duration_ms = totals.get(id).copied().unwrap_or(0.0) / n;
            perf.failure_rate = perf.failures as f64 / n;
            perf
        })
        .collect();

    let key = |p: &HookPerformance| match metric {
        PerformanceMetric::AvgDuration => p.avg_duration_ms,
        PerformanceMetric::MaxDuration => p.max_duration_ms,
        PerformanceMetric::Executions => p.executions as f64,
        PerformanceMetric::FailureRate => p.failure_rate,
    };
    out.sort_by(|a, b| {
        key(b)
            .total_cmp(&key(a))
            .then_with(|| a.hook_id.cmp(&b.hook_id))
    });
    out.truncate(limit);
    out
}
