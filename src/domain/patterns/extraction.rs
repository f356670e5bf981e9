//! Pattern mining over action history and merging into the previous snapshot.
//!
//! ## Policy
//!
//! For every (dispatcher, action) pair with at least `min_samples` records in
//! its trailing window of `window_size` records:
//!
//! 1. `baseline` = failure rate over the whole window.
//! 2. Records are bucketed three independent ways: call number ranges,
//!    context depth ranges and exact parameter-name signatures.
//! 3. A bucket becomes a candidate when it holds at least
//!    `min_bucket_samples` records, its failure rate is above the baseline
//!    and the difference is at least `failure_margin`.
//!
//! These are tunable thresholds, not a significance test.
//!
//! Records with a non-finite `context_depth_percent` are skipped and
//! counted, so one bad entry cannot stall learning while it sits in the
//! ring.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use super::{
    call_number_buckets, context_depth_buckets, FailurePattern, PatternCondition, PatternSnapshot,
    PatternType,
};
use crate::domain::foundation::{ErrorCode, PatternId, Timestamp};
use crate::domain::telemetry::ActionHistoryRecord;

/// Failure of one extraction cycle. The previous snapshot stays published.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternExtractionError {
    #[error("Invalid extraction parameters: {0}")]
    InvalidParameters(String),

    #[error("Extraction aborted: {0}")]
    Aborted(String),
}

impl PatternExtractionError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::PatternExtractionFailed
    }
}

/// Thresholds for the mining pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParams {
    pub window_size: usize,
    pub min_samples: usize,
    pub min_bucket_samples: usize,
    pub failure_margin: f64,
    pub call_number_bounds: Vec<u32>,
    pub context_depth_bounds: Vec<f64>,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            window_size: 500,
            min_samples: 20,
            min_bucket_samples: 5,
            failure_margin: 0.2,
            call_number_bounds: vec![3, 10],
            context_depth_bounds: vec![50.0, 75.0, 90.0],
        }
    }
}

/// Decay applied to patterns that were not re-observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayParams {
    pub decay_factor: f64,
    pub decay_floor: f64,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            decay_factor: 0.9,
            decay_floor: 0.05,
        }
    }
}

/// A bucket flagged in the current cycle, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternCandidate {
    pub dispatcher: String,
    pub action: String,
    pub condition: PatternCondition,
    pub samples: usize,
    pub failures: usize,
    pub failure_rate: f64,
    pub baseline_rate: f64,
}

impl PatternCandidate {
    pub fn pattern_type(&self) -> PatternType {
        self.condition.pattern_type()
    }

    pub fn pattern_id(&self) -> PatternId {
        PatternId::compose(
            self.pattern_type().as_str(),
            &self.dispatcher,
            &self.action,
            &self.condition.bucket_key(),
        )
    }

    fn context(&self) -> BTreeMap<String, serde_json::Value> {
        let mut ctx = BTreeMap::new();
        ctx.insert("bucket".to_string(), json!(self.condition.bucket_key()));
        ctx.insert("samples".to_string(), json!(self.samples));
        ctx.insert("failures".to_string(), json!(self.failures));
        ctx.insert("baseline_rate".to_string(), json!(self.baseline_rate));
        ctx.insert(
            "lift".to_string(),
            json!(self.failure_rate - self.baseline_rate),
        );
        ctx
    }
}

/// Result of one mining pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateScan {
    pub candidates: Vec<PatternCandidate>,
    /// Records left out because they could not be bucketed.
    pub skipped_records: usize,
}

/// Finds anomalous buckets in `records` (oldest first).
pub fn extract_candidates(
    records: &[ActionHistoryRecord],
    params: &ExtractionParams,
) -> Result<CandidateScan, PatternExtractionError> {
    if params.window_size == 0 || params.min_samples == 0 || params.min_bucket_samples == 0 {
        return Err(PatternExtractionError::InvalidParameters(
            "window_size, min_samples and min_bucket_samples must be positive".to_string(),
        ));
    }

    let mut groups: BTreeMap<(&str, &str), Vec<&ActionHistoryRecord>> = BTreeMap::new();
    let mut skipped_records = 0;
    for record in records {
        if !record.context_depth_percent.is_finite() {
            skipped_records += 1;
            continue;
        }
        groups
            .entry((record.dispatcher.as_str(), record.action.as_str()))
            .or_default()
            .push(record);
    }

    let call_buckets = call_number_buckets(&params.call_number_bounds);
    let depth_buckets = context_depth_buckets(&params.context_depth_bounds);

    let mut candidates = Vec::new();
    for ((dispatcher, action), group) in groups {
        let start = group.len().saturating_sub(params.window_size);
        let window = &group[start..];
        if window.len() < params.min_samples {
            continue;
        }

        let baseline = failure_rate(window);
        let mut flag = |condition: PatternCondition, members: Vec<&ActionHistoryRecord>| {
            if members.len() < params.min_bucket_samples {
                return;
            }
            let failures = members.iter().filter(|r| r.is_failure()).count();
            let rate = failures as f64 / members.len() as f64;
            if rate > baseline && rate - baseline >= params.failure_margin {
                candidates.push(PatternCandidate {
                    dispatcher: dispatcher.to_string(),
                    action: action.to_string(),
                    condition,
                    samples: members.len(),
                    failures,
                    failure_rate: rate.clamp(0.0, 1.0),
                    baseline_rate: baseline,
                });
            }
        };

        for bucket in call_buckets.iter().chain(depth_buckets.iter()) {
            let members: Vec<_> = window
                .iter()
                .copied()
                .filter(|r| match bucket {
                    PatternCondition::CallNumber { .. } => {
                        bucket.matches(r.call_number, 0.0, &r.param_keys)
                    }
                    _ => bucket.matches(0, r.context_depth_percent, &r.param_keys),
                })
                .collect();
            flag(bucket.clone(), members);
        }

        let mut signatures: BTreeMap<&BTreeSet<String>, Vec<&ActionHistoryRecord>> = BTreeMap::new();
        for record in window {
            signatures.entry(&record.param_keys).or_default().push(record);
        }
        for (keys, members) in signatures {
            flag(
                PatternCondition::ParamSignature { keys: keys.clone() },
                members,
            );
        }
    }

    Ok(CandidateScan {
        candidates,
        skipped_records,
    })
}

fn failure_rate(records: &[&ActionHistoryRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let failures = records.iter().filter(|r| r.is_failure()).count();
    failures as f64 / records.len() as f64
}

/// Merges this cycle's candidates into the previous snapshot.
///
/// - re-observed: occurrences accumulate, decay resets to 1.0
/// - not re-observed: `decay_weight *= decay_factor`, dropped below the floor
/// - new: occurrences = bucket samples, decay 1.0
///
/// Returns a new snapshot one generation after `previous`.
pub fn merge_patterns(
    previous: &PatternSnapshot,
    candidates: Vec<PatternCandidate>,
    decay: DecayParams,
    now: Timestamp,
) -> PatternSnapshot {
    let mut fresh: HashMap<PatternId, PatternCandidate> = candidates
        .into_iter()
        .map(|c| (c.pattern_id(), c))
        .collect();

    let mut merged: Vec<FailurePattern> = Vec::with_capacity(previous.len() + fresh.len());
    for old in previous.patterns() {
        match fresh.remove(&old.id) {
            Some(candidate) => merged.push(FailurePattern {
                confidence: candidate.failure_rate,
                occurrences: old.occurrences + candidate.samples as u64,
                decay_weight: 1.0,
                last_seen: now,
                context: candidate.context(),
                ..old.clone()
            }),
            None => {
                let decay_weight = old.decay_weight * decay.decay_factor;
                if decay_weight >= decay.decay_floor {
                    merged.push(FailurePattern {
                        decay_weight,
                        ..old.clone()
                    });
                }
            }
        }
    }

    for (id, candidate) in fresh {
        merged.push(FailurePattern {
            id,
            pattern_type: candidate.pattern_type(),
            dispatcher: candidate.dispatcher.clone(),
            action: candidate.action.clone(),
            confidence: candidate.failure_rate,
            occurrences: candidate.samples.max(1) as u64,
            decay_weight: 1.0,
            first_seen: now,
            last_seen: now,
            context: candidate.context(),
            condition: candidate.condition,
        });
    }

    merged.sort_by(|a, b| a.id.cmp(&b.id));
    PatternSnapshot::new(previous.generation() + 1, merged)
}
