//! Failure pattern types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PatternId, Timestamp, ValidationError};

/// Which call attribute a pattern correlates with failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    CallNumberCorrelation,
    ContextDepthCorrelation,
    ParamSignatureCorrelation,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::CallNumberCorrelation => "call_number_correlation",
            PatternType::ContextDepthCorrelation => "context_depth_correlation",
            PatternType::ParamSignatureCorrelation => "param_signature_correlation",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call_number_correlation" => Ok(PatternType::CallNumberCorrelation),
            "context_depth_correlation" => Ok(PatternType::ContextDepthCorrelation),
            "param_signature_correlation" => Ok(PatternType::ParamSignatureCorrelation),
            other => Err(ValidationError::invalid_format(
                "pattern_type",
                format!("unknown pattern type '{}'", other),
            )),
        }
    }
}

/// The bucket a call must fall into for a pattern to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternCondition {
    /// `min..=max` (open-ended when `max` is `None`).
    CallNumber { min: u32, max: Option<u32> },
    /// `min..max` percent (open-ended when `max` is `None`).
    ContextDepth { min: f64, max: Option<f64> },
    /// Exact set of top-level parameter names.
    ParamSignature { keys: BTreeSet<String> },
}

impl PatternCondition {
    pub fn pattern_type(&self) -> PatternType {
        match self {
            PatternCondition::CallNumber { .. } => PatternType::CallNumberCorrelation,
            PatternCondition::ContextDepth { .. } => PatternType::ContextDepthCorrelation,
            PatternCondition::ParamSignature { .. } => PatternType::ParamSignatureCorrelation,
        }
    }

    /// Stable label used in pattern ids (e.g. `"1-3"`, `"11+"`, `"75-90"`).
    pub fn bucket_key(&self) -> String {
        match self {
            PatternCondition::CallNumber { min, max: Some(max) } => format!("{}-{}", min, max),
            PatternCondition::CallNumber { min, max: None } => format!("{}+", min),
            PatternCondition::ContextDepth { min, max: Some(max) } => format!("{}-{}", min, max),
            PatternCondition::ContextDepth { min, max: None } => format!("{}+", min),
            PatternCondition::ParamSignature { keys } => {
                let joined = keys.iter().cloned().collect::<Vec<_>>().join(",");
                format!("[{}]", joined)
            }
        }
    }

    pub fn matches(&self, call_number: u32, context_depth: f64, param_keys: &BTreeSet<String>) -> bool {
        match self {
            PatternCondition::CallNumber { min, max } => {
                call_number >= *min && max.map_or(true, |m| call_number <= m)
            }
            PatternCondition::ContextDepth { min, max } => {
                context_depth >= *min && max.map_or(true, |m| context_depth < m)
            }
            PatternCondition::ParamSignature { keys } => keys == param_keys,
        }
    }
}

/// Builds inclusive call-number buckets from ascending upper bounds.
///
/// `[3, 10]` yields `1-3`, `4-10`, `11+`. A bound of `u32::MAX` closes the
/// range and no open bucket follows it.
pub fn call_number_buckets(bounds: &[u32]) -> Vec<PatternCondition> {
    let mut buckets = Vec::with_capacity(bounds.len() + 1);
    let mut min = 1;
    for &upper in bounds {
        buckets.push(PatternCondition::CallNumber {
            min,
            max: Some(upper),
        });
        match upper.checked_add(1) {
            Some(next) => min = next,
            None => return buckets,
        }
    }
    buckets.push(PatternCondition::CallNumber { min, max: None });
    buckets
}

/// Builds half-open depth buckets from ascending bounds.
///
/// `[50, 75]` yields `0-50`, `50-75`, `75+`.
pub fn context_depth_buckets(bounds: &[f64]) -> Vec<PatternCondition> {
    let mut buckets = Vec::with_capacity(bounds.len() + 1);
    let mut min = 0.0;
    for &upper in bounds {
        buckets.push(PatternCondition::ContextDepth {
            min,
            max: Some(upper),
        });
        min = upper;
    }
    buckets.push(PatternCondition::ContextDepth { min, max: None });
    buckets
}

/// A learned correlation between a call attribute and failure.
///
/// Created and merged by the extractor only; readers see it through an
/// immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePattern {
    pub id: PatternId,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub dispatcher: String,
    pub action: String,
    pub condition: PatternCondition,
    /// Failure rate of the bucket, in [0, 1].
    pub confidence: f64,
    /// Samples that supported this pattern, accumulated across cycles.
    pub occurrences: u64,
    /// Discount applied when the pattern is not re-observed, in [0, 1].
    pub decay_weight: f64,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    #[serde(default)]
    pub context: BTreeMap<String, JsonValue>,
}

impl FailurePattern {
    /// `confidence × decay_weight`, clamped to [0, 1].
    pub fn contribution(&self) -> f64 {
        (self.confidence * self.decay_weight).clamp(0.0, 1.0)
    }

    pub fn applies_to(&self, dispatcher: &str, action: &str) -> bool {
        self.dispatcher == dispatcher && self.action == action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(k: &[&str]) -> BTreeSet<String> {
        k.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn call_number_buckets_cover_all_calls() {
        let buckets = call_number_buckets(&[3, 10]);
        let labels: Vec<_> = buckets.iter().map(|b| b.bucket_key()).collect();
        assert_eq!(labels, vec!["1-3", "4-10", "11+"]);

        let empty = BTreeSet::new();
        for n in 1..50 {
            let hits = buckets.iter().filter(|b| b.matches(n, 0.0, &empty)).count();
            assert_eq!(hits, 1, "call {} must land in exactly one bucket", n);
        }
    }

    #[test]
    fn max_call_number_bound_closes_the_range() {
        let buckets = call_number_buckets(&[3, u32::MAX]);
        assert_eq!(
            buckets,
            vec![
                PatternCondition::CallNumber { min: 1, max: Some(3) },
                PatternCondition::CallNumber { min: 4, max: Some(u32::MAX) },
            ]
        );
        let empty = BTreeSet::new();
        assert!(!buckets[1].matches(2, 0.0, &empty));
        assert!(buckets[1].matches(u32::MAX, 0.0, &empty));
    }

    #[test]
    fn depth_buckets_are_half_open() {
        let buckets = context_depth_buckets(&[50.0, 75.0]);
        let empty = BTreeSet::new();

        assert!(buckets[0].matches(1, 49.9, &empty));
        assert!(!buckets[0].matches(1, 50.0, &empty));
        assert!(buckets[1].matches(1, 50.0, &empty));
        assert!(buckets[2].matches(1, 100.0, &empty));
        assert_eq!(buckets[2].bucket_key(), "75+");
    }

    #[test]
    fn param_signature_matches_exact_set() {
        let cond = PatternCondition::ParamSignature {
            keys: keys(&["depth", "feed"]),
        };
        assert!(cond.matches(1, 0.0, &keys(&["feed", "depth"])));
        assert!(!cond.matches(1, 0.0, &keys(&["depth"])));
        assert_eq!(cond.bucket_key(), "[depth,feed]");
        assert_eq!(cond.pattern_type(), PatternType::ParamSignatureCorrelation);
    }

    #[test]
    fn pattern_type_roundtrips_through_str() {
        for t in [
            PatternType::CallNumberCorrelation,
            PatternType::ContextDepthCorrelation,
            PatternType::ParamSignatureCorrelation,
        ] {
            assert_eq!(t.as_str().parse::<PatternType>().unwrap(), t);
        }
        assert!("latency_correlation".parse::<PatternType>().is_err());
    }

    #[test]
    fn contribution_is_confidence_times_decay() {
        let pattern = FailurePattern {
            id: PatternId::compose("call_number_correlation", "d", "a", "1-3"),
            pattern_type: PatternType::CallNumberCorrelation,
            dispatcher: "d".to_string(),
            action: "a".to_string(),
            condition: PatternCondition::CallNumber { min: 1, max: Some(3) },
            confidence: 0.8,
            occurrences: 15,
            decay_weight: 0.5,
            first_seen: Timestamp::now(),
            last_seen: Timestamp::now(),
            context: BTreeMap::new(),
        };
        assert!((pattern.contribution() - 0.4).abs() < 1e-12);
        assert!(pattern.applies_to("d", "a"));
        assert!(!pattern.applies_to("d", "b"));
    }

    #[test]
    fn pattern_serializes_type_field() {
        let cond = PatternCondition::CallNumber { min: 11, max: None };
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["kind"], "call_number");
        assert_eq!(json["min"], 11);
    }
}
