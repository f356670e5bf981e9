//! Risk scoring against a pattern snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use crate::domain::action::ActionContext;
use crate::domain::foundation::PatternId;
use crate::domain::patterns::{PatternSnapshot, PatternType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Allow,
    Monitor,
    Block,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::Allow => "allow",
            Recommendation::Monitor => "monitor",
            Recommendation::Block => "block",
        };
        write!(f, "{}", s)
    }
}

/// Score boundaries between risk levels.
///
/// `score < medium` is low/allow, `< high` medium/monitor, `< critical`
/// high/`high_action`, otherwise critical/block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_medium")]
    pub medium: f64,
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_critical")]
    pub critical: f64,
    /// What to recommend at the `high` level.
    #[serde(default = "default_high_action")]
    pub high_action: Recommendation,
}

fn default_medium() -> f64 {
    0.25
}

fn default_high() -> f64 {
    0.5
}

fn default_critical() -> f64 {
    0.75
}

fn default_high_action() -> Recommendation {
    Recommendation::Monitor
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: default_medium(),
            high: default_high(),
            critical: default_critical(),
            high_action: default_high_action(),
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, score: f64) -> (RiskLevel, Recommendation) {
        if score < self.medium {
            (RiskLevel::Low, Recommendation::Allow)
        } else if score < self.high {
            (RiskLevel::Medium, Recommendation::Monitor)
        } else if score < self.critical {
            (RiskLevel::High, self.high_action)
        } else {
            (RiskLevel::Critical, Recommendation::Block)
        }
    }
}

/// A prospective call to assess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskQuery {
    pub dispatcher: String,
    pub action: String,
    pub call_number: u32,
    pub context_depth_percent: f64,
    #[serde(default)]
    pub param_keys: BTreeSet<String>,
}

impl RiskQuery {
    pub fn new(dispatcher: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            dispatcher: dispatcher.into(),
            action: action.into(),
            call_number: 1,
            context_depth_percent: 0.0,
            param_keys: BTreeSet::new(),
        }
    }

    pub fn from_context(ctx: &ActionContext) -> Self {
        Self {
            dispatcher: ctx.dispatcher().to_string(),
            action: ctx.action().to_string(),
            call_number: ctx.metadata.call_number,
            context_depth_percent: ctx.metadata.context_depth_percent,
            param_keys: ctx.params().keys(),
        }
    }

    pub fn with_call_number(mut self, call_number: u32) -> Self {
        self.call_number = call_number;
        self
    }

    pub fn with_context_depth(mut self, percent: f64) -> Self {
        self.context_depth_percent = percent;
        self
    }

    pub fn with_param_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternContribution {
    pub pattern_id: PatternId,
    pub pattern_type: PatternType,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub dispatcher: String,
    pub action: String,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub recommendation: Recommendation,
    /// Highest contribution first.
    pub matched_patterns: Vec<PatternContribution>,
    pub assessment_ms: f64,
    /// Generation of the snapshot the assessment was computed against.
    pub snapshot_generation: u64,
}

/// Probabilistic OR: `1 - Π(1 - c)`. Never exceeds 1.
pub fn combine_contributions<I>(contributions: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let survival: f64 = contributions
        .into_iter()
        .map(|c| 1.0 - c.clamp(0.0, 1.0))
        .product();
    (1.0 - survival).clamp(0.0, 1.0)
}

/// Scores `query` against `snapshot`. Pure: reads only its arguments.
pub fn assess(
    snapshot: &PatternSnapshot,
    query: &RiskQuery,
    thresholds: &RiskThresholds,
) -> RiskAssessment {
    let started = Instant::now();

    let mut matched: Vec<PatternContribution> = snapshot
        .for_action(&query.dispatcher, &query.action)
        .filter(|p| {
            p.condition
                .matches(query.call_number, query.context_depth_percent, &query.param_keys)
        })
        .map(|p| PatternContribution {
            pattern_id: p.id.clone(),
            pattern_type: p.pattern_type,
            contribution: p.contribution(),
        })
        .filter(|c| c.contribution > 0.0)
        .collect();
    matched.sort_by(|a, b| {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.pattern_id.cmp(&b.pattern_id))
    });

    let risk_score = combine_contributions(matched.iter().map(|c| c.contribution));
    let (risk_level, recommendation) = thresholds.classify(risk_score);

    RiskAssessment {
        dispatcher: query.dispatcher.clone(),
        action: query.action.clone(),
        risk_level,
        risk_score,
        recommendation,
        matched_patterns: matched,
        assessment_ms: started.elapsed().as_secs_f64() * 1000.0,
        snapshot_generation: snapshot.generation(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::patterns::{FailurePattern, PatternCondition};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn pattern(condition: PatternCondition, confidence: f64, decay_weight: f64) -> FailurePattern {
        FailurePattern {
            id: PatternId::compose(
                condition.pattern_type().as_str(),
                "prism_toolpath",
                "params_calculate",
                &condition.bucket_key(),
            ),
            pattern_type: condition.pattern_type(),
            dispatcher: "prism_toolpath".to_string(),
            action: "params_calculate".to_string(),
            condition,
            confidence,
            occurrences: 20,
            decay_weight,
            first_seen: Timestamp::now(),
            last_seen: Timestamp::now(),
            context: BTreeMap::new(),
        }
    }

    fn query() -> RiskQuery {
        RiskQuery::new("prism_toolpath", "params_calculate")
    }

    #[test]
    fn no_patterns_is_low_allow() {
        let result = assess(&PatternSnapshot::empty(), &query(), &RiskThresholds::default());
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.recommendation, Recommendation::Allow);
        assert_eq!(result.risk_score, 0.0);
        assert!(result.matched_patterns.is_empty());
    }

    #[test]
    fn matched_pattern_contributes_confidence_times_decay() {
        let snap = PatternSnapshot::new(
            1,
            vec![pattern(PatternCondition::CallNumber { min: 1, max: Some(3) }, 0.8, 1.0)],
        );

        let hit = assess(&snap, &query().with_call_number(2), &RiskThresholds::default());
        assert!((hit.risk_score - 0.8).abs() < 1e-12);
        assert_eq!(hit.risk_level, RiskLevel::Critical);
        assert_eq!(hit.recommendation, Recommendation::Block);
        assert_eq!(hit.snapshot_generation, 1);

        let miss = assess(&snap, &query().with_call_number(7), &RiskThresholds::default());
        assert!(miss.matched_patterns.is_empty());
    }

    #[test]
    fn other_actions_do_not_match() {
        let snap = PatternSnapshot::new(
            1,
            vec![pattern(PatternCondition::CallNumber { min: 1, max: None }, 0.9, 1.0)],
        );
        let other = RiskQuery::new("prism_toolpath", "other_action");
        assert!(assess(&snap, &other, &RiskThresholds::default()).matched_patterns.is_empty());
    }

    #[test]
    fn independent_risks_combine_probabilistically() {
        let snap = PatternSnapshot::new(
            1,
            vec![
                pattern(PatternCondition::CallNumber { min: 1, max: Some(3) }, 0.5, 1.0),
                pattern(PatternCondition::ContextDepth { min: 75.0, max: None }, 0.5, 1.0),
            ],
        );

        let result = assess(
            &snap,
            &query().with_call_number(1).with_context_depth(80.0),
            &RiskThresholds::default(),
        );
        assert_eq!(result.matched_patterns.len(), 2);
        assert!((result.risk_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn classify_respects_high_action_policy() {
        let mut thresholds = RiskThresholds::default();
        assert_eq!(thresholds.classify(0.6), (RiskLevel::High, Recommendation::Monitor));
        thresholds.high_action = Recommendation::Block;
        assert_eq!(thresholds.classify(0.6), (RiskLevel::High, Recommendation::Block));
        assert_eq!(thresholds.classify(0.3), (RiskLevel::Medium, Recommendation::Monitor));
        assert_eq!(thresholds.classify(0.1), (RiskLevel::Low, Recommendation::Allow));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    proptest! {
        #[test]
        fn combined_score_stays_in_unit_interval(cs in prop::collection::vec(0.0f64..=1.0, 0..10)) {
            let score = combine_contributions(cs);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn adding_a_contribution_never_lowers_score(
            cs in prop::collection::vec(0.0f64..=1.0, 0..10),
            extra in 0.0001f64..=1.0,
        ) {
            let before = combine_contributions(cs.clone());
            let mut more = cs;
            more.push(extra);
            let after = combine_contributions(more);
            prop_assert!(after >= before);
        }
    }
}
