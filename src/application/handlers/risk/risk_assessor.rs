//! RiskAssessor - Scores prospective calls against the published patterns.

use std::sync::Arc;

use crate::application::handlers::patterns::SharedPfpConfig;
use crate::domain::risk::{assess, RiskAssessment, RiskQuery, RiskThresholds};
use crate::ports::PatternStore;

/// Lock-free reader of the pattern snapshot and the risk thresholds.
///
/// Both are loaded once per call, so an assessment always sees one
/// consistent generation even while the extractor publishes.
#[derive(Clone)]
pub struct RiskAssessor {
    patterns: Arc<dyn PatternStore>,
    config: SharedPfpConfig,
}

impl RiskAssessor {
    pub fn new(patterns: Arc<dyn PatternStore>, config: SharedPfpConfig) -> Self {
        Self { patterns, config }
    }

    pub fn thresholds(&self) -> RiskThresholds {
        self.config.load().thresholds()
    }

    pub fn assess(&self, query: &RiskQuery) -> RiskAssessment {
        let snapshot = self.patterns.current();
        let assessment = assess(&snapshot, query, &self.thresholds());
        if !assessment.matched_patterns.is_empty() {
            tracing::debug!(
                dispatcher = %query.dispatcher,
                action = %query.action,
                generation = assessment.snapshot_generation,
                risk_score = assessment.risk_score,
                risk_level = %assessment.risk_level,
                "Risk assessed"
            );
        }
        assessment
    }
}
