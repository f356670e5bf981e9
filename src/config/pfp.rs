//! Predictive failure prevention (PFP) configuration
//!
//! Governs pattern extraction, decay, and the risk thresholds used by the
//! assessor and the built-in risk hook.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{check_range, ValidationError};
use crate::domain::patterns::{DecayParams, ExtractionParams};
use crate::domain::risk::{Recommendation, RiskThresholds};

/// PFP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PfpConfig {
    /// Run the periodic extraction task
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_extraction_interval_secs")]
    pub extraction_interval_secs: u64,

    /// Trailing records considered per (dispatcher, action)
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Records a pair needs before it is mined
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Records a bucket needs before it can be flagged
    #[serde(default = "default_min_bucket_samples")]
    pub min_bucket_samples: usize,

    /// Required lift of a bucket's failure rate over the baseline
    #[serde(default = "default_failure_margin")]
    pub failure_margin: f64,

    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    #[serde(default = "default_decay_floor")]
    pub decay_floor: f64,

    /// Upper bounds of the call number buckets
    #[serde(default = "default_call_number_buckets")]
    pub call_number_buckets: Vec<u32>,

    /// Lower bounds of the context depth buckets above zero
    #[serde(default = "default_context_depth_buckets")]
    pub context_depth_buckets: Vec<f64>,

    #[serde(default)]
    pub risk: RiskConfig,
}

/// Risk thresholds and the built-in risk hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_medium")]
    pub medium: f64,

    #[serde(default = "default_high")]
    pub high: f64,

    #[serde(default = "default_critical")]
    pub critical: f64,

    /// Recommendation at the high level: monitor or block
    #[serde(default = "default_high_action")]
    pub high_action: Recommendation,

    #[serde(default = "default_enabled")]
    pub hook_enabled: bool,

    #[serde(default = "default_hook_event")]
    pub hook_event: String,

    #[serde(default = "default_hook_priority")]
    pub hook_priority: i32,
}

impl RiskConfig {
    pub fn thresholds(&self) -> RiskThresholds {
        RiskThresholds {
            medium: self.medium,
            high: self.high,
            critical: self.critical,
            high_action: self.high_action,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let ordered = [self.medium, self.high, self.critical]
            .iter()
            .all(|v| v.is_finite())
            && 0.0 < self.medium
            && self.medium < self.high
            && self.high < self.critical
            && self.critical <= 1.0;
        if !ordered {
            return Err(ValidationError::RiskThresholdsOrder);
        }
        if self.hook_enabled && self.hook_event.trim().is_empty() {
            return Err(ValidationError::Empty("pfp.risk.hook_event"));
        }
        Ok(())
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            medium: default_medium(),
            high: default_high(),
            critical: default_critical(),
            high_action: default_high_action(),
            hook_enabled: default_enabled(),
            hook_event: default_hook_event(),
            hook_priority: default_hook_priority(),
        }
    }
}

impl PfpConfig {
    pub fn extraction_interval(&self) -> Duration {
        Duration::from_secs(self.extraction_interval_secs)
    }

    pub fn extraction_params(&self) -> ExtractionParams {
        ExtractionParams {
            window_size: self.window_size,
            min_samples: self.min_samples,
            min_bucket_samples: self.min_bucket_samples,
            failure_margin: self.failure_margin,
            call_number_bounds: self.call_number_buckets.clone(),
            context_depth_bounds: self.context_depth_buckets.clone(),
        }
    }

    pub fn decay_params(&self) -> DecayParams {
        DecayParams {
            decay_factor: self.decay_factor,
            decay_floor: self.decay_floor,
        }
    }

    pub fn thresholds(&self) -> RiskThresholds {
        self.risk.thresholds()
    }

    /// Validate PFP configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.extraction_interval_secs == 0 {
            return Err(ValidationError::MustBePositive("pfp.extraction_interval_secs"));
        }
        if self.window_size == 0 {
            return Err(ValidationError::MustBePositive("pfp.window_size"));
        }
        if self.min_samples == 0 {
            return Err(ValidationError::MustBePositive("pfp.min_samples"));
        }
        if self.min_bucket_samples == 0 {
            return Err(ValidationError::MustBePositive("pfp.min_bucket_samples"));
        }
        if self.min_samples > self.window_size {
            return Err(ValidationError::SamplesExceedWindow {
                min_samples: self.min_samples,
                window_size: self.window_size,
            });
        }
        check_range("pfp.failure_margin", self.failure_margin, 0.0, 1.0)?;
        check_range("pfp.decay_factor", self.decay_factor, 0.0, 1.0)?;
        if self.decay_factor == 0.0 || self.decay_factor == 1.0 {
            return Err(ValidationError::OutOfRange {
                field: "pfp.decay_factor",
                min: 0.0,
                max: 1.0,
                actual: self.decay_factor,
            });
        }
        check_range("pfp.decay_floor", self.decay_floor, 0.0, 1.0)?;

        if self.call_number_buckets.is_empty() {
            return Err(ValidationError::Empty("pfp.call_number_buckets"));
        }
        if self.call_number_buckets[0] == 0
            || self.call_number_buckets.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(ValidationError::NotAscending("pfp.call_number_buckets"));
        }

        if self.context_depth_buckets.is_empty() {
            return Err(ValidationError::Empty("pfp.context_depth_buckets"));
        }
        for bound in &self.context_depth_buckets {
            check_range("pfp.context_depth_buckets", *bound, 0.0, 100.0)?;
        }
        if self.context_depth_buckets[0] <= 0.0
            || self.context_depth_buckets.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(ValidationError::NotAscending("pfp.context_depth_buckets"));
        }

        self.risk.validate()
    }
}

impl Default for PfpConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            extraction_interval_secs: default_extraction_interval_secs(),
            window_size: default_window_size(),
            min_samples: default_min_samples(),
            min_bucket_samples: default_min_bucket_samples(),
            failure_margin: default_failure_margin(),
            decay_factor: default_decay_factor(),
            decay_floor: default_decay_floor(),
            call_number_buckets: default_call_number_buckets(),
            context_depth_buckets: default_context_depth_buckets(),
            risk: RiskConfig::default(),
        }
    }
}

/// Partial runtime update of the PFP configuration.
///
/// Applied on top of the current config; the merged result is validated
/// as a whole and rejected on any invalid value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PfpConfigUpdate {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub extraction_interval_secs: Option<u64>,
    #[serde(default)]
    pub window_size: Option<usize>,
    #[serde(default)]
    pub min_samples: Option<usize>,
    #[serde(default)]
    pub min_bucket_samples: Option<usize>,
    #[serde(default)]
    pub failure_margin: Option<f64>,
    #[serde(default)]
    pub decay_factor: Option<f64>,
    #[serde(default)]
    pub decay_floor: Option<f64>,
    #[serde(default)]
    pub call_number_buckets: Option<Vec<u32>>,
    #[serde(default)]
    pub context_depth_buckets: Option<Vec<f64>>,
    #[serde(default)]
    pub medium_threshold: Option<f64>,
    #[serde(default)]
    pub high_threshold: Option<f64>,
    #[serde(default)]
    pub critical_threshold: Option<f64>,
    #[serde(default)]
    pub high_action: Option<Recommendation>,
}

impl PfpConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns `base` with this update applied, or why it was rejected.
    pub fn apply(&self, base: &PfpConfig) -> Result<PfpConfig, ValidationError> {
        let mut next = base.clone();
        if let Some(v) = self.enabled {
            next.enabled = v;
        }
        if let Some(v) = self.extraction_interval_secs {
            next.extraction_interval_secs = v;
        }
        if let Some(v) = self.window_size {
            next.window_size = v;
        }
        if let Some(v) = self.min_samples {
            next.min_samples = v;
        }
        if let Some(v) = self.min_bucket_samples {
            next.min_bucket_samples = v;
        }
        if let Some(v) = self.failure_margin {
            next.failure_margin = v;
        }
        if let Some(v) = self.decay_factor {
            next.decay_factor = v;
        }
        if let Some(v) = self.decay_floor {
            next.decay_floor = v;
        }
        if let Some(v) = &self.call_number_buckets {
            next.call_number_buckets = v.clone();
        }
        if let Some(v) = &self.context_depth_buckets {
            next.context_depth_buckets = v.clone();
        }
        if let Some(v) = self.medium_threshold {
            next.risk.medium = v;
        }
        if let Some(v) = self.high_threshold {
            next.risk.high = v;
        }
        if let Some(v) = self.critical_threshold {
            next.risk.critical = v;
        }
        if let Some(v) = self.high_action {
            next.risk.high_action = v;
        }
        next.validate()?;
        Ok(next)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_extraction_interval_secs() -> u64 {
    300
}

fn default_window_size() -> usize {
    500
}

fn default_min_samples() -> usize {
    20
}

fn default_min_bucket_samples() -> usize {
    5
}

fn default_failure_margin() -> f64 {
    0.2
}

fn default_decay_factor() -> f64 {
    0.9
}

fn default_decay_floor() -> f64 {
    0.05
}

fn default_call_number_buckets() -> Vec<u32> {
    vec![3, 10]
}

fn default_context_depth_buckets() -> Vec<f64> {
    vec![50.0, 75.0, 90.0]
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

fn default_hook_event() -> String {
    "pre-calculation".to_string()
}

fn default_hook_priority() -> i32 {
    -1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pfp_defaults_are_valid() {
        let config = PfpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction_interval(), Duration::from_secs(300));
        assert_eq!(config.extraction_params(), ExtractionParams::default());
        assert_eq!(config.decay_params(), DecayParams::default());
        assert_eq!(config.thresholds(), RiskThresholds::default());
        assert_eq!(config.risk.hook_priority, -1000);
    }

    #[test]
    fn test_decay_factor_out_of_range_rejected() {
        for bad in [0.0, 1.0, 1.5, -0.1, f64::NAN] {
            let config = PfpConfig {
                decay_factor: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "accepted decay_factor {}", bad);
        }
    }

    #[test]
    fn test_buckets_must_ascend() {
        let config = PfpConfig {
            call_number_buckets: vec![10, 3],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::NotAscending("pfp.call_number_buckets"))
        );

        let config = PfpConfig {
            context_depth_buckets: vec![],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::Empty("pfp.context_depth_buckets"))
        );
    }

    #[test]
    fn test_min_samples_cannot_exceed_window() {
        let config = PfpConfig {
            window_size: 10,
            min_samples: 20,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::SamplesExceedWindow { .. })
        ));
    }

    #[test]
    fn test_risk_thresholds_must_be_ordered() {
        let mut config = PfpConfig::default();
        config.risk.high = 0.2;
        assert_eq!(config.validate(), Err(ValidationError::RiskThresholdsOrder));
    }

    #[test]
    fn test_update_applies_partial_fields() {
        let base = PfpConfig::default();
        let update = PfpConfigUpdate {
            decay_factor: Some(0.8),
            window_size: Some(200),
            high_action: Some(Recommendation::Block),
            ..Default::default()
        };

        let next = update.apply(&base).unwrap();
        assert_eq!(next.decay_factor, 0.8);
        assert_eq!(next.window_size, 200);
        assert_eq!(next.risk.high_action, Recommendation::Block);
        assert_eq!(next.min_samples, base.min_samples);
    }

    #[test]
    fn test_update_rejects_whole_update_without_clamping() {
        let base = PfpConfig::default();
        let update = PfpConfigUpdate {
            window_size: Some(300),
            critical_threshold: Some(1.5),
            ..Default::default()
        };

        assert!(update.apply(&base).is_err());
    }

    #[test]
    fn test_update_deserializes_from_json() {
        let update: PfpConfigUpdate =
            serde_json::from_str(r#"{"decay_factor": 0.85, "high_action": "block"}"#).unwrap();
        assert_eq!(update.decay_factor, Some(0.85));
        assert_eq!(update.high_action, Some(Recommendation::Block));
        assert!(!update.is_empty());
        assert!(PfpConfigUpdate::default().is_empty());
    }
}
