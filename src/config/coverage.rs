//! Coverage analysis configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;
use crate::domain::coverage::{CatalogError, EventCatalog, GapThresholds};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoverageConfig {
    /// YAML event catalog; the built-in catalog is used when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default = "default_medium_fire_count")]
    pub medium_fire_count: u64,

    #[serde(default = "default_high_fire_count")]
    pub high_fire_count: u64,

    #[serde(default = "default_critical_fire_count")]
    pub critical_fire_count: u64,
}

impl CoverageConfig {
    pub fn gap_thresholds(&self) -> GapThresholds {
        GapThresholds {
            medium_fire_count: self.medium_fire_count,
            high_fire_count: self.high_fire_count,
            critical_fire_count: self.critical_fire_count,
        }
    }

    pub fn load_catalog(&self) -> Result<EventCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => EventCatalog::load(path),
            None => Ok(EventCatalog::builtin()),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.medium_fire_count > self.high_fire_count
            || self.high_fire_count > self.critical_fire_count
        {
            return Err(ValidationError::GapThresholdsOrder);
        }
        if let Some(path) = &self.catalog_path {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::Empty("coverage.catalog_path"));
            }
        }
        Ok(())
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            medium_fire_count: default_medium_fire_count(),
            high_fire_count: default_high_fire_count(),
            critical_fire_count: default_critical_fire_count(),
        }
    }
}

fn default_medium_fire_count() -> u64 {
    1
}

fn default_high_fire_count() -> u64 {
    10
}

fn default_critical_fire_count() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_defaults() {
        let config = CoverageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gap_thresholds(), GapThresholds::default());
        assert!(!config.load_catalog().unwrap().is_empty());
    }

    #[test]
    fn test_unordered_fire_counts_rejected() {
        let config = CoverageConfig {
            high_fire_count: 1000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::GapThresholdsOrder));
    }
}
