//! Engine configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PRISM_GUARD` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment yields a working engine.
//!
//! # Example
//!
//! ```no_run
//! use prism_guard::config::EngineConfig;
//!
//! let config = EngineConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Extracting every {:?}", config.pfp.extraction_interval());
//! ```

mod chain;
mod coverage;
mod error;
mod events;
mod history;
mod logging;
mod pfp;

pub use chain::ChainConfig;
pub use coverage::CoverageConfig;
pub use error::{ConfigError, ValidationError};
pub use events::EventsConfig;
pub use history::HistoryConfig;
pub use logging::LoggingConfig;
pub use pfp::{PfpConfig, PfpConfigUpdate, RiskConfig};

use serde::Deserialize;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PRISM_GUARD";

/// Keys whose environment values are comma-separated lists
const LIST_KEYS: &[&str] = &["pfp.call_number_buckets", "pfp.context_depth_buckets"];

/// Root engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Hook chain execution
    #[serde(default)]
    pub chain: ChainConfig,

    /// Telemetry ring capacities
    #[serde(default)]
    pub history: HistoryConfig,

    /// Event bus history
    #[serde(default)]
    pub events: EventsConfig,

    /// Pattern extraction and risk assessment
    #[serde(default)]
    pub pfp: PfpConfig,

    /// Event catalog and gap severity
    #[serde(default)]
    pub coverage: CoverageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PRISM_GUARD` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Splits bucket lists on commas
    /// 5. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PRISM_GUARD__CHAIN__MAX_PARALLEL_HOOKS=16` -> `chain.max_parallel_hooks = 16`
    /// - `PRISM_GUARD__PFP__CALL_NUMBER_BUCKETS=3,10` -> `pfp.call_number_buckets = [3, 10]`
    /// - `PRISM_GUARD__PFP__RISK__HIGH_ACTION=block` -> `pfp.risk.high_action = block`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let mut env = config::Environment::default()
            .prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }

        let config = config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate in one step
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.chain.validate()?;
        self.history.validate()?;
        self.events.validate()?;
        self.pfp.validate()?;
        self.coverage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::Recommendation;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "PRISM_GUARD__CHAIN__MAX_PARALLEL_HOOKS",
        "PRISM_GUARD__CHAIN__DEFAULT_TIMEOUT_MS",
        "PRISM_GUARD__PFP__DECAY_FACTOR",
        "PRISM_GUARD__PFP__CALL_NUMBER_BUCKETS",
        "PRISM_GUARD__PFP__RISK__HIGH_ACTION",
        "PRISM_GUARD__LOGGING__LOG_LEVEL",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let result = EngineConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.chain, ChainConfig::default());
        assert_eq!(config.pfp, PfpConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("PRISM_GUARD__CHAIN__MAX_PARALLEL_HOOKS", "16");
        env::set_var("PRISM_GUARD__CHAIN__DEFAULT_TIMEOUT_MS", "250");
        env::set_var("PRISM_GUARD__PFP__DECAY_FACTOR", "0.8");
        env::set_var("PRISM_GUARD__PFP__CALL_NUMBER_BUCKETS", "2,5,20");
        env::set_var("PRISM_GUARD__PFP__RISK__HIGH_ACTION", "block");
        env::set_var("PRISM_GUARD__LOGGING__LOG_LEVEL", "warn");
        let result = EngineConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.chain.max_parallel_hooks, 16);
        assert_eq!(config.chain.default_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.pfp.decay_factor, 0.8);
        assert_eq!(config.pfp.call_number_buckets, vec![2, 5, 20]);
        assert_eq!(config.pfp.risk.high_action, Recommendation::Block);
        assert_eq!(config.logging.log_level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("PRISM_GUARD__PFP__DECAY_FACTOR", "1.5");
        let result = EngineConfig::load_validated();
        clear_env();

        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }
}
