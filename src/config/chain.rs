//! Hook chain execution configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Hook chain configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainConfig {
    /// Worker pool size for parallel hook batches
    #[serde(default = "default_max_parallel_hooks")]
    pub max_parallel_hooks: usize,

    /// Deadline applied to chains that do not set their own
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,

    /// Limit for each compensating call during rollback
    #[serde(default = "default_compensation_timeout_ms")]
    pub compensation_timeout_ms: u64,

    /// How long a temporary disable lasts
    #[serde(default = "default_temporary_disable_secs")]
    pub temporary_disable_secs: u64,
}

impl ChainConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    pub fn compensation_timeout(&self) -> Duration {
        Duration::from_millis(self.compensation_timeout_ms)
    }

    /// Validate chain configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_parallel_hooks == 0 {
            return Err(ValidationError::MustBePositive("chain.max_parallel_hooks"));
        }
        if self.default_timeout_ms == Some(0) {
            return Err(ValidationError::MustBePositive("chain.default_timeout_ms"));
        }
        if self.compensation_timeout_ms == 0 {
            return Err(ValidationError::MustBePositive("chain.compensation_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_parallel_hooks: default_max_parallel_hooks(),
            default_timeout_ms: None,
            compensation_timeout_ms: default_compensation_timeout_ms(),
            temporary_disable_secs: default_temporary_disable_secs(),
        }
    }
}

fn default_max_parallel_hooks() -> usize {
    8
}

fn default_compensation_timeout_ms() -> u64 {
    5000
}

fn default_temporary_disable_secs() -> u64 {
    3600
}
