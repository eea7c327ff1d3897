// ABOUTME: Serializable rate configuration for building a Limiter.
// ABOUTME: Validates count and period before construction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rate expressed as `count` calls per `per_ms` milliseconds.
///
/// The period has millisecond granularity. Build the [`Limiter`](super::Limiter)
/// with [`Limiter::new`](super::Limiter::new) directly for finer periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateConfig {
    /// Calls permitted per period
    pub count: u32,
    /// Period length in milliseconds
    #[serde(default = "default_per_ms")]
    pub per_ms: u64,
}

impl RateConfig {
    pub fn new(count: u32, per_ms: u64) -> Self {
        Self { count, per_ms }
    }

    /// Period as a duration.
    pub fn per(&self) -> Duration {
        Duration::from_millis(self.per_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::ZeroCount);
        }
        if self.per_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

fn default_per_ms() -> u64 {
    1000
}
