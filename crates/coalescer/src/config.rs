//! Coalescer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Shortest accepted quiet period
pub const MIN_QUIET_PERIOD_MS: u64 = 1;

/// Longest accepted quiet period (one minute)
pub const MAX_QUIET_PERIOD_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("quiet_period_ms must be between {min} and {max}, got {value}")]
    QuietPeriodOutOfRange { value: u64, min: u64, max: u64 },
}

/// Coalescer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoalescerConfig {
    /// Delay between the last edit of a key and its commit (default: 500ms)
    pub quiet_period_ms: u64,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 500,
        }
    }
}

impl CoalescerConfig {
    pub fn with_quiet_period_ms(quiet_period_ms: u64) -> Self {
        Self { quiet_period_ms }
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_QUIET_PERIOD_MS..=MAX_QUIET_PERIOD_MS).contains(&self.quiet_period_ms) {
            return Err(ConfigError::QuietPeriodOutOfRange {
                value: self.quiet_period_ms,
                min: MIN_QUIET_PERIOD_MS,
                max: MAX_QUIET_PERIOD_MS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quiet_period() {
        let config = CoalescerConfig::default();
        assert_eq!(config.quiet_period(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_range() {
        assert!(CoalescerConfig::with_quiet_period_ms(0).validate().is_err());
        assert!(CoalescerConfig::with_quiet_period_ms(1).validate().is_ok());
        assert!(CoalescerConfig::with_quiet_period_ms(60_000).validate().is_ok());
        assert!(CoalescerConfig::with_quiet_period_ms(60_001).validate().is_err());
    }

    #[test]
    fn test_deserialize_missing_fields_uses_defaults() {
        let config: CoalescerConfig = toml::from_str("").unwrap();
        assert_eq!(config, CoalescerConfig::default());

        let config: CoalescerConfig = toml::from_str("quiet_period_ms = 250").unwrap();
        assert_eq!(config.quiet_period_ms, 250);
    }
}
