//! Retry and correction settings bound into every operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::broker::{BackoffPolicy, ClassificationPolicy};

/// Settings for the retry/correction engine.
///
/// Set once at startup and read by in-flight operations; nothing writes to
/// it while operations run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Mean backoff in milliseconds.
    #[serde(default = "default_sleep_mean_ms")]
    pub sleep_mean_ms: u64,
    /// Minimum backoff in milliseconds.
    #[serde(default = "default_sleep_floor_ms")]
    pub sleep_floor_ms: u64,
    /// Maximum backoff in milliseconds.
    #[serde(default = "default_sleep_cap_ms")]
    pub sleep_cap_ms: u64,
    /// Log verbosity: 0 silent, 1 errors, 2 warnings, 3 info, 99 also in simulation.
    #[serde(default = "default_error_level")]
    pub error_level: u32,
    /// Convert rejected pending orders near the market into market orders.
    #[serde(default)]
    pub limit_to_market: bool,
    /// Run the retry machinery inside simulated contexts too.
    #[serde(default)]
    pub retry_in_simulation: bool,
    /// Append the current spread to order comments.
    #[serde(default)]
    pub annotate_comment: bool,
    /// Treat market-closed and trade-disabled as transient.
    #[serde(default)]
    pub retry_market_closed: bool,
    /// Overall wall-clock deadline per operation in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            sleep_mean_ms: default_sleep_mean_ms(),
            sleep_floor_ms: default_sleep_floor_ms(),
            sleep_cap_ms: default_sleep_cap_ms(),
            error_level: default_error_level(),
            limit_to_market: false,
            retry_in_simulation: false,
            annotate_comment: false,
            retry_market_closed: false,
            deadline_ms: None,
        }
    }
}

impl ReliabilityConfig {
    /// Total submissions allowed: the initial attempt plus retries.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff policy built from the sleep settings.
    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.sleep_mean_ms),
            Duration::from_millis(self.sleep_floor_ms),
            Duration::from_millis(self.sleep_cap_ms),
        )
    }

    /// Classification rows selected by configuration.
    #[must_use]
    pub const fn classification(&self) -> ClassificationPolicy {
        ClassificationPolicy {
            retry_market_closed: self.retry_market_closed,
        }
    }

    /// Overall deadline, if configured.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Set the retry count.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Enable limit-to-market conversion.
    #[must_use]
    pub const fn with_limit_to_market(mut self, enabled: bool) -> Self {
        self.limit_to_market = enabled;
        self
    }

    /// Run retries inside simulated contexts.
    #[must_use]
    pub const fn with_retry_in_simulation(mut self, enabled: bool) -> Self {
        self.retry_in_simulation = enabled;
        self
    }

    /// Set the overall deadline.
    #[must_use]
    pub const fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_sleep_mean_ms() -> u64 {
    50
}

const fn default_sleep_floor_ms() -> u64 {
    20
}

const fn default_sleep_cap_ms() -> u64 {
    500 // 10x mean
}

const fn default_error_level() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliability_defaults() {
        let config = ReliabilityConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_attempts(), 6);
        assert_eq!(config.sleep_mean_ms, 50);
        assert_eq!(config.error_level, 3);
        assert!(!config.limit_to_market);
        assert!(!config.retry_in_simulation);
        assert!(!config.annotate_comment);
        assert!(!config.retry_market_closed);
        assert!(config.deadline().is_none());
    }

    #[test]
    fn test_backoff_from_config() {
        let config = ReliabilityConfig {
            sleep_mean_ms: 80,
            sleep_floor_ms: 30,
            sleep_cap_ms: 400,
            ..Default::default()
        };
        let backoff = config.backoff();

        assert_eq!(backoff.mean, Duration::from_millis(80));
        assert_eq!(backoff.floor, Duration::from_millis(30));
        assert_eq!(backoff.cap, Duration::from_millis(400));
    }

    #[test]
    fn test_builders() {
        let config = ReliabilityConfig::default()
            .with_max_retries(2)
            .with_limit_to_market(true)
            .with_deadline_ms(1500);

        assert_eq!(config.max_attempts(), 3);
        assert!(config.limit_to_market);
        assert_eq!(config.deadline(), Some(Duration::from_millis(1500)));
    }
}
