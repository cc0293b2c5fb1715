//! Structured logging for reliable order operations.
//!
//! Two pieces:
//!
//! - [`init_tracing`] installs the `tracing-subscriber` formatter selected by
//!   configuration (`pretty` or `json`).
//! - [`OperationLog`] gates the retry loop's own log lines by the configured
//!   error verbosity. Inside a simulated context the loop stays silent unless
//!   verbosity is raised to [`VERBOSE_IN_SIMULATION`] or above.
//!
//! | Verbosity | Emitted |
//! |-----------|---------|
//! | 0 | nothing |
//! | 1 | errors |
//! | 2 | errors, warnings |
//! | 3 (default) | errors, warnings, info |
//! | 99+ | everything, even when simulated |

use serde_json::Value;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use crate::config::LoggingConfig;
use crate::domain::corrections::StopLevels;
use crate::error::OperationError;

/// Verbosity at which a simulated context still logs.
pub const VERBOSE_IN_SIMULATION: u32 = 99;

/// Log tier of a retry loop line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Terminal failures.
    Error = 1,
    /// Retries, holds, refused conversions.
    Warn = 2,
    /// Successes and corrections.
    Info = 3,
}

/// Verbosity gate bound to one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationLog {
    operation: &'static str,
    verbosity: u32,
    simulated: bool,
}

impl OperationLog {
    /// Create a gate for `operation`.
    #[must_use]
    pub const fn new(operation: &'static str, verbosity: u32, simulated: bool) -> Self {
        Self {
            operation,
            verbosity,
            simulated,
        }
    }

    /// Operation tag carried on every line.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Returns true if a line at `tier` should be emitted.
    #[must_use]
    pub const fn allows(&self, tier: Verbosity) -> bool {
        if self.verbosity == 0 {
            return false;
        }
        if self.simulated && self.verbosity < VERBOSE_IN_SIMULATION {
            return false;
        }
        self.verbosity >= tier as u32
    }

    /// Report stop levels moved to the minimum distance.
    ///
    /// Returns true if `after` differs from `before`, whether or not the
    /// line was emitted.
    pub fn stops_moved(&self, before: StopLevels, after: StopLevels) -> bool {
        if before == after {
            return false;
        }
        if self.allows(Verbosity::Info) {
            tracing::info!(
                operation = self.operation,
                from_stop_loss = %before.stop_loss,
                to_stop_loss = %after.stop_loss,
                from_take_profit = %before.take_profit,
                to_take_profit = %after.take_profit,
                "Stops moved to satisfy minimum distance"
            );
        }
        true
    }

    /// Log a terminal failure with the final request parameters.
    pub fn failure(&self, error: &OperationError, request: &Value) {
        if !self.allows(Verbosity::Error) {
            return;
        }
        let code = error.last_code();
        tracing::error!(
            operation = self.operation,
            last_code = code.map(i32::from),
            description = code.map(|c| c.description()),
            attempts = error.attempts(),
            request = %request,
            "{error}"
        );
    }
}

/// Error type for tracing initialization.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Invalid filter directive.
    #[error("invalid log level directive '{directive}': {message}")]
    Directive {
        /// Directive that failed to parse.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// Subscriber already installed or failed to install.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at the configured
/// level.
///
/// # Errors
///
/// Returns an error if the level directive is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let directive = format!("order_reliability={}", config.level);
    let parsed: Directive = directive.parse().map_err(|e| TracingError::Directive {
        directive: directive.clone(),
        message: format!("{e}"),
    })?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(parsed);

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    let result = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };

    result.map_err(|e| TracingError::SubscriberError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use test_case::test_case;

    #[test_case(0, false => (false, false, false))]
    #[test_case(1, false => (true, false, false))]
    #[test_case(2, false => (true, true, false))]
    #[test_case(3, false => (true, true, true))]
    #[test_case(3, true => (false, false, false))]
    #[test_case(98, true => (false, false, false))]
    #[test_case(99, true => (true, true, true))]
    fn verbosity_gate(verbosity: u32, simulated: bool) -> (bool, bool, bool) {
        let log = OperationLog::new("SendOrder", verbosity, simulated);
        (
            log.allows(Verbosity::Error),
            log.allows(Verbosity::Warn),
            log.allows(Verbosity::Info),
        )
    }

    #[test]
    fn failure_logging_is_silent_when_disabled() {
        let log = OperationLog::new("CloseOrder", 0, false);
        log.failure(
            &OperationError::InvalidRequest("volume".to_string()),
            &serde_json::json!({"ticket": 1}),
        );
        assert_eq!(log.operation(), "CloseOrder");
    }

    #[test]
    fn stop_moves_are_reported_even_when_silent() {
        let silent = OperationLog::new("ModifyOrder", 0, false);
        let before = StopLevels::new(Decimal::new(119_950, 5), Decimal::ZERO);
        let after = StopLevels::new(Decimal::new(119_900, 5), Decimal::ZERO);

        assert!(!silent.allows(Verbosity::Info));
        assert!(silent.stops_moved(before, after));
        assert!(!silent.stops_moved(after, after));
    }

    #[test]
    fn invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            format: "pretty".to_string(),
        };
        assert!(matches!(
            init_tracing(&config),
            Err(TracingError::Directive { .. })
        ));
    }
}
