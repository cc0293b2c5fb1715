//! Prometheus metrics for reliable order operations.
//!
//! Counters cover endpoint submissions, classified outcomes, backoff sleeps,
//! request corrections and pending-to-market conversions.
//!
//! # Example
//!
//! ```ignore
//! use order_reliability::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config)?;
//!
//! record_submission("send");
//! ```

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::MetricsSettings;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for backoff delays (in seconds).
    pub delay_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // 20ms floor up to the 500ms default cap
            delay_buckets: vec![0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.25, 0.5],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

impl TryFrom<&MetricsSettings> for MetricsConfig {
    type Error = MetricsError;

    fn try_from(settings: &MetricsSettings) -> Result<Self, Self::Error> {
        let addr = settings
            .listen_addr
            .parse()
            .map_err(|e| MetricsError::Configuration(format!("{}: {e}", settings.listen_addr)))?;
        Ok(Self::with_addr(addr))
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.delay_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Retry Loop Metrics
// ============================================================================

/// Record one call to an endpoint transmission primitive.
///
/// # Arguments
///
/// * `operation` - Operation kind (e.g., "send", "close")
pub fn record_submission(operation: &str) {
    counter!(
        "order_submissions_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record the classified outcome of one attempt.
///
/// # Arguments
///
/// * `operation` - Operation kind
/// * `category` - Classification (e.g., "transient", "fatal")
pub fn record_outcome(operation: &str, category: &str) {
    counter!(
        "order_attempt_outcomes_total",
        "operation" => operation.to_string(),
        "category" => category.to_string()
    )
    .increment(1);
}

/// Record a backoff sleep.
pub fn record_backoff(operation: &str, delay: Duration) {
    counter!(
        "order_backoff_sleeps_total",
        "operation" => operation.to_string()
    )
    .increment(1);

    histogram!(
        "order_backoff_delay_seconds",
        "operation" => operation.to_string()
    )
    .record(delay.as_secs_f64());
}

/// Record a request correction.
///
/// # Arguments
///
/// * `operation` - Operation kind
/// * `correction` - Correction applied (e.g., "snapped", "nudged", "stops")
pub fn record_correction(operation: &str, correction: &str) {
    counter!(
        "order_corrections_total",
        "operation" => operation.to_string(),
        "correction" => correction.to_string()
    )
    .increment(1);
}

/// Record a pending order resubmitted as a market order.
pub fn record_market_conversion(instrument: &str) {
    counter!(
        "order_market_conversions_total",
        "instrument" => instrument.to_string()
    )
    .increment(1);
}

/// Record the terminal result of an operation.
///
/// # Arguments
///
/// * `operation` - Public operation name (e.g., "SendOrder")
/// * `result` - Terminal result (e.g., "succeeded", "failed", "ambiguous")
pub fn record_terminal(operation: &str, result: &str) {
    counter!(
        "order_operations_total",
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}
