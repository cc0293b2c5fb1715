//! Observability module for metrics and logging.
//!
//! This module provides instrumentation for the retry loop,
//! including Prometheus metrics export and verbosity-gated structured logs.

mod logging;
mod metrics;

pub use self::logging::{OperationLog, TracingError, VERBOSE_IN_SIMULATION, Verbosity, init_tracing};
pub use self::metrics::{
    MetricsConfig, MetricsError, init_metrics, record_backoff, record_correction,
    record_market_conversion, record_outcome, record_submission, record_terminal,
};
