// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::type_complexity
    )
)]

//! Order Reliability - Rust Core Library
//!
//! Reliability layer between a trading strategy and a broker's order
//! endpoint. Every order operation is driven through a retry loop that
//! classifies the endpoint's reply, corrects the request where the reply
//! says how, backs off with a randomized delay, and reconciles replies that
//! leave the outcome unknown.
//!
//! # Architecture (Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure values and corrections
//!   - `order`: order kinds, tickets, working requests, order details
//!   - `instrument`: snapshots normalized to price increments
//!   - `corrections`: stop distance, pending price, slippage
//!
//! - **Broker**: Error-code classification and backoff pacing
//!
//! - **Application**: Ports, the retry orchestrator, use cases
//!   - `ports`: `OrderEndpointPort`, `MarketDataPort`, `Sleeper`
//!   - `services`: `RetryOrchestrator`, `OrderDetailsAccessor`
//!   - `use_cases`: Send, Modify, Close, Cancel
//!   - `OrderReliability`: the public operation surface
//!
//! - **Infrastructure**: Paper broker and sleeper adapters
//!
//! # Concurrency
//!
//! Each operation owns its request and retry state. `OrderReliability` is
//! `Clone` and may be shared across tasks; concurrent operations on the same
//! ticket are the caller's responsibility.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Layers
// =============================================================================

/// Domain layer - Order values and correction logic.
pub mod domain;

/// Broker layer - Error codes, classification and backoff.
pub mod broker;

/// Application layer - Ports, retry orchestration and use cases.
pub mod application;

/// Infrastructure layer - Paper broker and sleepers.
pub mod infrastructure;

/// Configuration loading and validation.
pub mod config;

/// Error types.
pub mod error;

/// Metrics and structured logging.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::instrument::{InstrumentMetadata, MarketSnapshot};
pub use domain::order::{CloseRequest, Direction, ModifyRequest, OrderDetails, OrderKind, OrderRequest, Ticket};

// Broker re-exports
pub use broker::{BackoffPolicy, BrokerErrorCode, ErrorCategory, OperationKind, classify};

// Application re-exports
pub use application::OrderReliability;
pub use application::ports::{MarketDataPort, OrderEndpointPort, Sleeper};

// Infrastructure re-exports
pub use infrastructure::{PaperBroker, RecordingSleeper, TokioSleeper};

// Config and error re-exports
pub use config::{Config, ConfigError, ReliabilityConfig};
pub use error::{EndpointError, OperationError, OperationResultExt};
