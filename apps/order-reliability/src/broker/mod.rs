//! Broker error semantics and retry pacing.
//!
//! This module maps raw endpoint error codes to retry categories and
//! provides the randomized backoff used between attempts.

mod classify;
mod codes;
mod retry;

pub use classify::{ClassificationPolicy, ErrorCategory, OperationKind, classify};
pub use codes::BrokerErrorCode;
pub use retry::BackoffPolicy;
