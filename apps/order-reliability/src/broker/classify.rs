//! Error classification per operation kind.
//!
//! # Categories
//!
//! | Category | Action |
//! |----------|--------|
//! | Success | Done |
//! | RetryableTransient | Back off, refresh prices, resubmit unchanged |
//! | RetryableImmediate | Refresh prices, resubmit without sleeping |
//! | RetryableCorrectable | Correct the request, then resubmit |
//! | Ambiguous | Verify against the order state before reporting |
//! | Fatal | Abandon |
//!
//! The table is keyed per operation: send, modify, close and cancel share most
//! rows but differ on no-result, invalid price/stops and modify-denied.
//! Market-closed and trade-disabled are fatal unless the policy opts in.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::codes::BrokerErrorCode;

/// Operation kind used to select classification rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Open a market or pending order.
    Send,
    /// Amend price/stops/expiration.
    Modify,
    /// Close an open position.
    Close,
    /// Delete a pending order.
    Cancel,
}

impl OperationKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Modify => "modify",
            Self::Close => "close",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one endpoint reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Operation succeeded (or was a no-op matching server state).
    Success,
    /// Connectivity/busy/timeout class; retry after backoff.
    RetryableTransient,
    /// Requote/price changed; retry immediately.
    RetryableImmediate,
    /// Invalid price/stops; retry only after correcting the request.
    RetryableCorrectable,
    /// Reply does not establish whether the operation executed.
    Ambiguous,
    /// Abandon immediately.
    Fatal,
}

impl ErrorCategory {
    /// Returns true for the three retryable categories.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RetryableTransient | Self::RetryableImmediate | Self::RetryableCorrectable
        )
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RetryableTransient => "transient",
            Self::RetryableImmediate => "immediate",
            Self::RetryableCorrectable => "correctable",
            Self::Ambiguous => "ambiguous",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configurable rows of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationPolicy {
    /// Treat market-closed and trade-disabled as transient.
    pub retry_market_closed: bool,
}

/// Classify `code` for `operation` under `policy`.
#[must_use]
pub const fn classify(
    code: BrokerErrorCode,
    operation: OperationKind,
    policy: ClassificationPolicy,
) -> ErrorCategory {
    use BrokerErrorCode as C;
    use OperationKind as Op;

    match (code, operation) {
        (C::NoError, _) => ErrorCategory::Success,

        (C::NoResult, Op::Modify) => ErrorCategory::Success,
        (C::NoResult, Op::Send | Op::Close | Op::Cancel) => ErrorCategory::Ambiguous,

        (
            C::ServerBusy
            | C::NoConnection
            | C::TooFrequentRequests
            | C::TradeTimeout
            | C::OffQuotes
            | C::BrokerBusy
            | C::TooManyRequests
            | C::TradeContextBusy,
            _,
        ) => ErrorCategory::RetryableTransient,

        (C::PriceChanged | C::Requote, _) => ErrorCategory::RetryableImmediate,

        (C::InvalidPrice | C::InvalidStops, Op::Send | Op::Modify | Op::Close) => {
            ErrorCategory::RetryableCorrectable
        }

        (C::TradeModifyDenied, Op::Modify) => ErrorCategory::RetryableTransient,

        (C::MarketClosed | C::TradeDisabled, _) if policy.retry_market_closed => {
            ErrorCategory::RetryableTransient
        }

        _ => ErrorCategory::Fatal,
    }
}
