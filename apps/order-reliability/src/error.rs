//! Error types for reliable order operations.
//!
//! Retryable broker replies never surface here; they are absorbed by the
//! retry loop up to the attempt cap. What reaches the caller:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Fatal` | Broker reply classified fatal; no further attempts made |
//! | `RetriesExhausted` | Attempt cap reached on retryable replies |
//! | `Ambiguous` | Execution state unknown (deadline abort, unverifiable reply) |
//! | `StillOpen` | Close reported success but the order is still open |
//! | `OrderNotFound` | Ticket lookup failed |
//! | `InvalidRequest` | Request cannot be sent as given |
//! | `Endpoint` | Collaborator (market data, lookup) failure |

use thiserror::Error;

use crate::broker::BrokerErrorCode;
use crate::domain::order::Ticket;

/// Failure of a collaborator call outside the order-transmission primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// No order with this ticket.
    #[error("Order not found: {ticket}")]
    OrderNotFound {
        /// The missing ticket.
        ticket: Ticket,
    },

    /// No market data for this instrument.
    #[error("Market data unavailable for {instrument}")]
    MarketDataUnavailable {
        /// Instrument identifier.
        instrument: String,
    },

    /// Collaborator connection failure.
    #[error("Endpoint connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },
}

/// Terminal failure of a reliable operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Broker reply classified fatal.
    #[error("Fatal broker error {code} after {attempts} attempt(s)")]
    Fatal {
        /// Last raw code.
        code: BrokerErrorCode,
        /// Attempts made.
        attempts: u32,
    },

    /// Attempt cap reached.
    #[error("Retry attempts maxed at {attempts} (last error: {})", describe_last(.code))]
    RetriesExhausted {
        /// Last raw code, if the endpoint was contacted at all.
        code: Option<BrokerErrorCode>,
        /// Attempts made.
        attempts: u32,
    },

    /// Unknown whether the operation executed.
    #[error("Ambiguous outcome: {reason}")]
    Ambiguous {
        /// What made the outcome ambiguous.
        reason: String,
    },

    /// Close reported success but the order is still open.
    #[error("Order {ticket} still open after close reported success; manual retry required")]
    StillOpen {
        /// The order still open.
        ticket: Ticket,
    },

    /// Order not found.
    #[error("Order not found: {ticket}")]
    OrderNotFound {
        /// The missing ticket.
        ticket: Ticket,
    },

    /// Request cannot be sent as given.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Collaborator failure.
    #[error(transparent)]
    Endpoint(EndpointError),
}

#[allow(clippy::ref_option)]
fn describe_last(code: &Option<BrokerErrorCode>) -> String {
    code.as_ref().map_or_else(|| "not submitted, slippage beyond tolerance".to_string(), ToString::to_string)
}

impl From<EndpointError> for OperationError {
    fn from(error: EndpointError) -> Self {
        match error {
            EndpointError::OrderNotFound { ticket } => Self::OrderNotFound { ticket },
            other => Self::Endpoint(other),
        }
    }
}

impl OperationError {
    /// Last raw broker code, when one was received.
    #[must_use]
    pub const fn last_code(&self) -> Option<BrokerErrorCode> {
        match self {
            Self::Fatal { code, .. } => Some(*code),
            Self::RetriesExhausted { code, .. } => *code,
            _ => None,
        }
    }

    /// Attempts made before failing, when known.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Fatal { attempts, .. } | Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Returns true when the caller must reconcile the order state itself.
    #[must_use]
    pub const fn requires_verification(&self) -> bool {
        matches!(self, Self::Ambiguous { .. } | Self::StillOpen { .. })
    }
}

/// Collapse results to the raw sentinels of the endpoint convention.
pub trait OperationResultExt {
    /// `false` on failure.
    fn succeeded(&self) -> bool;

    /// Ticket value, or `-1` on failure. Non-ticket results report `-1` too.
    fn ticket_or_sentinel(&self) -> i64;
}

impl OperationResultExt for Result<Ticket, OperationError> {
    fn succeeded(&self) -> bool {
        self.is_ok()
    }

    fn ticket_or_sentinel(&self) -> i64 {
        self.as_ref().map_or(Ticket::INVALID.value(), Ticket::value)
    }
}

impl OperationResultExt for Result<(), OperationError> {
    fn succeeded(&self) -> bool {
        self.is_ok()
    }

    fn ticket_or_sentinel(&self) -> i64 {
        Ticket::INVALID.value()
    }
}
