//! Order state as reported by the endpoint.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderKind, Ticket};

/// Snapshot of an order looked up by ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    /// Ticket.
    pub ticket: Ticket,
    /// Instrument identifier.
    pub instrument: String,
    /// Order kind.
    pub kind: OrderKind,
    /// Remaining volume in lots.
    pub volume: Decimal,
    /// Open (or pending) price.
    pub open_price: Decimal,
    /// Current stop-loss (zero = not set).
    pub stop_loss: Decimal,
    /// Current take-profit (zero = not set).
    pub take_profit: Decimal,
    /// Set once the order has been closed or deleted.
    pub close_time: Option<DateTime<Utc>>,
}

impl OrderDetails {
    /// Returns true while the order has not been closed or deleted.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.close_time.is_none()
    }
}
