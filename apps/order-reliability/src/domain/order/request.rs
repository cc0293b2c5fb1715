//! Working requests carried through a retry sequence.
//!
//! A request is owned by exactly one in-flight operation and mutated in place
//! as corrections are applied between attempts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderKind, Ticket};

/// Shift a stop level by `delta`, leaving an unset (zero) level untouched.
#[must_use]
pub fn shift_level(level: Decimal, delta: Decimal) -> Decimal {
    if level.is_zero() { level } else { level + delta }
}

/// Request to open an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Instrument identifier.
    pub instrument: String,
    /// Order kind.
    pub kind: OrderKind,
    /// Volume in lots.
    pub volume: Decimal,
    /// Requested price.
    pub price: Decimal,
    /// Stop-loss level (zero = not set).
    pub stop_loss: Decimal,
    /// Take-profit level (zero = not set).
    pub take_profit: Decimal,
    /// Maximum slippage in price increments.
    pub slippage: u32,
    /// Order comment.
    pub comment: String,
    /// Opaque caller tag.
    pub magic: i64,
    /// Expiration for pending orders.
    pub expiration: Option<DateTime<Utc>>,
}

impl OrderRequest {
    /// Create a request without stops.
    #[must_use]
    pub fn new(instrument: impl Into<String>, kind: OrderKind, volume: Decimal, price: Decimal) -> Self {
        Self {
            instrument: instrument.into(),
            kind,
            volume,
            price,
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            slippage: 0,
            comment: String::new(),
            magic: 0,
            expiration: None,
        }
    }

    /// Set stop-loss and take-profit.
    #[must_use]
    pub const fn with_stops(mut self, stop_loss: Decimal, take_profit: Decimal) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// Set the slippage tolerance.
    #[must_use]
    pub const fn with_slippage(mut self, slippage: u32) -> Self {
        self.slippage = slippage;
        self
    }

    /// Set the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set the caller tag.
    #[must_use]
    pub const fn with_magic(mut self, magic: i64) -> Self {
        self.magic = magic;
        self
    }

    /// Set the expiration.
    #[must_use]
    pub const fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Returns true if either stop level is set.
    #[must_use]
    pub fn has_stops(&self) -> bool {
        !self.stop_loss.is_zero() || !self.take_profit.is_zero()
    }

    /// Same request with both stop levels cleared.
    #[must_use]
    pub fn without_stops(&self) -> Self {
        Self {
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            ..self.clone()
        }
    }

    /// Move both stop levels by `delta`, keeping their distance from price.
    pub fn shift_stops(&mut self, delta: Decimal) {
        self.stop_loss = shift_level(self.stop_loss, delta);
        self.take_profit = shift_level(self.take_profit, delta);
    }

    /// Round price and stop levels to the instrument precision.
    pub fn round_to(&mut self, digits: u32) {
        self.price = self.price.round_dp(digits);
        self.stop_loss = self.stop_loss.round_dp(digits);
        self.take_profit = self.take_profit.round_dp(digits);
    }
}

/// Request to amend an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRequest {
    /// Order to amend.
    pub ticket: Ticket,
    /// New price (only meaningful for pending orders).
    pub price: Decimal,
    /// New stop-loss (zero = not set).
    pub stop_loss: Decimal,
    /// New take-profit (zero = not set).
    pub take_profit: Decimal,
    /// New expiration.
    pub expiration: Option<DateTime<Utc>>,
}

impl ModifyRequest {
    /// Create a modify request.
    #[must_use]
    pub const fn new(ticket: Ticket, price: Decimal, stop_loss: Decimal, take_profit: Decimal) -> Self {
        Self {
            ticket,
            price,
            stop_loss,
            take_profit,
            expiration: None,
        }
    }

    /// Set the expiration.
    #[must_use]
    pub const fn with_expiration(mut self, expiration: Option<DateTime<Utc>>) -> Self {
        self.expiration = expiration;
        self
    }

    /// Round price and stop levels to the instrument precision.
    pub fn round_to(&mut self, digits: u32) {
        self.price = self.price.round_dp(digits);
        self.stop_loss = self.stop_loss.round_dp(digits);
        self.take_profit = self.take_profit.round_dp(digits);
    }
}

/// Request to close an open position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseRequest {
    /// Position to close.
    pub ticket: Ticket,
    /// Volume to close; zero closes the whole position and is resolved to
    /// the position volume before anything is sent.
    pub volume: Decimal,
    /// Requested close price.
    pub price: Decimal,
    /// Maximum slippage in price increments.
    pub slippage: u32,
}

impl CloseRequest {
    /// Create a close request.
    #[must_use]
    pub const fn new(ticket: Ticket, volume: Decimal, price: Decimal, slippage: u32) -> Self {
        Self {
            ticket,
            volume,
            price,
            slippage,
        }
    }
}
