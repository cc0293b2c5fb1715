//! Order kind (market, limit or stop, per direction).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Direction;

/// Kind of order sent to the endpoint.
///
/// Market kinds fill immediately at the far side of the spread; pending kinds
/// rest at the requested price until triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Market buy.
    Buy,
    /// Market sell.
    Sell,
    /// Buy limit (below the ask).
    BuyLimit,
    /// Sell limit (above the bid).
    SellLimit,
    /// Buy stop (above the ask).
    BuyStop,
    /// Sell stop (below the bid).
    SellStop,
}

impl OrderKind {
    /// Direction of the position this order opens.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::Buy | Self::BuyLimit | Self::BuyStop => Direction::Long,
            Self::Sell | Self::SellLimit | Self::SellStop => Direction::Short,
        }
    }

    /// Returns true for limit and stop orders.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.is_market()
    }

    /// Returns true for market buy/sell.
    #[must_use]
    pub const fn is_market(&self) -> bool {
        matches!(self, Self::Buy | Self::Sell)
    }

    /// The market order with the same direction.
    #[must_use]
    pub const fn to_market(&self) -> Self {
        match self.direction() {
            Direction::Long => Self::Buy,
            Direction::Short => Self::Sell,
        }
    }

    /// Whether a one-increment nudge moves this pending price up.
    ///
    /// Buy stops and sell limits rest above the market, so moving away from
    /// the market means adding; buy limits and sell stops rest below it.
    #[must_use]
    pub const fn nudges_up(&self) -> bool {
        matches!(self, Self::BuyStop | Self::SellLimit)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::BuyLimit => "BUY_LIMIT",
            Self::SellLimit => "SELL_LIMIT",
            Self::BuyStop => "BUY_STOP",
            Self::SellStop => "SELL_STOP",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_direction() {
        assert_eq!(OrderKind::Buy.direction(), Direction::Long);
        assert_eq!(OrderKind::BuyLimit.direction(), Direction::Long);
        assert_eq!(OrderKind::BuyStop.direction(), Direction::Long);
        assert_eq!(OrderKind::Sell.direction(), Direction::Short);
        assert_eq!(OrderKind::SellLimit.direction(), Direction::Short);
        assert_eq!(OrderKind::SellStop.direction(), Direction::Short);
    }

    #[test]
    fn kind_pending() {
        assert!(OrderKind::Buy.is_market());
        assert!(OrderKind::Sell.is_market());
        assert!(OrderKind::BuyLimit.is_pending());
        assert!(OrderKind::SellStop.is_pending());
    }

    #[test]
    fn kind_to_market() {
        assert_eq!(OrderKind::BuyLimit.to_market(), OrderKind::Buy);
        assert_eq!(OrderKind::BuyStop.to_market(), OrderKind::Buy);
        assert_eq!(OrderKind::SellLimit.to_market(), OrderKind::Sell);
        assert_eq!(OrderKind::Sell.to_market(), OrderKind::Sell);
    }

    #[test]
    fn kind_nudge_direction() {
        assert!(OrderKind::BuyStop.nudges_up());
        assert!(OrderKind::SellLimit.nudges_up());
        assert!(!OrderKind::BuyLimit.nudges_up());
        assert!(!OrderKind::SellStop.nudges_up());
    }

    #[test]
    fn kind_display() {
        assert_eq!(OrderKind::BuyLimit.to_string(), "BUY_LIMIT");
        assert_eq!(OrderKind::SellStop.to_string(), "SELL_STOP");
    }
}
