//! Instrument market data and price-increment arithmetic.
//!
//! [`MarketSnapshot`] is what the market-data collaborator reports.
//! [`InstrumentMetadata`] is the normalized view every correction works from:
//! brokers quoting fractional pips (3 or 5 digits) report a raw tick ten times
//! finer than the conventional increment, so the increment is scaled by 10.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::Direction;

/// Raw market snapshot for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Raw tick size reported by the broker.
    pub point: Decimal,
    /// Server-enforced minimum stop distance, in price increments.
    pub stop_level: u32,
    /// Decimal precision of prices.
    pub digits: u32,
}

/// Read-only per-attempt view of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    /// Decimal precision of prices.
    pub digits: u32,
    /// Price increment after fractional-pip normalization.
    pub point: Decimal,
    /// Minimum stop distance, in price increments.
    pub min_stop_distance: u32,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
}

impl InstrumentMetadata {
    /// Normalize a raw snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        let point = if matches!(snapshot.digits, 3 | 5) {
            snapshot.point * Decimal::TEN
        } else {
            snapshot.point
        };

        Self {
            digits: snapshot.digits,
            point,
            min_stop_distance: snapshot.stop_level,
            bid: snapshot.bid,
            ask: snapshot.ask,
        }
    }

    /// Minimum stop distance in price units.
    #[must_use]
    pub fn min_distance(&self) -> Decimal {
        Decimal::from(self.min_stop_distance) * self.point
    }

    /// Current spread in price units.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Current spread in price increments.
    #[must_use]
    pub fn spread_points(&self) -> Decimal {
        self.to_points(self.spread())
    }

    /// Price a new position in `direction` fills at (ask for long, bid for short).
    #[must_use]
    pub const fn entry_price(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => self.ask,
            Direction::Short => self.bid,
        }
    }

    /// Price a position in `direction` closes at (bid for long, ask for short).
    #[must_use]
    pub const fn exit_price(&self, direction: Direction) -> Decimal {
        self.entry_price(direction.opposite())
    }

    /// Round a price to the instrument precision.
    #[must_use]
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp(self.digits)
    }

    /// Convert a price difference to price increments.
    #[must_use]
    pub fn to_points(&self, delta: Decimal) -> Decimal {
        if self.point.is_zero() {
            return Decimal::ZERO;
        }
        delta / self.point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(digits: u32, point: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            bid: dec!(1.20000),
            ask: dec!(1.20020),
            point,
            stop_level: 100,
            digits,
        }
    }

    #[test]
    fn fractional_pip_point_is_scaled() {
        let meta = InstrumentMetadata::from_snapshot(&snapshot(5, dec!(0.00001)));
        assert_eq!(meta.point, dec!(0.0001));
        assert_eq!(meta.min_distance(), dec!(0.01));

        let meta = InstrumentMetadata::from_snapshot(&snapshot(3, dec!(0.001)));
        assert_eq!(meta.point, dec!(0.01));
    }

    #[test]
    fn conventional_point_is_kept() {
        let meta = InstrumentMetadata::from_snapshot(&snapshot(4, dec!(0.0001)));
        assert_eq!(meta.point, dec!(0.0001));

        let meta = InstrumentMetadata::from_snapshot(&snapshot(2, dec!(0.01)));
        assert_eq!(meta.point, dec!(0.01));
    }

    #[test]
    fn entry_and_exit_sides() {
        let meta = InstrumentMetadata::from_snapshot(&snapshot(5, dec!(0.00001)));
        assert_eq!(meta.entry_price(Direction::Long), dec!(1.20020));
        assert_eq!(meta.entry_price(Direction::Short), dec!(1.20000));
        assert_eq!(meta.exit_price(Direction::Long), dec!(1.20000));
        assert_eq!(meta.exit_price(Direction::Short), dec!(1.20020));
    }

    #[test]
    fn spread_in_points() {
        let meta = InstrumentMetadata::from_snapshot(&snapshot(5, dec!(0.00001)));
        assert_eq!(meta.spread(), dec!(0.00020));
        assert_eq!(meta.spread_points(), dec!(2));
    }

    #[test]
    fn zero_point_does_not_divide() {
        let meta = InstrumentMetadata::from_snapshot(&snapshot(4, Decimal::ZERO));
        assert_eq!(meta.to_points(dec!(0.5)), Decimal::ZERO);
    }
}
