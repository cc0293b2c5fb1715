//! Slippage measurement against a requested price.
//!
//! Slippage uses one signed convention throughout: positive is adverse
//! (paying more on a buy, receiving less on a sell), negative is favorable.
//! Tolerance is compared against the signed value, so favorable moves of any
//! size are always acceptable.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::instrument::InstrumentMetadata;
use crate::domain::order::Direction;

/// Result of comparing the current price with the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageCheck {
    /// Signed price move `current - requested`.
    pub delta: Decimal,
    /// Adverse slippage in price increments (negative when favorable).
    pub slipped_points: Decimal,
    /// Whether the adverse slippage is within tolerance.
    pub within_tolerance: bool,
    /// Slippage budget left for the endpoint, in whole increments.
    pub remaining_points: u32,
}

/// Computes realized slippage and the budget left for the endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlippageTracker;

impl SlippageTracker {
    /// Adverse slippage in increments for a position in `direction`.
    #[must_use]
    pub fn adverse_points(
        meta: &InstrumentMetadata,
        direction: Direction,
        requested: Decimal,
        current: Decimal,
    ) -> Decimal {
        meta.to_points((current - requested) * direction.sign())
    }

    /// Evaluate `current` against `requested` with a tolerance in increments.
    #[must_use]
    pub fn evaluate(
        meta: &InstrumentMetadata,
        direction: Direction,
        requested: Decimal,
        current: Decimal,
        tolerance: u32,
    ) -> SlippageCheck {
        let slipped_points = Self::adverse_points(meta, direction, requested, current);
        let tolerance = Decimal::from(tolerance);
        let within_tolerance = slipped_points <= tolerance;

        let remaining_points = if within_tolerance {
            (tolerance - slipped_points)
                .floor()
                .max(Decimal::ZERO)
                .to_u32()
                .unwrap_or(u32::MAX)
        } else {
            0
        };

        SlippageCheck {
            delta: current - requested,
            slipped_points,
            within_tolerance,
            remaining_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn meta() -> InstrumentMetadata {
        InstrumentMetadata {
            digits: 4,
            point: dec!(0.0001),
            min_stop_distance: 10,
            bid: dec!(1.2000),
            ask: dec!(1.2002),
        }
    }

    #[test]
    fn adverse_long_is_positive() {
        let check = SlippageTracker::evaluate(&meta(), Direction::Long, dec!(1.2000), dec!(1.2003), 5);

        assert_eq!(check.slipped_points, dec!(3));
        assert_eq!(check.delta, dec!(0.0003));
        assert!(check.within_tolerance);
        assert_eq!(check.remaining_points, 2);
    }

    #[test]
    fn adverse_short_is_positive() {
        let check = SlippageTracker::evaluate(&meta(), Direction::Short, dec!(1.2000), dec!(1.1996), 3);

        assert_eq!(check.slipped_points, dec!(4));
        assert!(!check.within_tolerance);
        assert_eq!(check.remaining_points, 0);
    }

    #[test]
    fn favorable_move_is_always_within_tolerance() {
        let check = SlippageTracker::evaluate(&meta(), Direction::Long, dec!(1.2000), dec!(1.1990), 0);

        assert_eq!(check.slipped_points, dec!(-10));
        assert!(check.within_tolerance);
        assert_eq!(check.remaining_points, 10);

        let check = SlippageTracker::evaluate(&meta(), Direction::Short, dec!(1.2000), dec!(1.2010), 0);
        assert_eq!(check.slipped_points, dec!(-10));
        assert!(check.within_tolerance);
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let check = SlippageTracker::evaluate(&meta(), Direction::Long, dec!(1.2000), dec!(1.2005), 5);

        assert!(check.within_tolerance);
        assert_eq!(check.remaining_points, 0);
    }
}
