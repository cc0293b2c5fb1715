//! Stop-distance admissibility.
//!
//! Brokers reject stop-loss/take-profit levels closer to the reference price
//! than the server minimum distance. The corrector clamps each level outward:
//!
//! | Direction | Stop-loss | Take-profit |
//! |-----------|-----------|-------------|
//! | Long  | `<= price - min_dist` (minus spread for new market orders) | `>= price + min_dist` |
//! | Short | `>= price + min_dist` (plus spread for new market orders)  | `<= price - min_dist` |
//!
//! A level is only ever moved away from price, never closer, and a zero level
//! (not set) is left alone. Callers log the moves under their own verbosity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::instrument::InstrumentMetadata;
use crate::domain::order::Direction;

/// A stop-loss/take-profit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopLevels {
    /// Stop-loss (zero = not set).
    pub stop_loss: Decimal,
    /// Take-profit (zero = not set).
    pub take_profit: Decimal,
}

impl StopLevels {
    /// Create a pair.
    #[must_use]
    pub const fn new(stop_loss: Decimal, take_profit: Decimal) -> Self {
        Self {
            stop_loss,
            take_profit,
        }
    }
}

/// Clamps stop levels to the broker minimum distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopDistanceCorrector;

impl StopDistanceCorrector {
    /// Correct `stop_loss`/`take_profit` relative to `price`.
    ///
    /// For a brand-new market order the stop-loss bound additionally accounts
    /// for the spread, since the fill happens at the far side.
    #[must_use]
    pub fn correct(
        meta: &InstrumentMetadata,
        direction: Direction,
        price: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        is_new_market_order: bool,
    ) -> StopLevels {
        let price = meta.round(price);
        let stop_loss = meta.round(stop_loss);
        let take_profit = meta.round(take_profit);

        let min_dist = meta.min_distance();
        let spread = if is_new_market_order {
            meta.spread()
        } else {
            Decimal::ZERO
        };

        let (sl_bound, tp_bound) = match direction {
            Direction::Long => (price - min_dist - spread, price + min_dist),
            Direction::Short => (price + min_dist + spread, price - min_dist),
        };
        let sl_bound = meta.round(sl_bound);
        let tp_bound = meta.round(tp_bound);

        let corrected_sl = if stop_loss.is_zero() {
            stop_loss
        } else {
            match direction {
                Direction::Long => stop_loss.min(sl_bound),
                Direction::Short => stop_loss.max(sl_bound),
            }
        };

        let corrected_tp = if take_profit.is_zero() {
            take_profit
        } else {
            match direction {
                Direction::Long => take_profit.max(tp_bound),
                Direction::Short => take_profit.min(tp_bound),
            }
        };

        StopLevels::new(corrected_sl, corrected_tp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    /// digits=5, raw point 0.00001 (scaled to 0.0001), stop level 100 => 0.01.
    fn fractional_pip_meta() -> InstrumentMetadata {
        InstrumentMetadata {
            digits: 5,
            point: dec!(0.0001),
            min_stop_distance: 100,
            bid: dec!(1.20000),
            ask: dec!(1.20020),
        }
    }

    #[test]
    fn long_stop_too_close_moves_to_boundary() {
        let meta = fractional_pip_meta();
        let price = dec!(1.19000);
        let levels = StopDistanceCorrector::correct(
            &meta,
            Direction::Long,
            price,
            price - dec!(0.0005),
            Decimal::ZERO,
            false,
        );

        assert_eq!(levels.stop_loss, price - dec!(0.01));
        assert_eq!(levels.take_profit, Decimal::ZERO);
    }

    #[test]
    fn long_take_profit_too_close_moves_up() {
        let meta = fractional_pip_meta();
        let levels = StopDistanceCorrector::correct(
            &meta,
            Direction::Long,
            dec!(1.20000),
            Decimal::ZERO,
            dec!(1.20300),
            false,
        );

        assert_eq!(levels.take_profit, dec!(1.21000));
    }

    #[test]
    fn short_levels_are_mirrored() {
        let meta = fractional_pip_meta();
        let levels = StopDistanceCorrector::correct(
            &meta,
            Direction::Short,
            dec!(1.20000),
            dec!(1.20100),
            dec!(1.19900),
            false,
        );

        assert_eq!(levels.stop_loss, dec!(1.21000));
        assert_eq!(levels.take_profit, dec!(1.19000));
    }

    #[test]
    fn admissible_levels_are_unchanged() {
        let meta = fractional_pip_meta();
        let levels = StopDistanceCorrector::correct(
            &meta,
            Direction::Long,
            dec!(1.20000),
            dec!(1.15000),
            dec!(1.25000),
            false,
        );

        assert_eq!(levels, StopLevels::new(dec!(1.15000), dec!(1.25000)));
    }

    #[test]
    fn new_market_order_accounts_for_spread() {
        let meta = fractional_pip_meta();
        // Long fills at the ask; the stop must clear the bid by min distance.
        let levels = StopDistanceCorrector::correct(
            &meta,
            Direction::Long,
            meta.ask,
            dec!(1.19500),
            Decimal::ZERO,
            true,
        );
        assert_eq!(levels.stop_loss, dec!(1.19000));

        let levels = StopDistanceCorrector::correct(
            &meta,
            Direction::Short,
            meta.bid,
            dec!(1.20500),
            Decimal::ZERO,
            true,
        );
        assert_eq!(levels.stop_loss, dec!(1.21020));
    }

    #[test]
    fn zero_levels_are_never_set() {
        let meta = fractional_pip_meta();
        let levels = StopDistanceCorrector::correct(
            &meta,
            Direction::Short,
            dec!(1.20000),
            Decimal::ZERO,
            Decimal::ZERO,
            true,
        );

        assert_eq!(levels, StopLevels::new(Decimal::ZERO, Decimal::ZERO));
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (100_000i64..200_000).prop_map(|n| Decimal::new(n, 5))
    }

    fn offset_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..5_000).prop_map(|n| Decimal::new(n, 5))
    }

    proptest! {
        #[test]
        fn stop_only_moves_away_from_price(
            price in price_strategy(),
            sl_offset in offset_strategy(),
            tp_offset in offset_strategy(),
            market in any::<bool>(),
        ) {
            let meta = fractional_pip_meta();

            let sl = price - sl_offset;
            let tp = price + tp_offset;
            let long = StopDistanceCorrector::correct(&meta, Direction::Long, price, sl, tp, market);
            prop_assert!(long.stop_loss <= sl);
            prop_assert!(long.take_profit >= tp);

            let sl = price + sl_offset;
            let tp = price - tp_offset;
            let short = StopDistanceCorrector::correct(&meta, Direction::Short, price, sl, tp, market);
            prop_assert!(short.stop_loss >= sl);
            prop_assert!(short.take_profit <= tp);
        }

        #[test]
        fn correction_is_idempotent(
            price in price_strategy(),
            sl_offset in offset_strategy(),
            tp_offset in offset_strategy(),
            long in any::<bool>(),
            market in any::<bool>(),
        ) {
            let meta = fractional_pip_meta();
            let (direction, sl, tp) = if long {
                (Direction::Long, price - sl_offset, price + tp_offset)
            } else {
                (Direction::Short, price + sl_offset, price - tp_offset)
            };

            let once = StopDistanceCorrector::correct(&meta, direction, price, sl, tp, market);
            let twice = StopDistanceCorrector::correct(
                &meta, direction, price, once.stop_loss, once.take_profit, market,
            );
            prop_assert_eq!(once, twice);
        }
    }
}
