//! Pending-order price correction after an invalid-price/invalid-stops reject.
//!
//! Applies only when the market has come within the broker minimum distance
//! of the requested pending price. Two policies:
//!
//! - **Limit-to-market**: if adverse slippage from the requested price is
//!   within tolerance, the order is resubmitted as a market order.
//! - **Snap, then nudge** (default): the first correction snaps the price to
//!   the minimum-distance boundary; later corrections move it one increment
//!   further from the market. Stops travel with the price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::slippage::{SlippageCheck, SlippageTracker};
use super::stops::StopDistanceCorrector;
use crate::domain::instrument::InstrumentMetadata;
use crate::domain::order::{OrderKind, OrderRequest};

/// What the corrector did to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum PendingCorrection {
    /// Price snapped to the minimum-distance boundary.
    Snapped {
        /// Price change applied.
        delta: Decimal,
    },
    /// Price moved one increment away from the market.
    Nudged {
        /// Price change applied.
        delta: Decimal,
    },
    /// Resubmit as a market order.
    ConvertToMarket(SlippageCheck),
    /// Conversion refused: slippage beyond tolerance.
    OutsideTolerance(SlippageCheck),
    /// Market is not near the requested price; the reject has another cause.
    NotNearMarket,
    /// Request is not a pending order.
    NotApplicable,
}

impl PendingCorrection {
    /// Returns true if the request was changed in place.
    #[must_use]
    pub const fn adjusted(&self) -> bool {
        matches!(self, Self::Snapped { .. } | Self::Nudged { .. })
    }
}

/// Corrects pending-order prices rejected near the market.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingPriceCorrector {
    limit_to_market: bool,
}

impl PendingPriceCorrector {
    /// Create a corrector.
    #[must_use]
    pub const fn new(limit_to_market: bool) -> Self {
        Self { limit_to_market }
    }

    /// Correct `request` against a fresh snapshot.
    ///
    /// `already_fixed` selects nudging over snapping once a snap has been
    /// tried for this placement.
    pub fn correct(
        &self,
        request: &mut OrderRequest,
        meta: &InstrumentMetadata,
        already_fixed: bool,
    ) -> PendingCorrection {
        if !request.kind.is_pending() {
            return PendingCorrection::NotApplicable;
        }

        let direction = request.kind.direction();
        let current = meta.entry_price(direction);
        if (request.price - current).abs() > meta.min_distance() {
            return PendingCorrection::NotNearMarket;
        }

        if self.limit_to_market {
            let check = SlippageTracker::evaluate(meta, direction, request.price, current, request.slippage);
            return if check.within_tolerance {
                PendingCorrection::ConvertToMarket(check)
            } else {
                PendingCorrection::OutsideTolerance(check)
            };
        }

        let new_price = if already_fixed {
            Self::nudged_price(request.kind, request.price, meta)
        } else {
            Self::boundary_price(request.kind, meta)
        };
        let new_price = meta.round(new_price);
        let delta = new_price - request.price;

        request.price = new_price;
        request.shift_stops(delta);

        let levels = StopDistanceCorrector::correct(
            meta,
            direction,
            request.price,
            request.stop_loss,
            request.take_profit,
            false,
        );
        request.stop_loss = levels.stop_loss;
        request.take_profit = levels.take_profit;

        if already_fixed {
            PendingCorrection::Nudged { delta }
        } else {
            PendingCorrection::Snapped { delta }
        }
    }

    /// Market order equivalent of a pending request, filled at the current price.
    ///
    /// Stops shift by the price move and the slippage budget shrinks by what
    /// the move already consumed.
    #[must_use]
    pub fn to_market_request(request: &OrderRequest, meta: &InstrumentMetadata, check: &SlippageCheck) -> OrderRequest {
        let kind = request.kind.to_market();
        let mut market = OrderRequest {
            kind,
            price: meta.entry_price(kind.direction()),
            slippage: check.remaining_points,
            expiration: None,
            ..request.clone()
        };
        market.shift_stops(check.delta);
        market.round_to(meta.digits);
        market
    }

    /// Price exactly `min_distance` from the market on the side this kind rests.
    fn boundary_price(kind: OrderKind, meta: &InstrumentMetadata) -> Decimal {
        let min_dist = meta.min_distance();
        match kind {
            OrderKind::BuyLimit => meta.ask - min_dist,
            OrderKind::BuyStop => meta.ask + min_dist,
            OrderKind::SellStop => meta.bid - min_dist,
            OrderKind::SellLimit => meta.bid + min_dist,
            OrderKind::Buy => meta.ask,
            OrderKind::Sell => meta.bid,
        }
    }

    fn nudged_price(kind: OrderKind, price: Decimal, meta: &InstrumentMetadata) -> Decimal {
        if kind.nudges_up() {
            price + meta.point
        } else {
            price - meta.point
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
    fn first_correction_snaps_buy_limit_below_ask() {
        let mut request = OrderRequest::new("EURUSD", OrderKind::BuyLimit, dec!(1), dec!(1.1998))
            .with_stops(dec!(1.1950), dec!(1.2100));
        let outcome = PendingPriceCorrector::new(false).correct(&mut request, &meta(), false);

        assert_eq!(outcome, PendingCorrection::Snapped { delta: dec!(-0.0006) });
        assert_eq!(request.price, dec!(1.1992));
        assert_eq!(request.stop_loss, dec!(1.1944));
        assert_eq!(request.take_profit, dec!(1.2094));
    }

    #[test]
    fn snap_side_per_kind() {
        let cases = [
            (OrderKind::BuyStop, dec!(1.2005), dec!(1.2012)),
            (OrderKind::SellStop, dec!(1.1995), dec!(1.1990)),
            (OrderKind::SellLimit, dec!(1.2004), dec!(1.2010)),
        ];

        for (kind, price, expected) in cases {
            let mut request = OrderRequest::new("EURUSD", kind, dec!(1), price);
            let outcome = PendingPriceCorrector::new(false).correct(&mut request, &meta(), false);
            assert!(outcome.adjusted(), "{kind} should be adjusted");
            assert_eq!(request.price, expected, "{kind} snapped to wrong side");
        }
    }

    #[test]
    fn later_corrections_nudge_one_increment() {
        let mut request = OrderRequest::new("EURUSD", OrderKind::BuyStop, dec!(1), dec!(1.2012))
            .with_stops(dec!(1.1990), Decimal::ZERO);
        let outcome = PendingPriceCorrector::new(false).correct(&mut request, &meta(), true);

        assert_eq!(outcome, PendingCorrection::Nudged { delta: dec!(0.0001) });
        assert_eq!(request.price, dec!(1.2013));
        assert_eq!(request.stop_loss, dec!(1.1991));

        let mut request = OrderRequest::new("EURUSD", OrderKind::SellStop, dec!(1), dec!(1.1990));
        PendingPriceCorrector::new(false).correct(&mut request, &meta(), true);
        assert_eq!(request.price, dec!(1.1989));
    }

    #[test]
    fn far_from_market_is_not_corrected() {
        let mut request = OrderRequest::new("EURUSD", OrderKind::BuyLimit, dec!(1), dec!(1.1900));
        let outcome = PendingPriceCorrector::new(false).correct(&mut request, &meta(), false);

        assert_eq!(outcome, PendingCorrection::NotNearMarket);
        assert_eq!(request.price, dec!(1.1900));
    }

    #[test]
    fn market_orders_are_not_applicable() {
        let mut request = OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.2002));
        let outcome = PendingPriceCorrector::new(false).correct(&mut request, &meta(), false);

        assert_eq!(outcome, PendingCorrection::NotApplicable);
    }

    #[test]
    fn limit_to_market_converts_within_tolerance() {
        let mut request = OrderRequest::new("EURUSD", OrderKind::BuyLimit, dec!(1), dec!(1.1999))
            .with_stops(dec!(1.1950), Decimal::ZERO)
            .with_slippage(5);
        let outcome = PendingPriceCorrector::new(true).correct(&mut request, &meta(), false);

        let PendingCorrection::ConvertToMarket(check) = outcome else {
            panic!("expected conversion, got {outcome:?}");
        };
        assert_eq!(check.slipped_points, dec!(3));

        let market = PendingPriceCorrector::to_market_request(&request, &meta(), &check);
        assert_eq!(market.kind, OrderKind::Buy);
        assert_eq!(market.price, dec!(1.2002));
        assert_eq!(market.stop_loss, dec!(1.1953));
        assert_eq!(market.slippage, 2);
    }

    #[test]
    fn limit_to_market_refuses_beyond_tolerance() {
        let mut request = OrderRequest::new("EURUSD", OrderKind::BuyLimit, dec!(1), dec!(1.1995))
            .with_slippage(3);
        let outcome = PendingPriceCorrector::new(true).correct(&mut request, &meta(), false);

        assert!(matches!(outcome, PendingCorrection::OutsideTolerance(_)));
        assert_eq!(request.price, dec!(1.1995));
    }

    #[test]
    fn buy_stop_below_market_converts_favorably() {
        let mut request = OrderRequest::new("EURUSD", OrderKind::BuyStop, dec!(1), dec!(1.2006));
        let outcome = PendingPriceCorrector::new(true).correct(&mut request, &meta(), false);

        let PendingCorrection::ConvertToMarket(check) = outcome else {
            panic!("expected conversion, got {outcome:?}");
        };
        assert_eq!(check.slipped_points, dec!(-4));
    }
}
