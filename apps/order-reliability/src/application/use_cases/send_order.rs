//! Send Order Use Cases
//!
//! Three ways to open an order:
//!
//! - [`SendOrderUseCase::send`]: market orders are repriced to the current
//!   far side on every attempt; pending orders rejected near the market are
//!   snapped, nudged, or converted to a market order.
//! - [`SendOrderUseCase::send_with_live_repricing`]: market orders are
//!   evaluated against the originally requested price on every attempt;
//!   adverse slippage beyond tolerance holds the submission back, otherwise
//!   stops shift with the price and the slippage budget shrinks.
//! - [`SendOrderUseCase::send_two_step`]: a bare order first, then a modify
//!   placing the stops shifted by the realized fill slippage.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use super::modify_order::ModifyOrderUseCase;
use crate::application::ports::{MarketDataPort, OrderEndpointPort, Sleeper};
use crate::application::services::{
    AttemptDriver, Correction, LoopOutcome, OperationContext, Preparation, RetryState,
};
use crate::broker::{BrokerErrorCode, OperationKind};
use crate::domain::corrections::{
    PendingCorrection, PendingPriceCorrector, SlippageTracker, StopDistanceCorrector, StopLevels,
};
use crate::domain::instrument::InstrumentMetadata;
use crate::domain::order::{ModifyRequest, OrderRequest, Ticket, shift_level};
use crate::error::OperationError;
use crate::observability::{self, OperationLog, Verbosity};

const SEND: &str = "SendOrder";
const SEND_LIVE: &str = "SendOrderWithLiveRepricing";
const SEND_TWO_STEP: &str = "SendOrderTwoStep";

/// Clamp the request's stops around `price`.
fn correct_stops(
    request: &mut OrderRequest,
    meta: &InstrumentMetadata,
    price: Decimal,
    is_new_market_order: bool,
    log: OperationLog,
) -> bool {
    let before = StopLevels::new(request.stop_loss, request.take_profit);
    let after = StopDistanceCorrector::correct(
        meta,
        request.kind.direction(),
        price,
        before.stop_loss,
        before.take_profit,
        is_new_market_order,
    );
    request.stop_loss = after.stop_loss;
    request.take_profit = after.take_profit;
    log.stops_moved(before, after)
}

/// Append the current spread, in increments, to the comment.
fn annotate_comment(comment: &str, meta: &InstrumentMetadata) -> String {
    let spread = meta.spread_points().round_dp(1).normalize();
    if comment.is_empty() {
        format!("spread={spread}")
    } else {
        format!("{comment} spread={spread}")
    }
}

fn describe(request: &OrderRequest) -> Value {
    serde_json::to_value(request).unwrap_or(Value::Null)
}

/// Plain send: market orders reprice each attempt, pending orders are
/// corrected after invalid-price/invalid-stops rejects.
struct SendDriver<'a, E> {
    endpoint: &'a E,
    request: OrderRequest,
    corrector: PendingPriceCorrector,
    log: OperationLog,
}

#[async_trait]
impl<E: OrderEndpointPort> AttemptDriver for SendDriver<'_, E> {
    type Output = Ticket;

    fn operation(&self) -> OperationKind {
        OperationKind::Send
    }

    fn instrument(&self) -> &str {
        &self.request.instrument
    }

    fn prepare(&mut self, meta: &InstrumentMetadata) -> Preparation {
        if self.request.kind.is_market() {
            let current = meta.entry_price(self.request.kind.direction());
            self.request.price = current;
            correct_stops(&mut self.request, meta, current, true, self.log);
            self.request.round_to(meta.digits);
        }
        Preparation::Submit
    }

    async fn submit(&mut self) -> Result<Ticket, BrokerErrorCode> {
        self.endpoint.submit_order(&self.request).await
    }

    fn correct(&mut self, code: BrokerErrorCode, meta: &InstrumentMetadata, state: &mut RetryState) -> Correction {
        if self.request.kind.is_market() {
            let current = meta.entry_price(self.request.kind.direction());
            return if correct_stops(&mut self.request, meta, current, true, self.log) {
                Correction::Applied("stops")
            } else {
                Correction::NotApplicable
            };
        }

        let requested = self.request.price;
        let correction = self.corrector.correct(&mut self.request, meta, state.fixed_invalid_price);
        if correction.adjusted() && self.log.allows(Verbosity::Info) {
            tracing::info!(
                operation = self.log.operation(),
                kind = %self.request.kind,
                from = %requested,
                to = %self.request.price,
                stop_loss = %self.request.stop_loss,
                take_profit = %self.request.take_profit,
                "Pending price corrected"
            );
        }

        match correction {
            PendingCorrection::Snapped { .. } => {
                state.fixed_invalid_price = true;
                Correction::Applied("snapped")
            }
            PendingCorrection::Nudged { .. } => Correction::Applied("nudged"),
            PendingCorrection::ConvertToMarket(check) => Correction::ConvertToMarket(check),
            PendingCorrection::OutsideTolerance(check) => {
                if self.log.allows(Verbosity::Warn) {
                    tracing::warn!(
                        operation = self.log.operation(),
                        kind = %self.request.kind,
                        requested = %self.request.price,
                        delta = %check.delta,
                        slipped_points = %check.slipped_points,
                        tolerance = self.request.slippage,
                        "Pending price too far from market to convert"
                    );
                }
                Correction::NotApplicable
            }
            PendingCorrection::NotNearMarket | PendingCorrection::NotApplicable => {
                let price = self.request.price;
                if code == BrokerErrorCode::InvalidStops && correct_stops(&mut self.request, meta, price, false, self.log)
                {
                    Correction::Applied("stops")
                } else {
                    Correction::NotApplicable
                }
            }
        }
    }

    fn describe(&self) -> Value {
        describe(&self.request)
    }
}

/// Live repricing send: every attempt is measured against `base`.
struct LiveSendDriver<'a, E> {
    endpoint: &'a E,
    base: OrderRequest,
    working: OrderRequest,
    log: OperationLog,
}

impl<'a, E> LiveSendDriver<'a, E> {
    fn new(endpoint: &'a E, base: OrderRequest, log: OperationLog) -> Self {
        Self {
            endpoint,
            working: base.clone(),
            base,
            log,
        }
    }
}

#[async_trait]
impl<E: OrderEndpointPort> AttemptDriver for LiveSendDriver<'_, E> {
    type Output = Ticket;

    fn operation(&self) -> OperationKind {
        OperationKind::Send
    }

    fn instrument(&self) -> &str {
        &self.base.instrument
    }

    fn prepare(&mut self, meta: &InstrumentMetadata) -> Preparation {
        let direction = self.base.kind.direction();
        let current = meta.entry_price(direction);
        let check = SlippageTracker::evaluate(meta, direction, self.base.price, current, self.base.slippage);
        if !check.within_tolerance {
            return Preparation::Hold(check);
        }

        let mut working = self.base.clone();
        working.price = current;
        working.shift_stops(check.delta);
        working.slippage = check.remaining_points;
        correct_stops(&mut working, meta, current, true, self.log);
        working.round_to(meta.digits);
        self.working = working;
        Preparation::Submit
    }

    async fn submit(&mut self) -> Result<Ticket, BrokerErrorCode> {
        self.endpoint.submit_order(&self.working).await
    }

    fn describe(&self) -> Value {
        describe(&self.working)
    }
}

/// Use case for opening orders.
pub struct SendOrderUseCase<E, M, S> {
    ctx: OperationContext<E, M, S>,
    modify: ModifyOrderUseCase<E, M, S>,
}

impl<E, M, S> Clone for SendOrderUseCase<E, M, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            modify: self.modify.clone(),
        }
    }
}

impl<E, M, S> SendOrderUseCase<E, M, S>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
    S: Sleeper,
{
    /// Create a new `SendOrderUseCase`.
    pub fn new(ctx: OperationContext<E, M, S>) -> Self {
        Self {
            modify: ModifyOrderUseCase::new(ctx.clone()),
            ctx,
        }
    }

    /// Open an order, retrying and correcting until the cap.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` once the order cannot be placed.
    pub async fn send(&self, request: OrderRequest) -> Result<Ticket, OperationError> {
        validate(&request)?;
        let log = self.ctx.log(SEND);
        if self.ctx.bypass_retries() {
            return self.raw_send(&request, log).await;
        }

        let accessor = self.ctx.accessor();
        let meta = accessor.instrument_metadata(&request.instrument).await?;
        let request = self.normalize(request, &meta, log);

        let orchestrator = self.ctx.orchestrator(log);
        let mut state = self.ctx.retry_state();
        let mut driver = SendDriver {
            endpoint: self.ctx.endpoint(),
            request,
            corrector: PendingPriceCorrector::new(self.ctx.config().limit_to_market),
            log,
        };

        match orchestrator.run(&mut driver, &mut state).await {
            LoopOutcome::ConvertToMarket { check, attempts } => {
                let meta = accessor.instrument_metadata(&driver.request.instrument).await?;
                let market = PendingPriceCorrector::to_market_request(&driver.request, &meta, &check);
                observability::record_market_conversion(&market.instrument);
                if log.allows(Verbosity::Info) {
                    tracing::info!(
                        operation = SEND,
                        from = %driver.request.kind,
                        to = %market.kind,
                        slipped_points = %check.slipped_points,
                        remaining_points = check.remaining_points,
                        attempts,
                        "Converting pending order to market"
                    );
                }
                let mut live = LiveSendDriver::new(self.ctx.endpoint(), market, log);
                orchestrator.run(&mut live, &mut state).await.into_result(SEND)
            }
            outcome => outcome.into_result(SEND),
        }
    }

    /// Open a market order bounded by the caller's slippage tolerance.
    ///
    /// Pending kinds are sent as by [`Self::send`].
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` once the order cannot be placed.
    pub async fn send_with_live_repricing(&self, request: OrderRequest) -> Result<Ticket, OperationError> {
        if request.kind.is_pending() {
            return self.send(request).await;
        }
        validate(&request)?;
        let log = self.ctx.log(SEND_LIVE);
        if self.ctx.bypass_retries() {
            return self.raw_send(&request, log).await;
        }

        let meta = self.ctx.accessor().instrument_metadata(&request.instrument).await?;
        let base = self.normalize(request, &meta, log);

        let mut state = self.ctx.retry_state();
        let mut driver = LiveSendDriver::new(self.ctx.endpoint(), base, log);
        self.ctx
            .orchestrator(log)
            .run(&mut driver, &mut state)
            .await
            .into_result(SEND_LIVE)
    }

    /// Open a bare order, then place stops shifted by the fill slippage.
    ///
    /// Once the bare order is placed its ticket is returned even if placing
    /// the stops fails; that failure is logged.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the bare order cannot be placed.
    pub async fn send_two_step(&self, request: OrderRequest) -> Result<Ticket, OperationError> {
        validate(&request)?;
        let log = self.ctx.log(SEND_TWO_STEP);
        if self.ctx.bypass_retries() {
            return self.raw_send(&request, log).await;
        }

        let accessor = self.ctx.accessor();
        let meta = accessor.instrument_metadata(&request.instrument).await?;
        let requested = if request.price.is_zero() {
            meta.entry_price(request.kind.direction())
        } else {
            meta.round(request.price)
        };
        let stop_loss = meta.round(request.stop_loss);
        let take_profit = meta.round(request.take_profit);
        let expiration = request.expiration;

        let ticket = self.send(request.without_stops()).await?;
        if stop_loss.is_zero() && take_profit.is_zero() {
            return Ok(ticket);
        }

        let details = match accessor.order_details(ticket).await {
            Ok(details) => details,
            Err(e) => {
                if log.allows(Verbosity::Error) {
                    tracing::error!(operation = SEND_TWO_STEP, %ticket, error = %e, "Order placed without stops: read-back failed");
                }
                return Ok(ticket);
            }
        };

        let delta = details.open_price - requested;
        let modify = ModifyRequest::new(
            ticket,
            details.open_price,
            shift_level(stop_loss, delta),
            shift_level(take_profit, delta),
        )
        .with_expiration(expiration);

        if log.allows(Verbosity::Info) {
            tracing::info!(
                operation = SEND_TWO_STEP,
                %ticket,
                %requested,
                open_price = %details.open_price,
                %delta,
                stop_loss = %modify.stop_loss,
                take_profit = %modify.take_profit,
                "Placing stops after fill"
            );
        }

        if let Err(e) = self.modify.modify(modify).await {
            if log.allows(Verbosity::Error) {
                tracing::error!(operation = SEND_TWO_STEP, %ticket, error = %e, "Order placed without stops");
            }
        }
        Ok(ticket)
    }

    /// Round, clamp stops around the reference price, annotate.
    fn normalize(&self, mut request: OrderRequest, meta: &InstrumentMetadata, log: OperationLog) -> OrderRequest {
        request.round_to(meta.digits);
        let is_market = request.kind.is_market();
        if is_market && request.price.is_zero() {
            request.price = meta.entry_price(request.kind.direction());
        }
        let price = request.price;
        correct_stops(&mut request, meta, price, is_market, log);
        if self.ctx.config().annotate_comment {
            request.comment = annotate_comment(&request.comment, meta);
        }
        request
    }

    async fn raw_send(&self, request: &OrderRequest, log: OperationLog) -> Result<Ticket, OperationError> {
        observability::record_submission(OperationKind::Send.as_str());
        self.ctx.endpoint().submit_order(request).await.map_err(|code| {
            let error = OperationError::Fatal { code, attempts: 1 };
            log.failure(&error, &describe(request));
            error
        })
    }
}

fn validate(request: &OrderRequest) -> Result<(), OperationError> {
    if request.instrument.is_empty() {
        return Err(OperationError::InvalidRequest("instrument is empty".to_string()));
    }
    if request.volume <= Decimal::ZERO {
        return Err(OperationError::InvalidRequest(format!(
            "volume must be positive, got {}",
            request.volume
        )));
    }
    if request.kind.is_pending() && request.price <= Decimal::ZERO {
        return Err(OperationError::InvalidRequest(format!(
            "{} requires a price",
            request.kind
        )));
    }
    Ok(())
}
