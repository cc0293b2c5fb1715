//! Close Order Use Cases
//!
//! Closes (part of) an open position. Every attempt re-prices the close at
//! the current exit side. The live-repricing variant additionally measures
//! the exit against the caller's requested price and refuses to submit while
//! adverse slippage exceeds tolerance.
//!
//! A reported success is verified by reading the order back: a position
//! without a close time is reported as [`OperationError::StillOpen`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::application::ports::{MarketDataPort, OrderEndpointPort, Sleeper};
use crate::application::services::{AttemptDriver, LoopOutcome, OperationContext, Preparation};
use crate::broker::{BrokerErrorCode, ErrorCategory, OperationKind, classify};
use crate::domain::corrections::SlippageTracker;
use crate::domain::instrument::InstrumentMetadata;
use crate::domain::order::{CloseRequest, Direction, OrderDetails, Ticket};
use crate::error::OperationError;
use crate::observability::{self, OperationLog, Verbosity};

const CLOSE: &str = "CloseOrder";
const CLOSE_LIVE: &str = "CloseOrderWithLiveRepricing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repricing {
    /// Exit at the current price each attempt.
    Plain,
    /// Exit at the current price only within tolerance of the requested one.
    Live,
}

struct CloseDriver<'a, E> {
    endpoint: &'a E,
    instrument: String,
    direction: Direction,
    base: CloseRequest,
    request: CloseRequest,
    repricing: Repricing,
    first: bool,
}

#[async_trait]
impl<E: OrderEndpointPort> AttemptDriver for CloseDriver<'_, E> {
    type Output = ();

    fn operation(&self) -> OperationKind {
        OperationKind::Close
    }

    fn instrument(&self) -> &str {
        &self.instrument
    }

    fn prepare(&mut self, meta: &InstrumentMetadata) -> Preparation {
        let current = meta.exit_price(self.direction);
        let first = std::mem::replace(&mut self.first, false);

        match self.repricing {
            Repricing::Plain => {
                self.request.price = if first && !self.base.price.is_zero() {
                    meta.round(self.base.price)
                } else {
                    current
                };
            }
            Repricing::Live => {
                let requested = if self.base.price.is_zero() {
                    current
                } else {
                    meta.round(self.base.price)
                };
                // Closing a long sells at the bid: adverse is measured as a short.
                let check = SlippageTracker::evaluate(
                    meta,
                    self.direction.opposite(),
                    requested,
                    current,
                    self.base.slippage,
                );
                if !check.within_tolerance {
                    return Preparation::Hold(check);
                }
                self.request.price = current;
                self.request.slippage = check.remaining_points;
            }
        }
        Preparation::Submit
    }

    async fn submit(&mut self) -> Result<(), BrokerErrorCode> {
        self.endpoint.close_order(&self.request).await
    }

    fn describe(&self) -> Value {
        serde_json::to_value(&self.request).unwrap_or(Value::Null)
    }
}

/// Use case for closing positions.
pub struct CloseOrderUseCase<E, M, S> {
    ctx: OperationContext<E, M, S>,
}

impl<E, M, S> Clone for CloseOrderUseCase<E, M, S> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<E, M, S> CloseOrderUseCase<E, M, S>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
    S: Sleeper,
{
    /// Create a new `CloseOrderUseCase`.
    pub const fn new(ctx: OperationContext<E, M, S>) -> Self {
        Self { ctx }
    }

    /// Close a position at the current exit price.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the close cannot be placed or the
    /// position is still open afterwards.
    pub async fn close(&self, request: CloseRequest) -> Result<(), OperationError> {
        self.run(request, Repricing::Plain, CLOSE).await
    }

    /// Close a position while adverse slippage versus the requested price
    /// stays within tolerance.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the close cannot be placed within
    /// tolerance or the position is still open afterwards.
    pub async fn close_with_live_repricing(&self, request: CloseRequest) -> Result<(), OperationError> {
        self.run(request, Repricing::Live, CLOSE_LIVE).await
    }

    async fn run(&self, request: CloseRequest, repricing: Repricing, operation: &'static str) -> Result<(), OperationError> {
        let log = self.ctx.log(operation);
        if self.ctx.bypass_retries() {
            return self.raw_close(&request, log).await;
        }

        let order = self.ctx.accessor().order_details(request.ticket).await?;
        check_closable(&order, &request)?;
        let mut request = request;
        if request.volume.is_zero() {
            request.volume = order.volume;
        }

        let mut driver = CloseDriver {
            endpoint: self.ctx.endpoint(),
            instrument: order.instrument.clone(),
            direction: order.kind.direction(),
            base: request.clone(),
            request,
            repricing,
            first: true,
        };
        let mut state = self.ctx.retry_state();

        match self.ctx.orchestrator(log).run(&mut driver, &mut state).await {
            LoopOutcome::Succeeded { .. } | LoopOutcome::Ambiguous { .. } => {
                self.verify_closed(order.ticket, log).await
            }
            outcome => outcome.into_result(operation),
        }
    }

    /// A close is only complete once the order carries a close time.
    async fn verify_closed(&self, ticket: Ticket, log: OperationLog) -> Result<(), OperationError> {
        match self.ctx.accessor().order_details(ticket).await {
            Ok(order) if !order.is_open() => Ok(()),
            Ok(_) => {
                let error = OperationError::StillOpen { ticket };
                if log.allows(Verbosity::Error) {
                    tracing::error!(operation = log.operation(), %ticket, "Close reported success but order is still open, manual retry required");
                }
                Err(error)
            }
            Err(e) => Err(OperationError::Ambiguous {
                reason: format!("close of {ticket} could not be verified: {e}"),
            }),
        }
    }

    async fn raw_close(&self, request: &CloseRequest, log: OperationLog) -> Result<(), OperationError> {
        observability::record_submission(OperationKind::Close.as_str());
        match self.ctx.endpoint().close_order(request).await {
            Ok(()) => Ok(()),
            Err(code)
                if classify(code, OperationKind::Close, self.ctx.config().classification())
                    == ErrorCategory::Success =>
            {
                Ok(())
            }
            Err(code) => {
                let error = OperationError::Fatal { code, attempts: 1 };
                log.failure(&error, &serde_json::to_value(request).unwrap_or(Value::Null));
                Err(error)
            }
        }
    }
}

fn check_closable(order: &OrderDetails, request: &CloseRequest) -> Result<(), OperationError> {
    if order.kind.is_pending() {
        return Err(OperationError::InvalidRequest(format!(
            "order {} is a pending {}; cancel it instead",
            order.ticket, order.kind
        )));
    }
    if !order.is_open() {
        return Err(OperationError::InvalidRequest(format!(
            "order {} is already closed",
            order.ticket
        )));
    }
    if request.volume < Decimal::ZERO || request.volume > order.volume {
        return Err(OperationError::InvalidRequest(format!(
            "close volume {} outside 0..={}",
            request.volume, order.volume
        )));
    }
    Ok(())
}
