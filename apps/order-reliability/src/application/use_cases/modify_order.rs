//! Modify Order Use Case
//!
//! Amends price, stops and expiration of an open order. Stops are clamped to
//! the minimum distance before the first attempt and again after every
//! invalid-stops reject. A no-result reply means nothing changed and counts
//! as success.
//!
//! A zero price keeps the order's current price, so a stops-only change
//! passes 0 for positions and pending orders alike.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::application::ports::{MarketDataPort, OrderEndpointPort, Sleeper};
use crate::application::services::{AttemptDriver, Correction, OperationContext, RetryState};
use crate::broker::{BrokerErrorCode, ErrorCategory, OperationKind, classify};
use crate::domain::corrections::{StopDistanceCorrector, StopLevels};
use crate::domain::instrument::InstrumentMetadata;
use crate::domain::order::{ModifyRequest, OrderDetails};
use crate::error::OperationError;
use crate::observability::{self, OperationLog, Verbosity};

const MODIFY: &str = "ModifyOrder";

struct ModifyDriver<'a, E> {
    endpoint: &'a E,
    order: OrderDetails,
    request: ModifyRequest,
    log: OperationLog,
}

impl<E> ModifyDriver<'_, E> {
    /// Pending orders measure stops from their own price, positions from the
    /// price they would close at.
    fn reference_price(&self, meta: &InstrumentMetadata) -> Decimal {
        if self.order.kind.is_pending() {
            self.request.price
        } else {
            meta.exit_price(self.order.kind.direction())
        }
    }

    fn correct_stops(&mut self, meta: &InstrumentMetadata) -> bool {
        let before = StopLevels::new(self.request.stop_loss, self.request.take_profit);
        let after = StopDistanceCorrector::correct(
            meta,
            self.order.kind.direction(),
            self.reference_price(meta),
            before.stop_loss,
            before.take_profit,
            false,
        );
        self.request.stop_loss = after.stop_loss;
        self.request.take_profit = after.take_profit;
        self.log.stops_moved(before, after)
    }
}

#[async_trait]
impl<E: OrderEndpointPort> AttemptDriver for ModifyDriver<'_, E> {
    type Output = ();

    fn operation(&self) -> OperationKind {
        OperationKind::Modify
    }

    fn instrument(&self) -> &str {
        &self.order.instrument
    }

    async fn submit(&mut self) -> Result<(), BrokerErrorCode> {
        self.endpoint.amend_order(&self.request).await
    }

    fn correct(&mut self, _code: BrokerErrorCode, meta: &InstrumentMetadata, _state: &mut RetryState) -> Correction {
        if self.correct_stops(meta) {
            Correction::Applied("stops")
        } else {
            Correction::NotApplicable
        }
    }

    fn success_without_result(&self) -> Option<()> {
        Some(())
    }

    fn describe(&self) -> Value {
        serde_json::to_value(&self.request).unwrap_or(Value::Null)
    }
}

/// Use case for amending orders.
pub struct ModifyOrderUseCase<E, M, S> {
    ctx: OperationContext<E, M, S>,
}

impl<E, M, S> Clone for ModifyOrderUseCase<E, M, S> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<E, M, S> ModifyOrderUseCase<E, M, S>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
    S: Sleeper,
{
    /// Create a new `ModifyOrderUseCase`.
    pub const fn new(ctx: OperationContext<E, M, S>) -> Self {
        Self { ctx }
    }

    /// Amend an order, retrying and correcting until the cap.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the order is unknown or closed, or
    /// once the amendment cannot be applied.
    pub async fn modify(&self, request: ModifyRequest) -> Result<(), OperationError> {
        let log = self.ctx.log(MODIFY);
        if self.ctx.bypass_retries() {
            observability::record_submission(OperationKind::Modify.as_str());
            return match self.ctx.endpoint().amend_order(&request).await {
                Ok(()) => Ok(()),
                Err(code) if classify(code, OperationKind::Modify, self.ctx.config().classification()) == ErrorCategory::Success => Ok(()),
                Err(code) => {
                    let error = OperationError::Fatal { code, attempts: 1 };
                    log.failure(&error, &serde_json::to_value(&request).unwrap_or(Value::Null));
                    Err(error)
                }
            };
        }

        let accessor = self.ctx.accessor();
        let order = accessor.order_details(request.ticket).await?;
        if !order.is_open() {
            return Err(OperationError::InvalidRequest(format!(
                "order {} is already closed",
                order.ticket
            )));
        }

        let meta = accessor.instrument_metadata(&order.instrument).await?;
        let mut request = request;
        request.round_to(meta.digits);
        if !order.kind.is_pending() || request.price.is_zero() {
            request.price = order.open_price;
        }
        if request.price < Decimal::ZERO || request.stop_loss < Decimal::ZERO || request.take_profit < Decimal::ZERO {
            return Err(OperationError::InvalidRequest(format!(
                "negative price or stop level for order {}",
                order.ticket
            )));
        }

        let mut driver = ModifyDriver {
            endpoint: self.ctx.endpoint(),
            order,
            request,
            log,
        };
        driver.correct_stops(&meta);

        let unchanged = driver.request.price == driver.order.open_price
            && driver.request.stop_loss == driver.order.stop_loss
            && driver.request.take_profit == driver.order.take_profit
            && driver.request.expiration.is_none();
        if unchanged {
            if log.allows(Verbosity::Info) {
                tracing::info!(operation = MODIFY, ticket = %driver.order.ticket, "Nothing to modify");
            }
            return Ok(());
        }

        let mut state = self.ctx.retry_state();
        self.ctx
            .orchestrator(log)
            .run(&mut driver, &mut state)
            .await
            .into_result(MODIFY)
    }
}
