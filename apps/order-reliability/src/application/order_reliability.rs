//! Reliable order operations.
//!
//! [`OrderReliability`] is the public surface: one method per operation,
//! each returning a ticket or unit on success and an [`OperationError`]
//! otherwise. Use [`OperationResultExt`](crate::error::OperationResultExt)
//! to collapse results to the `-1` / `false` sentinels.
//!
//! The facade is cheap to clone; clones share the ports and configuration,
//! so operations may run concurrently on separate tasks. Two concurrent
//! operations on the same ticket are not coordinated.

use std::future::Future;
use std::sync::Arc;

use super::ports::{MarketDataPort, OrderEndpointPort, Sleeper};
use super::services::OperationContext;
use super::use_cases::{CancelOrderUseCase, CloseOrderUseCase, ModifyOrderUseCase, SendOrderUseCase};
use crate::config::ReliabilityConfig;
use crate::domain::order::{CloseRequest, ModifyRequest, OrderRequest, Ticket};
use crate::error::OperationError;
use crate::observability;

/// Reliable order operations over an endpoint, market data and a sleeper.
pub struct OrderReliability<E, M, S> {
    ctx: OperationContext<E, M, S>,
    send: SendOrderUseCase<E, M, S>,
    modify: ModifyOrderUseCase<E, M, S>,
    close: CloseOrderUseCase<E, M, S>,
    cancel: CancelOrderUseCase<E, M, S>,
}

impl<E, M, S> Clone for OrderReliability<E, M, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            send: self.send.clone(),
            modify: self.modify.clone(),
            close: self.close.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<E, M, S> OrderReliability<E, M, S>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
    S: Sleeper,
{
    /// Bind the collaborators and configuration.
    pub fn new(endpoint: Arc<E>, market: Arc<M>, sleeper: Arc<S>, config: ReliabilityConfig) -> Self {
        let ctx = OperationContext::new(endpoint, market, sleeper, config);
        Self {
            send: SendOrderUseCase::new(ctx.clone()),
            modify: ModifyOrderUseCase::new(ctx.clone()),
            close: CloseOrderUseCase::new(ctx.clone()),
            cancel: CancelOrderUseCase::new(ctx.clone()),
            ctx,
        }
    }

    /// Configuration in effect.
    pub const fn config(&self) -> &ReliabilityConfig {
        self.ctx.config()
    }

    /// Open an order. Market orders fill at the current price; pending orders
    /// rejected near the market are corrected or converted.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` once the order cannot be placed.
    pub async fn send_order(&self, request: OrderRequest) -> Result<Ticket, OperationError> {
        self.bounded("SendOrder", self.send.send(request)).await
    }

    /// Open a market order only while adverse slippage versus the requested
    /// price is within the request's tolerance.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` once the order cannot be placed.
    pub async fn send_order_with_live_repricing(&self, request: OrderRequest) -> Result<Ticket, OperationError> {
        self.bounded("SendOrderWithLiveRepricing", self.send.send_with_live_repricing(request))
            .await
    }

    /// Open a bare order, then place stops shifted by the fill slippage.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the bare order cannot be placed.
    pub async fn send_order_two_step(&self, request: OrderRequest) -> Result<Ticket, OperationError> {
        self.bounded("SendOrderTwoStep", self.send.send_two_step(request)).await
    }

    /// Amend an open order.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` once the amendment cannot be applied.
    pub async fn modify_order(&self, request: ModifyRequest) -> Result<(), OperationError> {
        self.bounded("ModifyOrder", self.modify.modify(request)).await
    }

    /// Close (part of) an open position at the current exit price.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the close fails or cannot be verified.
    pub async fn close_order(&self, request: CloseRequest) -> Result<(), OperationError> {
        self.bounded("CloseOrder", self.close.close(request)).await
    }

    /// Close a position within tolerance of the requested exit price.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the close fails or cannot be verified.
    pub async fn close_order_with_live_repricing(&self, request: CloseRequest) -> Result<(), OperationError> {
        self.bounded("CloseOrderWithLiveRepricing", self.close.close_with_live_repricing(request))
            .await
    }

    /// Delete a pending order.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` once the cancel cannot be placed.
    pub async fn cancel_pending_order(&self, ticket: Ticket) -> Result<(), OperationError> {
        self.bounded("CancelPendingOrder", self.cancel.cancel(ticket)).await
    }

    /// Apply the optional deadline and record the terminal result.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, OperationError>
    where
        F: Future<Output = Result<T, OperationError>>,
    {
        let result = match self.ctx.config().deadline() {
            Some(deadline) => tokio::time::timeout(deadline, fut).await.unwrap_or_else(|_| {
                let error = OperationError::Ambiguous {
                    reason: format!("{operation} aborted after deadline of {}ms", deadline.as_millis()),
                };
                self.ctx.log(operation).failure(&error, &serde_json::Value::Null);
                Err(error)
            }),
            None => fut.await,
        };

        let outcome = match &result {
            Ok(_) => "succeeded",
            Err(e) if e.requires_verification() => "ambiguous",
            Err(_) => "failed",
        };
        observability::record_terminal(operation, outcome);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerErrorCode;
    use crate::config::PaperConfig;
    use crate::domain::order::OrderKind;
    use crate::error::OperationResultExt;
    use crate::infrastructure::{PaperBroker, PaperCall, RecordingSleeper, TokioSleeper};
    use rust_decimal_macros::dec;

    fn reliability(config: ReliabilityConfig) -> (Arc<PaperBroker>, OrderReliability<PaperBroker, PaperBroker, RecordingSleeper>) {
        let broker = Arc::new(PaperBroker::new(&PaperConfig::default()));
        let facade = OrderReliability::new(
            Arc::clone(&broker),
            Arc::clone(&broker),
            Arc::new(RecordingSleeper::default()),
            config,
        );
        (broker, facade)
    }

    #[tokio::test]
    async fn send_then_close() {
        let (broker, facade) = reliability(ReliabilityConfig::default());

        let ticket = facade
            .send_order(OrderRequest::new("EURUSD", OrderKind::Sell, dec!(0.5), dec!(1.20000)))
            .await;
        assert_ne!(ticket.ticket_or_sentinel(), -1);

        let closed = facade
            .close_order(CloseRequest::new(ticket.unwrap(), dec!(0), dec!(0), 3))
            .await;
        assert!(closed.succeeded());
        assert_eq!(broker.calls().close, 1);
    }

    #[tokio::test]
    async fn failure_collapses_to_sentinel() {
        let (broker, facade) = reliability(ReliabilityConfig::default());
        broker.script_rejects(PaperCall::Submit, &[BrokerErrorCode::NotEnoughMoney]);

        let result = facade
            .send_order(OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.20020)))
            .await;

        assert_eq!(result.ticket_or_sentinel(), -1);
    }

    #[tokio::test]
    async fn deadline_aborts_as_ambiguous() {
        let broker = Arc::new(PaperBroker::new(&PaperConfig::default()));
        broker.script_rejects(PaperCall::Submit, &[BrokerErrorCode::ServerBusy; 5]);
        let config = ReliabilityConfig {
            sleep_mean_ms: 1_000,
            sleep_floor_ms: 1_000,
            sleep_cap_ms: 1_000,
            ..ReliabilityConfig::default()
        }
        .with_deadline_ms(30);
        let facade = OrderReliability::new(Arc::clone(&broker), Arc::clone(&broker), Arc::new(TokioSleeper), config);

        let error = facade
            .send_order(OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.20020)))
            .await
            .unwrap_err();

        assert!(matches!(error, OperationError::Ambiguous { .. }));
        assert_eq!(broker.calls().submit, 1);
    }

    #[tokio::test]
    async fn clones_share_the_endpoint() {
        let (broker, facade) = reliability(ReliabilityConfig::default());
        let other = facade.clone();

        let (a, b) = tokio::join!(
            facade.send_order(OrderRequest::new("EURUSD", OrderKind::Buy, dec!(1), dec!(1.20020))),
            other.send_order(OrderRequest::new("EURUSD", OrderKind::Sell, dec!(1), dec!(1.20000))),
        );

        assert_ne!(a.unwrap(), b.unwrap());
        assert_eq!(broker.calls().submit, 2);
    }
}
