//! Cancel Pending Order Use Case

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::application::ports::{MarketDataPort, OrderEndpointPort, Sleeper};
use crate::application::services::{AttemptDriver, LoopOutcome, OperationContext};
use crate::broker::{BrokerErrorCode, OperationKind};
use crate::domain::order::Ticket;
use crate::error::OperationError;
use crate::observability::{self, Verbosity};

const CANCEL: &str = "CancelPendingOrder";

struct CancelDriver<'a, E> {
    endpoint: &'a E,
    ticket: Ticket,
    instrument: String,
}

#[async_trait]
impl<E: OrderEndpointPort> AttemptDriver for CancelDriver<'_, E> {
    type Output = ();

    fn operation(&self) -> OperationKind {
        OperationKind::Cancel
    }

    fn instrument(&self) -> &str {
        &self.instrument
    }

    async fn submit(&mut self) -> Result<(), BrokerErrorCode> {
        self.endpoint.cancel_pending_order(self.ticket).await
    }

    fn success_without_result(&self) -> Option<()> {
        Some(())
    }

    fn describe(&self) -> Value {
        json!({ "ticket": self.ticket, "instrument": self.instrument })
    }
}

/// Use case for deleting pending orders.
pub struct CancelOrderUseCase<E, M, S> {
    ctx: OperationContext<E, M, S>,
}

impl<E, M, S> Clone for CancelOrderUseCase<E, M, S> {
    fn clone(&self) -> Self {
        Self { ctx: self.ctx.clone() }
    }
}

impl<E, M, S> CancelOrderUseCase<E, M, S>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
    S: Sleeper,
{
    /// Create a new `CancelOrderUseCase`.
    pub const fn new(ctx: OperationContext<E, M, S>) -> Self {
        Self { ctx }
    }

    /// Delete a pending order.
    ///
    /// # Errors
    ///
    /// Returns an `OperationError` if the ticket is not an open pending
    /// order, or once the cancel cannot be placed.
    pub async fn cancel(&self, ticket: Ticket) -> Result<(), OperationError> {
        let log = self.ctx.log(CANCEL);
        if self.ctx.bypass_retries() {
            observability::record_submission(OperationKind::Cancel.as_str());
            return self.ctx.endpoint().cancel_pending_order(ticket).await.map_err(|code| {
                let error = OperationError::Fatal { code, attempts: 1 };
                log.failure(&error, &json!({ "ticket": ticket }));
                error
            });
        }

        let accessor = self.ctx.accessor();
        let order = accessor.order_details(ticket).await?;
        if !order.kind.is_pending() || !order.is_open() {
            return Err(OperationError::InvalidRequest(format!(
                "order {ticket} is not an open pending order"
            )));
        }

        let mut driver = CancelDriver {
            endpoint: self.ctx.endpoint(),
            ticket,
            instrument: order.instrument,
        };
        let mut state = self.ctx.retry_state();

        match self.ctx.orchestrator(log).run(&mut driver, &mut state).await {
            LoopOutcome::Ambiguous { code, attempts } => match accessor.order_details(ticket).await {
                Ok(order) if !order.is_open() => Ok(()),
                _ => {
                    if log.allows(Verbosity::Error) {
                        tracing::error!(operation = CANCEL, %ticket, %code, attempts, "Cancel not confirmed, order still pending");
                    }
                    Err(OperationError::Ambiguous {
                        reason: format!("cancel of {ticket} returned {code} and the order is still pending"),
                    })
                }
            },
            outcome => outcome.into_result(CANCEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PaperConfig, ReliabilityConfig};
    use crate::domain::order::{OrderDetails, OrderKind};
    use crate::infrastructure::{PaperBroker, PaperCall, PaperReply, RecordingSleeper};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn setup() -> (Arc<PaperBroker>, CancelOrderUseCase<PaperBroker, PaperBroker, RecordingSleeper>) {
        let broker = Arc::new(PaperBroker::new(&PaperConfig::default()));
        let ctx = OperationContext::new(
            Arc::clone(&broker),
            Arc::clone(&broker),
            Arc::new(RecordingSleeper::default()),
            ReliabilityConfig::default(),
        );
        (broker, CancelOrderUseCase::new(ctx))
    }

    fn pending(broker: &PaperBroker, kind: OrderKind) -> Ticket {
        let ticket = Ticket::new(7);
        broker.insert_order(OrderDetails {
            ticket,
            instrument: "EURUSD".to_string(),
            kind,
            volume: dec!(1),
            open_price: dec!(1.19000),
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            close_time: None,
        });
        ticket
    }

    #[tokio::test]
    async fn busy_context_is_retried() {
        let (broker, use_case) = setup();
        let ticket = pending(&broker, OrderKind::BuyLimit);
        broker.script_rejects(PaperCall::Cancel, &[BrokerErrorCode::TradeContextBusy]);

        use_case.cancel(ticket).await.unwrap();

        assert_eq!(broker.calls().cancel, 2);
        assert!(!broker.order(ticket).unwrap().is_open());
    }

    #[tokio::test]
    async fn no_result_is_confirmed_by_lookup() {
        let (broker, use_case) = setup();
        let ticket = pending(&broker, OrderKind::SellStop);
        broker.script(PaperCall::Cancel, PaperReply::LostAfterExecution(BrokerErrorCode::NoResult));

        use_case.cancel(ticket).await.unwrap();
    }

    #[tokio::test]
    async fn unconfirmed_cancel_is_ambiguous() {
        let (broker, use_case) = setup();
        let ticket = pending(&broker, OrderKind::SellStop);
        broker.script_rejects(PaperCall::Cancel, &[BrokerErrorCode::NoResult]);

        let error = use_case.cancel(ticket).await.unwrap_err();

        assert!(error.requires_verification());
    }

    #[tokio::test]
    async fn positions_are_not_cancelled() {
        let (broker, use_case) = setup();
        let ticket = pending(&broker, OrderKind::Buy);

        let result = use_case.cancel(ticket).await;

        assert!(matches!(result, Err(OperationError::InvalidRequest(_))));
        assert_eq!(broker.calls().cancel, 0);
    }
}
