//! Order Details Accessor
//!
//! Thin read path over the endpoint and market-data ports. Every retry
//! iteration reads instrument metadata through here, so corrections always
//! work from a fresh quote.

use crate::application::ports::{MarketDataPort, OrderEndpointPort};
use crate::domain::instrument::InstrumentMetadata;
use crate::domain::order::{OrderDetails, Ticket};
use crate::error::EndpointError;

/// Read-only view of instruments and orders.
pub struct OrderDetailsAccessor<'a, E, M> {
    endpoint: &'a E,
    market: &'a M,
}

impl<E, M> Clone for OrderDetailsAccessor<'_, E, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, M> Copy for OrderDetailsAccessor<'_, E, M> {}

impl<'a, E, M> OrderDetailsAccessor<'a, E, M>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
{
    /// Create an accessor over the given ports.
    pub const fn new(endpoint: &'a E, market: &'a M) -> Self {
        Self { endpoint, market }
    }

    /// Normalized metadata from a fresh market snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if market data is unavailable for `instrument`.
    pub async fn instrument_metadata(&self, instrument: &str) -> Result<InstrumentMetadata, EndpointError> {
        let snapshot = self.market.market_snapshot(instrument).await?;
        Ok(InstrumentMetadata::from_snapshot(&snapshot))
    }

    /// Current state of an order.
    ///
    /// # Errors
    ///
    /// Returns `EndpointError::OrderNotFound` for an unknown ticket.
    pub async fn order_details(&self, ticket: Ticket) -> Result<OrderDetails, EndpointError> {
        self.endpoint.lookup_order(ticket).await
    }

    /// Whether the host reports a simulated context.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.market.is_simulated()
    }
}
