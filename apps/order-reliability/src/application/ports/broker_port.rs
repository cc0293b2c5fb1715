//! Order Endpoint Port (Driven Port)
//!
//! The remote order-transmission primitives. Each call either succeeds or
//! returns the raw broker error code; the retry loop classifies the code.
//! Implementations do not retry.

use async_trait::async_trait;

use crate::broker::BrokerErrorCode;
use crate::domain::order::{CloseRequest, ModifyRequest, OrderDetails, OrderRequest, Ticket};
use crate::error::EndpointError;

/// Port for order transmission.
#[async_trait]
pub trait OrderEndpointPort: Send + Sync {
    /// Open a market or pending order.
    async fn submit_order(&self, request: &OrderRequest) -> Result<Ticket, BrokerErrorCode>;

    /// Amend price, stops and expiration of an order.
    async fn amend_order(&self, request: &ModifyRequest) -> Result<(), BrokerErrorCode>;

    /// Close (part of) an open position.
    async fn close_order(&self, request: &CloseRequest) -> Result<(), BrokerErrorCode>;

    /// Delete a pending order.
    async fn cancel_pending_order(&self, ticket: Ticket) -> Result<(), BrokerErrorCode>;

    /// Read back an order's current state.
    async fn lookup_order(&self, ticket: Ticket) -> Result<OrderDetails, EndpointError>;
}
