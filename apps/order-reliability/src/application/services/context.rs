//! Collaborators and configuration shared by every operation.

use std::sync::Arc;

use super::orchestrator::{RetryOrchestrator, RetryState};
use super::order_details::OrderDetailsAccessor;
use crate::application::ports::{MarketDataPort, OrderEndpointPort, Sleeper};
use crate::config::ReliabilityConfig;
use crate::observability::OperationLog;

/// Ports plus read-only configuration, cheap to clone.
pub struct OperationContext<E, M, S> {
    endpoint: Arc<E>,
    market: Arc<M>,
    sleeper: Arc<S>,
    config: ReliabilityConfig,
}

impl<E, M, S> Clone for OperationContext<E, M, S> {
    fn clone(&self) -> Self {
        Self {
            endpoint: Arc::clone(&self.endpoint),
            market: Arc::clone(&self.market),
            sleeper: Arc::clone(&self.sleeper),
            config: self.config.clone(),
        }
    }
}

impl<E, M, S> OperationContext<E, M, S>
where
    E: OrderEndpointPort,
    M: MarketDataPort,
    S: Sleeper,
{
    /// Bind ports and configuration.
    pub const fn new(endpoint: Arc<E>, market: Arc<M>, sleeper: Arc<S>, config: ReliabilityConfig) -> Self {
        Self {
            endpoint,
            market,
            sleeper,
            config,
        }
    }

    /// Retry configuration.
    pub const fn config(&self) -> &ReliabilityConfig {
        &self.config
    }

    /// Order endpoint.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Read path over the endpoint and market data.
    pub fn accessor(&self) -> OrderDetailsAccessor<'_, E, M> {
        OrderDetailsAccessor::new(&self.endpoint, &self.market)
    }

    /// Verbosity gate for `operation`.
    pub fn log(&self, operation: &'static str) -> OperationLog {
        OperationLog::new(operation, self.config.error_level, self.market.is_simulated())
    }

    /// Simulated contexts call the endpoint once, unmodified, unless opted in.
    pub fn bypass_retries(&self) -> bool {
        self.market.is_simulated() && !self.config.retry_in_simulation
    }

    /// Orchestrator logging through `log`.
    pub fn orchestrator(&self, log: OperationLog) -> RetryOrchestrator<'_, E, M, S> {
        RetryOrchestrator::new(
            self.accessor(),
            &self.sleeper,
            self.config.backoff(),
            self.config.classification(),
            log,
        )
    }

    /// Fresh retry bookkeeping.
    pub const fn retry_state(&self) -> RetryState {
        RetryState::new(self.config.max_attempts())
    }
}
