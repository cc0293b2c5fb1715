//! Market Data Port (Driven Port)
//!
//! Current quotes and instrument constraints, read before every attempt.

use async_trait::async_trait;

use crate::domain::instrument::MarketSnapshot;
use crate::error::EndpointError;

/// Port for market data.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Current bid/ask, raw point size, minimum stop distance and digits.
    async fn market_snapshot(&self, instrument: &str) -> Result<MarketSnapshot, EndpointError>;

    /// Whether the host is a simulated/backtest context.
    fn is_simulated(&self) -> bool;
}
