//! Application Ports (Driven)
//!
//! Ports define interfaces for the external collaborators the retry loop
//! drives: the order endpoint, market data, and the backoff sleeper.

mod broker_port;
mod market_data_port;
mod sleeper_port;

pub use broker_port::OrderEndpointPort;
pub use market_data_port::MarketDataPort;
pub use sleeper_port::Sleeper;
