//! Application Layer
//!
//! The application layer drives the domain corrections through the retry
//! loop. It defines:
//!
//! - **Ports**: The order endpoint, market data and sleeper collaborators
//! - **Services**: The order-details read path and the retry orchestrator
//! - **Use Cases**: One per reliable operation
//! - **`OrderReliability`**: The public operation surface

mod order_reliability;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use order_reliability::OrderReliability;
pub use ports::*;
pub use use_cases::*;
