//! Domain Layer
//!
//! Pure value types and correction logic with no I/O:
//!
//! - [`order`]: order kinds, tickets, working requests, order details
//! - [`instrument`]: market snapshots and price-increment arithmetic
//! - [`corrections`]: stop-distance, pending-price and slippage corrections

pub mod corrections;
pub mod instrument;
pub mod order;
