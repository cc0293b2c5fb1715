//! Request corrections applied between attempts.
//!
//! - [`stops`]: stop-loss/take-profit minimum-distance clamping
//! - [`pending_price`]: pending price snap/nudge and market conversion
//! - [`slippage`]: signed slippage measurement and remaining budget

pub mod pending_price;
pub mod slippage;
pub mod stops;

pub use pending_price::{PendingCorrection, PendingPriceCorrector};
pub use slippage::{SlippageCheck, SlippageTracker};
pub use stops::{StopDistanceCorrector, StopLevels};
