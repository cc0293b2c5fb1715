//! Paper broker settings used by the binary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Initial market for the in-memory paper broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Instrument quoted by the paper broker.
    #[serde(default = "default_instrument")]
    pub instrument: String,
    /// Initial bid.
    #[serde(default = "default_bid")]
    pub bid: Decimal,
    /// Initial ask.
    #[serde(default = "default_ask")]
    pub ask: Decimal,
    /// Raw tick size.
    #[serde(default = "default_point")]
    pub point: Decimal,
    /// Price precision.
    #[serde(default = "default_digits")]
    pub digits: u32,
    /// Minimum stop distance in increments.
    #[serde(default = "default_stop_level")]
    pub stop_level: u32,
    /// Adverse fill slippage applied to market fills, in price units.
    #[serde(default)]
    pub fill_slippage: Decimal,
    /// Report a simulated context.
    #[serde(default)]
    pub simulated: bool,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            instrument: default_instrument(),
            bid: default_bid(),
            ask: default_ask(),
            point: default_point(),
            digits: default_digits(),
            stop_level: default_stop_level(),
            fill_slippage: Decimal::ZERO,
            simulated: false,
        }
    }
}

fn default_instrument() -> String {
    "EURUSD".to_string()
}

fn default_bid() -> Decimal {
    Decimal::new(120_000, 5) // 1.20000
}

fn default_ask() -> Decimal {
    Decimal::new(120_020, 5) // 1.20020
}

fn default_point() -> Decimal {
    Decimal::new(1, 5) // 0.00001
}

const fn default_digits() -> u32 {
    5
}

const fn default_stop_level() -> u32 {
    10
}
