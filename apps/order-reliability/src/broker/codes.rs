//! Raw error codes returned by the order endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code reported by the endpoint for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum BrokerErrorCode {
    /// No error.
    NoError,
    /// Request matched the server state; nothing changed.
    NoResult,
    /// Common error.
    CommonError,
    /// Invalid trade parameters.
    InvalidTradeParameters,
    /// Trade server is busy.
    ServerBusy,
    /// Old client version.
    OldVersion,
    /// No connection with the trade server.
    NoConnection,
    /// Not enough rights.
    NotEnoughRights,
    /// Requests are too frequent.
    TooFrequentRequests,
    /// Malfunctional trade operation.
    MalfunctionalTrade,
    /// Account disabled.
    AccountDisabled,
    /// Invalid account.
    InvalidAccount,
    /// Trade timeout.
    TradeTimeout,
    /// Invalid price.
    InvalidPrice,
    /// Invalid stops.
    InvalidStops,
    /// Invalid trade volume.
    InvalidTradeVolume,
    /// Market is closed.
    MarketClosed,
    /// Trade is disabled.
    TradeDisabled,
    /// Not enough money.
    NotEnoughMoney,
    /// Price changed.
    PriceChanged,
    /// Off quotes.
    OffQuotes,
    /// Broker is busy.
    BrokerBusy,
    /// Requote.
    Requote,
    /// Order is locked.
    OrderLocked,
    /// Long positions only allowed.
    LongPositionsOnly,
    /// Too many requests.
    TooManyRequests,
    /// Modification denied because the order is too close to market.
    TradeModifyDenied,
    /// Trade context is busy.
    TradeContextBusy,
    /// Expirations are denied by broker.
    TradeExpirationDenied,
    /// Too many open and pending orders.
    TradeTooManyOrders,
    /// Unknown symbol.
    UnknownSymbol,
    /// Invalid ticket.
    InvalidTicket,
    /// Any code not in the table.
    Other(i32),
}

impl BrokerErrorCode {
    /// Map a raw numeric code.
    #[must_use]
    pub const fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::NoResult,
            2 => Self::CommonError,
            3 => Self::InvalidTradeParameters,
            4 => Self::ServerBusy,
            5 => Self::OldVersion,
            6 => Self::NoConnection,
            7 => Self::NotEnoughRights,
            8 => Self::TooFrequentRequests,
            9 => Self::MalfunctionalTrade,
            64 => Self::AccountDisabled,
            65 => Self::InvalidAccount,
            128 => Self::TradeTimeout,
            129 => Self::InvalidPrice,
            130 => Self::InvalidStops,
            131 => Self::InvalidTradeVolume,
            132 => Self::MarketClosed,
            133 => Self::TradeDisabled,
            134 => Self::NotEnoughMoney,
            135 => Self::PriceChanged,
            136 => Self::OffQuotes,
            137 => Self::BrokerBusy,
            138 => Self::Requote,
            139 => Self::OrderLocked,
            140 => Self::LongPositionsOnly,
            141 => Self::TooManyRequests,
            145 => Self::TradeModifyDenied,
            146 => Self::TradeContextBusy,
            147 => Self::TradeExpirationDenied,
            148 => Self::TradeTooManyOrders,
            4106 => Self::UnknownSymbol,
            4108 => Self::InvalidTicket,
            other => Self::Other(other),
        }
    }

    /// Raw numeric code.
    #[must_use]
    pub const fn as_raw(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::NoResult => 1,
            Self::CommonError => 2,
            Self::InvalidTradeParameters => 3,
            Self::ServerBusy => 4,
            Self::OldVersion => 5,
            Self::NoConnection => 6,
            Self::NotEnoughRights => 7,
            Self::TooFrequentRequests => 8,
            Self::MalfunctionalTrade => 9,
            Self::AccountDisabled => 64,
            Self::InvalidAccount => 65,
            Self::TradeTimeout => 128,
            Self::InvalidPrice => 129,
            Self::InvalidStops => 130,
            Self::InvalidTradeVolume => 131,
            Self::MarketClosed => 132,
            Self::TradeDisabled => 133,
            Self::NotEnoughMoney => 134,
            Self::PriceChanged => 135,
            Self::OffQuotes => 136,
            Self::BrokerBusy => 137,
            Self::Requote => 138,
            Self::OrderLocked => 139,
            Self::LongPositionsOnly => 140,
            Self::TooManyRequests => 141,
            Self::TradeModifyDenied => 145,
            Self::TradeContextBusy => 146,
            Self::TradeExpirationDenied => 147,
            Self::TradeTooManyOrders => 148,
            Self::UnknownSymbol => 4106,
            Self::InvalidTicket => 4108,
            Self::Other(code) => *code,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NoError => "no error",
            Self::NoResult => "no result",
            Self::CommonError => "common error",
            Self::InvalidTradeParameters => "invalid trade parameters",
            Self::ServerBusy => "trade server is busy",
            Self::OldVersion => "old version of the client terminal",
            Self::NoConnection => "no connection with trade server",
            Self::NotEnoughRights => "not enough rights",
            Self::TooFrequentRequests => "too frequent requests",
            Self::MalfunctionalTrade => "malfunctional trade operation",
            Self::AccountDisabled => "account disabled",
            Self::InvalidAccount => "invalid account",
            Self::TradeTimeout => "trade timeout",
            Self::InvalidPrice => "invalid price",
            Self::InvalidStops => "invalid stops",
            Self::InvalidTradeVolume => "invalid trade volume",
            Self::MarketClosed => "market is closed",
            Self::TradeDisabled => "trade is disabled",
            Self::NotEnoughMoney => "not enough money",
            Self::PriceChanged => "price changed",
            Self::OffQuotes => "off quotes",
            Self::BrokerBusy => "broker is busy",
            Self::Requote => "requote",
            Self::OrderLocked => "order is locked",
            Self::LongPositionsOnly => "long positions only allowed",
            Self::TooManyRequests => "too many requests",
            Self::TradeModifyDenied => "modification denied because order too close to market",
            Self::TradeContextBusy => "trade context is busy",
            Self::TradeExpirationDenied => "expirations are denied by broker",
            Self::TradeTooManyOrders => "amount of open and pending orders has reached the limit",
            Self::UnknownSymbol => "unknown symbol",
            Self::InvalidTicket => "invalid ticket",
            Self::Other(_) => "unknown error",
        }
    }
}

impl From<i32> for BrokerErrorCode {
    fn from(code: i32) -> Self {
        Self::from_raw(code)
    }
}

impl From<BrokerErrorCode> for i32 {
    fn from(code: BrokerErrorCode) -> Self {
        code.as_raw()
    }
}

impl fmt::Display for BrokerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_raw(), self.description())
    }
}
