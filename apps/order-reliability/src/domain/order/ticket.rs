//! Broker-assigned order ticket.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket identifying an order at the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(i64);

impl Ticket {
    /// Failure sentinel returned to callers that want a raw ticket.
    pub const INVALID: Self = Self(-1);

    /// Wrap a raw ticket number.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw ticket number.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Endpoints never hand out negative tickets.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
