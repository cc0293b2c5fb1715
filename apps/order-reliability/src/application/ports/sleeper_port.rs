//! Sleeper Port (Driven Port)
//!
//! The retry loop's only suspension point. Abstracted so tests can record
//! requested delays instead of waiting.

use async_trait::async_trait;
use std::time::Duration;

/// Port for backoff waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the calling operation for `duration`.
    async fn sleep(&self, duration: Duration);
}
