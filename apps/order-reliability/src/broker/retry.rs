//! Randomized backoff between retry attempts.
//!
//! Delays are drawn from an exponential distribution around a configured
//! mean, the network-friendly analogue of Ethernet backoff: many concurrent
//! operations retrying against the same endpoint spread out instead of
//! resubmitting in lockstep.
//!
//! Every delay is floored (no busy-looping) and capped. Inside a simulated
//! context no delay is produced at all.
//!
//! # Example
//!
//! ```rust,ignore
//! use order_reliability::broker::BackoffPolicy;
//! use std::time::Duration;
//!
//! let policy = BackoffPolicy::default();
//! let delay = policy.delay(); // >= 20ms, ~50ms on average
//! assert!(policy.delay_for(true).is_none()); // simulated context
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Mean of the exponential distribution (default: 50ms).
    pub mean: Duration,
    /// Lower bound on any delay (default: 20ms).
    pub floor: Duration,
    /// Upper bound on any delay (default: 500ms).
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            mean: Duration::from_millis(50),
            floor: Duration::from_millis(20),
            cap: Duration::from_millis(500),
        }
    }
}

impl BackoffPolicy {
    /// Create a backoff policy with custom settings.
    ///
    /// A cap below the floor is raised to the floor.
    #[must_use]
    pub fn new(mean: Duration, floor: Duration, cap: Duration) -> Self {
        Self {
            mean,
            floor,
            cap: cap.max(floor),
        }
    }

    /// Draw a delay using the thread-local RNG.
    #[must_use]
    pub fn delay(&self) -> Duration {
        let mut rng = rand::rng();
        self.delay_with(&mut rng)
    }

    /// Draw a delay from `rng`.
    ///
    /// Inverse-CDF sampling: `-mean * ln(1 - u)` for `u` uniform in `[0, 1)`.
    pub fn delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let u: f64 = rng.random();
        let mean_ms = self.mean.as_secs_f64() * 1000.0;
        let sample_ms = -mean_ms * (1.0 - u).ln();

        let floor_ms = self.floor.as_secs_f64() * 1000.0;
        let cap_ms = self.cap.as_secs_f64() * 1000.0;
        let clamped_ms = sample_ms.clamp(floor_ms, cap_ms.max(floor_ms));

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let micros = (clamped_ms * 1000.0) as u64;
        Duration::from_micros(micros)
    }

    /// Delay for the current context, or `None` inside a simulation.
    #[must_use]
    pub fn delay_for(&self, simulated: bool) -> Option<Duration> {
        if simulated { None } else { Some(self.delay()) }
    }
}
