//! Redial backoff

use rand::Rng;
use std::time::Duration;

/// Exponential backoff, doubling from `base` up to `max`
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a backoff starting at `base`
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Delay to sleep now; the following call returns double, capped at `max`
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Back to `base` after a stable connection
    pub fn reset(&mut self) {
        self.current = self.base;
    }

    /// Delay the next call to `next_delay` will return
    pub fn peek(&self) -> Duration {
        self.current
    }
}

/// Uniform random extra delay in `0..=bound`
pub(crate) fn jitter(bound: Duration) -> Duration {
    let bound_ms = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    if bound_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=bound_ms))
}
