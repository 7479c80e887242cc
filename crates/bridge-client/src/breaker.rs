//! Circuit breaker
//!
//! ```text
//!  Closed ──(N consecutive failures)──► Open ──(window elapsed, next check)──► HalfOpen
//!    ▲                                   ▲                                        │
//!    │                                   └────────────── trial failed ────────────┤
//!    └──────────────────────────────── any success ───────────────────────────────┘
//! ```
//!
//! While half-open exactly one caller holds the trial slot; everyone else still
//! sees the breaker as open.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Externally visible breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected without I/O
    Open,
    /// One trial request is in flight
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Open => f.write_str("open"),
            Self::HalfOpen => f.write_str("half-open"),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    consecutive_failures: u32,
    open_until: Option<Instant>,
    trial_in_flight: bool,
}

/// Consecutive-failure circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    open_for: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `threshold` failures for `open_for`
    #[must_use]
    pub fn new(threshold: u32, open_for: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            open_for,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Ask permission to send. `false` means fail fast with `BreakerOpen`.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut inner = self.inner.lock();
        let open_until = inner.open_until;
        match open_until {
            Some(until) if now < until => false,
            Some(_) if inner.trial_in_flight => false,
            Some(_) if inner.consecutive_failures >= self.threshold => {
                inner.trial_in_flight = true;
                tracing::debug!("Circuit breaker half-open, allowing trial request");
                true
            }
            _ => true,
        }
    }

    /// Ask permission to send, returning a permit that settles the outcome.
    ///
    /// A permit dropped without being settled counts as a failure, so a
    /// caller that abandons a half-open trial cannot leave the breaker half-open.
    pub fn acquire(&self) -> Option<BreakerPermit<'_>> {
        self.try_acquire().then_some(BreakerPermit {
            breaker: self,
            settled: false,
        })
    }

    /// Record a failed send
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    fn record_failure_at(&self, now: Instant) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let currently_open = inner.open_until.is_some_and(|until| now < until);
        if inner.consecutive_failures >= self.threshold && !currently_open {
            inner.open_until = Some(now + self.open_for);
            inner.trial_in_flight = false;
            tracing::warn!(
                failures = inner.consecutive_failures,
                open_for_ms = self.open_for.as_millis(),
                "Circuit breaker opened"
            );
        }
    }

    /// Record a successful send; closes the breaker unconditionally
    pub fn record_success(&self) {
        self.reset();
    }

    /// Return to `Closed` with a clean failure count
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        if inner.open_until.is_some() {
            tracing::info!("Circuit breaker closed");
        }
        *inner = Inner::default();
    }

    /// Current state
    pub fn state(&self) -> BreakerState {
        self.state_at(Instant::now())
    }

    fn state_at(&self, now: Instant) -> BreakerState {
        let inner = self.inner.lock();
        match inner.open_until {
            Some(until) if now < until => BreakerState::Open,
            _ if inner.trial_in_flight => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }

    fn release_trial(&self) {
        self.inner.lock().trial_in_flight = false;
    }

    /// Consecutive failures recorded since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }
}

/// Outcome slot for one send admitted by [`CircuitBreaker::acquire`]
#[must_use = "dropping a permit records a failure"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl BreakerPermit<'_> {
    /// The send succeeded
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    /// The send failed
    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }

    /// Neither outcome counts; frees the half-open slot if this permit held it
    pub fn release(mut self) {
        self.settled = true;
        self.breaker.release_trial();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record_failure();
        }
    }
}

impl fmt::Debug for BreakerPermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerPermit")
            .field("settled", &self.settled)
            .finish()
    }
}
