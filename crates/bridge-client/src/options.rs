//! Client options
//!
//! Timeouts, heartbeat, reconnect and breaker tuning for a [`BridgeClient`](crate::BridgeClient).

use crate::protocol::DEFAULT_MAX_BODY;
use std::time::Duration;

/// Tuning knobs for the bridge client
///
/// A zero value in any field means "use the default"; call
/// [`ClientOptions::normalized`] (done by the client) to fill them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Bound on a single dial attempt
    pub dial_timeout: Duration,
    /// Per-read deadline; expiry without data is tolerated
    pub read_timeout: Duration,
    /// Per-write deadline; expiry ends the connection
    pub write_timeout: Duration,
    /// Time between PING probes
    pub heartbeat_interval: Duration,
    /// How long each probe waits for a PONG
    pub heartbeat_timeout: Duration,
    /// Consecutive missed PONGs before the socket is closed
    pub heartbeat_misses: u32,
    /// First redial delay, and the value backoff resets to after a stable run
    pub reconnect_base_backoff: Duration,
    /// Cap on the redial delay
    pub reconnect_max_backoff: Duration,
    /// Upper bound of the random delay added to every backoff sleep
    pub reconnect_jitter: Duration,
    /// A connection that lives shorter than this is treated as flapping
    pub flap_threshold: Duration,
    /// Default deadline for a command response
    pub command_timeout: Duration,
    /// Consecutive failures that open the breaker
    pub breaker_failures: u32,
    /// How long the breaker stays open before allowing a trial request
    pub breaker_open_for: Duration,
    /// Capacity of the outbound frame queue
    pub write_queue_capacity: usize,
    /// Subscriber buffer used when `subscribe(0)` is requested
    pub default_subscriber_buffer: usize,
    /// Largest body accepted or sent
    pub max_body: usize,
    /// Bound on waiting for background work during `close`
    pub shutdown_grace: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(5),
            heartbeat_misses: 2,
            reconnect_base_backoff: Duration::from_secs(1),
            reconnect_max_backoff: Duration::from_secs(30),
            reconnect_jitter: Duration::from_millis(500),
            flap_threshold: Duration::from_secs(2),
            command_timeout: Duration::from_secs(10),
            breaker_failures: 3,
            breaker_open_for: Duration::from_secs(10),
            write_queue_capacity: 128,
            default_subscriber_buffer: 2048,
            max_body: DEFAULT_MAX_BODY,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

fn or_default<T: PartialEq + Default>(value: T, default: T) -> T {
    if value == T::default() {
        default
    } else {
        value
    }
}

impl ClientOptions {
    /// Replace zero values with their defaults
    #[must_use]
    pub fn normalized(self) -> Self {
        let d = Self::default();
        let mut o = Self {
            dial_timeout: or_default(self.dial_timeout, d.dial_timeout),
            read_timeout: or_default(self.read_timeout, d.read_timeout),
            write_timeout: or_default(self.write_timeout, d.write_timeout),
            heartbeat_interval: or_default(self.heartbeat_interval, d.heartbeat_interval),
            heartbeat_timeout: or_default(self.heartbeat_timeout, d.heartbeat_timeout),
            heartbeat_misses: or_default(self.heartbeat_misses, d.heartbeat_misses),
            reconnect_base_backoff: or_default(
                self.reconnect_base_backoff,
                d.reconnect_base_backoff,
            ),
            reconnect_max_backoff: or_default(self.reconnect_max_backoff, d.reconnect_max_backoff),
            // zero jitter is a legitimate choice
            reconnect_jitter: self.reconnect_jitter,
            flap_threshold: or_default(self.flap_threshold, d.flap_threshold),
            command_timeout: or_default(self.command_timeout, d.command_timeout),
            breaker_failures: or_default(self.breaker_failures, d.breaker_failures),
            breaker_open_for: or_default(self.breaker_open_for, d.breaker_open_for),
            write_queue_capacity: or_default(self.write_queue_capacity, d.write_queue_capacity),
            default_subscriber_buffer: or_default(
                self.default_subscriber_buffer,
                d.default_subscriber_buffer,
            ),
            max_body: or_default(self.max_body, d.max_body),
            shutdown_grace: or_default(self.shutdown_grace, d.shutdown_grace),
        };
        if o.reconnect_max_backoff < o.reconnect_base_backoff {
            o.reconnect_max_backoff = o.reconnect_base_backoff;
        }
        o
    }

    /// Set the dial timeout
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the per-read deadline
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the per-write deadline
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set heartbeat interval and per-probe timeout
    pub fn with_heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.heartbeat_timeout = timeout;
        self
    }

    /// Set how many consecutive misses close the socket
    pub fn with_heartbeat_misses(mut self, misses: u32) -> Self {
        self.heartbeat_misses = misses;
        self
    }

    /// Set base and maximum redial backoff
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.reconnect_base_backoff = base;
        self.reconnect_max_backoff = max;
        self
    }

    /// Set the random jitter bound added to backoff sleeps
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    /// Set the flapping threshold
    pub fn with_flap_threshold(mut self, threshold: Duration) -> Self {
        self.flap_threshold = threshold;
        self
    }

    /// Set the default command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set breaker threshold and open window
    pub fn with_breaker(mut self, failures: u32, open_for: Duration) -> Self {
        self.breaker_failures = failures;
        self.breaker_open_for = open_for;
        self
    }

    /// Set the outbound queue capacity
    pub fn with_write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity;
        self
    }

    /// Set the body size cap
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }
}
