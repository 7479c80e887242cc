//! Connection supervisor
//!
//! Dials, runs the transport, and redials with exponential backoff plus
//! jitter until shutdown. Backoff is reset only after a run that outlived
//! the flap threshold; a short run sleeps the current backoff first.

use super::backoff::{jitter, Backoff};
use super::transport;
use crate::client::Shared;
use crate::error::BridgeError;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};

/// Supervise the link until `shared.shutdown` fires
pub(crate) async fn supervise(shared: Arc<Shared>) {
    let options = &shared.options;
    let addr = shared.link.addr().to_string();
    let mut backoff = Backoff::new(
        options.reconnect_base_backoff,
        options.reconnect_max_backoff,
    );

    tracing::info!(addr = %addr, "Bridge supervisor started");

    while !shared.shutdown.is_cancelled() {
        let attempt = shared.link.record_dial_attempt();
        let dial = time::timeout(options.dial_timeout, TcpStream::connect(addr.as_str()));

        let dialed = tokio::select! {
            () = shared.shutdown.cancelled() => break,
            dialed = dial => dialed,
        };

        match dialed {
            Ok(Ok(stream)) => {
                let generation = shared.install();
                tracing::info!(
                    addr = %addr,
                    attempt = attempt,
                    generation = generation,
                    "Bridge connected"
                );

                let started = Instant::now();
                let reason = transport::run(&shared, stream).await;
                let lived = started.elapsed();
                shared.connection_lost();

                if reason.is_shutdown() {
                    break;
                }
                tracing::info!(
                    addr = %addr,
                    reason = %reason,
                    lived_ms = lived.as_millis(),
                    "Bridge disconnected"
                );

                if lived >= options.flap_threshold {
                    backoff.reset();
                    continue;
                }
                tracing::warn!(
                    addr = %addr,
                    lived_ms = lived.as_millis(),
                    "Connection flapping, backing off"
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    addr = %addr,
                    attempt = attempt,
                    error = %BridgeError::from(e),
                    "Dial failed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    addr = %addr,
                    attempt = attempt,
                    timeout_ms = options.dial_timeout.as_millis(),
                    "Dial timed out"
                );
            }
        }

        let delay = backoff.next_delay() + jitter(options.reconnect_jitter);
        tracing::debug!(addr = %addr, delay_ms = delay.as_millis(), "Waiting before redial");

        tokio::select! {
            () = shared.shutdown.cancelled() => break,
            () = time::sleep(delay) => {}
        }
    }

    shared.link.mark_disconnected();
    tracing::info!(addr = %addr, "Bridge supervisor stopped");
}
