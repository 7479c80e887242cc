//! Heartbeat monitor
//!
//! Sends a PING every interval and waits for the reader to see a PONG. After
//! `max_misses` consecutive unanswered probes it returns, which tears the
//! connection down. It never touches pending requests itself.

use super::DisconnectReason;
use crate::protocol::Frame;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

/// Probe timing
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_misses: u32,
}

/// Run the monitor until the connection should be closed.
///
/// `pongs` is bumped by the reader each time a PONG arrives.
pub async fn monitor(
    config: HeartbeatConfig,
    outbound: mpsc::Sender<Frame>,
    mut pongs: watch::Receiver<u64>,
) -> DisconnectReason {
    let mut ticker = time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut misses = 0u32;

    loop {
        ticker.tick().await;
        pongs.borrow_and_update();

        match outbound.try_send(Frame::Ping) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                // the write deadline will catch a stalled writer
                tracing::debug!("Outbound queue full, skipping heartbeat");
                continue;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return DisconnectReason::Shutdown,
        }

        match time::timeout(config.timeout, pongs.changed()).await {
            Ok(Ok(())) => {
                if misses > 0 {
                    tracing::debug!(misses = misses, "Heartbeat recovered");
                }
                misses = 0;
            }
            // reader is gone; the transport notices on its own
            Ok(Err(_)) => return DisconnectReason::PeerClosed,
            Err(_) => {
                misses += 1;
                tracing::warn!(
                    misses = misses,
                    max_misses = config.max_misses,
                    timeout_ms = config.timeout.as_millis(),
                    "Heartbeat missed"
                );
                if misses >= config.max_misses {
                    return DisconnectReason::HeartbeatMissed(misses);
                }
            }
        }
    }
}
