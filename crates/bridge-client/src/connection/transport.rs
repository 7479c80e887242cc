//! Frame transport
//!
//! One reader, one writer and one heartbeat task per socket. The first of
//! them to finish (or shutdown) ends the run and the others are aborted.

use super::heartbeat::{self, HeartbeatConfig};
use super::DisconnectReason;
use crate::broadcast::Event;
use crate::client::Shared;
use crate::correlator::Correlator;
use crate::error::BridgeError;
use crate::protocol::{BridgeCodec, Decoded, Frame};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time;
use tokio_util::codec::{FramedRead, FramedWrite};

/// Run the transport over `stream` until it fails or the client shuts down
pub(crate) async fn run(shared: &Arc<Shared>, stream: TcpStream) -> DisconnectReason {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
    }
    let (read_half, write_half) = stream.into_split();
    let options = &shared.options;

    let frames_in = FramedRead::new(read_half, BridgeCodec::with_max_body(options.max_body));
    let frames_out = FramedWrite::new(write_half, BridgeCodec::with_max_body(options.max_body));
    let (pong_tx, pong_rx) = watch::channel(0u64);

    let mut reader = tokio::spawn(read_loop(Arc::clone(shared), frames_in, pong_tx));
    let mut writer = tokio::spawn(write_loop(
        Arc::clone(&shared.outbound_rx),
        Arc::clone(&shared.correlator),
        frames_out,
        options.write_timeout,
    ));
    let mut heartbeat = tokio::spawn(heartbeat::monitor(
        HeartbeatConfig {
            interval: options.heartbeat_interval,
            timeout: options.heartbeat_timeout,
            max_misses: options.heartbeat_misses,
        },
        shared.outbound_tx.clone(),
        pong_rx,
    ));

    let (reason, finished) = tokio::select! {
        result = &mut reader => (joined(result, "reader"), Some("reader")),
        result = &mut writer => (joined(result, "writer"), Some("writer")),
        result = &mut heartbeat => (joined(result, "heartbeat"), Some("heartbeat")),
        () = shared.shutdown.cancelled() => (DisconnectReason::Shutdown, None),
    };

    // a finished handle must not be polled again; the rest are aborted and
    // awaited so the writer releases the outbound queue before the next run
    let unfinished: Vec<_> = [("writer", writer), ("reader", reader), ("heartbeat", heartbeat)]
        .into_iter()
        .filter(|(task, _)| finished != Some(*task))
        .map(|(_, handle)| handle)
        .collect();
    for handle in &unfinished {
        handle.abort();
    }
    for handle in unfinished {
        let _ = handle.await;
    }

    reason
}

fn joined(
    result: Result<DisconnectReason, tokio::task::JoinError>,
    task: &str,
) -> DisconnectReason {
    result.unwrap_or_else(|e| {
        tracing::error!(task = task, error = %e, "Connection task panicked");
        DisconnectReason::TaskFailed(task.to_string())
    })
}

async fn read_loop(
    shared: Arc<Shared>,
    mut frames: FramedRead<OwnedReadHalf, BridgeCodec>,
    pongs: watch::Sender<u64>,
) -> DisconnectReason {
    let read_timeout = shared.options.read_timeout;

    loop {
        let next = match time::timeout(read_timeout, frames.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::trace!(
                    timeout_ms = read_timeout.as_millis(),
                    "No data before read deadline"
                );
                continue;
            }
        };

        match next {
            None => return DisconnectReason::PeerClosed,
            Some(Err(e)) => return DisconnectReason::ReadFailed(e),
            Some(Ok(Decoded::Malformed(reason))) => {
                tracing::warn!(reason = %reason, "Dropping malformed frame");
            }
            Some(Ok(Decoded::Frame(frame))) => dispatch(&shared, &pongs, frame),
        }
    }
}

fn dispatch(shared: &Shared, pongs: &watch::Sender<u64>, frame: Frame) {
    match frame {
        Frame::Pong => {
            shared.link.record_heartbeat();
            pongs.send_modify(|n| *n = n.wrapping_add(1));
        }
        Frame::Ping => {
            if shared.outbound_tx.try_send(Frame::Pong).is_err() {
                tracing::debug!("Outbound queue full, not answering PING");
            }
        }
        Frame::Res { id, body } => {
            tracing::trace!(id = %id, len = body.len(), "Response received");
            shared.correlator.resolve(&id, Ok(body));
        }
        Frame::Err { id, message } => {
            let message = String::from_utf8_lossy(&message).into_owned();
            tracing::debug!(id = %id, message = %message, "Error response received");
            shared.correlator.resolve(&id, Err(BridgeError::Remote(message)));
        }
        Frame::Evt { topic, body } => {
            tracing::trace!(topic = %topic, len = body.len(), "Event received");
            shared.fanout.publish(&Event::new(topic, body));
        }
        Frame::Cmd { id, .. } => {
            tracing::debug!(id = %id, "Ignoring command from peer");
        }
        Frame::Unknown { kind } => {
            tracing::debug!(kind = %kind, "Ignoring unknown frame kind");
        }
    }
}

async fn write_loop<W>(
    queue: Arc<Mutex<mpsc::Receiver<Frame>>>,
    correlator: Arc<Correlator>,
    mut sink: FramedWrite<W, BridgeCodec>,
    write_timeout: Duration,
) -> DisconnectReason
where
    W: AsyncWrite + Unpin,
{
    let mut queue = queue.lock().await;

    while let Some(frame) = queue.recv().await {
        // the caller already gave up or was failed by a previous connection
        if let Frame::Cmd { id, .. } = &frame {
            if !correlator.is_pending(id) {
                tracing::debug!(id = %id, "Skipping command with no waiting caller");
                continue;
            }
        }

        let kind = frame.kind();
        match time::timeout(write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => tracing::trace!(kind = ?kind, "Frame written"),
            Ok(Err(e)) => return DisconnectReason::WriteFailed(e),
            Err(_) => return DisconnectReason::WriteFailed(BridgeError::Timeout(write_timeout)),
        }
    }

    DisconnectReason::Shutdown
}
