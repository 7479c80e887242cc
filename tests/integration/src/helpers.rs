//! Test helpers for integration tests
//!
//! Provides a scripted peer that speaks the bridge protocol over a real TCP
//! socket, plus small polling utilities.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bridge_client::{BridgeCodec, Decoded, Frame, Topic};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

/// How long a helper waits for the client before failing the test
pub const STEP_TIMEOUT: Duration = Duration::from_secs(3);

/// Listening side of a scripted peer
pub struct MockPeer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockPeer {
    /// Bind on an ephemeral loopback port
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// Address to hand to the client
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Accept the next client connection
    pub async fn accept(&self) -> Result<PeerConn> {
        self.accept_within(STEP_TIMEOUT).await
    }

    /// Accept the next client connection, failing after `limit`
    pub async fn accept_within(&self, limit: Duration) -> Result<PeerConn> {
        let (stream, _) = tokio::time::timeout(limit, self.listener.accept())
            .await
            .map_err(|_| anyhow!("no connection within {limit:?}"))??;
        Ok(PeerConn::new(stream))
    }
}

/// One accepted connection on the peer side
pub struct PeerConn {
    frames: Framed<TcpStream, BridgeCodec>,
    answer_pings: bool,
    pings_seen: usize,
}

impl PeerConn {
    fn new(stream: TcpStream) -> Self {
        Self {
            frames: Framed::new(stream, BridgeCodec::new()),
            answer_pings: true,
            pings_seen: 0,
        }
    }

    /// Stop answering PING with PONG
    pub fn ignore_pings(mut self) -> Self {
        self.answer_pings = false;
        self
    }

    /// Number of PINGs received so far
    pub fn pings_seen(&self) -> usize {
        self.pings_seen
    }

    /// Next frame as decoded, `None` once the client hung up
    pub async fn recv(&mut self) -> Result<Option<Frame>> {
        let next = tokio::time::timeout(STEP_TIMEOUT, self.frames.next())
            .await
            .map_err(|_| anyhow!("no frame within {STEP_TIMEOUT:?}"))?;

        match next {
            None => Ok(None),
            Some(Ok(Decoded::Frame(frame))) => Ok(Some(frame)),
            Some(Ok(Decoded::Malformed(reason))) => bail!("client sent malformed frame: {reason}"),
            // a reset from the client counts as hanging up
            Some(Err(_)) => Ok(None),
        }
    }

    /// Next CMD frame, handling PINGs on the way
    pub async fn recv_command(&mut self) -> Result<(String, Bytes)> {
        loop {
            match self.recv().await?.context("client hung up")? {
                Frame::Ping => self.on_ping().await?,
                Frame::Cmd { id, body } => return Ok((id, body)),
                other => bail!("expected CMD, got {other:?}"),
            }
        }
    }

    /// Wait for the client to close the socket, handling PINGs meanwhile
    pub async fn expect_closed(&mut self) -> Result<()> {
        loop {
            match self.recv().await? {
                None => return Ok(()),
                Some(Frame::Ping) => self.on_ping().await?,
                Some(_) => {}
            }
        }
    }

    /// Send a frame to the client
    pub async fn send(&mut self, frame: Frame) -> Result<()> {
        self.frames.send(frame).await?;
        Ok(())
    }

    /// Write bytes to the socket exactly as given
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.frames.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Answer a command
    pub async fn respond(&mut self, id: &str, body: &str) -> Result<()> {
        self.send(Frame::response(id, body.to_string())).await
    }

    /// Reject a command
    pub async fn fail(&mut self, id: &str, message: &str) -> Result<()> {
        self.send(Frame::error(id, message.to_string())).await
    }

    /// Push an event
    pub async fn event(&mut self, topic: impl Into<Topic>, body: &str) -> Result<()> {
        self.send(Frame::event(topic, body.to_string())).await
    }

    /// Serve commands until the client hangs up, answering each with `reply(body)`
    pub async fn serve<F>(mut self, reply: F) -> Result<usize>
    where
        F: Fn(&str) -> String,
    {
        let mut served = 0;
        loop {
            match self.recv().await {
                Ok(None) => return Ok(served),
                Ok(Some(Frame::Ping)) => self.on_ping().await?,
                Ok(Some(Frame::Cmd { id, body })) => {
                    let answer = reply(&String::from_utf8_lossy(&body));
                    self.respond(&id, &answer).await?;
                    served += 1;
                }
                Ok(Some(_)) => {}
                // idle connections are fine here
                Err(_) => {}
            }
        }
    }

    async fn on_ping(&mut self) -> Result<()> {
        self.pings_seen += 1;
        if self.answer_pings {
            self.send(Frame::Pong).await?;
        }
        Ok(())
    }
}

/// Address of a loopback port with nothing listening
pub async fn unreachable_addr() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr.to_string())
}

/// Poll `condition` until it holds or `limit` elapses
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Run `fut` and return its output with the wall time it took
pub async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let started = std::time::Instant::now();
    let output = fut.await;
    (output, started.elapsed())
}
