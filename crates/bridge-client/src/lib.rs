//! # bridge-client
//!
//! Resilient TCP client for the game-server bridge: a reconnecting,
//! heartbeat-monitored, length-framed transport with request/response
//! correlation, event fan-out and a circuit breaker.
//!
//! ```no_run
//! use bridge_client::{BridgeClient, ClientOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> bridge_client::BridgeResult<()> {
//! let client = BridgeClient::new("127.0.0.1:26644", ClientOptions::default());
//! client.start(CancellationToken::new());
//!
//! let mut events = client.subscribe(0);
//! let players = client.send("list").await?;
//! println!("{}", String::from_utf8_lossy(&players));
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}: {}", event.topic, event.text());
//! }
//! client.close().await
//! # }
//! ```

pub mod breaker;
pub mod broadcast;
pub mod client;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod options;
pub mod protocol;

pub use breaker::{BreakerPermit, BreakerState, CircuitBreaker};
pub use broadcast::{CancelHandle, Event, EventFanout, Subscription};
pub use client::{BridgeClient, ClientStatus, SendOptions};
pub use connection::{Backoff, DisconnectReason};
pub use correlator::{Correlator, PendingRequest};
pub use error::{BridgeError, BridgeResult};
pub use options::ClientOptions;
pub use protocol::{BridgeCodec, Decoded, Frame, FrameKind, Topic};
