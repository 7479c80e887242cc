//! Connection management
//!
//! Dial/redial supervision, the framed transport and the heartbeat monitor.

mod backoff;
mod disconnect;
mod heartbeat;
mod state;
mod supervisor;
mod transport;

pub use backoff::Backoff;
pub use disconnect::DisconnectReason;
pub use heartbeat::HeartbeatConfig;
pub use state::LinkState;

pub(crate) use supervisor::supervise;
