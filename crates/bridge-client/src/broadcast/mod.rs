//! Event broadcasting
//!
//! Distributes unsolicited EVT frames from the peer to every subscriber.

mod event;
mod fanout;

pub use event::Event;
pub use fanout::{CancelHandle, EventFanout, Subscription};
