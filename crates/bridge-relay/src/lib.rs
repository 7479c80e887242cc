//! # bridge-relay
//!
//! Relays chat between a chat platform and the game server over the bridge,
//! and dispatches operator commands to the game server.

pub mod action;
pub mod commands;
pub mod events;
pub mod relay;
pub mod sink;

pub use action::{ActionId, ActionIdError, ActionKind};
pub use commands::{Arity, CommandRegistry, CommandSpec, OperatorInput};
pub use events::{EventRouter, Routed, RouteTargets};
pub use relay::{create_relay, operator_loop, run, Relay};
pub use sink::{ChatSink, MemorySink, SinkRecord, TracingSink};
