//! Bridge wire protocol
//!
//! Defines frame kinds, frames, event topics and the line codec.

mod codec;
mod frame;
mod kind;
mod topic;

pub(crate) use codec::valid_key;
pub use codec::{BridgeCodec, Decoded, DEFAULT_MAX_BODY, MAX_HEADER_LEN};
pub use frame::Frame;
pub use kind::FrameKind;
pub use topic::Topic;
