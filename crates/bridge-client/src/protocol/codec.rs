//! Length-prefixed line codec
//!
//! ```text
//! PING\n
//! PONG\n
//! CMD <id> <len>\n<len bytes>\n
//! RES <id> <len>\n<len bytes>\n
//! ERR <id> <len>\n<len bytes>\n
//! EVT <topic> <len>\n<len bytes>\n
//! ```
//!
//! The trailing newline after a body is written by the encoder and tolerated
//! (skipped as a blank line) by the decoder, so peers that omit it still work.
//! Malformed header lines are surfaced as [`Decoded::Malformed`] and the stream
//! continues; oversized bodies and unterminated headers are fatal.

use super::{Frame, FrameKind, Topic};
use crate::error::BridgeError;
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Default cap on a single frame body (16 MiB)
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

/// Longest header line accepted before giving up on the stream
pub const MAX_HEADER_LEN: usize = 4 * 1024;

/// Output of the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A well-formed frame
    Frame(Frame),
    /// A header line that could not be understood, with the reason
    Malformed(String),
}

/// Header waiting for its body bytes to arrive
#[derive(Debug)]
enum PendingHeader {
    Known { kind: FrameKind, key: String },
    Unknown { kind: String },
}

/// Codec for the bridge wire protocol
#[derive(Debug)]
pub struct BridgeCodec {
    max_body: usize,
    pending: Option<(PendingHeader, usize)>,
}

impl BridgeCodec {
    /// Create a codec with the default body cap
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_body(DEFAULT_MAX_BODY)
    }

    /// Create a codec with a custom body cap
    #[must_use]
    pub fn with_max_body(max_body: usize) -> Self {
        Self {
            max_body,
            pending: None,
        }
    }

    /// Maximum accepted body length
    #[must_use]
    pub fn max_body(&self) -> usize {
        self.max_body
    }

    fn check_len(&self, len: u64) -> Result<usize, BridgeError> {
        match usize::try_from(len) {
            Ok(len) if len <= self.max_body => Ok(len),
            _ => Err(BridgeError::bad_frame(format!(
                "declared body length {len} exceeds cap {}",
                self.max_body
            ))),
        }
    }

    /// Parse one header line. `Ok(Some(..))` is a complete item, `Ok(None)`
    /// means a body is now pending.
    fn parse_header(&mut self, line: &[u8]) -> Result<Option<Decoded>, BridgeError> {
        let Ok(line) = std::str::from_utf8(line) else {
            return Ok(Some(Decoded::Malformed("header is not valid UTF-8".to_string())));
        };

        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        let Some((&token, rest)) = fields.split_first() else {
            return Ok(Some(Decoded::Malformed("empty header".to_string())));
        };

        let Some(kind) = FrameKind::parse(token) else {
            // Forward compatible: skip the body of unknown kinds that declare one
            if let Some(len) = rest.last().and_then(|s| s.parse::<u64>().ok()) {
                let len = self.check_len(len)?;
                self.pending = Some((
                    PendingHeader::Unknown {
                        kind: token.to_string(),
                    },
                    len,
                ));
                return Ok(None);
            }
            return Ok(Some(Decoded::Frame(Frame::Unknown {
                kind: token.to_string(),
            })));
        };

        if !kind.carries_body() {
            if !rest.is_empty() {
                return Ok(Some(Decoded::Malformed(format!(
                    "{kind} takes no fields, got {}",
                    rest.len()
                ))));
            }
            let frame = if kind == FrameKind::Ping {
                Frame::Ping
            } else {
                Frame::Pong
            };
            return Ok(Some(Decoded::Frame(frame)));
        }

        let [key, len] = rest else {
            return Ok(Some(Decoded::Malformed(format!(
                "{kind} expects 2 fields, got {}",
                rest.len()
            ))));
        };

        let len = match len.parse::<i64>() {
            Ok(n) if n < 0 => {
                return Ok(Some(Decoded::Malformed(format!(
                    "{kind} {key}: negative body length {n}"
                ))));
            }
            Ok(n) => self.check_len(n.unsigned_abs())?,
            Err(_) => {
                return Ok(Some(Decoded::Malformed(format!(
                    "{kind} {key}: invalid body length {len:?}"
                ))));
            }
        };

        self.pending = Some((
            PendingHeader::Known {
                kind,
                key: (*key).to_string(),
            },
            len,
        ));
        Ok(None)
    }
}

impl Default for BridgeCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn assemble(header: PendingHeader, body: bytes::Bytes) -> Frame {
    match header {
        PendingHeader::Known { kind, key } => match kind {
            FrameKind::Cmd => Frame::Cmd { id: key, body },
            FrameKind::Res => Frame::Res { id: key, body },
            FrameKind::Err => Frame::Err { id: key, message: body },
            FrameKind::Evt => Frame::Evt {
                topic: Topic::parse(&key),
                body,
            },
            FrameKind::Ping => Frame::Ping,
            FrameKind::Pong => Frame::Pong,
        },
        PendingHeader::Unknown { kind } => Frame::Unknown { kind },
    }
}

impl Decoder for BridgeCodec {
    type Item = Decoded;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if let Some((_, len)) = &self.pending {
                let len = *len;
                if src.len() < len {
                    src.reserve(len - src.len());
                    return Ok(None);
                }
                let body = src.split_to(len).freeze();
                if let Some((header, _)) = self.pending.take() {
                    return Ok(Some(Decoded::Frame(assemble(header, body))));
                }
            }

            let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                if src.len() > MAX_HEADER_LEN {
                    return Err(BridgeError::bad_frame(format!(
                        "header line exceeds {MAX_HEADER_LEN} bytes"
                    )));
                }
                return Ok(None);
            };

            if newline > MAX_HEADER_LEN {
                return Err(BridgeError::bad_frame(format!(
                    "header line exceeds {MAX_HEADER_LEN} bytes"
                )));
            }

            let line = src.split_to(newline + 1);
            let line = line[..newline].trim_ascii();
            if line.is_empty() {
                continue;
            }

            if let Some(item) = self.parse_header(line)? {
                return Ok(Some(item));
            }
        }
    }
}

/// Whether `key` can be used as an id or topic on the wire
pub(crate) fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.bytes().any(|b| b.is_ascii_whitespace())
}

impl Encoder<Frame> for BridgeCodec {
    type Error = BridgeError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (kind, key, body) = match item {
            Frame::Ping => {
                dst.put_slice(b"PING\n");
                return Ok(());
            }
            Frame::Pong => {
                dst.put_slice(b"PONG\n");
                return Ok(());
            }
            Frame::Cmd { id, body } => (FrameKind::Cmd, id, body),
            Frame::Res { id, body } => (FrameKind::Res, id, body),
            Frame::Err { id, message } => (FrameKind::Err, id, message),
            Frame::Evt { topic, body } => (FrameKind::Evt, topic.as_str().to_string(), body),
            Frame::Unknown { kind } => {
                return Err(BridgeError::bad_frame(format!(
                    "cannot encode unknown frame kind {kind}"
                )));
            }
        };

        if !valid_key(&key) {
            return Err(BridgeError::bad_frame(format!(
                "{kind} key {key:?} must be non-empty and contain no whitespace"
            )));
        }
        if body.len() > self.max_body {
            return Err(BridgeError::bad_frame(format!(
                "body of {} bytes exceeds cap {}",
                body.len(),
                self.max_body
            )));
        }

        let header = format!("{kind} {key} {}\n", body.len());
        dst.reserve(header.len() + body.len() + 1);
        dst.put_slice(header.as_bytes());
        dst.put_slice(&body);
        dst.put_u8(b'\n');
        Ok(())
    }
}
