//! Protocol module - JSON message types for the pool adapter
//!
//! One JSON object per line. Every message has a `type` and a `seq`;
//! `seq` must strictly increase per client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Preview;
use crate::types::{color_name, PieceColor, QueueId, SlotIndex};

pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Default number of colors returned by a `peek` request.
pub const DEFAULT_PEEK_COUNT: usize = 3;

// ============== Client -> Pool Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HelloType {
    #[serde(rename = "hello")]
    #[default]
    Hello,
}

/// First message on a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    /// Receive `cursor_changed` events for every queue.
    #[serde(default)]
    pub stream_events: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// A call into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolRequest {
    Advance {
        queue: QueueId,
        /// Slot to resume from. Absent, `null` or negative walks from the
        /// stored cursor.
        #[serde(
            default,
            deserialize_with = "resume_slot",
            skip_serializing_if = "Option::is_none"
        )]
        resume: Option<SlotIndex>,
    },
    NameOf {
        code: i64,
    },
    ColorNameAt {
        slot: SlotIndex,
    },
    GetCursor {
        queue: QueueId,
    },
    SetCursor {
        queue: QueueId,
        position: SlotIndex,
    },
    Peek {
        queue: QueueId,
        #[serde(default = "default_peek_count")]
        count: usize,
    },
}

fn default_peek_count() -> usize {
    DEFAULT_PEEK_COUNT
}

/// Hosts that track the last shown slot send `-1` for "none yet".
fn resume_slot<'de, D>(deserializer: D) -> Result<Option<SlotIndex>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<i64>::deserialize(deserializer)? {
        Some(slot) if slot >= 0 => SlotIndex::try_from(slot)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl PoolRequest {
    /// Wire names of every request type.
    pub const TYPES: [&'static str; 6] = [
        "advance",
        "name_of",
        "color_name_at",
        "get_cursor",
        "set_cursor",
        "peek",
    ];
}

/// A request with its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub seq: u64,
    #[serde(flatten)]
    pub request: PoolRequest,
}

// ============== Pool -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    OutOfOrder,
    Backpressure,
    InvalidMessage,
    UnknownType,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        seq: u64,
        protocol_version: String,
        client_id: u64,
        /// Color names indexed by code.
        colors: Vec<String>,
    },
    Color {
        seq: u64,
        queue: QueueId,
        position: SlotIndex,
        /// `null` when the slot holds no color.
        code: Option<u8>,
        name: String,
    },
    Name {
        seq: u64,
        name: String,
    },
    Cursor {
        seq: u64,
        queue: QueueId,
        position: SlotIndex,
    },
    Preview {
        seq: u64,
        queue: QueueId,
        colors: Vec<String>,
    },
    Error {
        seq: u64,
        code: ErrorCode,
        message: String,
    },
    /// Streamed to clients that asked for events; carries no `seq`.
    CursorChanged {
        queue: QueueId,
        position: SlotIndex,
    },
}

impl ServerMessage {
    pub fn seq(&self) -> Option<u64> {
        match self {
            ServerMessage::Welcome { seq, .. }
            | ServerMessage::Color { seq, .. }
            | ServerMessage::Name { seq, .. }
            | ServerMessage::Cursor { seq, .. }
            | ServerMessage::Preview { seq, .. }
            | ServerMessage::Error { seq, .. } => Some(*seq),
            ServerMessage::CursorChanged { .. } => None,
        }
    }
}

// ============== Message Parsing ==============

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no type")]
    MissingType,
}

/// Parsed incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Hello(HelloMessage),
    Request(RequestMessage),
    Unknown { seq: u64, msg_type: String },
}

/// Parse one line from a client.
///
/// An unrecognised `type` is not a parse error; it comes back as
/// [`ClientMessage::Unknown`] so the server can answer with its `seq`.
pub fn parse_message(json: &str) -> Result<ClientMessage, ProtocolError> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(rename = "type")]
        msg_type: Option<String>,
        seq: Option<u64>,
    }

    let envelope: Envelope = serde_json::from_str(json)?;
    let msg_type = envelope.msg_type.ok_or(ProtocolError::MissingType)?;

    if msg_type == "hello" {
        return Ok(ClientMessage::Hello(serde_json::from_str(json)?));
    }
    if PoolRequest::TYPES.contains(&msg_type.as_str()) {
        return Ok(ClientMessage::Request(serde_json::from_str(json)?));
    }
    Ok(ClientMessage::Unknown {
        seq: envelope.seq.unwrap_or(0),
        msg_type,
    })
}

/// Pull `seq` out of a line that may not be valid JSON.
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let rest = after_key[after_key.find(':')? + 1..].trim_start();
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    rest[..digits].parse().ok()
}

// ============== Utility Functions ==============

pub fn create_hello(seq: u64, client_name: &str, stream_events: bool) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: PROTOCOL_VERSION.to_string(),
        stream_events,
    }
}

pub fn create_welcome(seq: u64, protocol_version: &str, client_id: u64) -> ServerMessage {
    ServerMessage::Welcome {
        seq,
        protocol_version: protocol_version.to_string(),
        client_id,
        colors: PieceColor::ALL.iter().map(|c| c.name().to_string()).collect(),
    }
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ServerMessage {
    ServerMessage::Error {
        seq,
        code,
        message: message.to_string(),
    }
}

pub fn preview_names(preview: &Preview) -> Vec<String> {
    preview.iter().map(|c| color_name(*c).to_string()).collect()
}
