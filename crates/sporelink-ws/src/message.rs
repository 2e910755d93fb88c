//! WebSocket message types.
//!
//! Outbound data goes out as a [`Message`]; everything `recv` can yield is a
//! [`Received`]. Control frames never reach the caller except for the
//! peer's Close, surfaced as [`Received::RemoteClosed`].

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CloseCode, WsError, WsResult};
use crate::frame::OpCode;

/// An outbound data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message.
    Binary(Bytes),
}

impl Message {
    /// Create a new text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a new binary message.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::Binary(data.into())
    }

    /// Create a text message from a JSON-serializable value.
    pub fn from_json<T: Serialize>(value: &T) -> WsResult<Self> {
        let text = serde_json::to_string(value).map_err(|e| WsError::encode_failed(e.to_string()))?;
        Ok(Self::Text(text))
    }

    /// Opcode this message travels under.
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::Text(_) => OpCode::Text,
            Self::Binary(_) => OpCode::Binary,
        }
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }

    /// Get the length of the message payload in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the message payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Message {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(b.into())
    }
}

impl From<Bytes> for Message {
    fn from(b: Bytes) -> Self {
        Self::Binary(b)
    }
}

impl From<&[u8]> for Message {
    fn from(b: &[u8]) -> Self {
        Self::Binary(Bytes::copy_from_slice(b))
    }
}

/// Outcome of one receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Nothing complete is available yet. Not an error.
    NoData,
    /// A complete text message.
    Text(String),
    /// A complete binary message.
    Binary(Bytes),
    /// The peer closed the connection, with its close frame if it sent one.
    RemoteClosed(Option<CloseFrame>),
}

impl Received {
    /// Check if this is [`Received::NoData`].
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    /// Check if this carries a data message (text or binary).
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Binary(_))
    }

    /// Check if the peer closed the connection.
    pub fn is_remote_closed(&self) -> bool {
        matches!(self, Self::RemoteClosed(_))
    }

    /// Get the payload as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into text, `None` unless this is a text message.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into the data payload, `None` unless this is a data message.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::Text(s) => Some(Bytes::from(s)),
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Try to parse a text message as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> WsResult<T> {
        let text = self
            .as_text()
            .ok_or_else(|| WsError::decode_failed("not a text message"))?;
        serde_json::from_str(text).map_err(|e| WsError::decode_failed(e.to_string()))
    }
}

impl From<Message> for Received {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(s) => Self::Text(s),
            Message::Binary(b) => Self::Binary(b),
        }
    }
}

/// A WebSocket close frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close code.
    pub code: u16,
    /// The close reason.
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame.
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code: code.as_u16(),
            reason: reason.into(),
        }
    }

    /// Create a normal close frame.
    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(CloseCode::Normal, reason)
    }

    /// Get the close code enum value if it's a registered code.
    pub fn close_code(&self) -> Option<CloseCode> {
        CloseCode::from_u16(self.code)
    }

    /// Wire form: big-endian code followed by the UTF-8 reason.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + self.reason.len());
        payload.extend_from_slice(&self.code.to_be_bytes());
        payload.extend_from_slice(self.reason.as_bytes());
        payload
    }

    /// Parse a Close payload. `None` when it is too short to carry a code.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 2 {
            return None;
        }
        let (code, reason) = payload.split_at(2);
        Some(Self {
            code: u16::from_be_bytes([code[0], code[1]]),
            reason: String::from_utf8_lossy(reason).into_owned(),
        })
    }
}
