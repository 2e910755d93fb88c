//! Error types for WebSocket operations.
//!
//! This module defines the connection-level error taxonomy and the close
//! codes carried in Close frames. "No data yet" is deliberately absent: it is
//! an expected outcome and is returned as [`Received::NoData`] instead.
//!
//! [`Received::NoData`]: crate::message::Received::NoData

use std::fmt;
use thiserror::Error;

use crate::buffer::ReadError;
use crate::codec::FrameError;

/// Result type for WebSocket operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors that can occur during WebSocket operations.
///
/// Every variant except the configuration and encode/decode failures means
/// the connection has transitioned to closed; the caller must build a new
/// connection to reconnect.
#[derive(Debug, Error)]
pub enum WsError {
    /// The connection was already closed when the operation was attempted.
    #[error("connection closed")]
    Closed,

    /// The transport reported end-of-stream without a Close handshake.
    #[error("peer closed the transport without a close handshake")]
    PeerClosed,

    /// The peer sent a malformed or unsupported frame.
    #[error("protocol error: {0}")]
    Protocol(#[source] FrameError),

    /// The peer declared a frame larger than the configured maximum.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Declared payload length.
        len: u64,
        /// Configured maximum.
        max: usize,
    },

    /// A text frame carried bytes that are not valid UTF-8.
    #[error("text frame is not valid UTF-8")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// An outbound payload could not be encoded.
    #[error("failed to encode message: {0}")]
    EncodeFailed(String),

    /// A received message could not be decoded into the requested type.
    #[error("failed to decode message: {0}")]
    DecodeFailed(String),

    /// The connection configuration was rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WsError {
    /// Create a new invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Create a new encode failure.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::EncodeFailed(reason.into())
    }

    /// Create a new decode failure.
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed(reason.into())
    }

    /// The close code the engine sends (best-effort) when this error ends
    /// the connection, if any.
    ///
    /// Transport failures get no reply since the socket is already unusable.
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Protocol(_) => Some(CloseCode::Protocol),
            Self::FrameTooLarge { .. } => Some(CloseCode::MessageTooBig),
            Self::InvalidUtf8(_) => Some(CloseCode::InvalidPayload),
            _ => None,
        }
    }

    /// Check if this error means the connection is no longer usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InvalidConfig(_) | Self::EncodeFailed(_) | Self::DecodeFailed(_)
        )
    }
}

impl From<ReadError> for WsError {
    fn from(err: ReadError) -> Self {
        match err {
            // Callers map WouldBlock to NoData before converting; reaching
            // this arm means a transport surfaced it mid-write.
            ReadError::WouldBlock => Self::Io(std::io::ErrorKind::WouldBlock.into()),
            ReadError::PeerClosed => Self::PeerClosed,
            ReadError::Io(e) => Self::Io(e),
        }
    }
}

impl From<FrameError> for WsError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::TooLarge { len, max } => Self::FrameTooLarge { len, max },
            other => Self::Protocol(other),
        }
    }
}

/// Close code for WebSocket connections.
///
/// Used only as the payload of Close frames, never as connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure (1000).
    Normal = 1000,
    /// Going away (1001).
    GoingAway = 1001,
    /// Protocol error (1002).
    Protocol = 1002,
    /// Unsupported data (1003).
    Unsupported = 1003,
    /// No status received (1005). Never sent on the wire.
    NoStatus = 1005,
    /// Abnormal closure (1006). Never sent on the wire.
    Abnormal = 1006,
    /// Invalid payload data (1007).
    InvalidPayload = 1007,
    /// Policy violation (1008).
    PolicyViolation = 1008,
    /// Message too big (1009).
    MessageTooBig = 1009,
    /// Extension required (1010).
    ExtensionRequired = 1010,
    /// Internal error (1011).
    InternalError = 1011,
    /// Service restart (1012).
    ServiceRestart = 1012,
    /// Try again later (1013).
    TryAgainLater = 1013,
    /// Bad gateway (1014).
    BadGateway = 1014,
    /// TLS handshake failure (1015). Never sent on the wire.
    TlsHandshake = 1015,
}

impl CloseCode {
    /// Convert from a u16 code.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::Protocol),
            1003 => Some(Self::Unsupported),
            1005 => Some(Self::NoStatus),
            1006 => Some(Self::Abnormal),
            1007 => Some(Self::InvalidPayload),
            1008 => Some(Self::PolicyViolation),
            1009 => Some(Self::MessageTooBig),
            1010 => Some(Self::ExtensionRequired),
            1011 => Some(Self::InternalError),
            1012 => Some(Self::ServiceRestart),
            1013 => Some(Self::TryAgainLater),
            1014 => Some(Self::BadGateway),
            1015 => Some(Self::TlsHandshake),
            _ => None,
        }
    }

    /// Get the u16 value of this close code.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether the code may appear in a Close frame.
    ///
    /// 1005, 1006 and 1015 only describe a close locally.
    pub fn is_sendable(self) -> bool {
        !matches!(self, Self::NoStatus | Self::Abnormal | Self::TlsHandshake)
    }

    /// Big-endian wire form of the code.
    pub fn to_be_bytes(self) -> [u8; 2] {
        self.as_u16().to_be_bytes()
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "Normal",
            Self::GoingAway => "GoingAway",
            Self::Protocol => "Protocol",
            Self::Unsupported => "Unsupported",
            Self::NoStatus => "NoStatus",
            Self::Abnormal => "Abnormal",
            Self::InvalidPayload => "InvalidPayload",
            Self::PolicyViolation => "PolicyViolation",
            Self::MessageTooBig => "MessageTooBig",
            Self::ExtensionRequired => "ExtensionRequired",
            Self::InternalError => "InternalError",
            Self::ServiceRestart => "ServiceRestart",
            Self::TryAgainLater => "TryAgainLater",
            Self::BadGateway => "BadGateway",
            Self::TlsHandshake => "TlsHandshake",
        };
        write!(f, "{} ({})", name, self.as_u16())
    }
}
