//! The server side of the wire.
//!
//! Builders produce frames exactly as a server would send them (never
//! masked), and [`decode_client_frames`] reads back what the engine wrote,
//! insisting that every client frame was masked.

use bytes::BytesMut;
use sporelink_ws::codec::{self, FrameHeader};
use sporelink_ws::{Frame, OpCode, Role};

use crate::error::TestError;

/// Any frame as the server would send it.
pub fn frame(opcode: OpCode, payload: impl AsRef<[u8]>) -> Vec<u8> {
    codec::encode(opcode, payload.as_ref(), Role::Server).to_vec()
}

/// A text frame.
pub fn text(text: &str) -> Vec<u8> {
    frame(OpCode::Text, text)
}

/// A binary frame.
pub fn binary(data: impl AsRef<[u8]>) -> Vec<u8> {
    frame(OpCode::Binary, data)
}

/// A ping frame.
pub fn ping(data: impl AsRef<[u8]>) -> Vec<u8> {
    frame(OpCode::Ping, data)
}

/// A pong frame.
pub fn pong(data: impl AsRef<[u8]>) -> Vec<u8> {
    frame(OpCode::Pong, data)
}

/// A close frame carrying `code` and `reason`.
pub fn close(code: u16, reason: &str) -> Vec<u8> {
    let mut payload = code.to_be_bytes().to_vec();
    payload.extend_from_slice(reason.as_bytes());
    frame(OpCode::Close, payload)
}

/// A close frame with an empty payload.
pub fn close_empty() -> Vec<u8> {
    frame(OpCode::Close, b"")
}

/// A hand-built header: `b0` and `b1` verbatim followed by `rest`.
///
/// For producing frames the encoder refuses to emit (RSV bits, FIN=0,
/// oversized length declarations).
pub fn raw(b0: u8, b1: u8, rest: &[u8]) -> Vec<u8> {
    let mut bytes = vec![b0, b1];
    bytes.extend_from_slice(rest);
    bytes
}

/// Decode every frame the client wrote, in order.
pub fn decode_client_frames(bytes: &[u8]) -> Result<Vec<Frame>, TestError> {
    let mut buf = BytesMut::from(bytes);
    let mut frames = Vec::new();
    while !buf.is_empty() {
        let header = match FrameHeader::parse(&buf) {
            Ok(header) => header,
            Err(e) if e.is_incomplete() => return Err(TestError::Truncated(buf.len())),
            Err(e) => return Err(e.into()),
        };
        if header.mask.is_none() {
            return Err(TestError::Unmasked(frames.len()));
        }
        match codec::decode(&mut buf, None) {
            Ok(frame) => frames.push(frame),
            Err(e) if e.is_incomplete() => return Err(TestError::Truncated(buf.len())),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(frames)
}
