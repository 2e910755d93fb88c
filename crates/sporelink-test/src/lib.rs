//! # Sporelink Test
//!
//! Test utilities for sporelink, driving the WebSocket engine without any
//! real socket.
//!
//! ## Key Features
//!
//! - **Scripted transport**: inbound chunks, `WouldBlock` stalls and EOF in
//!   exactly the order a test needs
//! - **Write capture**: everything the engine sends, decodable as frames
//! - **Fault injection**: failing writes and forced readiness flags
//! - **Peer frames**: server-side (unmasked) frame builders
//!
//! ## Example
//!
//! ```ignore
//! use sporelink_test::{peer, MockTransport};
//! use sporelink_ws::{Received, WebSocket, WebSocketConfig};
//!
//! let mock = MockTransport::new();
//! mock.push_bytes(peer::ping(b"hb")).push_bytes(peer::text("A"));
//!
//! let mut ws = WebSocket::new(mock.clone(), WebSocketConfig::default())?;
//! assert_eq!(ws.recv()?, Received::Text("A".into()));
//! assert_eq!(mock.written_frames()?.len(), 1); // the pong
//! ```

#![forbid(unsafe_code)]

mod error;
mod mock;
pub mod peer;

pub use error::TestError;
pub use mock::MockTransport;
