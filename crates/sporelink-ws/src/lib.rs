//! Non-blocking RFC 6455 client framing for raw byte-stream sockets.
//!
//! This crate turns an already upgraded, non-blocking socket into a
//! message-oriented WebSocket connection. It never blocks the calling
//! thread and never spawns anything: the caller drives it, either by polling
//! or by awaiting the suspending receive.
//!
//! # Features
//!
//! - **Atomic frame decoding**: partial frames stay buffered until complete
//! - **Transparent control frames**: Ping is answered, Pong absorbed, Close
//!   acknowledged, all in stream order
//! - **Bounded memory**: declared frame sizes are checked before any payload
//!   is read
//! - **Two calling conventions** over one engine: `recv` and `arecv`
//!   (cargo feature `cooperative`, on by default)
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpStream;
//! use sporelink_ws::{CloseCode, Received, WebSocket, WebSocketConfig};
//!
//! # fn main() -> Result<(), sporelink_ws::WsError> {
//! let stream = TcpStream::connect("127.0.0.1:9001")?;
//! let mut ws = WebSocket::new(stream, WebSocketConfig::default().debug(true))?;
//!
//! ws.send_text(r#"{"type":"hello"}"#)?;
//! while ws.check_connection() {
//!     match ws.recv()? {
//!         Received::NoData => std::thread::sleep(std::time::Duration::from_millis(10)),
//!         Received::Text(text) => println!("{text}"),
//!         Received::Binary(_) => {}
//!         Received::RemoteClosed(_) => break,
//!     }
//! }
//! ws.close(CloseCode::Normal, "done");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! send ──► codec::encode (+ mask) ──► Transport::write
//!
//! Transport::read ──► ReceiveBuffer ──► FrameHeader::parse ──► WebSocket
//!                                                                │
//!                         Ping ──► Pong written ◄────────────────┤
//!                         Close ──► Close echoed, Closed ◄────────┤
//!                         Text / Binary ──► caller ◄──────────────┘
//! ```
//!
//! # Configuration
//!
//! - [`WebSocketConfig`](config::WebSocketConfig) - Per-connection settings

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
#[cfg(feature = "cooperative")]
mod cooperative;
pub mod error;
pub mod frame;
pub mod mask;
pub mod message;
pub mod transport;

// Re-exports for convenience
pub use buffer::{ReadError, ReceiveBuffer};
pub use codec::{FrameError, FrameHeader};
pub use config::{Role, WebSocketConfig};
pub use connection::{ConnectionId, ConnectionState, WebSocket};
pub use error::{CloseCode, WsError, WsResult};
pub use frame::{Frame, OpCode};
pub use message::{CloseFrame, Message, Received};
pub use transport::{Readiness, Transport};
