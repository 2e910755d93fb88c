//! WebSocket connection handling.
//!
//! This module provides the [`WebSocket`] engine which owns a non-blocking
//! transport and its receive buffer, answers control frames transparently
//! and surfaces only data frames to the caller.

use std::io;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::buffer::{ReadError, ReceiveBuffer};
use crate::codec::{self, FrameError, FrameHeader, MAX_CONTROL_PAYLOAD};
use crate::config::WebSocketConfig;
use crate::error::{CloseCode, WsError, WsResult};
use crate::frame::{Frame, OpCode};
use crate::message::{CloseFrame, Message, Received};
use crate::transport::Transport;

/// Longest close reason that still fits a 125-byte control payload.
const MAX_CLOSE_REASON: usize = MAX_CONTROL_PAYLOAD - 2;

/// Pause between attempts to finish a frame the transport would not take.
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(1);

/// A unique identifier for a WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new time-ordered connection ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a connection ID from a UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a connection.
///
/// `Open -> Closed` is the only transition and it is irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames may be sent and received.
    Open,
    /// The transport has been released; nothing touches it again.
    Closed,
}

/// How the connection ended.
#[derive(Debug)]
enum Closure {
    /// Closed by the caller or by a fatal error.
    Local,
    /// The peer sent a Close frame (or an empty one).
    Remote(Option<CloseFrame>),
}

/// A client-side WebSocket connection over a non-blocking transport.
///
/// Every operation returns immediately. "Nothing to read yet" is the value
/// [`Received::NoData`], never an error. Any error returned by `recv`,
/// `send` or `ping` other than an encode/decode failure leaves the
/// connection closed.
///
/// # Example
///
/// ```no_run
/// use std::net::TcpStream;
/// use sporelink_ws::{Received, WebSocket, WebSocketConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // The opening handshake has already been performed on this stream.
/// let stream = TcpStream::connect("127.0.0.1:9001")?;
/// let mut ws = WebSocket::new(stream, WebSocketConfig::default())?;
///
/// ws.send_text("hello")?;
/// loop {
///     match ws.recv()? {
///         Received::NoData => { /* do other work, try again later */ }
///         Received::Text(text) => println!("got {text}"),
///         Received::Binary(data) => println!("got {} bytes", data.len()),
///         Received::RemoteClosed(_) => break,
///     }
/// #   break;
/// }
/// # Ok(())
/// # }
/// ```
pub struct WebSocket<T: Transport> {
    /// The unique connection ID.
    id: ConnectionId,
    /// The exclusively owned socket.
    transport: T,
    /// Bytes read but not yet decoded.
    rx: ReceiveBuffer,
    /// Configuration for this connection.
    config: WebSocketConfig,
    /// Set once, when the connection closes.
    closure: Option<Closure>,
    /// When the connection was established.
    connected_at: Instant,
    /// Last time a frame was decoded.
    last_activity: Instant,
}

impl<T: Transport> WebSocket<T> {
    /// Wrap a live, already upgraded transport.
    ///
    /// The configuration is validated and the transport switched to
    /// non-blocking mode.
    pub fn new(mut transport: T, config: WebSocketConfig) -> WsResult<Self> {
        config.validate()?;
        transport.set_nonblocking()?;

        let id = ConnectionId::new();
        let now = Instant::now();
        debug!(connection_id = %id, role = ?config.role, "WebSocket opened");
        Ok(Self {
            id,
            transport,
            rx: ReceiveBuffer::new(config.read_chunk_size),
            config,
            closure: None,
            connected_at: now,
            last_activity: now,
        })
    }

    /// Get the connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        if self.closure.is_some() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Check if the connection is still open.
    pub fn is_open(&self) -> bool {
        self.closure.is_none()
    }

    /// The peer's Close frame, once the peer has closed the connection.
    pub fn remote_close(&self) -> Option<&CloseFrame> {
        match &self.closure {
            Some(Closure::Remote(frame)) => frame.as_ref(),
            _ => None,
        }
    }

    /// Get the connection configuration.
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    /// Shared access to the transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    ///
    /// Reading from or writing to it directly desynchronises the framing.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Number of received bytes not yet decoded into frames.
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Get when the connection was established.
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Get the last time any frame, control frames included, was received.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Receive the next data message without blocking.
    ///
    /// Ping and Pong frames are handled along the way and never surface.
    /// Once the peer has closed, every call returns
    /// [`Received::RemoteClosed`]; after a local or fatal close, calls fail
    /// with [`WsError::Closed`].
    #[instrument(skip(self), fields(connection_id = %self.id))]
    pub fn recv(&mut self) -> WsResult<Received> {
        match &self.closure {
            None => {}
            Some(Closure::Remote(frame)) => return Ok(Received::RemoteClosed(frame.clone())),
            Some(Closure::Local) => return Err(WsError::Closed),
        }

        loop {
            let frame = match self.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    trace!("no data yet");
                    return Ok(Received::NoData);
                }
                Err(e) => return Err(self.fail(e)),
            };

            match self.dispatch(frame) {
                Ok(Some(received)) => return Ok(received),
                Ok(None) => {}
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Send one data message as a single masked frame.
    ///
    /// The frame is written whole. While the transport is full this call
    /// waits, up to [`WebSocketConfig::write_timeout_ms`]; past that it
    /// fails with a `TimedOut` I/O error and the connection closes.
    #[instrument(skip(self, msg), fields(connection_id = %self.id))]
    pub fn send(&mut self, msg: impl Into<Message>) -> WsResult<()> {
        if !self.is_open() {
            return Err(WsError::Closed);
        }

        let msg = msg.into();
        if let Err(e) = self.write_frame(msg.opcode(), msg.as_bytes()) {
            return Err(self.fail(e.into()));
        }
        Ok(())
    }

    /// Send a text message.
    pub fn send_text(&mut self, text: impl Into<String>) -> WsResult<()> {
        self.send(Message::text(text))
    }

    /// Send a binary message.
    pub fn send_binary(&mut self, data: impl Into<bytes::Bytes>) -> WsResult<()> {
        self.send(Message::binary(data))
    }

    /// Send a JSON message.
    pub fn send_json<S: serde::Serialize>(&mut self, value: &S) -> WsResult<()> {
        let msg = Message::from_json(value)?;
        self.send(msg)
    }

    /// Send a ping. The payload must fit a control frame.
    #[instrument(skip(self, payload), fields(connection_id = %self.id))]
    pub fn ping(&mut self, payload: &[u8]) -> WsResult<()> {
        if !self.is_open() {
            return Err(WsError::Closed);
        }
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(WsError::encode_failed(format!(
                "ping payload of {} bytes exceeds {}",
                payload.len(),
                MAX_CONTROL_PAYLOAD
            )));
        }

        if let Err(e) = self.write_frame(OpCode::Ping, payload) {
            return Err(self.fail(e.into()));
        }
        Ok(())
    }

    /// Close the connection.
    ///
    /// Writes one Close frame (best-effort) and releases the transport.
    /// Codes reserved for local reporting (1005, 1006, 1015) are sent as
    /// 1000. Closing an already closed connection does nothing.
    #[instrument(skip(self, reason), fields(connection_id = %self.id))]
    pub fn close(&mut self, code: CloseCode, reason: &str) {
        if !self.is_open() {
            return;
        }

        let code = if code.is_sendable() {
            code
        } else {
            CloseCode::Normal
        };
        let reason = truncate_reason(reason);
        debug!(code = code.as_u16(), reason, "Closing connection");

        let payload = CloseFrame::new(code, reason).encode();
        if let Err(e) = self.write_frame(OpCode::Close, &payload) {
            debug!(error = %e, "Failed to send close frame");
        }
        self.release(Closure::Local);
    }

    /// Close the connection with a normal close code.
    pub fn close_normal(&mut self) {
        self.close(CloseCode::Normal, "");
    }

    /// Cheap liveness probe that also keeps control traffic flowing.
    ///
    /// Returns `false` once the connection is closed or the transport
    /// reports an error or hangup. Control frames waiting at the head of the
    /// stream are answered; a data frame found there stays buffered for the
    /// next [`recv`](Self::recv).
    ///
    /// Frames already buffered when the transport reports a problem are
    /// still honoured: a buffered Close is acknowledged (so later `recv`
    /// calls return [`Received::RemoteClosed`]) and a buffered Ping is
    /// answered. After a plain hangup the connection stays open while a
    /// complete data frame is still waiting to be received.
    #[instrument(skip(self), fields(connection_id = %self.id))]
    pub fn check_connection(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }

        let readiness = match self.transport.poll_readiness() {
            Ok(readiness) => readiness,
            Err(e) => {
                self.fail(e.into());
                return false;
            }
        };

        if readiness.is_fatal() {
            debug!(?readiness, buffered = self.rx.len(), "Transport unhealthy");
            if let Err(e) = self.pump_control(false) {
                self.fail(e);
                return false;
            }
            let hangup_only = !readiness.error && !readiness.invalid;
            if self.is_open() && !(hangup_only && self.has_complete_frame()) {
                self.release(Closure::Local);
            }
            return self.is_open();
        }

        if readiness.readable || !self.rx.is_empty() {
            if let Err(e) = self.pump_control(true) {
                self.fail(e);
            }
        }
        self.is_open()
    }

    /// Decode the next complete frame, `None` when the transport runs dry.
    ///
    /// The header is parsed in place first so the size limit is enforced
    /// before the payload is read.
    fn read_frame(&mut self) -> WsResult<Option<Frame>> {
        loop {
            let header = match FrameHeader::parse(self.rx.as_slice()) {
                Ok(header) => header,
                Err(FrameError::Incomplete { needed }) => {
                    let want = self.rx.len() + needed;
                    match self.rx.ensure(&mut self.transport, want) {
                        Ok(()) => continue,
                        Err(ReadError::WouldBlock) => return Ok(None),
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => return Err(e.into()),
            };

            let total = header.frame_len(self.config.max_frame_size)?;
            return match self.rx.read_exactly(&mut self.transport, total) {
                Ok(raw) => Ok(Some(header.into_frame(raw))),
                Err(ReadError::WouldBlock) => Ok(None),
                Err(e) => Err(e.into()),
            };
        }
    }

    /// Handle one decoded frame, yielding what the caller should see.
    fn dispatch(&mut self, frame: Frame) -> WsResult<Option<Received>> {
        self.last_activity = Instant::now();
        self.log_frame("recv", frame.opcode, frame.payload.len());

        match frame.opcode {
            OpCode::Text => {
                let text = std::str::from_utf8(&frame.payload).map_err(WsError::InvalidUtf8)?;
                Ok(Some(Received::Text(text.to_owned())))
            }
            OpCode::Binary => Ok(Some(Received::Binary(frame.payload))),
            OpCode::Ping => {
                self.write_frame(OpCode::Pong, &frame.payload)?;
                Ok(None)
            }
            OpCode::Pong => Ok(None),
            OpCode::Close => Ok(Some(self.on_remote_close(&frame.payload))),
            OpCode::Continuation => Err(WsError::Protocol(FrameError::UnexpectedContinuation)),
        }
    }

    /// Acknowledge the peer's Close and shut down.
    ///
    /// The reply echoes the peer's two code bytes, or 1000 when it sent none.
    fn on_remote_close(&mut self, payload: &[u8]) -> Received {
        let frame = CloseFrame::decode(payload);
        debug!(
            code = ?frame.as_ref().map(|f| f.code),
            reason = ?frame.as_ref().map(|f| f.reason.as_str()),
            "Received close frame"
        );

        let reply = match payload {
            [hi, lo, ..] => [*hi, *lo],
            _ => CloseCode::Normal.to_be_bytes(),
        };
        if let Err(e) = self.write_frame(OpCode::Close, &reply) {
            debug!(error = %e, "Failed to acknowledge close");
        }

        self.release(Closure::Remote(frame.clone()));
        Received::RemoteClosed(frame)
    }

    /// Process control frames sitting at the head of the stream.
    ///
    /// With `fill` unset the transport is never read: only frames that are
    /// already complete in the buffer are handled.
    fn pump_control(&mut self, fill: bool) -> WsResult<()> {
        while self.is_open() {
            match FrameHeader::parse(self.rx.as_slice()) {
                Ok(header) if header.opcode.is_data() => return Ok(()),
                Ok(header) => {
                    if !fill && self.rx.len() < header.frame_len(self.config.max_frame_size)? {
                        return Ok(());
                    }
                }
                Err(FrameError::Incomplete { .. }) if !fill => return Ok(()),
                Err(FrameError::Incomplete { .. }) => match self.rx.fill(&mut self.transport) {
                    Ok(_) => continue,
                    Err(ReadError::WouldBlock) => return Ok(()),
                    Err(e) => return Err(e.into()),
                },
                Err(e) => return Err(e.into()),
            }

            let Some(frame) = self.read_frame()? else {
                return Ok(());
            };
            self.dispatch(frame)?;
        }
        Ok(())
    }

    /// `true` when a whole frame sits at the head of the buffer.
    fn has_complete_frame(&self) -> bool {
        FrameHeader::parse(self.rx.as_slice())
            .and_then(|header| header.frame_len(self.config.max_frame_size))
            .is_ok_and(|total| self.rx.len() >= total)
    }

    fn write_frame(&mut self, opcode: OpCode, payload: &[u8]) -> io::Result<()> {
        let bytes = codec::encode(opcode, payload, self.config.role);
        self.log_frame("send", opcode, payload.len());
        self.write_whole(&bytes)?;
        self.transport.flush()
    }

    /// Write all of `buf`, waiting out `WouldBlock` until the write timeout.
    ///
    /// A frame is never left half written while the connection stays open:
    /// running out of time is a `TimedOut` error, which closes it.
    fn write_whole(&mut self, mut buf: &[u8]) -> io::Result<()> {
        let deadline = Instant::now() + self.config.write_timeout_duration();
        while !buf.is_empty() {
            match self.transport.write(buf) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("{} bytes of the frame still unsent", buf.len()),
                        ));
                    }
                    trace!(pending = buf.len(), "transport full, waiting to finish frame");
                    std::thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Close because of `err`, replying with its close code when it has
    /// one. Returns the error for propagation.
    fn fail(&mut self, err: WsError) -> WsError {
        if self.is_open() {
            warn!(connection_id = %self.id, error = %err, "Connection failed");
            if let Some(code) = err.close_code() {
                if let Err(e) = self.write_frame(OpCode::Close, &code.to_be_bytes()) {
                    debug!(error = %e, "Failed to send close frame");
                }
            }
            self.release(Closure::Local);
        }
        err
    }

    /// Release the transport and mark the connection closed.
    fn release(&mut self, closure: Closure) {
        if let Err(e) = self.transport.shutdown() {
            debug!(error = %e, "Transport shutdown failed");
        }
        self.rx.clear();
        self.closure = Some(closure);
        debug!(connection_id = %self.id, "WebSocket closed");
    }

    fn log_frame(&self, direction: &'static str, opcode: OpCode, len: usize) {
        if self.config.debug {
            debug!(direction, ?opcode, len, "frame");
        } else {
            trace!(direction, ?opcode, len, "frame");
        }
    }
}

impl<T: Transport> Drop for WebSocket<T> {
    fn drop(&mut self) {
        self.close(CloseCode::Normal, "");
    }
}

impl<T: Transport> std::fmt::Debug for WebSocket<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("buffered", &self.rx.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Cut `reason` to at most [`MAX_CLOSE_REASON`] bytes on a char boundary.
fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}
