//! Scripted in-memory transport.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use sporelink_ws::{Frame, Readiness, Transport};

use crate::error::TestError;
use crate::peer;

#[derive(Debug)]
enum Inbound {
    Data(Vec<u8>),
    Stall,
}

#[derive(Debug, Default)]
struct State {
    inbound: VecDeque<Inbound>,
    eof: bool,
    written: Vec<u8>,
    fail_writes: bool,
    write_stalls: usize,
    max_write: Option<usize>,
    readiness: Option<Readiness>,
    nonblocking: bool,
    reads: usize,
    shutdowns: usize,
    used_after_shutdown: bool,
}

/// A transport whose inbound side is scripted by the test.
///
/// Each pushed chunk is handed out by at most one `read` call (split if the
/// reader's buffer is smaller). With nothing queued, reads fail with
/// `WouldBlock`, or return EOF once [`close_remote`](Self::close_remote) was
/// called. Clones share state, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    /// Creates an idle transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one chunk of inbound bytes.
    pub fn push_bytes(&self, bytes: impl AsRef<[u8]>) -> &Self {
        let bytes = bytes.as_ref();
        if !bytes.is_empty() {
            self.state
                .lock()
                .inbound
                .push_back(Inbound::Data(bytes.to_vec()));
        }
        self
    }

    /// Queues `bytes` split into chunks of `chunk_size`, each followed by a
    /// stall so every chunk needs a separate receive attempt.
    pub fn push_chunked(&self, bytes: impl AsRef<[u8]>, chunk_size: usize) -> &Self {
        let mut state = self.state.lock();
        for chunk in bytes.as_ref().chunks(chunk_size.max(1)) {
            state.inbound.push_back(Inbound::Data(chunk.to_vec()));
            state.inbound.push_back(Inbound::Stall);
        }
        self
    }

    /// Queues one `WouldBlock` result.
    pub fn push_stall(&self) -> &Self {
        self.state.lock().inbound.push_back(Inbound::Stall);
        self
    }

    /// Reports EOF once every queued chunk has been read.
    pub fn close_remote(&self) -> &Self {
        self.state.lock().eof = true;
        self
    }

    /// Makes every subsequent write fail with `BrokenPipe`.
    pub fn fail_writes(&self, fail: bool) -> &Self {
        self.state.lock().fail_writes = fail;
        self
    }

    /// Makes the next `count` writes fail with `WouldBlock`.
    pub fn stall_writes(&self, count: usize) -> &Self {
        self.state.lock().write_stalls = count;
        self
    }

    /// Caps how many bytes a single `write` accepts. `None` removes the cap.
    pub fn max_write(&self, limit: Option<usize>) -> &Self {
        self.state.lock().max_write = limit;
        self
    }

    /// Overrides what `poll_readiness` reports. `None` restores the default.
    pub fn set_readiness(&self, readiness: Option<Readiness>) -> &Self {
        self.state.lock().readiness = readiness;
        self
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    /// Everything written so far, clearing the capture.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().written)
    }

    /// Decodes everything written so far as client frames.
    pub fn written_frames(&self) -> Result<Vec<Frame>, TestError> {
        peer::decode_client_frames(&self.written())
    }

    /// Number of inbound chunks (data or stall) still queued.
    pub fn pending(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// Number of `read` calls made so far.
    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    /// Number of times the transport was shut down.
    pub fn shutdowns(&self) -> usize {
        self.state.lock().shutdowns
    }

    /// Returns true if the transport was switched to non-blocking mode.
    pub fn is_nonblocking(&self) -> bool {
        self.state.lock().nonblocking
    }

    /// Returns true if anything read or wrote after shutdown.
    pub fn used_after_shutdown(&self) -> bool {
        self.state.lock().used_after_shutdown
    }
}

impl Read for MockTransport {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.reads += 1;
        if state.shutdowns > 0 {
            state.used_after_shutdown = true;
            return Err(io::ErrorKind::NotConnected.into());
        }

        match state.inbound.pop_front() {
            Some(Inbound::Data(chunk)) => {
                let n = chunk.len().min(out.len());
                out[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    state.inbound.push_front(Inbound::Data(chunk[n..].to_vec()));
                }
                Ok(n)
            }
            Some(Inbound::Stall) => Err(io::ErrorKind::WouldBlock.into()),
            None if state.eof => Ok(0),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.shutdowns > 0 {
            state.used_after_shutdown = true;
            return Err(io::ErrorKind::NotConnected.into());
        }
        if state.fail_writes {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        if state.write_stalls > 0 {
            state.write_stalls -= 1;
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = state.max_write.map_or(buf.len(), |max| buf.len().min(max));
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn set_nonblocking(&mut self) -> io::Result<()> {
        self.state.lock().nonblocking = true;
        Ok(())
    }

    fn poll_readiness(&mut self) -> io::Result<Readiness> {
        let state = self.state.lock();
        if let Some(readiness) = state.readiness {
            return Ok(readiness);
        }
        let data_ready = matches!(state.inbound.front(), Some(Inbound::Data(_)));
        let hangup = state.eof && state.inbound.is_empty();
        Ok(Readiness {
            readable: data_ready || hangup,
            hangup,
            ..Readiness::IDLE
        })
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.state.lock().shutdowns += 1;
        Ok(())
    }
}
