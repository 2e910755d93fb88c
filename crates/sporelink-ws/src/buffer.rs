//! Exact-read accumulator over a non-blocking byte stream.
//!
//! The buffer never owns the transport; the connection lends it for each
//! call so it stays the sole owner of the socket. Bytes are only ever
//! appended at the back and removed from the front, and a read that cannot
//! complete leaves every buffered byte in place for the next attempt.

use std::io::{self, Read};

use bytes::BytesMut;
use thiserror::Error;

/// Errors produced while pulling bytes from the transport.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The transport has nothing to offer right now. Recoverable.
    #[error("no data available yet")]
    WouldBlock,

    /// The transport reported end-of-stream.
    #[error("peer closed the transport")]
    PeerClosed,

    /// Any other transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    /// `true` for [`ReadError::WouldBlock`].
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }
}

/// Byte queue fed by non-blocking transport reads.
#[derive(Debug)]
pub struct ReceiveBuffer {
    buf: BytesMut,
    chunk_size: usize,
}

impl ReceiveBuffer {
    /// Create an empty buffer that reads up to `chunk_size` bytes per fill.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(chunk_size),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Buffered bytes, oldest first.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Drop every buffered byte.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Attempt one read from `src`, appending whatever it yields.
    ///
    /// Returns the number of bytes appended.
    pub fn fill<R: Read + ?Sized>(&mut self, src: &mut R) -> Result<usize, ReadError> {
        let start = self.buf.len();
        self.buf.resize(start + self.chunk_size, 0);
        let result = loop {
            match src.read(&mut self.buf[start..]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match result {
            Ok(0) => {
                self.buf.truncate(start);
                Err(ReadError::PeerClosed)
            }
            Ok(n) => {
                self.buf.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                self.buf.truncate(start);
                if e.kind() == io::ErrorKind::WouldBlock {
                    Err(ReadError::WouldBlock)
                } else {
                    Err(ReadError::Io(e))
                }
            }
        }
    }

    /// Make sure at least `n` bytes are buffered, filling as needed.
    pub fn ensure<R: Read + ?Sized>(&mut self, src: &mut R, n: usize) -> Result<(), ReadError> {
        while self.buf.len() < n {
            self.fill(src)?;
        }
        Ok(())
    }

    /// Remove and return exactly the first `n` bytes.
    ///
    /// Fails with [`ReadError::WouldBlock`] the moment the transport runs
    /// dry; bytes gathered so far stay buffered.
    pub fn read_exactly<R: Read + ?Sized>(
        &mut self,
        src: &mut R,
        n: usize,
    ) -> Result<BytesMut, ReadError> {
        self.ensure(src, n)?;
        Ok(self.buf.split_to(n))
    }
}
