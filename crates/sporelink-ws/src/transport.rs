//! The raw byte-stream seam the engine drives.
//!
//! A transport is any non-blocking `Read + Write` socket that can also report
//! readiness without consuming data. The engine owns its transport
//! exclusively; nothing else reads from or writes to it.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

/// Readiness flags reported by a transport probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Bytes (or EOF) can be read without blocking.
    pub readable: bool,
    /// A socket-level error is pending.
    pub error: bool,
    /// The peer hung up.
    pub hangup: bool,
    /// The handle is no longer valid.
    pub invalid: bool,
}

impl Readiness {
    /// Nothing to report.
    pub const IDLE: Self = Self {
        readable: false,
        error: false,
        hangup: false,
        invalid: false,
    };

    /// Readable and healthy.
    pub const READABLE: Self = Self {
        readable: true,
        error: false,
        hangup: false,
        invalid: false,
    };

    /// Any flag that makes the connection unusable.
    pub fn is_fatal(&self) -> bool {
        self.error || self.hangup || self.invalid
    }
}

/// A non-blocking byte-stream socket.
pub trait Transport: Read + Write {
    /// Switch the socket to non-blocking mode.
    fn set_nonblocking(&mut self) -> io::Result<()>;

    /// Report readiness without consuming any application data.
    fn poll_readiness(&mut self) -> io::Result<Readiness>;

    /// Release the socket. Called once, when the connection closes.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_nonblocking(&mut self) -> io::Result<()> {
        Self::set_nonblocking(self, true)
    }

    fn poll_readiness(&mut self) -> io::Result<Readiness> {
        if self.take_error()?.is_some() {
            return Ok(Readiness {
                error: true,
                ..Readiness::IDLE
            });
        }

        let mut probe = [0u8; 1];
        match self.peek(&mut probe) {
            Ok(0) => Ok(Readiness {
                readable: true,
                hangup: true,
                ..Readiness::IDLE
            }),
            Ok(_) => Ok(Readiness::READABLE),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Readiness::IDLE),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Readiness::IDLE),
            Err(_) => Ok(Readiness {
                error: true,
                ..Readiness::IDLE
            }),
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match Self::shutdown(self, Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn set_nonblocking(&mut self) -> io::Result<()> {
        (**self).set_nonblocking()
    }

    fn poll_readiness(&mut self) -> io::Result<Readiness> {
        (**self).poll_readiness()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }
}
