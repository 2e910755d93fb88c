//! WebSocket configuration.
//!
//! This module defines the explicit per-connection configuration handed to
//! the engine at construction. Nothing inside the engine reads global state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{WsError, WsResult};

/// Which end of the connection this engine plays.
///
/// Clients mask every outbound frame; servers never do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Client role (masks outbound frames).
    #[default]
    Client,
    /// Server role (never masks).
    Server,
}

/// Configuration for a WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebSocketConfig {
    /// Role on the wire (default: client).
    pub role: Role,
    /// Maximum accepted payload per frame (default: 16 MB). `None` disables
    /// the check.
    pub max_frame_size: Option<usize>,
    /// Bytes requested per transport read (default: 1024).
    pub read_chunk_size: usize,
    /// Resume delay of the suspending receive loop, in ms (default: 10).
    pub poll_interval_ms: u64,
    /// How long a send may wait for a full transport to take the rest of a
    /// frame, in ms (default: 5000).
    pub write_timeout_ms: u64,
    /// Emit per-frame diagnostics at debug level (default: false).
    pub debug: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            role: Role::Client,
            max_frame_size: Some(16 * 1024 * 1024), // 16 MB
            read_chunk_size: 1024,
            poll_interval_ms: 10,
            write_timeout_ms: 5_000,
            debug: false,
        }
    }
}

impl WebSocketConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role.
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the maximum frame size.
    pub fn max_frame_size(mut self, size: impl Into<Option<usize>>) -> Self {
        self.max_frame_size = size.into();
        self
    }

    /// Set the transport read chunk size.
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Set the poll interval of the suspending receive loop.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set how long a send may wait to finish a frame.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable per-frame diagnostics.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Write timeout as a [`Duration`].
    pub fn write_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Check that every field holds a usable value.
    pub fn validate(&self) -> WsResult<()> {
        if self.read_chunk_size == 0 {
            return Err(WsError::invalid_config("read_chunk_size must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(WsError::invalid_config("poll_interval_ms must be positive"));
        }
        if self.write_timeout_ms == 0 {
            return Err(WsError::invalid_config("write_timeout_ms must be positive"));
        }
        if self.max_frame_size == Some(0) {
            return Err(WsError::invalid_config(
                "max_frame_size must be positive when set",
            ));
        }
        Ok(())
    }
}
