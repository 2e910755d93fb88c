//! Structured logging for sporelink.
//!
//! The WebSocket engine only emits `tracing` events; this crate installs the
//! subscriber that turns them into JSON (production) or pretty
//! (development) output.
//!
//! # Example
//!
//! ```rust,ignore
//! use sporelink_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(connection_id = %ws.id(), "Link up");
//! ```

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
