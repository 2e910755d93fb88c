//! Main configuration types.
//!
//! This module provides the top-level [`LinkConfig`] struct.

use serde::{Deserialize, Serialize};
use sporelink_telemetry::LogConfig;
use sporelink_ws::WebSocketConfig;

use crate::ConfigError;

/// Complete configuration of one WebSocket link.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use sporelink_config::LinkConfig;
///
/// let config = LinkConfig::default();
/// assert_eq!(config.websocket.read_chunk_size, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    /// Engine configuration.
    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LogConfig,
}

impl LinkConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.websocket
            .validate()
            .map_err(|e| ConfigError::invalid_value("websocket", e.to_string()))?;
        self.logging
            .validate()
            .map_err(|e| ConfigError::invalid_value("logging", e.to_string()))?;
        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Per-frame diagnostics on, pretty debug-level logs.
    ///
    /// # Example
    ///
    /// ```
    /// use sporelink_config::LinkConfig;
    ///
    /// let config = LinkConfig::development();
    /// assert!(config.websocket.debug);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        Self {
            websocket: WebSocketConfig::default().debug(true),
            logging: LogConfig::development(),
        }
    }

    /// Create a production configuration preset.
    #[must_use]
    pub fn production() -> Self {
        Self {
            websocket: WebSocketConfig::default(),
            logging: LogConfig::production(),
        }
    }
}
