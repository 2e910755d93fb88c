//! Typed configuration for sporelink links.
//!
//! This crate loads the per-connection engine settings and the logging
//! settings with support for:
//! - TOML and JSON configuration files
//! - `.env` files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use sporelink_config::ConfigLoader;
//!
//! # fn main() -> Result<(), sporelink_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("link.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("SPORELINK")
//!     .load()?;
//!
//! println!("reading {} bytes per poll", config.websocket.read_chunk_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [websocket]
//! role = "client"
//! max_frame_size = 16777216
//! read_chunk_size = 1024
//! poll_interval_ms = 10
//! debug = false
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! service_name = "sporelink"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `SPORELINK__WEBSOCKET__DEBUG=true`
//! - `SPORELINK__WEBSOCKET__MAX_FRAME_SIZE=none`
//! - `SPORELINK__LOGGING__FORMAT=pretty`

mod config;
mod error;
mod loader;

pub use config::LinkConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
