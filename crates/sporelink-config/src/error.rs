//! Errors raised while assembling a [`LinkConfig`](crate::LinkConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Errors from any layer of the config loader.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required link config file does not exist.
    #[error("link config file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The link config file exists but could not be read.
    #[error("failed to read link config file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML layer did not parse or named an unknown field.
    #[error("invalid TOML link config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The JSON layer did not parse or named an unknown field.
    #[error("invalid JSON link config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// `.env` file could not be loaded.
    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),

    /// A section or field holds an unusable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Section or dotted field path.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `PREFIX__SECTION__KEY` override could not be applied.
    #[error("bad environment override {var}: {reason}")]
    EnvParseError {
        /// Full variable name.
        var: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The merged config failed validation, or a layer was unusable.
    #[error("link config rejected: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Create a new validation error.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
