//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Macro definition is not `name=value`
    #[error("invalid macro definition '{0}' (expected name=value)")]
    BadDefine(String),

    /// Store list names a field this build does not know
    #[error("unknown store field '{name}'")]
    UnknownStoreField { name: String },

    /// A filter rule failed to convert
    #[error("filter rule {index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    /// A listener address failed to parse
    #[error("listener '{address}': {reason}")]
    InvalidListener { address: String, reason: String },

    /// A value is out of range
    #[error("invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}
