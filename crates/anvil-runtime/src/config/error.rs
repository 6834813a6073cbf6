//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A figment source failed to load or deserialize.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {0:?}")]
    FileNotFound(PathBuf),

    /// A configuration file has an extension no enabled format feature
    /// handles.
    #[error("unsupported configuration format: {0:?}")]
    UnsupportedFormat(PathBuf),

    /// The configuration loaded but fails validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
