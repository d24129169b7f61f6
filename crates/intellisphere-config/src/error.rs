//! Error types for client config loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading or validating client config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a config file failed.
    #[error("failed to read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {}", .0.display())]
    MissingLayer(PathBuf),
    /// Parsing a JSON5 config file failed.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// Converting merged JSON values into the config model failed.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A specific field failed validation.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// Generic validation failure.
    #[error("invalid config: {0}")]
    Invalid(String),
}
