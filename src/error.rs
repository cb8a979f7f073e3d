//! Error types for the vaultgen secret generation tool.

use thiserror::Error;

/// Errors raised while reaching or reading the secret store
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Secret store unreachable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Unexpected backend response for '{path}': {detail}")]
    BadResponse { path: String, detail: String },

    #[error("Malformed listing at '{path}': {detail}")]
    MalformedListing { path: String, detail: String },
}

/// Application-level errors surfaced to the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Cannot render nested secrets as '{format}' output: {detail}")]
    SerializationMismatch { format: String, detail: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}
