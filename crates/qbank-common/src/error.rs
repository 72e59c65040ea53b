//! Error types shared across qbank crates

use thiserror::Error;

/// Result type alias for qbank operations
pub type Result<T> = std::result::Result<T, QbankError>;

/// Main error type for configuration and process-level failures
#[derive(Error, Debug)]
pub enum QbankError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

impl QbankError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
