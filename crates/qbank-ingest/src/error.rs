//! Error taxonomy for ingestion runs
//!
//! Only [`IngestError`] ends a run. [`FetchError`] and per-record write
//! failures are recovered inside the coordinator and show up as counters.

use thiserror::Error;

use crate::record::Key;

/// Fatal errors: the run stops, statistics gathered so far are still reported
#[derive(Error, Debug)]
pub enum IngestError {
    /// The candidate listing could not be obtained at all
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The document store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store was reachable but refused a whole-collection operation
    #[error("Store operation failed: {0}")]
    StoreFailed(String),

    /// Invalid run or collection configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// One record's body could not be retrieved or built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch {key}: {cause}")]
pub struct FetchError {
    pub key: Key,
    pub cause: String,
}

impl FetchError {
    pub fn new(key: Key, cause: impl ToString) -> Self {
        Self {
            key,
            cause: cause.to_string(),
        }
    }
}

/// Failure of the candidate listing call
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected listing payload: {0}")]
    Payload(String),
}

impl From<SourceError> for IngestError {
    fn from(err: SourceError) -> Self {
        IngestError::SourceUnavailable(err.to_string())
    }
}

/// Failure reported by a document store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection-level failure; nothing can be written
    #[error("Store unreachable: {0}")]
    Unavailable(String),

    #[error("Invalid collection name '{0}'")]
    InvalidCollection(String),

    /// The store answered but rejected the whole operation
    #[error("Store operation failed: {0}")]
    Operation(String),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidCollection(name) => {
                IngestError::Config(format!("invalid collection name '{name}'"))
            },
            StoreError::Unavailable(message) => IngestError::StoreUnavailable(message),
            StoreError::Operation(message) => IngestError::StoreFailed(message),
            other => IngestError::StoreFailed(other.to_string()),
        }
    }
}
