use std::path::PathBuf;

use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The collection changed between read and write.
    /// The expected version did not match the actual version.
    #[error(
        "Concurrency conflict for collection {collection}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        collection: String,
        expected: Version,
        actual: Version,
    },

    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A write was rejected by the backend.
    #[error("Write to collection {collection} rejected: {reason}")]
    WriteRejected { collection: String, reason: String },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for errors that a fresh read-modify-write may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
