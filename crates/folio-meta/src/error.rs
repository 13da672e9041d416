//! Error types for metadata operations.

use thiserror::Error;

/// Errors that can occur while loading or saving project metadata.
#[derive(Debug, Error)]
pub enum MetaError {
    /// Saving would exceed the store's capacity.
    #[error("metadata quota exceeded for {key}: document needs {needed} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        needed: u64,
        available: u64,
    },

    /// The backend cannot be opened or read.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    /// The persisted document cannot be decoded.
    #[error("corrupt metadata document {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// The namespace key cannot be used as a storage key.
    #[error("invalid storage key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The collection handed to `save` repeats an id.
    #[error("duplicate project id {id} in {key}")]
    DuplicateId { key: String, id: String },

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetaError {
    /// Returns `true` if this is a capacity failure.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Convenience type alias for metadata operations.
pub type MetaResult<T> = std::result::Result<T, MetaError>;
