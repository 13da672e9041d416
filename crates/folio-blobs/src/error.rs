use folio_types::ProjectId;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The backend ran out of space for the payload.
    #[error("blob store quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The backend cannot be opened or is not supported.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    /// The stored payload does not match its manifest.
    #[error("corrupt blob {id}: {reason}")]
    Corrupt { id: ProjectId, reason: String },

    /// The id cannot be used as a storage key.
    #[error("invalid blob key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Manifest serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Returns `true` if this is a capacity failure.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}

/// Result alias for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;
