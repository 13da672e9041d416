use thiserror::Error;

use folio_blobs::BlobError;
use folio_meta::MetaError;
use folio_session::SessionError;

/// Every failure a caller of the core can observe.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad user input; the operation was not attempted.
    #[error("{0}")]
    Validation(String),

    /// A store is inaccessible, unsupported, corrupt, or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A store ran out of space.
    #[error("storage full: {0}")]
    QuotaExceeded(String),

    /// The identity provider failed; the session is unchanged.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The operation needs a namespace but nobody is signed in.
    #[error("not signed in")]
    SignedOut,

    /// The operation is not valid in the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}

impl From<MetaError> for CoreError {
    fn from(err: MetaError) -> Self {
        if err.is_quota_exceeded() {
            Self::QuotaExceeded(err.to_string())
        } else {
            Self::StorageUnavailable(err.to_string())
        }
    }
}

impl From<BlobError> for CoreError {
    fn from(err: BlobError) -> Self {
        if err.is_quota_exceeded() {
            Self::QuotaExceeded(err.to_string())
        } else {
            Self::StorageUnavailable(err.to_string())
        }
    }
}

impl From<SessionError> for CoreError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Auth(msg) => Self::Auth(msg),
            SessionError::InvalidTransition { .. } => Self::InvalidOperation(err.to_string()),
            SessionError::GuestFlag(msg) => Self::StorageUnavailable(msg),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
