use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("project id must not be empty")]
    EmptyProjectId,

    #[error("user id must not be empty")]
    EmptyUserId,
}
