use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The identity provider failed; the session keeps its prior state.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The requested transition is not defined from the current state.
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// The durable guest flag could not be read or written.
    #[error("guest flag error: {0}")]
    GuestFlag(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
