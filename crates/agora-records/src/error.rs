//! Validation errors for record construction.

use thiserror::Error;

/// Result type for record validation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when a record fails validation at the boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Message content is empty or whitespace-only.
    #[error("message content is empty")]
    EmptyContent,

    /// Participant alias is empty or whitespace-only.
    #[error("participant alias is empty")]
    EmptyAlias,

    /// Session topic is empty or whitespace-only.
    #[error("session topic is empty")]
    EmptyTopic,

    /// Join code has the wrong length or alphabet.
    #[error("malformed join code: {0}")]
    BadJoinCode(String),
}
