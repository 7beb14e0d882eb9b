//! Error types for the synchronization layer.

use agora_records::{SessionId, SessionStatus};
use thiserror::Error;

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur synchronizing board state.
#[derive(Debug, Error)]
pub enum Error {
    /// A write reported success with zero rows affected. The access
    /// policy rejected it; the row is intact.
    #[error("not permitted: {0}")]
    NotPermitted(String),

    /// Point read found no such session.
    #[error("no session with id {0}")]
    NoSuchSession(SessionId),

    /// The requested status change is not a legal transition.
    #[error("illegal status transition: {from} -> {to}")]
    Transition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// Join-code allocation kept colliding with existing sessions.
    #[error("no unique join code after {0} attempts")]
    JoinCodeCollision(u32),

    /// The synthesizer collaborator failed.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The store call itself failed.
    #[error("store error: {0}")]
    Store(#[from] agora_store::Error),

    /// Record failed boundary validation.
    #[error("record error: {0}")]
    Record(#[from] agora_records::Error),
}
