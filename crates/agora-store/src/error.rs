//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to a record store.
#[derive(Debug, Error)]
pub enum Error {
    /// Store unreachable or the call failed in transit.
    #[error("transport error: {0}")]
    Transport(String),

    /// A row could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record failed boundary validation.
    #[error("record error: {0}")]
    Record(#[from] agora_records::Error),
}
