//! Agora Records - Typed Record Boundary
//!
//! Typed representations of the three persisted collections (sessions,
//! messages, reactions). Store rows are loosely shaped where they live;
//! this crate is the boundary where they become typed. Malformed fields
//! are defaulted or rejected here and never propagate into the tree
//! builder or layout logic.
//!
//! # Collections
//!
//! - **Session**: a moderated discussion with a join code and a status
//!   gate (`waiting` / `active` / `inactive`).
//! - **Message**: one contribution in a session's tree. A null parent
//!   marks the seed (the opening prompt); everything else hangs off it.
//! - **Reaction**: a per-participant, per-kind mark on a message.

mod error;
mod message;
mod reaction;
mod session;

pub use error::{Error, Result};
pub use message::{
    validate_alias, validate_content, Message, MessageDraft, MessageId, Position,
    INHIBITION_MARKER,
};
pub use reaction::{Reaction, ReactionKind};
pub use session::{
    validate_join_code, validate_topic, Session, SessionId, SessionStatus, JOIN_CODE_ALPHABET,
    JOIN_CODE_LEN,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix timestamp in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
