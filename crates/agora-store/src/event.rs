//! Change-feed and bulletin event types.

use agora_records::SessionId;
use serde::{Deserialize, Serialize};

/// A change-feed event for one row of a collection.
///
/// Feeds deliver these in commit order per filter. Updates carry the
/// prior row when the store has it, so consumers can diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowEvent<T> {
    /// A new row was inserted.
    Inserted { row: T },
    /// An existing row changed.
    Updated { before: Option<T>, after: T },
    /// A row was removed.
    Deleted { row: T },
}

impl<T> RowEvent<T> {
    /// The row the event is about (the after-image for updates).
    pub fn row(&self) -> &T {
        match self {
            RowEvent::Inserted { row } => row,
            RowEvent::Updated { after, .. } => after,
            RowEvent::Deleted { row } => row,
        }
    }
}

/// Bulletin channel carrying a session's activation gate.
///
/// Producers and consumers of the gate agree on this name; nothing
/// else shares the channel.
pub fn gate_channel(session: SessionId) -> String {
    format!("sync-gate:{session}")
}

/// A broadcast message on a named bulletin channel.
///
/// Bulletins are independent of row storage: they fan out to every
/// subscriber of the channel, including the publisher (self-delivery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Bulletin {
    /// A moderator activated the session. Published right after the
    /// authoritative status write succeeds.
    SessionStarted { session_id: SessionId },

    /// A participant announced themselves present or departing.
    Presence {
        session_id: SessionId,
        alias: String,
        joined: bool,
    },
}
