//! Message (intervention) records.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, SessionId};

/// Unique message identifier, assigned by the record store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content a logically deleted message is replaced with.
///
/// The row keeps its identifier, position, and child links so the
/// subtree below it stays attached; only the body is inhibited.
pub const INHIBITION_MARKER: &str = "[withdrawn]";

/// A manually assigned board position.
///
/// Zero coordinates are treated as unset: the layout engine owns any
/// node whose position is absent or (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether this counts as a real manual placement.
    pub fn is_set(&self) -> bool {
        self.x != 0.0 && self.y != 0.0
    }

    /// Round both coordinates to whole units (drag-release persistence).
    pub fn rounded(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
        }
    }
}

/// One contribution in a session's message tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    /// `None` marks the seed (the opening prompt).
    pub parent_id: Option<MessageId>,
    pub alias: String,
    /// Display color assigned to the author.
    pub color: String,
    pub content: String,
    /// Set when the message came from the synthesis collaborator.
    pub is_ai: bool,
    /// Manual position persisted on moderator drag, if any.
    pub position: Option<Position>,
    /// Unix millis.
    pub created_at: u64,
}

impl Message {
    /// Whether this message is the seed of its session.
    pub fn is_seed(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether this message was logically deleted.
    pub fn is_inhibited(&self) -> bool {
        self.content == INHIBITION_MARKER
    }

    /// The manual position, if one is set and meaningful.
    pub fn manual_position(&self) -> Option<Position> {
        self.position.filter(Position::is_set)
    }

    /// Decode a loosely shaped store row. Returns `None` when the row
    /// lacks an id or session reference.
    pub fn from_row(row: &serde_json::Value) -> Option<Self> {
        let id = MessageId(row.get("id")?.as_u64()?);
        let session_id = SessionId(row.get("session_id")?.as_u64()?);
        let parent_id = row
            .get("parent_id")
            .and_then(|v| v.as_u64())
            .map(MessageId);
        let position = match (
            row.get("x_pos").and_then(|v| v.as_f64()),
            row.get("y_pos").and_then(|v| v.as_f64()),
        ) {
            (Some(x), Some(y)) => Some(Position::new(x, y)),
            _ => None,
        };
        Some(Self {
            id,
            session_id,
            parent_id,
            alias: str_field(row, "alias"),
            color: str_field(row, "color"),
            content: str_field(row, "content"),
            is_ai: row.get("is_ai").and_then(|v| v.as_bool()).unwrap_or(false),
            position,
            created_at: row.get("created_at").and_then(|v| v.as_u64()).unwrap_or(0),
        })
    }
}

fn str_field(row: &serde_json::Value, key: &str) -> String {
    row.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Payload for inserting a new message; the store assigns id and
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub session_id: SessionId,
    pub parent_id: Option<MessageId>,
    pub alias: String,
    pub color: String,
    pub content: String,
    pub is_ai: bool,
}

impl MessageDraft {
    /// Validate the draft before any network call.
    pub fn validate(&self) -> Result<()> {
        validate_content(&self.content)?;
        validate_alias(&self.alias)
    }
}

/// Validate message content before any network call.
pub fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::EmptyContent);
    }
    Ok(())
}

/// Validate a participant alias before any network call.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.trim().is_empty() {
        return Err(Error::EmptyAlias);
    }
    Ok(())
}
