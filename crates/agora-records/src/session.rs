//! Session records and the status gate.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Unique session identifier, assigned by the record store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a session.
///
/// Legal transitions: `Waiting -> Active`, `Active <-> Inactive`.
/// Participants never mutate status; only the moderator does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, participants gather in the waiting room.
    #[default]
    Waiting,
    /// Board is live; participants may post.
    Active,
    /// Paused by the moderator; may be reactivated.
    Inactive,
}

impl SessionStatus {
    /// String form matching the persisted row value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
            SessionStatus::Inactive => "inactive",
        }
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Waiting, SessionStatus::Active)
                | (SessionStatus::Active, SessionStatus::Inactive)
                | (SessionStatus::Inactive, SessionStatus::Active)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A moderated discussion session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Topic text seeded by the moderator.
    pub topic: String,
    /// Short code participants type to join.
    pub join_code: String,
    /// Rows missing a status decode as `Waiting` rather than failing.
    #[serde(default)]
    pub status: SessionStatus,
    pub owner_id: String,
    /// Unix millis.
    pub created_at: u64,
}

impl Session {
    /// Whether the board is currently live.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Decode a loosely shaped store row, defaulting malformed fields.
    ///
    /// Returns `None` only when the row lacks an id entirely.
    pub fn from_row(row: &serde_json::Value) -> Option<Self> {
        let id = SessionId(row.get("id")?.as_u64()?);
        let status = row
            .get("status")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        Some(Self {
            id,
            topic: string_field(row, "topic"),
            join_code: string_field(row, "join_code"),
            status,
            owner_id: string_field(row, "owner_id"),
            created_at: row.get("created_at").and_then(|v| v.as_u64()).unwrap_or(0),
        })
    }
}

fn string_field(row: &serde_json::Value, key: &str) -> String {
    row.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Join codes are 6 characters from an alphabet without 0/O/1/I.
pub const JOIN_CODE_LEN: usize = 6;
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Validate a session topic before any network call.
pub fn validate_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(Error::EmptyTopic);
    }
    Ok(())
}

/// Validate a join code's shape (length and alphabet).
pub fn validate_join_code(code: &str) -> Result<()> {
    if code.len() != JOIN_CODE_LEN
        || !code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b))
    {
        return Err(Error::BadJoinCode(code.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_transitions() {
        assert!(SessionStatus::Waiting.can_transition_to(SessionStatus::Active));
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Inactive));
        assert!(SessionStatus::Inactive.can_transition_to(SessionStatus::Active));

        assert!(!SessionStatus::Waiting.can_transition_to(SessionStatus::Inactive));
        assert!(!SessionStatus::Active.can_transition_to(SessionStatus::Waiting));
        assert!(!SessionStatus::Active.can_transition_to(SessionStatus::Active));
    }

    #[test]
    fn status_serde_snake_case() {
        let json = serde_json::to_string(&SessionStatus::Waiting).unwrap();
        assert_eq!(json, "\"waiting\"");

        let parsed: SessionStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(parsed, SessionStatus::Inactive);
    }

    #[test]
    fn row_with_missing_status_defaults_to_waiting() {
        let row = json!({ "id": 7, "topic": "Energy", "join_code": "ABC234" });
        let session = Session::from_row(&row).unwrap();
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(session.id, SessionId(7));
    }

    #[test]
    fn row_with_garbage_status_defaults_to_waiting() {
        let row = json!({ "id": 7, "status": "launching" });
        let session = Session::from_row(&row).unwrap();
        assert_eq!(session.status, SessionStatus::Waiting);
    }

    #[test]
    fn row_without_id_is_rejected() {
        let row = json!({ "topic": "Energy" });
        assert!(Session::from_row(&row).is_none());
    }

    #[test]
    fn join_code_validation() {
        assert!(validate_join_code("ABC234").is_ok());
        assert!(validate_join_code("abc234").is_err());
        assert!(validate_join_code("ABC23").is_err());
        assert!(validate_join_code("ABC0I1").is_err());
    }
}
