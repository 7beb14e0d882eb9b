//! Reaction records.

use serde::{Deserialize, Serialize};

use crate::MessageId;

/// The kinds of reaction a participant can leave on a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Contribution,
    Question,
    Interesting,
}

impl ReactionKind {
    /// All kinds, in display order.
    pub const fn all() -> [ReactionKind; 3] {
        [
            ReactionKind::Contribution,
            ReactionKind::Question,
            ReactionKind::Interesting,
        ]
    }

    /// String form matching the persisted row value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Contribution => "contribution",
            ReactionKind::Question => "question",
            ReactionKind::Interesting => "interesting",
        }
    }
}

impl std::fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant's reaction of one kind on one message.
///
/// The triple (message, alias, kind) is the identity: at most one such
/// row exists at any time. Rows are created and removed by toggling,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: MessageId,
    pub alias: String,
    pub kind: ReactionKind,
}

impl Reaction {
    pub fn new(message_id: MessageId, alias: impl Into<String>, kind: ReactionKind) -> Self {
        Self {
            message_id,
            alias: alias.into(),
            kind,
        }
    }
}
