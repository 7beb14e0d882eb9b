//! Reconciliation of a local message list against a fresh fetch.
//!
//! The sync layer periodically re-reads a session's messages and has
//! to merge the result into state that live events already shaped.
//! Two regimes:
//!
//! - membership changed (different count or different id set): the
//!   fetch wins wholesale and replaces the local list
//! - same membership: only content is patched in place, so positions
//!   and any locally observed ordering survive the merge

use std::collections::HashSet;

use agora_records::{Message, MessageId};
use tracing::debug;

/// What the merge did to the local list.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Membership differed; the local list was replaced.
    Replaced,
    /// Same rows; content was patched where it differed.
    Patched { updated: Vec<MessageId> },
}

impl Reconciliation {
    /// True when the merge changed nothing.
    pub fn is_noop(&self) -> bool {
        matches!(self, Reconciliation::Patched { updated } if updated.is_empty())
    }
}

/// Merge `remote` into `local`.
pub fn reconcile(local: &mut Vec<Message>, remote: Vec<Message>) -> Reconciliation {
    let local_ids: HashSet<MessageId> = local.iter().map(|m| m.id).collect();
    let remote_ids: HashSet<MessageId> = remote.iter().map(|m| m.id).collect();

    if local.len() != remote.len() || local_ids != remote_ids {
        debug!(
            local = local.len(),
            remote = remote.len(),
            "membership changed, replacing list"
        );
        *local = remote;
        return Reconciliation::Replaced;
    }

    let mut updated = Vec::new();
    for fresh in remote {
        if let Some(row) = local.iter_mut().find(|m| m.id == fresh.id) {
            if row.content != fresh.content {
                row.content = fresh.content;
                updated.push(row.id);
            }
        }
    }
    Reconciliation::Patched { updated }
}
