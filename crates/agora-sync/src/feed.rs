//! The message synchronization feed.
//!
//! One [`MessageFeed`] owns the canonical ordered message list of a
//! session. The list is loaded once and then kept consistent by the
//! store's change feed; sends are never appended optimistically, the
//! subscription echo is the only writer on the insert path. This keeps
//! every client's list a pure function of what the store committed.
//!
//! Deletion is two-state. A leaf is physically removed; a message with
//! children is inhibited instead (content replaced with the marker) so
//! its subtree stays attached. Classification is recomputed from the
//! live list on every request because children may have appeared since
//! the user asked.

use std::sync::Arc;

use agora_graph::MessageTree;
use agora_records::{
    validate_content, Message, MessageDraft, MessageId, Position, SessionId, INHIBITION_MARKER,
};
use agora_store::{RecordStore, RowEvent};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{Error, Result};

/// How a smart delete resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Leaf; the row was physically removed.
    Removed,
    /// Had children; content was replaced with the inhibition marker.
    Inhibited,
    /// Already gone locally; nothing was done.
    AlreadyGone,
}

/// Synchronized message list of one session.
pub struct MessageFeed<S> {
    store: Arc<S>,
    session_id: SessionId,
    messages: Arc<RwLock<Vec<Message>>>,
}

impl<S: RecordStore> MessageFeed<S> {
    pub fn new(store: Arc<S>, session_id: SessionId) -> Self {
        Self {
            store,
            session_id,
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Fetch the full list, ascending by creation time, and replace
    /// local state. On transport failure the previous list is kept and
    /// the error is returned for the caller to retry.
    pub async fn load(&self) -> Result<usize> {
        match self.store.messages(self.session_id).await {
            Ok(rows) => {
                let count = rows.len();
                *self.messages.write().await = rows;
                debug!(session = %self.session_id, count, "message list loaded");
                Ok(count)
            }
            Err(err) => {
                warn!(session = %self.session_id, %err, "load failed, keeping stale list");
                Err(err.into())
            }
        }
    }

    /// Snapshot of the current list.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    /// Open the change-event stream and apply it to the list until the
    /// handle is torn down. Must be torn down on session switch so a
    /// prior session's events cannot leak into the next.
    pub fn subscribe(&self) -> FeedHandle {
        let mut rx = self.store.watch_messages(self.session_id);
        let messages = Arc::clone(&self.messages);
        let session = self.session_id;
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => apply(&messages, event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(session = %session, skipped, "message feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(session = %session, "message feed closed");
        });
        FeedHandle { task }
    }

    /// Insert a new message. The local list is not touched; the
    /// subscription echo delivers the committed row.
    pub async fn send(
        &self,
        parent_id: Option<MessageId>,
        alias: &str,
        color: &str,
        content: &str,
        is_ai: bool,
    ) -> Result<Message> {
        let draft = MessageDraft {
            session_id: self.session_id,
            parent_id,
            alias: alias.to_string(),
            color: color.to_string(),
            content: content.to_string(),
            is_ai,
        };
        draft.validate()?;
        Ok(self.store.insert_message(draft).await?)
    }

    /// Replace a message's content. Zero affected rows means the
    /// access policy rejected the write.
    pub async fn update(&self, id: MessageId, content: &str) -> Result<()> {
        validate_content(content)?;
        let count = self.store.update_message_content(id, content).await?;
        if count == 0 {
            return Err(Error::NotPermitted(format!(
                "content update of message {id} affected no rows"
            )));
        }
        Ok(())
    }

    /// Persist a manual drag position. Coordinates are rounded to
    /// integers before the write.
    pub async fn reposition(&self, id: MessageId, position: Position) -> Result<()> {
        let count = self
            .store
            .update_message_position(id, position.rounded())
            .await?;
        if count == 0 {
            return Err(Error::NotPermitted(format!(
                "reposition of message {id} affected no rows"
            )));
        }
        Ok(())
    }

    /// Physically delete a message. Targets already gone locally are
    /// no-op successes; a refresh reconciles stale references.
    pub async fn remove(&self, id: MessageId) -> Result<()> {
        let known = self.messages.read().await.iter().any(|m| m.id == id);
        if !known {
            debug!(message = %id, "remove target already gone, skipping");
            return Ok(());
        }
        let count = self.store.delete_message(id).await?;
        if count == 0 {
            return Err(Error::NotPermitted(format!(
                "delete of message {id} affected no rows"
            )));
        }
        Ok(())
    }

    /// Delete with the two-state policy: physical for leaves, logical
    /// inhibition for messages with children.
    pub async fn smart_delete(&self, id: MessageId) -> Result<DeleteOutcome> {
        let snapshot = self.messages().await;
        if !snapshot.iter().any(|m| m.id == id) {
            return Ok(DeleteOutcome::AlreadyGone);
        }
        let tree = MessageTree::build(&snapshot);
        if tree.has_children(id) {
            self.update(id, INHIBITION_MARKER).await?;
            debug!(message = %id, "message inhibited");
            Ok(DeleteOutcome::Inhibited)
        } else {
            self.remove(id).await?;
            debug!(message = %id, "message removed");
            Ok(DeleteOutcome::Removed)
        }
    }
}

async fn apply(messages: &RwLock<Vec<Message>>, event: RowEvent<Message>) {
    let mut list = messages.write().await;
    match event {
        RowEvent::Inserted { row } => {
            if !list.iter().any(|m| m.id == row.id) {
                list.push(row);
            }
        }
        RowEvent::Updated { after, .. } => {
            if let Some(slot) = list.iter_mut().find(|m| m.id == after.id) {
                *slot = after;
            }
        }
        RowEvent::Deleted { row } => {
            list.retain(|m| m.id != row.id);
        }
    }
}

/// Owns the subscription task; dropping it closes the stream.
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Tear the subscription down explicitly.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
