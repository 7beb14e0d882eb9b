//! The record store contract.
//!
//! The board core never talks to a concrete backend directly; every
//! consumer takes a [`RecordStore`] so tests can substitute the
//! in-memory implementation. The contract is the minimum capability
//! the core depends on:
//!
//! - equality-filtered queries, ascending by creation time
//! - insert returning the inserted row
//! - update/delete by id returning the affected-row count (zero
//!   distinguishes "rejected by access policy" from "changed")
//! - per-filter change feeds delivering insert/update/delete events
//! - a bulletin pub/sub primitive with self-delivery
//!
//! The access-control layer behind a real backend may silently reject
//! writes (zero rows affected); callers check the count defensively.

use agora_records::{
    Message, MessageDraft, MessageId, Position, Reaction, Session, SessionId, SessionStatus,
};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::event::{Bulletin, RowEvent};
use crate::Result;

/// Generic CRUD + subscribe interface over the three collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Sessions ---

    /// Insert a new session in `waiting` status. The store assigns id
    /// and creation timestamp.
    async fn insert_session(&self, topic: &str, join_code: &str, owner_id: &str)
        -> Result<Session>;

    /// Point read of one session.
    async fn session(&self, id: SessionId) -> Result<Option<Session>>;

    /// Lookup by join code.
    async fn session_by_code(&self, code: &str) -> Result<Option<Session>>;

    /// All sessions, newest first.
    async fn sessions(&self) -> Result<Vec<Session>>;

    /// Write a session's status. Returns the affected-row count.
    async fn set_session_status(&self, id: SessionId, status: SessionStatus) -> Result<u64>;

    /// Delete a session row. Returns the affected-row count.
    async fn delete_session(&self, id: SessionId) -> Result<u64>;

    // --- Messages ---

    /// Insert a new message. The store assigns id and creation
    /// timestamp and returns the full row.
    async fn insert_message(&self, draft: MessageDraft) -> Result<Message>;

    /// All messages of a session, ascending by creation time.
    async fn messages(&self, session: SessionId) -> Result<Vec<Message>>;

    /// Replace a message's content. Returns the affected-row count.
    async fn update_message_content(&self, id: MessageId, content: &str) -> Result<u64>;

    /// Persist a message's manual position. Returns the affected-row
    /// count.
    async fn update_message_position(&self, id: MessageId, position: Position) -> Result<u64>;

    /// Physically delete a message row. Returns the affected-row count.
    async fn delete_message(&self, id: MessageId) -> Result<u64>;

    // --- Reactions ---

    /// Insert a reaction row. Inserting an already-present triple is a
    /// no-op returning the existing row.
    async fn insert_reaction(&self, reaction: Reaction) -> Result<Reaction>;

    /// Delete a reaction row by its (message, alias, kind) identity.
    /// Returns the affected-row count.
    async fn delete_reaction(&self, reaction: &Reaction) -> Result<u64>;

    /// All reactions on a message.
    async fn reactions_for(&self, message: MessageId) -> Result<Vec<Reaction>>;

    // --- Change feeds ---

    /// Change feed for one session row.
    fn watch_session(&self, id: SessionId) -> broadcast::Receiver<RowEvent<Session>>;

    /// Change feed for a session's messages.
    fn watch_messages(&self, session: SessionId) -> broadcast::Receiver<RowEvent<Message>>;

    /// Change feed for one message's reactions.
    fn watch_reactions(&self, message: MessageId) -> broadcast::Receiver<RowEvent<Reaction>>;

    // --- Bulletin ---

    /// Publish on a named channel. Delivery includes the publisher's
    /// own subscribers. Returns the number of receivers reached.
    fn publish(&self, channel: &str, bulletin: Bulletin) -> usize;

    /// Subscribe to a named channel.
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Bulletin>;
}
