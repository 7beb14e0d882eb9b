//! In-memory reference implementation of [`RecordStore`].
//!
//! Backs the test suites and any single-process deployment. Rows live
//! in `BTreeMap`s behind one `Mutex`; change feeds are lazily created
//! `broadcast` channels keyed by filter. The lock is never held across
//! an await point. Every call yields to the scheduler once before
//! touching state, the way a remote backend would, so in-flight
//! interleavings stay observable under test.
//!
//! The store also carries test knobs that simulate backend behavior
//! the contract allows but a healthy backend rarely shows:
//!
//! - [`MemoryStore::deny_writes`]: updates and deletes succeed with an
//!   affected-row count of zero, the way an access-control layer
//!   silently rejects.
//! - [`MemoryStore::interrupt_reads`]: reads fail with a transport
//!   error.
//! - [`MemoryStore::quiet_set_status`]: mutate a session without
//!   emitting a feed event, standing in for a missed delivery.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use agora_records::{
    now_millis, Message, MessageDraft, MessageId, Position, Reaction, Session, SessionId,
    SessionStatus,
};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::event::{Bulletin, RowEvent};
use crate::store::RecordStore;
use crate::{Error, Result};

/// Buffer depth for feed and bulletin channels.
const CHANNEL_CAPACITY: usize = 256;

/// One scheduling point per call, standing in for the round trip a
/// remote backend would cost. Keeps interleavings under test honest.
async fn transit() {
    tokio::task::yield_now().await;
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    clock: u64,
    sessions: BTreeMap<u64, Session>,
    messages: BTreeMap<u64, Message>,
    reactions: Vec<Reaction>,

    session_feeds: HashMap<u64, broadcast::Sender<RowEvent<Session>>>,
    message_feeds: HashMap<u64, broadcast::Sender<RowEvent<Message>>>,
    reaction_feeds: HashMap<u64, broadcast::Sender<RowEvent<Reaction>>>,
    channels: HashMap<String, broadcast::Sender<Bulletin>>,

    deny_writes: bool,
    interrupt_reads: bool,
    session_reads: usize,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Timestamps are strictly increasing even when the wall clock
    /// stalls, so creation order always has a total order.
    fn tick(&mut self) -> u64 {
        self.clock = self.clock.max(now_millis()) + 1;
        self.clock
    }

    fn check_reads(&mut self) -> Result<()> {
        if self.interrupt_reads {
            return Err(Error::Transport("simulated read failure".into()));
        }
        Ok(())
    }

    fn emit_session(&self, id: SessionId, event: RowEvent<Session>) {
        if let Some(tx) = self.session_feeds.get(&id.0) {
            let _ = tx.send(event);
        }
    }

    fn emit_message(&self, session: SessionId, event: RowEvent<Message>) {
        if let Some(tx) = self.message_feeds.get(&session.0) {
            let _ = tx.send(event);
        }
    }

    fn emit_reaction(&self, message: MessageId, event: RowEvent<Reaction>) {
        if let Some(tx) = self.reaction_feeds.get(&message.0) {
            let _ = tx.send(event);
        }
    }
}

/// In-memory [`RecordStore`] with per-filter change feeds.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Test knobs ---

    /// When set, updates and deletes report zero affected rows.
    pub fn deny_writes(&self, deny: bool) {
        self.inner.lock().unwrap().deny_writes = deny;
    }

    /// When set, reads fail with a transport error.
    pub fn interrupt_reads(&self, interrupt: bool) {
        self.inner.lock().unwrap().interrupt_reads = interrupt;
    }

    /// Write a session's status without emitting a feed event.
    pub fn quiet_set_status(&self, id: SessionId, status: SessionStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(session) = inner.sessions.get_mut(&id.0) {
            session.status = status;
        }
    }

    /// How many times a session point read was served.
    pub fn session_read_count(&self) -> usize {
        self.inner.lock().unwrap().session_reads
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    // --- Sessions ---

    async fn insert_session(
        &self,
        topic: &str,
        join_code: &str,
        owner_id: &str,
    ) -> Result<Session> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        let id = SessionId(inner.next_id());
        let created_at = inner.tick();
        let session = Session {
            id,
            topic: topic.to_string(),
            join_code: join_code.to_string(),
            status: SessionStatus::Waiting,
            owner_id: owner_id.to_string(),
            created_at,
        };
        inner.sessions.insert(id.0, session.clone());
        debug!(session = %id, topic, "session inserted");
        inner.emit_session(
            id,
            RowEvent::Inserted {
                row: session.clone(),
            },
        );
        Ok(session)
    }

    async fn session(&self, id: SessionId) -> Result<Option<Session>> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        inner.check_reads()?;
        inner.session_reads += 1;
        Ok(inner.sessions.get(&id.0).cloned())
    }

    async fn session_by_code(&self, code: &str) -> Result<Option<Session>> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        inner.check_reads()?;
        Ok(inner
            .sessions
            .values()
            .find(|s| s.join_code == code)
            .cloned())
    }

    async fn sessions(&self) -> Result<Vec<Session>> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        inner.check_reads()?;
        let mut all: Vec<Session> = inner.sessions.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn set_session_status(&self, id: SessionId, status: SessionStatus) -> Result<u64> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_writes {
            return Ok(0);
        }
        let Some(before) = inner.sessions.get(&id.0).cloned() else {
            return Ok(0);
        };
        let mut after = before.clone();
        after.status = status;
        inner.sessions.insert(id.0, after.clone());
        debug!(session = %id, %status, "session status updated");
        inner.emit_session(
            id,
            RowEvent::Updated {
                before: Some(before),
                after,
            },
        );
        Ok(1)
    }

    async fn delete_session(&self, id: SessionId) -> Result<u64> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_writes {
            return Ok(0);
        }
        let Some(session) = inner.sessions.remove(&id.0) else {
            return Ok(0);
        };
        inner.emit_session(id, RowEvent::Deleted { row: session });
        Ok(1)
    }

    // --- Messages ---

    async fn insert_message(&self, draft: MessageDraft) -> Result<Message> {
        transit().await;
        draft.validate()?;
        let mut inner = self.inner.lock().unwrap();
        let id = MessageId(inner.next_id());
        let created_at = inner.tick();
        let message = Message {
            id,
            session_id: draft.session_id,
            parent_id: draft.parent_id,
            alias: draft.alias,
            color: draft.color,
            content: draft.content,
            is_ai: draft.is_ai,
            position: None,
            created_at,
        };
        inner.messages.insert(id.0, message.clone());
        inner.emit_message(
            message.session_id,
            RowEvent::Inserted {
                row: message.clone(),
            },
        );
        Ok(message)
    }

    async fn messages(&self, session: SessionId) -> Result<Vec<Message>> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        inner.check_reads()?;
        let mut rows: Vec<Message> = inner
            .messages
            .values()
            .filter(|m| m.session_id == session)
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.created_at, m.id.0));
        Ok(rows)
    }

    async fn update_message_content(&self, id: MessageId, content: &str) -> Result<u64> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_writes {
            return Ok(0);
        }
        let Some(before) = inner.messages.get(&id.0).cloned() else {
            return Ok(0);
        };
        let mut after = before.clone();
        after.content = content.to_string();
        inner.messages.insert(id.0, after.clone());
        inner.emit_message(
            after.session_id,
            RowEvent::Updated {
                before: Some(before),
                after,
            },
        );
        Ok(1)
    }

    async fn update_message_position(&self, id: MessageId, position: Position) -> Result<u64> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_writes {
            return Ok(0);
        }
        let Some(before) = inner.messages.get(&id.0).cloned() else {
            return Ok(0);
        };
        let mut after = before.clone();
        after.position = Some(position);
        inner.messages.insert(id.0, after.clone());
        inner.emit_message(
            after.session_id,
            RowEvent::Updated {
                before: Some(before),
                after,
            },
        );
        Ok(1)
    }

    async fn delete_message(&self, id: MessageId) -> Result<u64> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_writes {
            return Ok(0);
        }
        let Some(message) = inner.messages.remove(&id.0) else {
            return Ok(0);
        };
        inner.emit_message(message.session_id, RowEvent::Deleted { row: message });
        Ok(1)
    }

    // --- Reactions ---

    async fn insert_reaction(&self, reaction: Reaction) -> Result<Reaction> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.reactions.iter().any(|r| *r == reaction) {
            return Ok(reaction);
        }
        inner.reactions.push(reaction.clone());
        inner.emit_reaction(
            reaction.message_id,
            RowEvent::Inserted {
                row: reaction.clone(),
            },
        );
        Ok(reaction)
    }

    async fn delete_reaction(&self, reaction: &Reaction) -> Result<u64> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.deny_writes {
            return Ok(0);
        }
        let before = inner.reactions.len();
        inner.reactions.retain(|r| r != reaction);
        let removed = (before - inner.reactions.len()) as u64;
        if removed > 0 {
            inner.emit_reaction(
                reaction.message_id,
                RowEvent::Deleted {
                    row: reaction.clone(),
                },
            );
        }
        Ok(removed)
    }

    async fn reactions_for(&self, message: MessageId) -> Result<Vec<Reaction>> {
        transit().await;
        let mut inner = self.inner.lock().unwrap();
        inner.check_reads()?;
        Ok(inner
            .reactions
            .iter()
            .filter(|r| r.message_id == message)
            .cloned()
            .collect())
    }

    // --- Change feeds ---

    fn watch_session(&self, id: SessionId) -> broadcast::Receiver<RowEvent<Session>> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .session_feeds
            .entry(id.0)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn watch_messages(&self, session: SessionId) -> broadcast::Receiver<RowEvent<Message>> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .message_feeds
            .entry(session.0)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn watch_reactions(&self, message: MessageId) -> broadcast::Receiver<RowEvent<Reaction>> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .reaction_feeds
            .entry(message.0)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    // --- Bulletin ---

    fn publish(&self, channel: &str, bulletin: Bulletin) -> usize {
        let inner = self.inner.lock().unwrap();
        match inner.channels.get(channel) {
            Some(tx) => tx.send(bulletin).unwrap_or(0),
            None => 0,
        }
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Bulletin> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}
