//! Session lifecycle service.
//!
//! The moderator-facing surface: create a session with a fresh join
//! code, look sessions up, gate them open and closed, and delete them
//! with a full cascade. Activation is the producer end of the
//! activation signal: the authoritative status write happens first,
//! and only a successful write is followed by the gate bulletin.

use std::sync::Arc;

use agora_records::{
    validate_join_code, validate_topic, Session, SessionId, SessionStatus, JOIN_CODE_ALPHABET,
    JOIN_CODE_LEN,
};
use agora_store::{gate_channel, Bulletin, RecordStore};
use rand::Rng;
use tracing::{debug, info};

use crate::{Error, Result};

/// Collision retries before join-code allocation gives up.
const CODE_ATTEMPTS: u32 = 8;

/// Generate one join code from the unambiguous alphabet.
pub fn generate_join_code<R: Rng>(rng: &mut R) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Moderator operations over the session collection.
pub struct SessionDesk<S> {
    store: Arc<S>,
}

impl<S: RecordStore> SessionDesk<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a session in `waiting` with a unique join code.
    pub async fn create(&self, topic: &str, owner_id: &str) -> Result<Session> {
        validate_topic(topic)?;
        let mut rng = rand::thread_rng();
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_join_code(&mut rng);
            if self.store.session_by_code(&code).await?.is_some() {
                continue;
            }
            let session = self.store.insert_session(topic, &code, owner_id).await?;
            info!(session = %session.id, topic, "session created");
            return Ok(session);
        }
        Err(Error::JoinCodeCollision(CODE_ATTEMPTS))
    }

    /// Participant entry point: look a session up by its join code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Session>> {
        validate_join_code(code)?;
        Ok(self.store.session_by_code(code).await?)
    }

    /// All sessions, newest first.
    pub async fn list(&self) -> Result<Vec<Session>> {
        Ok(self.store.sessions().await?)
    }

    /// Open the gate: write `active`, then publish the activation
    /// bulletin on the session's gate channel. Valid from `waiting`
    /// (first start) and from `inactive` (reactivation).
    pub async fn activate(&self, id: SessionId) -> Result<Session> {
        let session = self.transition(id, SessionStatus::Active).await?;
        let reached = self.store.publish(
            &gate_channel(id),
            Bulletin::SessionStarted { session_id: id },
        );
        debug!(session = %id, reached, "activation bulletin published");
        Ok(session)
    }

    /// Close the gate: `active` back to `inactive`. No bulletin; the
    /// change feed carries the downgrade.
    pub async fn deactivate(&self, id: SessionId) -> Result<Session> {
        self.transition(id, SessionStatus::Inactive).await
    }

    /// Delete the session and everything under it: reactions first,
    /// then messages, then the session row.
    pub async fn delete(&self, id: SessionId) -> Result<()> {
        let messages = self.store.messages(id).await?;
        for message in &messages {
            for reaction in self.store.reactions_for(message.id).await? {
                self.store.delete_reaction(&reaction).await?;
            }
            self.store.delete_message(message.id).await?;
        }
        let count = self.store.delete_session(id).await?;
        if count == 0 {
            return Err(Error::NotPermitted(format!(
                "delete of session {id} affected no rows"
            )));
        }
        info!(session = %id, messages = messages.len(), "session deleted");
        Ok(())
    }

    async fn transition(&self, id: SessionId, to: SessionStatus) -> Result<Session> {
        let session = self
            .store
            .session(id)
            .await?
            .ok_or(Error::NoSuchSession(id))?;
        if !session.status.can_transition_to(to) {
            return Err(Error::Transition {
                from: session.status,
                to,
            });
        }
        let count = self.store.set_session_status(id, to).await?;
        if count == 0 {
            return Err(Error::NotPermitted(format!(
                "status write on session {id} affected no rows"
            )));
        }
        info!(session = %id, from = %session.status, %to, "session status changed");
        Ok(Session {
            status: to,
            ..session
        })
    }
}
