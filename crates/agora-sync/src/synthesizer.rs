//! Seam for the AI facilitator.
//!
//! The board never talks to a model directly; it hands the message
//! list to a [`Synthesizer`] and posts whatever comes back as
//! AI-flagged replies. An [`EngagementPolicy`] keeps the facilitator
//! quiet until the discussion has enough human material to work with.

use agora_records::{Message, MessageId};
use agora_store::RecordStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::feed::MessageFeed;
use crate::Result;

/// Card color for AI-origin messages.
pub const AI_COLOR: &str = "#0ea5e9";

/// One proposed AI contribution, attached under `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub target_id: MessageId,
    pub text: String,
    pub display_alias: String,
}

/// Opaque text-generation collaborator. May fail, may return nothing.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, messages: &[Message]) -> Result<Vec<Synthesis>>;
}

/// When the facilitator is invited in. Product policy, not structure.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementPolicy {
    /// Minimum human-authored messages before synthesis is offered.
    pub min_messages: usize,
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self { min_messages: 7 }
    }
}

impl EngagementPolicy {
    #[must_use]
    pub fn with_min_messages(mut self, min: usize) -> Self {
        self.min_messages = min;
        self
    }

    /// Whether the list carries enough human material. AI rows do not
    /// count toward their own trigger.
    pub fn ready(&self, messages: &[Message]) -> bool {
        messages.iter().filter(|m| !m.is_ai).count() >= self.min_messages
    }
}

/// Run one synthesis round over the feed's current list.
///
/// Below the engagement threshold this returns empty without calling
/// the collaborator. Each accepted suggestion is sent through the feed
/// with `is_ai` set, so it reaches every client by the normal echo
/// path.
pub async fn run_synthesis<S, Y>(
    feed: &MessageFeed<S>,
    synthesizer: &Y,
    policy: &EngagementPolicy,
) -> Result<Vec<Message>>
where
    S: RecordStore,
    Y: Synthesizer + ?Sized,
{
    let snapshot = feed.messages().await;
    if !policy.ready(&snapshot) {
        return Ok(Vec::new());
    }
    let suggestions = synthesizer.synthesize(&snapshot).await?;
    debug!(count = suggestions.len(), "synthesis suggestions received");

    let mut sent = Vec::with_capacity(suggestions.len());
    for suggestion in suggestions {
        let message = feed
            .send(
                Some(suggestion.target_id),
                &suggestion.display_alias,
                AI_COLOR,
                &suggestion.text,
                true,
            )
            .await?;
        sent.push(message);
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CannedSynthesizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Synthesizer for CannedSynthesizer {
        async fn synthesize(&self, messages: &[Message]) -> Result<Vec<Synthesis>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let seed = messages.first().expect("non-empty list");
            Ok(vec![Synthesis {
                target_id: seed.id,
                text: "a connecting question".into(),
                display_alias: "FACILITATOR".into(),
            }])
        }
    }

    async fn feed() -> MessageFeed<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let session = store.insert_session("t", "AAAA22", "o").await.unwrap();
        MessageFeed::new(store, session.id)
    }

    #[tokio::test]
    async fn below_threshold_the_collaborator_is_not_called() {
        let feed = feed().await;
        feed.send(None, "MOD", "#333", "seed", false).await.unwrap();
        feed.load().await.unwrap();

        let synth = CannedSynthesizer {
            calls: AtomicUsize::new(0),
        };
        let policy = EngagementPolicy::default();
        let sent = run_synthesis(&feed, &synth, &policy).await.unwrap();
        assert!(sent.is_empty());
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn at_threshold_suggestions_are_posted_as_ai_replies() {
        let feed = feed().await;
        let seed = feed.send(None, "MOD", "#333", "seed", false).await.unwrap();
        feed.send(Some(seed.id), "P1", "#444", "reply", false)
            .await
            .unwrap();
        feed.load().await.unwrap();

        let synth = CannedSynthesizer {
            calls: AtomicUsize::new(0),
        };
        let policy = EngagementPolicy::default().with_min_messages(2);
        let sent = run_synthesis(&feed, &synth, &policy).await.unwrap();

        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_ai);
        assert_eq!(sent[0].parent_id, Some(seed.id));
        assert_eq!(sent[0].color, AI_COLOR);
    }

    struct BrokenSynthesizer;

    #[async_trait]
    impl Synthesizer for BrokenSynthesizer {
        async fn synthesize(&self, _messages: &[Message]) -> Result<Vec<Synthesis>> {
            Err(crate::Error::Synthesis("model unavailable".into()))
        }
    }

    #[tokio::test]
    async fn collaborator_failure_propagates_without_posting() {
        let feed = feed().await;
        feed.send(None, "MOD", "#333", "seed", false).await.unwrap();
        feed.load().await.unwrap();

        let policy = EngagementPolicy::default().with_min_messages(1);
        let err = run_synthesis(&feed, &BrokenSynthesizer, &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Synthesis(_)));
        assert_eq!(feed.load().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ai_rows_do_not_count_toward_the_trigger() {
        let policy = EngagementPolicy::default().with_min_messages(1);
        let mut ai = Message {
            id: MessageId(1),
            session_id: agora_records::SessionId(1),
            parent_id: None,
            alias: "FACILITATOR".into(),
            color: AI_COLOR.into(),
            content: "hello".into(),
            is_ai: true,
            position: None,
            created_at: 1,
        };
        assert!(!policy.ready(std::slice::from_ref(&ai)));
        ai.is_ai = false;
        assert!(policy.ready(std::slice::from_ref(&ai)));
    }
}
