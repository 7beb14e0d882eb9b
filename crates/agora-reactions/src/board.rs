//! The per-message reaction board.
//!
//! Tallies every reaction on one message and tracks which kinds the
//! local participant has set. Toggling is optimistic: the local tally
//! flips immediately, the store write follows, and a re-fetch settles
//! the board on ground truth. While a toggle for a kind is in flight,
//! further toggles for that kind are rejected; two rapid taps must
//! not produce two writes racing each other.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use agora_records::{MessageId, Reaction, ReactionKind};
use agora_store::{RecordStore, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What a toggle call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The participant's reaction of this kind was added.
    Added,
    /// The participant's reaction of this kind was removed.
    Removed,
    /// A toggle for this kind is still in flight; nothing was done.
    Pending,
}

#[derive(Default)]
struct TallyState {
    counts: HashMap<ReactionKind, usize>,
    mine: HashSet<ReactionKind>,
    pending: HashSet<ReactionKind>,
}

fn apply_rows(state: &Mutex<TallyState>, alias: &str, rows: Vec<Reaction>) {
    let mut state = state.lock().unwrap();
    state.counts.clear();
    state.mine.clear();
    for row in rows {
        *state.counts.entry(row.kind).or_default() += 1;
        if row.alias == alias {
            state.mine.insert(row.kind);
        }
    }
}

/// Reaction tallies of one message, from one participant's seat.
pub struct ReactionBoard<S> {
    store: Arc<S>,
    message_id: MessageId,
    alias: String,
    state: Arc<Mutex<TallyState>>,
}

impl<S: RecordStore + 'static> ReactionBoard<S> {
    pub fn new(store: Arc<S>, message_id: MessageId, alias: impl Into<String>) -> Self {
        Self {
            store,
            message_id,
            alias: alias.into(),
            state: Arc::new(Mutex::new(TallyState::default())),
        }
    }

    /// Load ground truth and recompute every tally.
    pub async fn refresh(&self) -> Result<()> {
        let rows = self.store.reactions_for(self.message_id).await?;
        apply_rows(&self.state, &self.alias, rows);
        Ok(())
    }

    /// Current count of one kind.
    pub fn tally(&self, kind: ReactionKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .counts
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    /// All current counts.
    pub fn counts(&self) -> HashMap<ReactionKind, usize> {
        self.state.lock().unwrap().counts.clone()
    }

    /// Whether the local participant has this kind set.
    pub fn reacted(&self, kind: ReactionKind) -> bool {
        self.state.lock().unwrap().mine.contains(&kind)
    }

    /// Whether a toggle for this kind is in flight.
    pub fn is_pending(&self, kind: ReactionKind) -> bool {
        self.state.lock().unwrap().pending.contains(&kind)
    }

    /// Flip the local participant's reaction of `kind`.
    pub async fn toggle(&self, kind: ReactionKind) -> Result<ToggleOutcome> {
        let adding = {
            let mut state = self.state.lock().unwrap();
            if state.pending.contains(&kind) {
                debug!(message = %self.message_id, %kind, "toggle rejected, one already in flight");
                return Ok(ToggleOutcome::Pending);
            }
            state.pending.insert(kind);
            let adding = !state.mine.contains(&kind);
            // Optimistic flip; the re-fetch below corrects any drift.
            if adding {
                state.mine.insert(kind);
                *state.counts.entry(kind).or_default() += 1;
            } else {
                state.mine.remove(&kind);
                if let Some(count) = state.counts.get_mut(&kind) {
                    *count = count.saturating_sub(1);
                }
            }
            adding
        };

        let reaction = Reaction::new(self.message_id, &self.alias, kind);
        let write = if adding {
            self.store.insert_reaction(reaction).await.map(|_| ())
        } else {
            // Zero rows here means the row was already gone; the
            // re-fetch settles it either way.
            self.store.delete_reaction(&reaction).await.map(|_| ())
        };
        let refetch = self.refresh().await;
        self.state.lock().unwrap().pending.remove(&kind);

        if let Err(err) = write {
            if refetch.is_err() {
                // Neither the write nor ground truth went through;
                // undo the optimistic flip by hand.
                let mut state = self.state.lock().unwrap();
                if adding {
                    state.mine.remove(&kind);
                    if let Some(count) = state.counts.get_mut(&kind) {
                        *count = count.saturating_sub(1);
                    }
                } else {
                    state.mine.insert(kind);
                    *state.counts.entry(kind).or_default() += 1;
                }
            }
            return Err(err);
        }
        if let Err(err) = refetch {
            debug!(message = %self.message_id, %err, "re-fetch failed, keeping optimistic tally");
        }
        Ok(if adding {
            ToggleOutcome::Added
        } else {
            ToggleOutcome::Removed
        })
    }

    /// Follow the reaction feed; any event on this message triggers a
    /// re-fetch. Torn down by dropping the handle.
    pub fn subscribe(&self) -> BoardHandle {
        let mut rx = self.store.watch_reactions(self.message_id);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let message_id = self.message_id;
        let alias = self.alias.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(_) => match store.reactions_for(message_id).await {
                        Ok(rows) => apply_rows(&state, &alias, rows),
                        Err(err) => {
                            debug!(message = %message_id, %err, "reaction re-fetch failed")
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(message = %message_id, skipped, "reaction feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        BoardHandle { task }
    }
}

/// Owns the feed-following task; dropping it closes the stream.
pub struct BoardHandle {
    task: JoinHandle<()>,
}

impl BoardHandle {
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for BoardHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
