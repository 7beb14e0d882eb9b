//! Presence roster over the bulletin primitive.
//!
//! Participants announce themselves on a session-scoped channel; the
//! roster records who was last heard from and when. Self-delivery
//! means an announcer's own roster learns about the announcement by
//! the same path as everyone else's. Entries that stop being
//! refreshed age out after the configured maximum.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agora_records::SessionId;
use agora_store::{Bulletin, RecordStore};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Bulletin channel carrying a session's presence announcements.
pub fn presence_channel(session: SessionId) -> String {
    format!("presence:{session}")
}

/// Roster tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceConfig {
    /// How long an alias stays listed without a fresh announcement.
    pub max_age: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60),
        }
    }
}

impl PresenceConfig {
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Live alias roster of one session.
pub struct PresenceRoster<S> {
    store: Arc<S>,
    session_id: SessionId,
    config: PresenceConfig,
    seen: Arc<Mutex<HashMap<String, Instant>>>,
    task: JoinHandle<()>,
}

impl<S: RecordStore + 'static> PresenceRoster<S> {
    pub fn new(store: Arc<S>, session_id: SessionId, config: PresenceConfig) -> Self {
        let mut rx = store.subscribe(&presence_channel(session_id));
        let seen = Arc::new(Mutex::new(HashMap::new()));
        let map = Arc::clone(&seen);
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Bulletin::Presence {
                        session_id: sid,
                        alias,
                        joined,
                    }) if sid == session_id => {
                        let mut map = map.lock().unwrap();
                        if joined {
                            map.insert(alias, Instant::now());
                        } else {
                            map.remove(&alias);
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(session = %session_id, skipped, "presence stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(session = %session_id, "presence roster closed");
        });
        Self {
            store,
            session_id,
            config,
            seen,
            task,
        }
    }

    /// Announce an alias as present or departing. Returns the number
    /// of rosters reached, this one included.
    pub fn announce(&self, alias: &str, joined: bool) -> usize {
        self.store.publish(
            &presence_channel(self.session_id),
            Bulletin::Presence {
                session_id: self.session_id,
                alias: alias.to_string(),
                joined,
            },
        )
    }

    /// Aliases heard from within the max age, sorted.
    pub fn participants(&self) -> Vec<String> {
        let now = Instant::now();
        let mut map = self.seen.lock().unwrap();
        map.retain(|_, seen| now.duration_since(*seen) <= self.config.max_age);
        let mut aliases: Vec<String> = map.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Stop following announcements.
    pub fn shutdown(self) {}
}

impl<S> Drop for PresenceRoster<S> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
