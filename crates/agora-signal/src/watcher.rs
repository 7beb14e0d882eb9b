//! The session activation watcher.
//!
//! A waiting client needs to learn the instant a moderator flips the
//! session to `active`, and no single delivery path is reliable
//! enough to carry that alone. Three producers run side by side:
//!
//! - the gate bulletin (push, self-delivery included)
//! - the session row's change feed
//! - an authoritative poll, non-privileged clients only
//!
//! All three converge on one `watch` channel flipped with
//! `send_if_modified`: the first arrival wins and duplicates are
//! no-ops, so no ordering between channels is assumed. The returned
//! handle owns every task; tearing it down aborts them all, which is
//! what keeps session switches from accumulating stale timers and
//! listeners.

use std::sync::Arc;
use std::time::Duration;

use agora_records::SessionId;
use agora_store::{gate_channel, Bulletin, RecordStore, RowEvent};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Tuning for the activation watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    /// Poll cadence of the fallback channel.
    pub poll_interval: Duration,
    /// Privileged clients trust their push channels and skip the
    /// poll fallback entirely.
    pub privileged: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            privileged: false,
        }
    }
}

impl SignalConfig {
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }
}

/// Owns the watcher tasks; dropping it tears all channels down.
pub struct SignalHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SignalHandle {
    /// Whether the activation has been observed.
    pub fn is_active(&self) -> bool {
        *self.rx.borrow()
    }

    /// A receiver over the activation flag. It flips to `true` at
    /// most once.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Wait until the activation is observed.
    pub async fn activated(&mut self) {
        // The sender lives in self, so the channel cannot close.
        let _ = self.rx.wait_for(|active| *active).await;
    }

    /// Tear down every producer task.
    pub fn shutdown(self) {}
}

impl Drop for SignalHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Start watching `session_id` for activation.
pub fn watch_activation<S>(store: Arc<S>, session_id: SessionId, config: SignalConfig) -> SignalHandle
where
    S: RecordStore + 'static,
{
    let (tx, rx) = watch::channel(false);
    let tx = Arc::new(tx);
    let mut tasks = Vec::with_capacity(3);

    // Push channel: the gate bulletin.
    {
        let mut gate = store.subscribe(&gate_channel(session_id));
        let tx = Arc::clone(&tx);
        let mut done = rx.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = done.wait_for(|active| *active) => break,
                    msg = gate.recv() => match msg {
                        Ok(Bulletin::SessionStarted { session_id: sid }) if sid == session_id => {
                            mark_active(&tx, session_id, "bulletin");
                            break;
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(session = %session_id, skipped, "gate bulletin stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }));
    }

    // Change-feed channel: updates on the session row.
    {
        let mut feed = store.watch_session(session_id);
        let tx = Arc::clone(&tx);
        let mut done = rx.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = done.wait_for(|active| *active) => break,
                    event = feed.recv() => match event {
                        Ok(RowEvent::Updated { after, .. }) if after.is_active() => {
                            mark_active(&tx, session_id, "change-feed");
                            break;
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(session = %session_id, skipped, "session feed lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }));
    }

    // Poll fallback: authoritative point reads until active. Read
    // errors are transient here and retried on the next tick.
    if !config.privileged {
        let store = Arc::clone(&store);
        let tx = Arc::clone(&tx);
        let mut done = rx.clone();
        let interval = config.poll_interval;
        tasks.push(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                tokio::select! {
                    _ = async { let _ = done.wait_for(|active| *active).await; } => break,
                    _ = ticker.tick() => match store.session(session_id).await {
                        Ok(Some(session)) if session.is_active() => {
                            mark_active(&tx, session_id, "poll");
                            break;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            debug!(session = %session_id, %err, "activation poll failed, retrying");
                        }
                    },
                }
            }
        }));
    }

    debug!(session = %session_id, privileged = config.privileged, "activation watcher started");
    SignalHandle { tx, rx, tasks }
}

fn mark_active(tx: &watch::Sender<bool>, session: SessionId, channel: &str) {
    let flipped = tx.send_if_modified(|active| {
        if *active {
            false
        } else {
            *active = true;
            true
        }
    });
    if flipped {
        info!(session = %session, channel, "session activation observed");
    } else {
        trace!(session = %session, channel, "duplicate activation signal ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_records::SessionStatus;
    use agora_store::MemoryStore;
    use tokio::time::{advance, timeout};

    async fn store_with_session() -> (Arc<MemoryStore>, SessionId) {
        let store = Arc::new(MemoryStore::new());
        let session = store.insert_session("t", "AAAA22", "o").await.unwrap();
        (store, session.id)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn bulletin_alone_activates() {
        let (store, id) = store_with_session().await;
        let mut handle = watch_activation(Arc::clone(&store), id, SignalConfig::default());

        store.publish(
            &gate_channel(id),
            Bulletin::SessionStarted { session_id: id },
        );
        timeout(Duration::from_secs(1), handle.activated())
            .await
            .expect("bulletin should activate");
        assert!(handle.is_active());
    }

    #[tokio::test]
    async fn change_feed_alone_activates() {
        let (store, id) = store_with_session().await;
        let mut handle = watch_activation(Arc::clone(&store), id, SignalConfig::default());

        store
            .set_session_status(id, SessionStatus::Active)
            .await
            .unwrap();
        timeout(Duration::from_secs(1), handle.activated())
            .await
            .expect("change feed should activate");
    }

    #[tokio::test(start_paused = true)]
    async fn poll_fallback_catches_a_silent_activation() {
        let (store, id) = store_with_session().await;
        let mut handle = watch_activation(Arc::clone(&store), id, SignalConfig::default());

        // Status changes but neither push channel says a word.
        store.quiet_set_status(id, SessionStatus::Active);
        advance(Duration::from_secs(3)).await;
        timeout(Duration::from_secs(1), handle.activated())
            .await
            .expect("poll should activate");
    }

    #[tokio::test(start_paused = true)]
    async fn poll_stops_reading_after_activation() {
        let (store, id) = store_with_session().await;
        let handle = watch_activation(Arc::clone(&store), id, SignalConfig::default());

        advance(Duration::from_secs(3)).await;
        settle().await;
        advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(store.session_read_count(), 2);

        store.quiet_set_status(id, SessionStatus::Active);
        advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(store.session_read_count(), 3);
        assert!(handle.is_active());

        // Cancelled on success: more time, no more reads.
        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(store.session_read_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn privileged_clients_never_poll() {
        let (store, id) = store_with_session().await;
        let handle = watch_activation(
            Arc::clone(&store),
            id,
            SignalConfig::default().with_privileged(true),
        );

        store.quiet_set_status(id, SessionStatus::Active);
        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(store.session_read_count(), 0);
        assert!(!handle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_retries_silently_through_read_errors() {
        let (store, id) = store_with_session().await;
        let mut handle = watch_activation(Arc::clone(&store), id, SignalConfig::default());

        store.interrupt_reads(true);
        advance(Duration::from_secs(3)).await;
        settle().await;
        assert!(!handle.is_active());

        store.interrupt_reads(false);
        store.quiet_set_status(id, SessionStatus::Active);
        advance(Duration::from_secs(3)).await;
        timeout(Duration::from_secs(1), handle.activated())
            .await
            .expect("poll should recover and activate");
    }

    #[tokio::test]
    async fn duplicate_signals_flip_the_flag_once() {
        let (store, id) = store_with_session().await;
        let mut handle = watch_activation(Arc::clone(&store), id, SignalConfig::default());
        let mut flag = handle.subscribe();

        // Both push channels fire, in quick succession.
        store.publish(
            &gate_channel(id),
            Bulletin::SessionStarted { session_id: id },
        );
        store
            .set_session_status(id, SessionStatus::Active)
            .await
            .unwrap();

        timeout(Duration::from_secs(1), handle.activated())
            .await
            .expect("should activate");
        settle().await;

        // Exactly one observable change on the flag.
        assert!(flag.has_changed().unwrap());
        flag.changed().await.unwrap();
        assert!(!flag.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_the_poll_loop() {
        let (store, id) = store_with_session().await;
        let handle = watch_activation(Arc::clone(&store), id, SignalConfig::default());

        advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(store.session_read_count(), 1);

        handle.shutdown();
        advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(store.session_read_count(), 1);
    }
}
