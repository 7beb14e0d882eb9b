//! End-to-end scenarios over the full board core: store, feed, graph,
//! signal, and reactions working together.

use std::sync::Arc;
use std::time::Duration;

use agora_graph::{layout, layout_focused, LayoutConfig, MessageTree};
use agora_integration_tests::init_tracing;
use agora_reactions::{ReactionBoard, ToggleOutcome};
use agora_records::{Position, ReactionKind, SessionStatus, INHIBITION_MARKER};
use agora_signal::{watch_activation, SignalConfig};
use agora_store::{MemoryStore, RecordStore};
use agora_sync::{DeleteOutcome, MessageFeed, SessionDesk};

async fn board_session() -> (Arc<MemoryStore>, MessageFeed<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = store
        .insert_session("deep dive", "AAAA22", "owner")
        .await
        .unwrap();
    let feed = MessageFeed::new(Arc::clone(&store), session.id);
    (store, feed)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

async fn settle_paused() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn a_parentless_reply_is_wired_under_the_seed() {
    init_tracing();
    let (_store, feed) = board_session().await;
    let sub = feed.subscribe();

    let seed = feed
        .send(None, "MOD", "#333", "opening prompt", false)
        .await
        .unwrap();
    let stray = feed
        .send(None, "P1", "#7c3aed", "floating thought", false)
        .await
        .unwrap();
    settle().await;

    let tree = MessageTree::build(&feed.messages().await);
    assert_eq!(tree.len(), 2);
    let root = tree.root().unwrap();
    assert_eq!(root.message.id, seed.id);
    // Exactly one edge: seed to the stray reply.
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].message.id, stray.id);
    assert!(root.children[0].children.is_empty());

    sub.shutdown();
}

#[tokio::test]
async fn isolating_a_node_shows_only_its_subtree() {
    init_tracing();
    let (_store, feed) = board_session().await;
    let m0 = feed.send(None, "MOD", "#333", "m0", false).await.unwrap();
    let m1 = feed
        .send(Some(m0.id), "P1", "#444", "m1", false)
        .await
        .unwrap();
    let m2 = feed
        .send(Some(m1.id), "P2", "#555", "m2", false)
        .await
        .unwrap();
    feed.load().await.unwrap();

    let tree = MessageTree::build(&feed.messages().await);
    let config = LayoutConfig::default();
    let placements = layout_focused(&tree, m1.id, &config);

    let ids: Vec<_> = placements.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![m1.id, m2.id]);

    // The focus takes the root column; its child sits one rank right.
    assert_eq!(placements[0].position.x, -config.node_width / 2.0);
    assert_eq!(
        placements[1].position.x,
        config.node_width + config.rank_sep - config.node_width / 2.0
    );
}

#[tokio::test]
async fn smart_delete_is_physical_for_leaves_and_logical_for_parents() {
    init_tracing();
    let (store, feed) = board_session().await;
    let session = feed.session_id();

    // Childless seed: physically removed.
    let lonely = feed.send(None, "MOD", "#333", "m0", false).await.unwrap();
    feed.load().await.unwrap();
    assert_eq!(
        feed.smart_delete(lonely.id).await.unwrap(),
        DeleteOutcome::Removed
    );
    assert!(store.messages(session).await.unwrap().is_empty());

    // Seed with a child: inhibited, still listed, child intact.
    let seed = feed.send(None, "MOD", "#333", "m0", false).await.unwrap();
    let child = feed
        .send(Some(seed.id), "P1", "#444", "m1", false)
        .await
        .unwrap();
    feed.load().await.unwrap();
    assert_eq!(
        feed.smart_delete(seed.id).await.unwrap(),
        DeleteOutcome::Inhibited
    );

    let rows = store.messages(session).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, seed.id);
    assert_eq!(rows[0].content, INHIBITION_MARKER);
    assert!(rows[0].is_inhibited());
    assert_eq!(rows[1].id, child.id);
}

#[tokio::test]
async fn layout_is_reproducible_without_manual_positions() {
    init_tracing();
    let (_store, feed) = board_session().await;
    let m0 = feed.send(None, "MOD", "#333", "m0", false).await.unwrap();
    let m1 = feed
        .send(Some(m0.id), "P1", "#444", "m1", false)
        .await
        .unwrap();
    feed.send(Some(m0.id), "P2", "#555", "m2", false)
        .await
        .unwrap();
    feed.send(Some(m1.id), "P3", "#666", "m3", false)
        .await
        .unwrap();
    feed.load().await.unwrap();

    let rows = feed.messages().await;
    let config = LayoutConfig::default();
    let first = layout(&MessageTree::build(&rows), &config);
    let second = layout(&MessageTree::build(&rows), &config);
    assert_eq!(first, second);
    assert!(first.iter().all(|p| !p.pinned));
}

#[tokio::test(start_paused = true)]
async fn the_poll_fallback_flips_exactly_once_then_stops() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let session = store
        .insert_session("deep dive", "AAAA22", "owner")
        .await
        .unwrap();
    let handle = watch_activation(Arc::clone(&store), session.id, SignalConfig::default());
    let mut flag = handle.subscribe();

    // Two polls observe `waiting`.
    tokio::time::advance(Duration::from_secs(3)).await;
    settle_paused().await;
    assert_eq!(store.session_read_count(), 1);
    assert!(!handle.is_active());

    tokio::time::advance(Duration::from_secs(3)).await;
    settle_paused().await;
    assert_eq!(store.session_read_count(), 2);
    assert!(!handle.is_active());

    // The status flips without either push channel noticing.
    store.quiet_set_status(session.id, SessionStatus::Active);
    tokio::time::advance(Duration::from_secs(3)).await;
    settle_paused().await;
    assert_eq!(store.session_read_count(), 3);
    assert!(handle.is_active());

    // Poll cancelled: no further reads, ever.
    tokio::time::advance(Duration::from_secs(60)).await;
    settle_paused().await;
    assert_eq!(store.session_read_count(), 3);

    // Exactly one observable flip on the flag.
    assert!(flag.has_changed().unwrap());
    flag.changed().await.unwrap();
    assert!(!flag.has_changed().unwrap());
}

#[tokio::test]
async fn rapid_double_toggle_leaves_one_row_and_a_true_tally() {
    init_tracing();
    let (store, feed) = board_session().await;
    let seed = feed.send(None, "MOD", "#333", "m0", false).await.unwrap();

    let board = ReactionBoard::new(Arc::clone(&store), seed.id, "P1");
    let (first, second) = tokio::join!(
        board.toggle(ReactionKind::Question),
        board.toggle(ReactionKind::Question)
    );
    assert_eq!(first.unwrap(), ToggleOutcome::Added);
    assert_eq!(second.unwrap(), ToggleOutcome::Pending);

    let rows = store.reactions_for(seed.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    board.refresh().await.unwrap();
    assert_eq!(board.tally(ReactionKind::Question), 1);
}

#[tokio::test]
async fn moderator_activation_reaches_a_waiting_participant() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let desk = SessionDesk::new(Arc::clone(&store));
    let session = desk.create("deep dive", "owner").await.unwrap();

    // Participant is in the waiting room before the moderator acts.
    let mut participant = watch_activation(Arc::clone(&store), session.id, SignalConfig::default());

    desk.activate(session.id).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), participant.activated())
        .await
        .expect("activation should reach the participant");
}

#[tokio::test]
async fn manual_positions_survive_a_content_edit() {
    init_tracing();
    let (_store, feed) = board_session().await;
    let sub = feed.subscribe();
    let seed = feed.send(None, "MOD", "#333", "m0", false).await.unwrap();
    let reply = feed
        .send(Some(seed.id), "P1", "#444", "first draft", false)
        .await
        .unwrap();
    settle().await;

    feed.reposition(reply.id, Position { x: 480.3, y: 222.9 })
        .await
        .unwrap();
    feed.update(reply.id, "second draft").await.unwrap();
    settle().await;

    let tree = MessageTree::build(&feed.messages().await);
    let placements = layout(&tree, &LayoutConfig::default());
    let moved = placements.iter().find(|p| p.id == reply.id).unwrap();
    assert!(moved.pinned);
    // Drag coordinates are persisted as integers.
    assert_eq!(moved.position, Position { x: 480.0, y: 223.0 });

    let rows = feed.messages().await;
    let row = rows.iter().find(|m| m.id == reply.id).unwrap();
    assert_eq!(row.content, "second draft");

    sub.shutdown();
}
