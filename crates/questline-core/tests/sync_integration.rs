//! End-to-end sync scenarios across the public API.
//!
//! Covers several tabs sharing one store file, recovery after the remote
//! comes back, and the HTTP gateway driven by the coordinator against a
//! mocked server.

use std::sync::Arc;
use std::time::Duration;

use questline_core::storage::RemoteConfig;
use questline_core::sync::{
    Collection, CollectionOutcome, ContentCollection, HttpGateway, KeepReason, MemoryGateway,
    OfflineGateway, SyncOptions,
};
use questline_core::{
    ContentItem, CrossTabBus, LocalStore, ProgressRecord, RetryPolicy, StorageKey, SyncCoordinator,
};

fn fast_options() -> SyncOptions {
    let mut options = SyncOptions::default();
    options.retry = RetryPolicy::new(2, Duration::from_millis(50), 2.0);
    options
}

// ============================================================================
// Multiple tabs
// ============================================================================

#[tokio::test]
async fn test_tabs_sharing_a_store_see_each_others_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("questline.db");
    let bus = CrossTabBus::new();

    let tab_a = SyncCoordinator::new(
        LocalStore::open(&path, "learner").unwrap(),
        Arc::new(OfflineGateway),
        bus.join(),
        SyncOptions::default(),
    );
    let tab_b = SyncCoordinator::new(
        LocalStore::open(&path, "learner").unwrap(),
        Arc::new(OfflineGateway),
        bus.join(),
        SyncOptions::default(),
    );
    let mut b_listener = tab_b.channel().listen();
    let mut a_listener = tab_a.channel().listen();

    let items = vec![ContentItem::new("n1", "Shared note")];
    tab_a.push_local(ContentCollection::Materials, &items);

    let signal = tokio::time::timeout(Duration::from_secs(1), b_listener.recv())
        .await
        .expect("signal delivered")
        .expect("bus open");
    assert_eq!(signal.origin.as_ref(), Some(tab_a.channel().tab_id()));
    assert_eq!(tab_b.content(ContentCollection::Materials), items);

    // The writer does not hear itself.
    assert!(a_listener.try_recv().is_none());
}

// ============================================================================
// Offline then online
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_progress_made_offline_reaches_remote_after_recovery() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.set_offline(true);
    let store = LocalStore::open_memory("learner").unwrap();
    let sync = SyncCoordinator::new(store.clone(), gateway.clone(), CrossTabBus::new().join(), fast_options());

    let record = ProgressRecord::new("learner-7", "Kim");
    sync.push_user(&record);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(gateway.profile("learner-7").is_none());
    assert_eq!(sync.status().pending_count, 1);

    gateway.set_offline(false);
    let report = sync.sync_all().await;
    assert!(gateway.profile("learner-7").is_some());
    assert_eq!(sync.status().pending_count, 0);
    // The saved profile comes back linked to its remote id.
    assert_eq!(report.outcome(Collection::Profile), Some(&CollectionOutcome::Updated));
    let local: ProgressRecord = store.get(StorageKey::Progress, ProgressRecord::anonymous());
    assert_eq!(local.remote_id.as_deref(), Some("learner-7"));

    let again = sync.sync_all().await;
    assert_eq!(again.outcome(Collection::Profile), Some(&CollectionOutcome::Unchanged));
}

#[tokio::test(start_paused = true)]
async fn test_partial_outage_only_affects_failing_collections() {
    let gateway = Arc::new(
        MemoryGateway::new()
            .with_collection(ContentCollection::Modules, vec![ContentItem::new("m1", "Intro")])
            .with_collection(ContentCollection::Events, vec![ContentItem::new("e1", "Meetup")]),
    );
    gateway.fail("events");
    let store = LocalStore::open_memory("learner").unwrap();
    store.set(StorageKey::Events, &vec![ContentItem::new("cached", "Cached event")]);
    let sync = SyncCoordinator::new(store, gateway, CrossTabBus::new().join(), fast_options());

    let report = sync.sync_all().await;
    assert_eq!(
        report.outcome(Collection::Content(ContentCollection::Modules)),
        Some(&CollectionOutcome::Updated)
    );
    assert!(matches!(
        report.outcome(Collection::Content(ContentCollection::Events)),
        Some(CollectionOutcome::KeptLocal(KeepReason::FetchFailed(_)))
    ));
    assert_eq!(sync.content(ContentCollection::Events)[0].id, "cached");
}

// ============================================================================
// HTTP gateway
// ============================================================================

#[tokio::test]
async fn test_http_round_against_mock_server() {
    let mut server = mockito::Server::new_async().await;
    let modules = server
        .mock("GET", "/collections/modules")
        .match_header("authorization", "Bearer token-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"m1","title":"Intro","lessons":["l1","l2","l3"]}]"#)
        .create_async()
        .await;
    let others = server
        .mock(
            "GET",
            mockito::Matcher::Regex(r"^/collections/(materials|streams|events|scenarios)$".into()),
        )
        .with_status(404)
        .expect(4)
        .create_async()
        .await;
    server
        .mock("GET", "/leaderboard")
        .with_status(200)
        .with_body(r#"[{"id":"a","name":"Ann","xp":300,"level":1},{"id":"b","name":"Bo","xp":1200,"level":2}]"#)
        .create_async()
        .await;
    server
        .mock("GET", "/notifications")
        .with_status(200)
        .with_body(r#"[{"id":"n1","title":"Welcome"}]"#)
        .create_async()
        .await;

    let gateway = HttpGateway::new(&RemoteConfig {
        base_url: Some(server.url()),
        api_key: Some("token-1".into()),
        ..RemoteConfig::default()
    })
    .unwrap();
    let store = LocalStore::open_memory("learner").unwrap();
    let mut options = SyncOptions::default();
    options.retry = RetryPolicy::no_retry();
    let sync = SyncCoordinator::new(store.clone(), Arc::new(gateway), CrossTabBus::new().join(), options);

    let report = sync.sync_all().await;
    modules.assert_async().await;
    others.assert_async().await;

    assert_eq!(
        report.outcome(Collection::Content(ContentCollection::Modules)),
        Some(&CollectionOutcome::Updated)
    );
    assert_eq!(
        report.outcome(Collection::Content(ContentCollection::Streams)),
        Some(&CollectionOutcome::KeptLocal(KeepReason::EmptyRemote))
    );
    assert_eq!(report.outcome(Collection::Leaderboard), Some(&CollectionOutcome::Updated));

    let board: Vec<questline_core::Profile> = store.get(StorageKey::AllUsers, Vec::new());
    assert_eq!(board.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);
    let notes: Vec<questline_core::Notification> = store.get(StorageKey::LocalNotifications, Vec::new());
    assert_eq!(notes.len(), 1);
    assert!(!notes[0].read);
}
