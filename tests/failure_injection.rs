//! Failure injection tests for the sync engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config_sync::records::ConfigRecord;
use config_sync::store::{CoordinationStore, NodeValue, StoreResult, WatchSink};
use config_sync::subscriber::Subscribers;
use config_sync::sync::WatchState;
use config_sync::{MemoryStore, StoreError, SyncConfig, SyncEngine, SyncError};

mod common;
use common::{seeded_store, wait_for, FailingAuth, Recorder, WAIT};

/// Delegates to a memory store, running a mutation right before the first
/// read of `trigger_path`.
struct MutatingStore {
    inner: Arc<MemoryStore>,
    trigger_path: String,
    fired: AtomicBool,
    mutation: Box<dyn Fn(&MemoryStore) + Send + Sync>,
}

#[async_trait]
impl CoordinationStore for MutatingStore {
    async fn get(&self, path: &str) -> StoreResult<Option<NodeValue>> {
        if path == self.trigger_path && !self.fired.swap(true, Ordering::SeqCst) {
            (self.mutation)(&self.inner);
        }
        self.inner.get(path).await
    }

    async fn get_children_keys(&self, path: &str, delimiter: &str) -> StoreResult<Vec<String>> {
        self.inner.get_children_keys(path, delimiter).await
    }

    fn watch_child_change(&self, parent: &str, sink: WatchSink) -> StoreResult<()> {
        self.inner.watch_child_change(parent, sink)
    }

    fn watch_data_change(&self, path: &str, sink: WatchSink) -> StoreResult<()> {
        self.inner.watch_data_change(path, sink)
    }

    fn watch_close(&self, path: &str) {
        self.inner.watch_close(path)
    }

    fn close(&self) {
        self.inner.close()
    }
}

#[tokio::test]
async fn test_startup_fails_when_store_is_unreachable() {
    let store = seeded_store(&[]);
    store.close();

    let result = SyncEngine::start(store, Recorder::new().subscribe_all(), &SyncConfig::default()).await;
    assert!(matches!(result, Err(SyncError::Startup(StoreError::Closed))));
}

#[tokio::test]
async fn test_startup_fails_when_root_listing_fails() {
    let store = seeded_store(&[("/shenyu/auth/app1", r#"{"appKey":"app1"}"#)]);
    store.fail_listing("/shenyu");

    let result = SyncEngine::start(store, Subscribers::new(), &SyncConfig::default()).await;
    assert!(matches!(result, Err(SyncError::Startup(StoreError::Unavailable(_)))));
}

#[tokio::test]
async fn test_listing_failure_is_treated_as_empty() {
    let store = seeded_store(&[
        ("/shenyu/auth/app1", r#"{"appKey":"app1"}"#),
        ("/shenyu/metaData/%2Forder", r#"{"path":"/order"}"#),
    ]);
    store.fail_listing("/shenyu/auth");
    let recorder = Recorder::new();

    let engine = SyncEngine::start(store.clone(), recorder.subscribe_all(), &SyncConfig::default())
        .await
        .unwrap();
    assert_eq!(recorder.count("on_meta"), 1);
    assert_eq!(recorder.count("on_auth"), 0);

    // the namespace watch was still registered, so later nodes arrive
    store.restore_listing("/shenyu/auth");
    store.put("/shenyu/auth/app2", r#"{"appKey":"app2"}"#).unwrap();
    assert!(wait_for(WAIT, || recorder.count("on_auth") == 1).await);
    match recorder.last("on_auth") {
        Some(ConfigRecord::AppAuth(auth)) => assert_eq!(auth.app_key, "app2"),
        other => panic!("unexpected delivery {:?}", other),
    }
    engine.close().await;
}

#[tokio::test]
async fn test_read_failure_skips_only_that_leaf() {
    let store = seeded_store(&[
        ("/shenyu/auth/app1", r#"{"appKey":"app1","appSecret":"v1"}"#),
        ("/shenyu/auth/app2", r#"{"appKey":"app2"}"#),
        ("/shenyu/metaData/%2Forder", r#"{"path":"/order"}"#),
    ]);
    store.fail_get("/shenyu/auth/app1");
    let recorder = Recorder::new();

    let engine = SyncEngine::start(store.clone(), recorder.subscribe_all(), &SyncConfig::default())
        .await
        .unwrap();
    assert_eq!(recorder.count("on_auth"), 1);
    assert_eq!(recorder.count("on_meta"), 1);
    assert!(!engine.view().contains("/shenyu/auth/app1"));
    assert!(engine.view().contains("/shenyu/auth/app2"));

    // the data watch went in before the read, so the next write arrives
    assert_eq!(engine.watch_state("/shenyu/auth/app1"), WatchState::Watching);
    store.restore_get("/shenyu/auth/app1");
    store
        .put("/shenyu/auth/app1", r#"{"appKey":"app1","appSecret":"v2"}"#)
        .unwrap();
    assert!(wait_for(WAIT, || recorder.count("on_auth") == 2).await);
    match recorder.last("on_auth") {
        Some(ConfigRecord::AppAuth(auth)) => {
            assert_eq!(auth.app_key, "app1");
            assert_eq!(auth.app_secret.as_deref(), Some("v2"));
        }
        other => panic!("unexpected delivery {:?}", other),
    }
    engine.close().await;
}

#[tokio::test]
async fn test_failing_subscriber_does_not_block_siblings() {
    let store = seeded_store(&[("/shenyu/auth/app1", r#"{"appKey":"app1"}"#)]);
    let first = Recorder::new();
    let failing = FailingAuth::erroring();
    let third = Recorder::new();
    let subscribers = Subscribers::new()
        .with_auth(first.clone())
        .with_auth(failing.clone())
        .with_auth(third.clone());

    let engine = SyncEngine::start(store.clone(), subscribers, &SyncConfig::default())
        .await
        .unwrap();

    assert_eq!(first.count("on_auth"), 1);
    assert_eq!(failing.attempts(), 1);
    assert_eq!(third.count("on_auth"), 1);
    assert!(engine.view().contains("/shenyu/auth/app1"));
    engine.close().await;
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_stop_the_engine() {
    let store = seeded_store(&[]);
    let panicking = FailingAuth::panicking();
    let recorder = Recorder::new();
    let subscribers = Subscribers::new()
        .with_auth(panicking.clone())
        .with_auth(recorder.clone());

    let engine = SyncEngine::start(store.clone(), subscribers, &SyncConfig::default())
        .await
        .unwrap();

    store.put("/shenyu/auth/app1", r#"{"appKey":"app1"}"#).unwrap();
    assert!(wait_for(WAIT, || recorder.count("on_auth") == 1).await);

    store.put("/shenyu/auth/app2", r#"{"appKey":"app2"}"#).unwrap();
    assert!(wait_for(WAIT, || recorder.count("on_auth") == 2).await);
    assert_eq!(panicking.attempts(), 2);
    engine.close().await;
}

#[tokio::test]
async fn test_unparseable_delete_keeps_entry() {
    let rule_path = "/shenyu/plugin/divide/rule/NOSEPARATOR";
    let store = seeded_store(&[(
        rule_path,
        r#"{"id":"r1","pluginName":"divide","selectorId":"s1"}"#,
    )]);
    let recorder = Recorder::new();
    let engine = SyncEngine::start(store.clone(), recorder.subscribe_all(), &SyncConfig::default())
        .await
        .unwrap();
    assert_eq!(recorder.count("on_rule"), 1);

    store.delete(rule_path).unwrap();
    store.put("/shenyu/auth/marker", r#"{"appKey":"marker"}"#).unwrap();
    assert!(wait_for(WAIT, || recorder.count("on_auth") == 1).await);

    assert_eq!(recorder.count("un_rule"), 0);
    assert!(engine.view().contains(rule_path));
    assert_eq!(engine.watch_state(rule_path), WatchState::Watching);
    engine.close().await;
}

#[tokio::test]
async fn test_create_during_snapshot_is_not_lost() {
    let inner = seeded_store(&[("/shenyu/auth/app1", r#"{"appKey":"app1"}"#)]);
    let store = Arc::new(MutatingStore {
        inner: inner.clone(),
        trigger_path: "/shenyu/auth/app1".into(),
        fired: AtomicBool::new(false),
        mutation: Box::new(|store: &MemoryStore| {
            store.put("/shenyu/auth/late", r#"{"appKey":"late"}"#).unwrap();
        }),
    });
    let recorder = Recorder::new();

    let engine = SyncEngine::start(store, recorder.subscribe_all(), &SyncConfig::default())
        .await
        .unwrap();
    assert_eq!(recorder.count("on_auth"), 1);

    // created after the namespace was listed; delivered from the buffered event
    assert!(wait_for(WAIT, || recorder.count("on_auth") == 2).await);
    assert!(engine.view().contains("/shenyu/auth/late"));
    engine.close().await;
}

#[tokio::test]
async fn test_update_during_snapshot_is_delivered_once() {
    let inner = seeded_store(&[("/shenyu/auth/app1", r#"{"appKey":"app1","appSecret":"old"}"#)]);
    let store = Arc::new(MutatingStore {
        inner: inner.clone(),
        trigger_path: "/shenyu/auth/app1".into(),
        fired: AtomicBool::new(false),
        mutation: Box::new(|store: &MemoryStore| {
            store
                .put("/shenyu/auth/app1", r#"{"appKey":"app1","appSecret":"new"}"#)
                .unwrap();
        }),
    });
    let recorder = Recorder::new();

    let engine = SyncEngine::start(store, recorder.subscribe_all(), &SyncConfig::default())
        .await
        .unwrap();

    // the read already saw the new value; the buffered events are stale
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.count("on_auth"), 1);
    match recorder.last("on_auth") {
        Some(ConfigRecord::AppAuth(auth)) => assert_eq!(auth.app_secret.as_deref(), Some("new")),
        other => panic!("unexpected delivery {:?}", other),
    }
    engine.close().await;
}

#[tokio::test]
async fn test_delete_during_snapshot_is_applied() {
    let inner = seeded_store(&[
        ("/shenyu/auth/app1", r#"{"appKey":"app1"}"#),
        ("/shenyu/auth/app2", r#"{"appKey":"app2"}"#),
    ]);
    let store = Arc::new(MutatingStore {
        inner: inner.clone(),
        trigger_path: "/shenyu/auth/app2".into(),
        fired: AtomicBool::new(false),
        mutation: Box::new(|store: &MemoryStore| {
            store.delete("/shenyu/auth/app1").unwrap();
        }),
    });
    let recorder = Recorder::new();

    let engine = SyncEngine::start(store, recorder.subscribe_all(), &SyncConfig::default())
        .await
        .unwrap();
    assert_eq!(recorder.count("on_auth"), 2);

    assert!(wait_for(WAIT, || recorder.count("un_auth") == 1).await);
    assert!(!engine.view().contains("/shenyu/auth/app1"));
    assert!(engine.view().contains("/shenyu/auth/app2"));
    engine.close().await;
}

#[tokio::test]
async fn test_delete_overtaken_during_snapshot_is_ignored() {
    let inner = seeded_store(&[("/shenyu/auth/app1", r#"{"appKey":"app1","appSecret":"old"}"#)]);
    let store = Arc::new(MutatingStore {
        inner: inner.clone(),
        trigger_path: "/shenyu/auth/app1".into(),
        fired: AtomicBool::new(false),
        mutation: Box::new(|store: &MemoryStore| {
            store.delete("/shenyu/auth/app1").unwrap();
            store
                .put("/shenyu/auth/app1", r#"{"appKey":"app1","appSecret":"new"}"#)
                .unwrap();
        }),
    });
    let recorder = Recorder::new();

    let engine = SyncEngine::start(store, recorder.subscribe_all(), &SyncConfig::default())
        .await
        .unwrap();

    // the read saw the re-created node; the buffered delete is older
    tokio::time::sleep(Duration::from_millis(50)).await;
    let methods: Vec<&str> = recorder.calls().iter().map(|c| c.method).collect();
    assert_eq!(methods, vec!["on_auth"]);
    match recorder.last("on_auth") {
        Some(ConfigRecord::AppAuth(auth)) => assert_eq!(auth.app_secret.as_deref(), Some("new")),
        other => panic!("unexpected delivery {:?}", other),
    }
    assert_eq!(engine.watch_state("/shenyu/auth/app1"), WatchState::Watching);

    // the leaf is still watched, so a real delete goes through
    inner.delete("/shenyu/auth/app1").unwrap();
    assert!(wait_for(WAIT, || recorder.count("un_auth") == 1).await);
    assert!(engine.view().is_empty());
    engine.close().await;
}
