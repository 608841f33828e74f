//! End-to-end dispatcher behaviour against the in-memory service.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use beacon_bridge::beacon_config::{BridgeOptions, ConfigError, ConfigLookup};
use beacon_bridge::beacon_types::Payload;
use beacon_bridge::memory::{MemoryPushService, RemoteOp};
use beacon_bridge::{BridgeDispatcher, BridgeError, CompletionCallback, Dispatch, TaskRunner};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::common::{bridge, call, counted, credentials};

/// Lookup that counts how often it is consulted.
struct CountingLookup {
    values: HashMap<String, String>,
    reads: AtomicUsize,
}

impl ConfigLookup for CountingLookup {
    fn lookup(&self, key: &str) -> Result<String, ConfigError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.values.lookup(key)
    }
}

fn bridge_with_lookup(
    service: &Arc<MemoryPushService>,
    values: HashMap<String, String>,
) -> (BridgeDispatcher, Arc<CountingLookup>) {
    let lookup = Arc::new(CountingLookup {
        values,
        reads: AtomicUsize::new(0),
    });
    let bridge = BridgeDispatcher::new(
        TaskRunner::current().unwrap(),
        service.clone(),
        lookup.clone(),
        BridgeOptions::default(),
    );
    (bridge, lookup)
}

fn channels(payload: &Payload) -> BTreeSet<String> {
    let text = payload.as_text().expect("subscriptions are text");
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .expect("bracketed list");
    inner
        .split(", ")
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn first_run_walkthrough() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);

    let id = call(&bridge, "initialize", &[]).await.unwrap();
    assert_eq!(call(&bridge, "getInstallationId", &[]).await.unwrap(), id);

    let object_id = call(&bridge, "getInstallationObjectId", &[]).await.unwrap();
    assert!(!object_id.as_text().unwrap().is_empty());

    call(&bridge, "subscribe", &[json!("news")]).await.unwrap();
    assert_eq!(
        call(&bridge, "getSubscriptions", &[]).await.unwrap(),
        Payload::text("[news]")
    );

    call(&bridge, "unsubscribe", &[json!("news")]).await.unwrap();
    assert_eq!(
        call(&bridge, "getSubscriptions", &[]).await.unwrap(),
        Payload::text("[]")
    );

    let remote = service.remote_record().unwrap();
    assert_eq!(Payload::text(remote.installation_id().as_str()), id);
    assert!(remote.channels().is_empty());
}

#[tokio::test]
async fn every_action_completes_exactly_once() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);

    let requests: [(&str, Vec<Value>); 7] = [
        ("initialize", vec![]),
        ("getInstallationId", vec![]),
        ("getInstallationObjectId", vec![]),
        ("getSubscriptions", vec![]),
        ("subscribe", vec![json!("alerts")]),
        ("unsubscribe", vec![json!("alerts")]),
        ("subscribe", vec![]),
    ];

    for (action, args) in requests {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback = CompletionCallback::new(move |reply| {
            let _ = tx.send(reply);
        });
        assert!(bridge.execute(action, &args, callback).is_handled());

        assert!(rx.recv().await.is_some(), "{action} never completed");
        // The sink is consumed on first use, which closes the channel.
        assert!(rx.recv().await.is_none(), "{action} completed twice");
    }
}

#[tokio::test]
async fn initialize_twice_keeps_identity() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);

    let first = call(&bridge, "initialize", &[]).await.unwrap();
    let object_id = service.remote_record().unwrap().object_id().cloned();
    let second = call(&bridge, "initialize", &[]).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(service.calls().initialize, 1);
    assert_eq!(service.calls().save, 2);
    assert_eq!(service.remote_record().unwrap().object_id().cloned(), object_id);
}

#[tokio::test]
async fn repeated_subscribe_and_ghost_unsubscribe_succeed() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);
    call(&bridge, "initialize", &[]).await.unwrap();

    call(&bridge, "subscribe", &[json!("news")]).await.unwrap();
    call(&bridge, "subscribe", &[json!("news")]).await.unwrap();
    assert_eq!(
        call(&bridge, "getSubscriptions", &[]).await.unwrap(),
        Payload::text("[news]")
    );

    call(&bridge, "unsubscribe", &[json!("ghost")]).await.unwrap();
    assert_eq!(
        call(&bridge, "getSubscriptions", &[]).await.unwrap(),
        Payload::text("[news]")
    );
}

#[tokio::test]
async fn subscriptions_match_as_a_set() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);
    call(&bridge, "initialize", &[]).await.unwrap();

    call(&bridge, "subscribe", &[json!("b")]).await.unwrap();
    call(&bridge, "subscribe", &[json!("a")]).await.unwrap();

    let listed = call(&bridge, "getSubscriptions", &[]).await.unwrap();
    let expected: BTreeSet<String> = ["a", "b"].into_iter().map(str::to_string).collect();
    assert_eq!(channels(&listed), expected);
}

#[tokio::test]
async fn malformed_arguments_never_reach_the_service() {
    let service = Arc::new(MemoryPushService::new().preinitialized());
    let bridge = bridge(&service);

    for args in [vec![], vec![json!(7)], vec![json!("a"), json!("b")]] {
        let (callback, mut rx) = CompletionCallback::channel();
        assert!(bridge.execute("subscribe", &args, callback).is_handled());
        let reply = rx.try_recv().expect("decode errors are reported synchronously");
        assert!(matches!(reply, Err(BridgeError::Decode(_))));
    }

    assert_eq!(service.calls().subscribe, 0);
    assert_eq!(service.calls().current_installation, 0);
}

#[tokio::test]
async fn missing_credentials_fail_initialize() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = BridgeDispatcher::new(
        TaskRunner::current().unwrap(),
        service.clone(),
        Arc::new(HashMap::<String, String>::new()),
        BridgeOptions::default(),
    );

    let err = call(&bridge, "initialize", &[]).await.unwrap_err();
    assert!(err.message().contains("parse_app_id"), "{}", err.message());
    assert_eq!(service.calls().initialize, 0);
}

#[tokio::test]
async fn provider_failure_leaves_no_installation() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);
    service.fail_next(RemoteOp::Initialize, "invalid client key");

    let err = call(&bridge, "initialize", &[]).await.unwrap_err();
    assert_eq!(err.message(), "invalid client key");

    let err = call(&bridge, "getInstallationId", &[]).await.unwrap_err();
    assert!(matches!(err, BridgeError::NoInstallation(_)));
}

#[tokio::test]
async fn remote_subscribe_error_is_reported_in_strict_mode() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);
    call(&bridge, "initialize", &[]).await.unwrap();

    service.fail_next(RemoteOp::Subscribe, "quota exceeded");
    let err = call(&bridge, "subscribe", &[json!("news")]).await.unwrap_err();
    assert_eq!(err.message(), "quota exceeded");
    assert_eq!(
        call(&bridge, "getSubscriptions", &[]).await.unwrap(),
        Payload::text("[]")
    );
}

#[tokio::test]
async fn execute_returns_before_remote_work() {
    let (service, gate) = MemoryPushService::new().gated();
    let service = Arc::new(service);
    let bridge = bridge(&service);

    let (callback, mut rx) = CompletionCallback::channel();
    assert!(bridge.execute("initialize", &[], callback).is_handled());
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err(), "reply arrived before the save ran");

    gate.open();
    let reply = rx.await.unwrap().unwrap();
    assert!(reply.as_text().is_some());
}

#[tokio::test]
async fn unknown_action_hands_back_an_unfired_callback() {
    let service = Arc::new(MemoryPushService::new());
    let bridge = bridge(&service);
    let (callback, fired) = counted();

    let Dispatch::NotHandled(callback) = bridge.execute("setBadge", &[json!(3)], callback) else {
        panic!("setBadge should not be handled");
    };
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    drop(callback);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_initialize_does_not_read_config() {
    let service = Arc::new(MemoryPushService::new());
    let (bridge, lookup) = bridge_with_lookup(&service, credentials());

    let first = call(&bridge, "initialize", &[]).await.unwrap();
    let reads = lookup.reads.load(Ordering::SeqCst);
    assert_eq!(reads, 2);

    let second = call(&bridge, "initialize", &[]).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(lookup.reads.load(Ordering::SeqCst), reads);
}

#[tokio::test]
async fn initialize_twice_without_credentials_reports_one_error_per_call() {
    let service = Arc::new(MemoryPushService::new());
    let (bridge, lookup) = bridge_with_lookup(&service, HashMap::new());

    for _ in 0..2 {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback = CompletionCallback::new(move |reply| {
            let _ = tx.send(reply);
        });
        assert!(bridge.execute("initialize", &[], callback).is_handled());

        let err = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(err.message(), "missing configuration value 'parse_app_id'");
        assert!(rx.recv().await.is_none());
    }

    // The first missing key stops the lookup each time.
    assert_eq!(lookup.reads.load(Ordering::SeqCst), 2);
    assert_eq!(service.calls().initialize, 0);
    assert_eq!(service.calls().save, 0);
}

#[tokio::test]
async fn local_reads_answer_while_a_write_is_pending() {
    let (service, gate) = MemoryPushService::new().preinitialized().gated();
    let service = Arc::new(service);
    let bridge = bridge(&service);
    let id = call(&bridge, "getInstallationId", &[]).await.unwrap();

    let (callback, mut pending) = CompletionCallback::channel();
    assert!(bridge.execute("subscribe", &[json!("news")], callback).is_handled());
    tokio::task::yield_now().await;
    assert!(pending.try_recv().is_err(), "subscribe went past the gate");

    let limit = Duration::from_millis(500);
    let read = tokio::time::timeout(limit, call(&bridge, "getInstallationId", &[]))
        .await
        .expect("getInstallationId waited on the pending subscribe");
    assert_eq!(read.unwrap(), id);

    let read = tokio::time::timeout(limit, call(&bridge, "getInstallationObjectId", &[]))
        .await
        .expect("getInstallationObjectId waited on the pending subscribe");
    assert_eq!(read.unwrap(), Payload::Absent);

    let read = tokio::time::timeout(limit, call(&bridge, "getSubscriptions", &[]))
        .await
        .expect("getSubscriptions waited on the pending subscribe");
    assert_eq!(read.unwrap(), Payload::text("[]"));

    gate.open();
    assert_eq!(pending.await.unwrap().unwrap(), Payload::Empty);
    assert_eq!(
        call(&bridge, "getSubscriptions", &[]).await.unwrap(),
        Payload::text("[news]")
    );
}
