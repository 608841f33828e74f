//! Overlapping requests against one installation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use beacon_bridge::memory::MemoryPushService;
use futures_util::future::join_all;
use serde_json::{Value, json};

use crate::common::{bridge, call};

const CHANNELS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribes_are_all_kept() {
    let service = Arc::new(MemoryPushService::new().with_latency(Duration::from_millis(5)));
    let bridge = bridge(&service);
    call(&bridge, "initialize", &[]).await.unwrap();

    let names: Vec<String> = (0..CHANNELS).map(|i| format!("topic{i}")).collect();
    let args: Vec<[Value; 1]> = names.iter().map(|name| [json!(name)]).collect();
    let replies = join_all(args.iter().map(|arg| call(&bridge, "subscribe", arg))).await;
    assert!(replies.iter().all(Result::is_ok));

    let record = service.remote_record().unwrap();
    let remote: BTreeSet<&str> = record.channels().iter().collect();
    let expected: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    assert_eq!(remote, expected);

    let listed = call(&bridge, "getSubscriptions", &[]).await.unwrap();
    assert_eq!(listed.as_text().unwrap().matches("topic").count(), CHANNELS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initialize_agrees_on_one_id() {
    let service = Arc::new(MemoryPushService::new().with_latency(Duration::from_millis(2)));
    let bridge = bridge(&service);

    let replies = join_all((0..8).map(|_| call(&bridge, "initialize", &[]))).await;
    let ids: BTreeSet<String> = replies
        .into_iter()
        .map(|reply| reply.unwrap().as_text().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(service.calls().save, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_writes_settle_on_last_acknowledged_state() {
    let service = Arc::new(MemoryPushService::new().with_latency(Duration::from_millis(2)));
    let bridge = bridge(&service);
    call(&bridge, "initialize", &[]).await.unwrap();

    call(&bridge, "subscribe", &[json!("keep")]).await.unwrap();
    let replies = join_all([
        call(&bridge, "subscribe", &[json!("a")]),
        call(&bridge, "subscribe", &[json!("b")]),
        call(&bridge, "unsubscribe", &[json!("keep")]),
    ])
    .await;
    assert!(replies.iter().all(Result::is_ok));

    let record = service.remote_record().unwrap();
    let remote: BTreeSet<&str> = record.channels().iter().collect();
    assert_eq!(remote, BTreeSet::from(["a", "b"]));
}
