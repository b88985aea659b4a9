mod common;

use common::{configured, full_id, reconciler, seed, FakeRuntime};
use mcp_fleet::records::MemoryRecordStore;
use std::sync::Arc;

#[tokio::test]
async fn test_short_stored_id_is_not_an_orphan() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    runtime.add_managed(&full_id("abc123def456"), "mcp-a", 8000, true);
    seed(&store, vec![configured("a", "abc123def456", 8000)]).await;

    let orphans = reconciler(&runtime, &store).detect_orphans().await.unwrap();
    assert!(orphans.is_empty());
}

#[tokio::test]
async fn test_empty_container_id_tracks_nothing() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    runtime.add_managed(&full_id("abc123def456"), "mcp-a", 8000, false);
    seed(&store, vec![configured("unlinked", "", 8000)]).await;

    let orphans = reconciler(&runtime, &store).detect_orphans().await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].id, "abc123def456");
}

#[tokio::test]
async fn test_unlabelled_containers_are_ignored() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    runtime.add_managed(&full_id("abc123def456"), "mcp-a", 8000, false);
    let mut foreign = runtime.container(&full_id("abc123def456")).unwrap();
    foreign.id = full_id("ffff00001111");
    foreign.name = "/someone-else".into();
    foreign.labels.clear();
    runtime.add_container(foreign);

    let reconciler = reconciler(&runtime, &store);
    let report = reconciler.cleanup_orphans().await.unwrap();
    assert_eq!(report.succeeded.len(), 1);
    assert!(runtime.container(&full_id("ffff00001111")).is_some());
}

#[tokio::test]
async fn test_cleanup_stops_running_orphans_and_is_idempotent() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let running = full_id("111111111111");
    let stopped = full_id("222222222222");
    let kept = full_id("333333333333");
    runtime.add_managed(&running, "mcp-running", 8000, true);
    runtime.add_managed(&stopped, "mcp-stopped", 8001, false);
    runtime.add_managed(&kept, "mcp-kept", 8002, true);
    seed(&store, vec![configured("kept", &kept, 8002)]).await;

    let reconciler = reconciler(&runtime, &store);
    let report = reconciler.cleanup_orphans().await.unwrap();

    assert_eq!(report.succeeded.len(), 2);
    assert!(!report.has_failures());
    assert_eq!(runtime.count("stop"), 1);
    assert!(runtime.calls().contains(&format!("stop:{}", running)));
    assert_eq!(runtime.count("remove"), 2);
    assert_eq!(runtime.container_ids(), vec![kept.clone()]);

    runtime.clear_calls();
    let second = reconciler.cleanup_orphans().await.unwrap();
    assert!(second.is_noop());
    assert_eq!(runtime.count("stop"), 0);
    assert_eq!(runtime.count("remove"), 0);
}

#[tokio::test]
async fn test_stop_failure_still_removes() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let orphan = full_id("444444444444");
    runtime.add_managed(&orphan, "mcp-stuck", 8000, true);
    runtime.fail_on("stop", &orphan);

    let report = reconciler(&runtime, &store).cleanup_orphans().await.unwrap();
    assert_eq!(report.succeeded.len(), 1);
    assert!(runtime.container(&orphan).is_none());
}

#[tokio::test]
async fn test_remove_failure_continues_with_the_rest() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let stuck = full_id("555555555555");
    let other = full_id("666666666666");
    runtime.add_managed(&stuck, "mcp-stuck", 8000, false);
    runtime.add_managed(&other, "mcp-other", 8001, false);
    runtime.fail_on("remove", &stuck);

    let report = reconciler(&runtime, &store).cleanup_orphans().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].item.contains("mcp-stuck"));
    assert_eq!(report.succeeded.len(), 1);
    assert!(runtime.container(&other).is_none());
    assert!(runtime.container(&stuck).is_some());
    assert!(report.into_result().is_err());
}
