mod common;

use common::{configured, full_id, reconciler, seed, FakeRuntime, StickyRecordStore};
use mcp_fleet::config::ServerDefaults;
use mcp_fleet::docker::CreateRequest;
use mcp_fleet::docker::ContainerRuntime;
use mcp_fleet::reconciler::InstantiateRequest;
use mcp_fleet::Reconciler;
use mcp_fleet::records::{CatalogEntry, MemoryRecordStore, RecordStore};
use mcp_fleet::Error;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::test]
async fn test_create_falls_back_to_host_port_for_container_port() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let reconciler = reconciler(&runtime, &store);

    let request = CreateRequest {
        name: "mcp-legacy".into(),
        image: "mcp/legacy:0.1".into(),
        host_port: 8080,
        container_port: 0,
        env: HashMap::from([("B".into(), "2".into()), ("A".into(), "1".into())]),
        volumes: HashMap::from([("/home/me/data".into(), "/data".into())]),
        command: Some(r#"node server.js --name "my server""#.into()),
        memory_limit_mb: 256,
        restart_policy: "on-failure".into(),
        ..Default::default()
    };
    let id = reconciler.create(&request).await.unwrap();
    assert_eq!(id.len(), 64);

    let spec = &runtime.created_specs()[0];
    let port = spec.port.as_ref().unwrap();
    assert_eq!(port.container_port, 8080);
    assert_eq!(port.host_port, 8080);
    assert_eq!(port.host_ip, "127.0.0.1");
    assert_eq!(spec.env, vec!["A=1", "B=2"]);
    assert_eq!(spec.mounts[0].source, "/home/me/data");
    assert_eq!(spec.mounts[0].target, "/data");
    assert_eq!(
        spec.cmd.as_deref().unwrap(),
        ["node", "server.js", "--name", "my server"]
    );
    assert_eq!(spec.memory_bytes, Some(256 * 1024 * 1024));
    assert_eq!(spec.restart_policy.as_deref(), Some("on-failure"));
    assert_eq!(spec.labels["mcp-fleet.managed-by"], "true");
    assert!(spec.labels.contains_key("mcp-fleet.created-at"));
}

#[tokio::test]
async fn test_create_without_port_memory_or_policy() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let reconciler = reconciler(&runtime, &store);

    let request = CreateRequest {
        name: "mcp-bare".into(),
        image: "mcp/bare".into(),
        ..Default::default()
    };
    reconciler.create(&request).await.unwrap();

    let spec = &runtime.created_specs()[0];
    assert!(spec.port.is_none());
    assert!(spec.memory_bytes.is_none());
    assert!(spec.restart_policy.is_none());
    assert!(spec.cmd.is_none());
}

#[tokio::test]
async fn test_create_failure_is_create_failed() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let reconciler = reconciler(&runtime, &store);
    runtime.fail_on("create", "mcp-broken");

    let err = reconciler
        .create(&CreateRequest {
            name: "mcp-broken".into(),
            image: "mcp/broken".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CreateFailed { ref name, .. } if name == "mcp-broken"));
}

#[tokio::test]
async fn test_list_enriches_and_cleans_orphans() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let tracked = full_id("aaaaaaaaaaaa");
    let orphan = full_id("bbbbbbbbbbbb");
    runtime.add_managed(&tracked, "mcp-a", 8000, true);
    runtime.add_managed(&orphan, "mcp-stale", 8001, false);
    seed(&store, vec![configured("a", "aaaaaaaaaaaa", 8000)]).await;

    let reconciler = reconciler(&runtime, &store);
    let containers = reconciler.list_containers().await.unwrap();

    assert_eq!(containers.len(), 1);
    let info = &containers[0];
    assert_eq!(info.id, "aaaaaaaaaaaa");
    assert_eq!(info.display_name, "Server a");
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.port, 8000);
    assert_eq!(info.cpu, "10.0%");
    assert_eq!(info.memory, "64MB");
    assert!(runtime.container(&orphan).is_none());
}

#[tokio::test]
async fn test_list_unreachable_runtime_is_unavailable() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    runtime.set_reachable(false);

    let err = reconciler(&runtime, &store)
        .list_containers()
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_start_stamps_last_started() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let id = full_id("aaaaaaaaaaaa");
    runtime.add_managed(&id, "mcp-a", 8000, false);
    seed(&store, vec![configured("a", "aaaaaaaaaaaa", 8000)]).await;

    let reconciler = reconciler(&runtime, &store);
    reconciler.start(&id).await.unwrap();

    let record = store.configured_server("a").await.unwrap().unwrap();
    assert!(record.last_started.is_some());
    assert!(runtime.container(&id).unwrap().running);
}

#[tokio::test]
async fn test_single_target_errors_propagate() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let id = full_id("aaaaaaaaaaaa");
    runtime.add_managed(&id, "mcp-a", 8000, true);
    runtime.fail_on("stop", &id);

    let reconciler = reconciler(&runtime, &store);
    let err = reconciler.stop(&id).await.unwrap_err();
    assert!(matches!(err, Error::Docker(_)));
    assert_eq!(runtime.count("stop"), 1);

    let err = reconciler.start("does-not-exist").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_remove_deletes_matching_record() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let id = full_id("aaaaaaaaaaaa");
    runtime.add_managed(&id, "mcp-a", 8000, true);
    seed(
        &store,
        vec![configured("a", "aaaaaaaaaaaa", 8000), configured("b", "", 8001)],
    )
    .await;

    let reconciler = reconciler(&runtime, &store);
    reconciler.remove(&id, true).await.unwrap();

    let remaining = store.configured_servers().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "b");

    // No record references this one; still fine.
    let other = full_id("cccccccccccc");
    runtime.add_managed(&other, "mcp-c", 8002, false);
    reconciler.remove(&other, false).await.unwrap();
    assert_eq!(store.configured_servers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_install_instantiate_uninstall() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    seed(&store, vec![configured("existing", "", 8000)]).await;
    let reconciler = reconciler(&runtime, &store);

    let mut entry = CatalogEntry {
        name: "Echo Server".into(),
        docker_image: "mcp/echo:2.0".into(),
        version: "2.0.0".into(),
        ..Default::default()
    };
    entry.metadata.ports.insert("mcp".into(), json!("3100"));
    entry.metadata.docker_command = "serve --stdio".into();

    let installed = reconciler.install_server(entry).await.unwrap();
    assert!(installed.id.starts_with("echo-server-"));
    assert_eq!(runtime.count("pull"), 1);

    let defaults = ServerDefaults {
        auto_start: true,
        ..Default::default()
    };
    let server = reconciler
        .instantiate(
            InstantiateRequest {
                installed_server_id: installed.id.clone(),
                container_name: "mcp-echo".into(),
                ..Default::default()
            },
            &defaults,
        )
        .await
        .unwrap();

    assert_eq!(server.port, 8001);
    assert_eq!(server.container_port, 3100);
    assert!(server.last_started.is_some());
    let spec = &runtime.created_specs()[0];
    assert_eq!(spec.port.as_ref().unwrap().container_port, 3100);
    assert_eq!(spec.cmd.as_deref().unwrap(), ["serve", "--stdio"]);
    assert_eq!(spec.memory_bytes, Some(512 * 1024 * 1024));
    assert!(runtime.container(&server.container_id).unwrap().running);

    let report = reconciler.uninstall_server(&installed.id, true).await.unwrap();
    assert_eq!(report.succeeded, vec![server.id.clone()]);
    assert!(runtime.container(&server.container_id).is_none());
    assert_eq!(runtime.count("remove_image"), 1);
    assert!(store.installed_servers().await.unwrap().is_empty());
    assert_eq!(store.configured_servers().await.unwrap().len(), 1);

    let err = reconciler.uninstall_server(&installed.id, false).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_instantiate_rejects_taken_port() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    seed(&store, vec![configured("existing", "", 8000)]).await;
    let reconciler = reconciler(&runtime, &store);

    let installed = reconciler
        .install_manual("ghcr.io/me/tool:dev", "My Tool", "hand built")
        .await
        .unwrap();
    assert!(installed.id.starts_with("manual-my-tool-"));
    assert_eq!(installed.version, "latest");
    assert_eq!(installed.metadata.tags, vec!["manual", "custom"]);
    assert_eq!(
        installed.metadata.setup_description,
        "Manually configured Docker container from image ghcr.io/me/tool:dev"
    );
    assert_eq!(installed.metadata.license, "Unknown");
    assert_eq!(installed.metadata.maintainer, "Custom");
    assert_eq!(installed.metadata.architecture, vec!["amd64"]);
    assert_eq!(installed.source_registry, "Custom Docker");

    let err = reconciler
        .instantiate(
            InstantiateRequest {
                installed_server_id: installed.id,
                container_name: "mcp-tool".into(),
                port: Some(8000),
                ..Default::default()
            },
            &ServerDefaults::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(runtime.created_specs().is_empty());
}

#[tokio::test]
async fn test_create_rejects_oversized_memory_limit() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let reconciler = reconciler(&runtime, &store);

    let err = reconciler
        .create(&CreateRequest {
            name: "mcp-huge".into(),
            image: "mcp/huge".into(),
            memory_limit_mb: u64::MAX / 1024,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CreateFailed { ref name, .. } if name == "mcp-huge"));
    assert_eq!(runtime.count("create"), 0);
}

#[tokio::test]
async fn test_remove_succeeds_when_record_delete_fails() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(StickyRecordStore::default());
    let id = full_id("aaaaaaaaaaaa");
    runtime.add_managed(&id, "mcp-a", 8000, true);
    seed(&store.inner, vec![configured("a", "aaaaaaaaaaaa", 8000)]).await;

    let dyn_runtime: Arc<dyn ContainerRuntime> = runtime.clone();
    let reconciler = Reconciler::builder()
        .runtime(dyn_runtime)
        .records(store.clone())
        .build()
        .unwrap();

    reconciler.remove(&id, true).await.unwrap();
    assert!(runtime.container(&id).is_none());
    assert_eq!(store.inner.configured_servers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_installed_with_updates() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryRecordStore::new());
    let reconciler = reconciler(&runtime, &store);

    let installed = reconciler
        .install_server(CatalogEntry {
            name: "Echo".into(),
            docker_image: "mcp/echo".into(),
            version: "1.0.0".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let catalog = vec![CatalogEntry {
        name: "Echo".into(),
        docker_image: "mcp/echo".into(),
        version: "1.1.0".into(),
        ..Default::default()
    }];
    let statuses = reconciler.installed_with_updates(&catalog).await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].installed.id, installed.id);
    assert!(statuses[0].update_available);
    assert_eq!(statuses[0].latest_version, "1.1.0");

    let statuses = reconciler.installed_with_updates(&[]).await.unwrap();
    assert!(!statuses[0].update_available);
    assert_eq!(statuses[0].latest_version, "1.0.0");
}
