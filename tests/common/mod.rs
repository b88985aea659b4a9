//! Shared test fixtures: an in-memory container runtime and record builders.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use mcp_fleet::docker::runtime::{ContainerDetails, ContainerSpec, MountInfo, PortMapping};
use mcp_fleet::docker::{ContainerRuntime, DockerError, LabelSelector, OwnershipLabels};
use mcp_fleet::logging::Logger;
use mcp_fleet::reconciler::ids_match;
use mcp_fleet::records::{ConfiguredServer, InstalledServer, MemoryRecordStore, RecordStore};
use mcp_fleet::Reconciler;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct FakeState {
    containers: Vec<ContainerDetails>,
    created: Vec<ContainerSpec>,
    calls: Vec<String>,
    failures: Vec<(String, String)>,
    next_id: u64,
    unreachable: bool,
}

/// Scripted runtime. Records every call as `"<op>:<target>"` and fails any
/// operation registered with [`FakeRuntime::fail_on`].
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `op` fail for targets matching `target` (prefix rules apply).
    pub fn fail_on(&self, op: &str, target: &str) {
        self.state
            .lock()
            .failures
            .push((op.to_string(), target.to_string()));
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unreachable = !reachable;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of recorded calls for `op`.
    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{}:", op);
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.state.lock().created.clone()
    }

    pub fn container_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .containers
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn container(&self, id: &str) -> Option<ContainerDetails> {
        self.state
            .lock()
            .containers
            .iter()
            .find(|c| ids_match(id, &c.id))
            .cloned()
    }

    /// Add a managed container with a fixed full id.
    pub fn add_managed(&self, id: &str, name: &str, host_port: u16, running: bool) {
        let mut labels = HashMap::new();
        OwnershipLabels::default().apply(&mut labels, Utc::now());
        self.add_container(ContainerDetails {
            id: id.to_string(),
            name: format!("/{}", name),
            image: "mcp/echo:1.0".to_string(),
            status: if running { "running" } else { "exited" }.to_string(),
            running,
            started_at: running.then(|| Utc::now().to_rfc3339()),
            created: Some(Utc::now().to_rfc3339()),
            env: vec!["MODE=test".to_string(), "TOKEN=secret".to_string()],
            mounts: vec![MountInfo {
                source: format!("/srv/{}", name),
                destination: "/data".to_string(),
            }],
            ports: vec![PortMapping {
                container_port: "3000/tcp".to_string(),
                host_ip: Some("127.0.0.1".to_string()),
                host_port: Some(host_port.to_string()),
            }],
            labels,
        });
    }

    pub fn add_container(&self, details: ContainerDetails) {
        self.state.lock().containers.push(details);
    }

    fn begin(&self, op: &str, target: &str) -> Result<(), DockerError> {
        let mut state = self.state.lock();
        state.calls.push(format!("{}:{}", op, target));
        if state.unreachable {
            return Err(DockerError::unavailable("fake runtime is down"));
        }
        let injected = state
            .failures
            .iter()
            .any(|(f_op, f_target)| f_op == op && (f_target == target || ids_match(f_target, target)));
        if injected {
            return Err(DockerError::api(
                "fake",
                target,
                Some(500),
                format!("injected {} failure", op),
            ));
        }
        Ok(())
    }

    fn with_container<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut ContainerDetails) -> Result<T, DockerError>,
    ) -> Result<T, DockerError> {
        let mut state = self.state.lock();
        match state.containers.iter_mut().find(|c| ids_match(id, &c.id)) {
            Some(container) => f(container),
            None => Err(DockerError::container_not_found(id)),
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), DockerError> {
        self.begin("ping", "daemon")
    }

    async fn list_containers(&self, selector: &LabelSelector) -> Result<Vec<String>, DockerError> {
        self.begin("list", "managed")?;
        Ok(self
            .state
            .lock()
            .containers
            .iter()
            .filter(|c| selector.matches(&c.labels))
            .map(|c| c.id.clone())
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, DockerError> {
        self.begin("inspect", id)?;
        self.with_container(id, |c| Ok(c.clone()))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
        self.begin("create", &spec.name)?;
        let mut state = self.state.lock();
        let wanted = format!("/{}", spec.name);
        if state.containers.iter().any(|c| c.name == wanted) {
            return Err(DockerError::api(
                "create",
                &spec.name,
                Some(409),
                "container name already in use",
            ));
        }

        state.next_id += 1;
        let id = format!("c{:011x}{}", state.next_id, "f".repeat(52));
        let ports = spec
            .port
            .iter()
            .map(|p| PortMapping {
                container_port: format!("{}/tcp", p.container_port),
                host_ip: Some(p.host_ip.clone()),
                host_port: Some(p.host_port.to_string()),
            })
            .collect();
        let mounts = spec
            .mounts
            .iter()
            .map(|m| MountInfo {
                source: m.source.clone(),
                destination: m.target.clone(),
            })
            .collect();

        state.containers.push(ContainerDetails {
            id: id.clone(),
            name: wanted,
            image: spec.image.clone(),
            status: "created".to_string(),
            running: false,
            started_at: None,
            created: Some(Utc::now().to_rfc3339()),
            env: spec.env.clone(),
            mounts,
            ports,
            labels: spec.labels.clone(),
        });
        state.created.push(spec.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        self.begin("start", id)?;
        self.with_container(id, |c| {
            c.running = true;
            c.status = "running".to_string();
            c.started_at = Some(Utc::now().to_rfc3339());
            Ok(())
        })
    }

    async fn stop_container(&self, id: &str, _grace: Duration) -> Result<(), DockerError> {
        self.begin("stop", id)?;
        self.with_container(id, |c| {
            c.running = false;
            c.status = "exited".to_string();
            Ok(())
        })
    }

    async fn restart_container(&self, id: &str, _grace: Duration) -> Result<(), DockerError> {
        self.begin("restart", id)?;
        self.with_container(id, |c| {
            c.running = true;
            c.status = "running".to_string();
            c.started_at = Some(Utc::now().to_rfc3339());
            Ok(())
        })
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), DockerError> {
        self.begin("remove", id)?;
        let mut state = self.state.lock();
        let Some(pos) = state.containers.iter().position(|c| ids_match(id, &c.id)) else {
            return Err(DockerError::container_not_found(id));
        };
        if state.containers[pos].running && !force {
            return Err(DockerError::api(
                "remove",
                id,
                Some(409),
                "container is running",
            ));
        }
        state.containers.remove(pos);
        Ok(())
    }

    async fn container_stats(&self, id: &str) -> Result<serde_json::Value, DockerError> {
        self.begin("stats", id)?;
        Ok(json!({
            "cpu_stats": { "cpu_usage": { "total_usage": 300 }, "system_cpu_usage": 2000 },
            "precpu_stats": { "cpu_usage": { "total_usage": 200 }, "system_cpu_usage": 1000 },
            "memory_stats": { "usage": 64u64 * 1024 * 1024 }
        }))
    }

    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        self.begin("pull", image)
    }

    async fn remove_image(&self, image: &str, _force: bool) -> Result<(), DockerError> {
        self.begin("remove_image", image)
    }
}

/// 64 character id whose first 12 characters are `short`.
pub fn full_id(short: &str) -> String {
    format!("{:0<64}", short)
}

pub fn configured(id: &str, container_id: &str, port: u16) -> ConfiguredServer {
    ConfiguredServer {
        id: id.to_string(),
        name: format!("Server {}", id),
        container_name: format!("mcp-{}", id),
        container_id: container_id.to_string(),
        installed_server_id: "echo-1".to_string(),
        version: "1.0.0".to_string(),
        docker_image: "mcp/echo:1.0".to_string(),
        docker_command: None,
        port,
        container_port: 3000,
        environment: HashMap::from([("MODE".to_string(), "test".to_string())]),
        volumes: HashMap::new(),
        created_date: Utc::now(),
        last_started: None,
        auto_start: false,
        recreation: None,
    }
}

pub fn reconciler(runtime: &Arc<FakeRuntime>, store: &Arc<MemoryRecordStore>) -> Reconciler {
    let runtime: Arc<dyn ContainerRuntime> = runtime.clone();
    Reconciler::builder()
        .runtime(runtime)
        .records(store.clone())
        .logger(Logger::default())
        .build()
        .expect("reconciler builds")
}

pub async fn seed(store: &MemoryRecordStore, servers: Vec<ConfiguredServer>) {
    for server in servers {
        store
            .upsert_configured_server(server)
            .await
            .expect("seed record");
    }
}

/// Record store whose configured-server deletes always fail.
#[derive(Debug, Default)]
pub struct StickyRecordStore {
    pub inner: MemoryRecordStore,
}

#[async_trait]
impl RecordStore for StickyRecordStore {
    async fn installed_servers(&self) -> mcp_fleet::Result<Vec<InstalledServer>> {
        self.inner.installed_servers().await
    }

    async fn upsert_installed_server(&self, server: InstalledServer) -> mcp_fleet::Result<()> {
        self.inner.upsert_installed_server(server).await
    }

    async fn remove_installed_server(&self, id: &str) -> mcp_fleet::Result<bool> {
        self.inner.remove_installed_server(id).await
    }

    async fn configured_servers(&self) -> mcp_fleet::Result<Vec<ConfiguredServer>> {
        self.inner.configured_servers().await
    }

    async fn upsert_configured_server(&self, server: ConfiguredServer) -> mcp_fleet::Result<()> {
        self.inner.upsert_configured_server(server).await
    }

    async fn remove_configured_server(&self, _id: &str) -> mcp_fleet::Result<bool> {
        Err(mcp_fleet::Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "records file is read-only",
        )))
    }
}
