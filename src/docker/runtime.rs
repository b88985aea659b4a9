//! The runtime seam.
//!
//! [`ContainerRuntime`] is the minimal set of primitives the rest of the crate
//! needs from a container engine. It speaks in this crate's own types so the
//! convention layer ([`super::ContainerClient`]) and the reconciler never see
//! engine-specific structures. [`super::DockerEngine`] implements it over the
//! Docker Engine API; tests implement it in memory.

use super::labels::LabelSelector;
use super::DockerError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Normalized inspect result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerDetails {
    /// Full runtime identifier.
    pub id: String,
    /// Name as reported by the runtime (may carry a leading `/`).
    pub name: String,
    pub image: String,
    /// Raw state string (`running`, `exited`, `dead`, ...).
    pub status: String,
    pub running: bool,
    /// RFC3339 start time, when the runtime reports one.
    pub started_at: Option<String>,
    pub created: Option<String>,
    /// `KEY=VALUE` entries.
    pub env: Vec<String>,
    pub mounts: Vec<MountInfo>,
    pub ports: Vec<PortMapping>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub source: String,
    pub destination: String,
}

/// One published port from the network settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Container side in `port/proto` form, e.g. `8080/tcp`.
    pub container_port: String,
    pub host_ip: Option<String>,
    pub host_port: Option<String>,
}

impl PortMapping {
    pub fn is_tcp(&self) -> bool {
        self.container_port.ends_with("/tcp")
    }
}

/// Fully resolved create request. All conventions are already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<String>,
    pub mounts: Vec<BindMount>,
    pub labels: HashMap<String, String>,
    pub cmd: Option<Vec<String>>,
    pub memory_bytes: Option<i64>,
    pub restart_policy: Option<String>,
    pub port: Option<PortPublish>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPublish {
    pub container_port: u16,
    pub host_port: u16,
    pub host_ip: String,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn ping(&self) -> Result<(), DockerError>;

    /// Ids of all containers (running or not) matching `selector`.
    async fn list_containers(&self, selector: &LabelSelector) -> Result<Vec<String>, DockerError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, DockerError>;

    /// Create a container and return its full identifier.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError>;

    async fn start_container(&self, id: &str) -> Result<(), DockerError>;

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), DockerError>;

    async fn restart_container(&self, id: &str, grace: Duration) -> Result<(), DockerError>;

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), DockerError>;

    /// Raw one-shot stats document.
    async fn container_stats(&self, id: &str) -> Result<serde_json::Value, DockerError>;

    /// Pull an image, returning once the progress stream is drained.
    async fn pull_image(&self, image: &str) -> Result<(), DockerError>;

    async fn remove_image(&self, image: &str, force: bool) -> Result<(), DockerError>;
}
