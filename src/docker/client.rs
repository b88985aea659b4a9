//! Convention-aware container client.
//!
//! `ContainerClient` sits on top of a [`ContainerRuntime`] and applies every
//! rule this system places on containers: ownership labels, `KEY=VALUE`
//! environment encoding, bind-mounted volumes, loopback-only port publishing,
//! memory ceilings, restart policies and quoted command parsing. It also
//! turns raw inspect data into [`ContainerInfo`] snapshots.
//!
//! Single-target operations return the first error unchanged. Nothing here
//! retries.

use super::command::parse_command_args;
use super::labels::OwnershipLabels;
use super::runtime::{BindMount, ContainerDetails, ContainerRuntime, ContainerSpec, PortPublish};
use super::stats::{parse_stats, ResourceUsage};
use super::{DockerError, LOOPBACK_HOST_IP, STOP_GRACE_PERIOD};
use crate::error::{Error, Result};
use crate::logging::Logger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Length of the abbreviated identifier shown to users.
pub const SHORT_ID_LEN: usize = 12;

/// Uptime shown for containers that are not running.
const NOT_RUNNING_UPTIME: &str = "0h";

const ZERO_CPU: &str = "0%";
const ZERO_MEMORY: &str = "0MB";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Normalized container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Stopped,
    Restarting,
    Error,
}

impl ContainerState {
    pub fn from_status(status: &str) -> Self {
        match status {
            "running" => ContainerState::Running,
            "exited" | "dead" => ContainerState::Stopped,
            "restarting" => ContainerState::Restarting,
            _ => ContainerState::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Stopped => "stopped",
            ContainerState::Restarting => "restarting",
            ContainerState::Error => "error",
        }
    }
}

/// Observed-state snapshot of one container. Rebuilt on every query.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    /// Abbreviated identifier (12 characters).
    pub id: String,
    pub full_id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub state: ContainerState,
    pub uptime: String,
    pub cpu: String,
    pub memory: String,
    /// Host port from the first TCP binding, 0 when unpublished.
    pub port: u16,
    pub env: HashMap<String, String>,
    /// `source:destination` pairs.
    pub volumes: Vec<String>,
    pub created: Option<String>,
    pub started_at: Option<String>,
    pub labels: HashMap<String, String>,
    pub display_name: String,
    pub version: String,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Everything needed to create a container for a server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequest {
    pub name: String,
    pub image: String,
    pub host_port: u16,
    /// Port the server listens on inside the container; 0 means the host port.
    pub container_port: u16,
    pub env: HashMap<String, String>,
    /// Host path to container path.
    pub volumes: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub command: Option<String>,
    /// 0 leaves memory unlimited.
    pub memory_limit_mb: u64,
    /// Empty leaves the runtime default.
    pub restart_policy: String,
}

#[derive(Clone)]
pub struct ContainerClient {
    runtime: Arc<dyn ContainerRuntime>,
    labels: OwnershipLabels,
    logger: Logger,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ContainerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerClient")
            .field("labels", &self.labels)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ContainerClient {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, logger: Logger) -> Self {
        Self {
            runtime,
            labels: OwnershipLabels::default(),
            logger,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_labels(mut self, labels: OwnershipLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub fn labels(&self) -> &OwnershipLabels {
        &self.labels
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Run a runtime call unless the client's token fires first.
    async fn guarded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, DockerError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled(operation.to_string())),
            result = fut => result.map_err(Error::from),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn ping(&self) -> Result<()> {
        self.guarded("ping", self.runtime.ping()).await
    }

    /// All containers (including stopped ones) carrying the ownership label.
    ///
    /// A container that cannot be inspected is logged and left out.
    pub async fn list_managed(&self) -> Result<Vec<ContainerInfo>> {
        let selector = self.labels.selector();
        let ids = self
            .guarded("list", self.runtime.list_containers(&selector))
            .await?;

        let mut infos = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_info(&id).await {
                Ok(info) => infos.push(info),
                Err(Error::Cancelled(op)) => return Err(Error::Cancelled(op)),
                Err(e) => self
                    .logger
                    .warn(format_args!("Skipping container {}: {}", short_id(&id), e)),
            }
        }
        Ok(infos)
    }

    pub async fn get_info(&self, id: &str) -> Result<ContainerInfo> {
        let details = self
            .guarded("inspect", self.runtime.inspect_container(id))
            .await?;
        let mut info = info_from_details(&details, Utc::now());

        if details.running {
            match self.stats(&details.id).await {
                Ok(usage) => {
                    info.cpu = usage.cpu_display();
                    info.memory = usage.memory_display();
                }
                Err(Error::Cancelled(op)) => return Err(Error::Cancelled(op)),
                Err(e) => self.logger.debug(format_args!(
                    "Stats unavailable for {}: {}",
                    info.id, e
                )),
            }
        }
        Ok(info)
    }

    pub async fn stats(&self, id: &str) -> Result<ResourceUsage> {
        let raw = self
            .guarded("stats", self.runtime.container_stats(id))
            .await?;
        parse_stats(&raw)
    }

    // ========================================================================
    // Container lifecycle
    // ========================================================================

    /// Create a container and return its full identifier.
    pub async fn create(&self, request: &CreateRequest) -> Result<String> {
        let spec = self
            .build_spec(request, Utc::now())
            .map_err(|source| Error::CreateFailed {
                name: request.name.clone(),
                source,
            })?;
        self.logger.debug(format_args!(
            "Creating container {} from {}",
            spec.name, spec.image
        ));

        let id = self
            .guarded("create", self.runtime.create_container(&spec))
            .await
            .map_err(|e| match e {
                Error::Cancelled(op) => Error::Cancelled(op),
                Error::Docker(source) => Error::CreateFailed {
                    name: request.name.clone(),
                    source,
                },
                Error::Unavailable(reason) => Error::CreateFailed {
                    name: request.name.clone(),
                    source: DockerError::Unavailable { reason },
                },
                other => Error::CreateFailed {
                    name: request.name.clone(),
                    source: DockerError::api("create", &request.name, None, other.to_string()),
                },
            })?;

        self.logger
            .info(format_args!("Created container {} ({})", request.name, short_id(&id)));
        Ok(id)
    }

    /// Resolve a request into a runtime spec with all conventions applied.
    pub fn build_spec(
        &self,
        request: &CreateRequest,
        now: DateTime<Utc>,
    ) -> std::result::Result<ContainerSpec, DockerError> {
        let mut labels = request.labels.clone();
        self.labels.apply(&mut labels, now);

        let mut env: Vec<String> = request
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        env.sort();

        let mut mounts: Vec<BindMount> = request
            .volumes
            .iter()
            .map(|(host, container)| BindMount {
                source: host.clone(),
                target: container.clone(),
            })
            .collect();
        mounts.sort_by(|a, b| a.source.cmp(&b.source));

        let cmd = request
            .command
            .as_deref()
            .map(parse_command_args)
            .filter(|args| !args.is_empty());

        let memory_bytes = memory_limit_bytes(request.memory_limit_mb)?;

        let restart_policy = if request.restart_policy.is_empty() {
            None
        } else {
            Some(request.restart_policy.clone())
        };

        let port = if request.host_port > 0 {
            let container_port = if request.container_port == 0 {
                request.host_port
            } else {
                request.container_port
            };
            Some(PortPublish {
                container_port,
                host_port: request.host_port,
                host_ip: LOOPBACK_HOST_IP.to_string(),
            })
        } else {
            None
        };

        Ok(ContainerSpec {
            name: request.name.clone(),
            image: request.image.clone(),
            env,
            mounts,
            labels,
            cmd,
            memory_bytes,
            restart_policy,
            port,
        })
    }

    pub async fn start(&self, id: &str) -> Result<()> {
        self.guarded("start", self.runtime.start_container(id)).await?;
        self.logger.info(format_args!("Started container {}", short_id(id)));
        Ok(())
    }

    /// Stop with the fixed grace period before the runtime kills it.
    pub async fn stop(&self, id: &str) -> Result<()> {
        self.guarded("stop", self.runtime.stop_container(id, STOP_GRACE_PERIOD))
            .await?;
        self.logger.info(format_args!("Stopped container {}", short_id(id)));
        Ok(())
    }

    pub async fn restart(&self, id: &str) -> Result<()> {
        self.guarded(
            "restart",
            self.runtime.restart_container(id, STOP_GRACE_PERIOD),
        )
        .await?;
        self.logger.info(format_args!("Restarted container {}", short_id(id)));
        Ok(())
    }

    pub async fn remove(&self, id: &str, force: bool) -> Result<()> {
        self.guarded("remove", self.runtime.remove_container(id, force))
            .await?;
        self.logger.info(format_args!("Removed container {}", short_id(id)));
        Ok(())
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Pull an image, waiting for the pull to finish.
    pub async fn pull_image(&self, image: &str) -> Result<()> {
        self.logger.info(format_args!("Pulling image {}", image));
        self.guarded("pull", self.runtime.pull_image(image)).await?;
        self.logger.info(format_args!("Pulled image {}", image));
        Ok(())
    }

    pub async fn remove_image(&self, image: &str, force: bool) -> Result<()> {
        self.guarded("remove image", self.runtime.remove_image(image, force))
            .await?;
        self.logger.info(format_args!("Removed image {}", image));
        Ok(())
    }
}

/// First 12 characters of an identifier (or the whole thing if shorter).
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Memory ceiling in bytes for a limit in megabytes. Zero means no limit.
pub fn memory_limit_bytes(mb: u64) -> std::result::Result<Option<i64>, DockerError> {
    if mb == 0 {
        return Ok(None);
    }
    mb.checked_mul(BYTES_PER_MB)
        .and_then(|bytes| i64::try_from(bytes).ok())
        .map(Some)
        .ok_or_else(|| DockerError::invalid_spec(format!("memory limit of {} MB is too large", mb)))
}

/// Build a snapshot from inspect data. Stats are left at zero.
///
/// State comes from the status string alone; `running` only decides
/// whether uptime is computed.
pub fn info_from_details(details: &ContainerDetails, now: DateTime<Utc>) -> ContainerInfo {
    let env = details
        .env
        .iter()
        .filter_map(|entry| entry.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let volumes = details
        .mounts
        .iter()
        .map(|m| format!("{}:{}", m.source, m.destination))
        .collect();

    let port = details
        .ports
        .iter()
        .filter(|p| p.is_tcp())
        .find_map(|p| p.host_port.as_deref().and_then(|hp| hp.parse::<u16>().ok()))
        .unwrap_or(0);

    let uptime = if details.running {
        details
            .started_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|started| format_uptime(now.signed_duration_since(started.with_timezone(&Utc))))
            .unwrap_or_else(|| NOT_RUNNING_UPTIME.to_string())
    } else {
        NOT_RUNNING_UPTIME.to_string()
    };

    let name = details.name.trim_start_matches('/').to_string();
    let state = ContainerState::from_status(&details.status);

    ContainerInfo {
        id: short_id(&details.id).to_string(),
        full_id: details.id.clone(),
        display_name: name.clone(),
        name,
        image: details.image.clone(),
        status: details.status.clone(),
        state,
        uptime,
        cpu: ZERO_CPU.to_string(),
        memory: ZERO_MEMORY.to_string(),
        port,
        env,
        volumes,
        created: details.created.clone(),
        started_at: details.started_at.clone(),
        labels: details.labels.clone(),
        version: "unknown".to_string(),
    }
}

/// `Nd Nh Nm` for a day or more, `Nh Nm` for an hour or more, else `Nm`.
pub fn format_uptime(elapsed: chrono::Duration) -> String {
    let minutes_total = elapsed.num_minutes().max(0);
    let days = minutes_total / (60 * 24);
    let hours = (minutes_total / 60) % 24;
    let minutes = minutes_total % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
