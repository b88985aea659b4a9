//! Docker Engine API adapter.
//!
//! Implements [`ContainerRuntime`] over `bollard`, translating between the
//! crate's runtime types and the engine's models, and mapping every engine
//! failure onto [`DockerError`].

use super::labels::LabelSelector;
use super::runtime::{
    ContainerDetails, ContainerRuntime, ContainerSpec, MountInfo, PortMapping,
};
use super::DockerError;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RestartContainerOptions, StartContainerOptions, StatsOptions,
    StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{CreateImageOptions, RemoveImageOptions};
use bollard::models::{
    ContainerStateStatusEnum, HostConfig, Mount, MountTypeEnum, PortBinding, RestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

/// Network every created container joins.
const NETWORK_MODE: &str = "bridge";

/// [`ContainerRuntime`] backed by the local Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform's default socket.
    ///
    /// Connecting does not contact the daemon; use [`ContainerRuntime::ping`]
    /// to find out whether it is actually reachable.
    pub fn connect() -> Result<Self, DockerError> {
        let docker = Docker::connect_with_local_defaults().map_err(DockerError::unavailable)?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Map an engine error for `operation` on `target`.
fn map_error(operation: &'static str, target: &str, err: BollardError) -> DockerError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => {
            if operation == "pull" || operation == "remove image" {
                DockerError::ImageNotFound {
                    image: target.to_string(),
                }
            } else {
                DockerError::container_not_found(target)
            }
        }
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => DockerError::api(operation, target, Some(status_code), message),
        BollardError::IOError { err } => DockerError::unavailable(err),
        other => {
            let text = other.to_string();
            let lower = text.to_lowercase();
            if lower.contains("connect") || lower.contains("socket") || lower.contains("no such file")
            {
                DockerError::unavailable(text)
            } else {
                DockerError::api(operation, target, None, text)
            }
        }
    }
}

fn restart_policy_name(policy: &str) -> Result<RestartPolicyNameEnum, DockerError> {
    match policy {
        "no" => Ok(RestartPolicyNameEnum::NO),
        "always" => Ok(RestartPolicyNameEnum::ALWAYS),
        "unless-stopped" => Ok(RestartPolicyNameEnum::UNLESS_STOPPED),
        "on-failure" => Ok(RestartPolicyNameEnum::ON_FAILURE),
        other => Err(DockerError::invalid_spec(format!(
            "unknown restart policy '{}'",
            other
        ))),
    }
}

fn state_name(status: &ContainerStateStatusEnum) -> &'static str {
    match status {
        ContainerStateStatusEnum::CREATED => "created",
        ContainerStateStatusEnum::RUNNING => "running",
        ContainerStateStatusEnum::PAUSED => "paused",
        ContainerStateStatusEnum::RESTARTING => "restarting",
        ContainerStateStatusEnum::REMOVING => "removing",
        ContainerStateStatusEnum::EXITED => "exited",
        ContainerStateStatusEnum::DEAD => "dead",
        ContainerStateStatusEnum::EMPTY => "",
    }
}

fn build_config(spec: &ContainerSpec) -> Result<Config<String>, DockerError> {
    let mounts: Vec<Mount> = spec
        .mounts
        .iter()
        .map(|m| Mount {
            source: Some(m.source.clone()),
            target: Some(m.target.clone()),
            typ: Some(MountTypeEnum::BIND),
            ..Default::default()
        })
        .collect();

    let restart_policy = match spec.restart_policy.as_deref() {
        Some(name) => Some(RestartPolicy {
            name: Some(restart_policy_name(name)?),
            ..Default::default()
        }),
        None => None,
    };

    let mut exposed_ports = None;
    let mut port_bindings = None;
    if let Some(publish) = &spec.port {
        let key = format!("{}/tcp", publish.container_port);
        exposed_ports = Some(HashMap::from([(key.clone(), HashMap::new())]));
        port_bindings = Some(HashMap::from([(
            key,
            Some(vec![PortBinding {
                host_ip: Some(publish.host_ip.clone()),
                host_port: Some(publish.host_port.to_string()),
            }]),
        )]));
    }

    let host_config = HostConfig {
        mounts: if mounts.is_empty() { None } else { Some(mounts) },
        memory: spec.memory_bytes,
        restart_policy,
        port_bindings,
        network_mode: Some(NETWORK_MODE.to_string()),
        ..Default::default()
    };

    Ok(Config {
        image: Some(spec.image.clone()),
        env: Some(spec.env.clone()),
        labels: Some(spec.labels.clone()),
        cmd: spec.cmd.clone(),
        exposed_ports,
        host_config: Some(host_config),
        ..Default::default()
    })
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    async fn ping(&self) -> Result<(), DockerError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| match map_error("ping", "daemon", e) {
                DockerError::Api { message, .. } => DockerError::unavailable(message),
                other => other,
            })
    }

    async fn list_containers(&self, selector: &LabelSelector) -> Result<Vec<String>, DockerError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), selector.to_filters());

        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(|e| map_error("list", "managed containers", e))?;

        Ok(summaries.into_iter().filter_map(|s| s.id).collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, DockerError> {
        let resp = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_error("inspect", id, e))?;

        let config = resp.config.unwrap_or_default();
        let state = resp.state.unwrap_or_default();

        let mounts = resp
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountInfo {
                source: m.source.unwrap_or_default(),
                destination: m.destination.unwrap_or_default(),
            })
            .collect();

        // Port keys are sorted so "first binding" is stable across calls.
        let mut ports = Vec::new();
        if let Some(port_map) = resp.network_settings.and_then(|n| n.ports) {
            let mut keys: Vec<_> = port_map.into_iter().collect();
            keys.sort_by(|a, b| a.0.cmp(&b.0));
            for (container_port, bindings) in keys {
                let bindings = bindings.unwrap_or_default();
                if bindings.is_empty() {
                    ports.push(PortMapping {
                        container_port,
                        host_ip: None,
                        host_port: None,
                    });
                    continue;
                }
                for binding in bindings {
                    ports.push(PortMapping {
                        container_port: container_port.clone(),
                        host_ip: binding.host_ip,
                        host_port: binding.host_port,
                    });
                }
            }
        }

        Ok(ContainerDetails {
            id: resp.id.unwrap_or_else(|| id.to_string()),
            name: resp.name.unwrap_or_default(),
            image: config.image.unwrap_or_default(),
            status: state
                .status
                .as_ref()
                .map(state_name)
                .unwrap_or_default()
                .to_string(),
            running: state.running.unwrap_or(false),
            started_at: state.started_at,
            created: resp.created,
            env: config.env.unwrap_or_default(),
            mounts,
            ports,
            labels: config.labels.unwrap_or_default(),
        })
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
        let config = build_config(spec)?;
        let resp = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.clone(),
                    ..Default::default()
                }),
                config,
            )
            .await
            .map_err(|e| map_error("create", &spec.name, e))?;
        Ok(resp.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_error("start", id, e))
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), DockerError> {
        self.docker
            .stop_container(
                id,
                Some(StopContainerOptions {
                    t: grace.as_secs() as _,
                }),
            )
            .await
            .map_err(|e| map_error("stop", id, e))
    }

    async fn restart_container(&self, id: &str, grace: Duration) -> Result<(), DockerError> {
        self.docker
            .restart_container(
                id,
                Some(RestartContainerOptions {
                    t: grace.as_secs() as _,
                }),
            )
            .await
            .map_err(|e| map_error("restart", id, e))
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), DockerError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| map_error("remove", id, e))
    }

    async fn container_stats(&self, id: &str) -> Result<serde_json::Value, DockerError> {
        let mut stream = self.docker.stats(
            id,
            Some(StatsOptions {
                stream: false,
                one_shot: false,
            }),
        );

        match stream.next().await {
            Some(Ok(stats)) => serde_json::to_value(stats)
                .map_err(|e| DockerError::api("stats", id, None, e.to_string())),
            Some(Err(e)) => Err(map_error("stats", id, e)),
            None => Err(DockerError::api("stats", id, None, "empty stats stream")),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        let mut stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(progress) = stream.next().await {
            progress.map_err(|e| map_error("pull", image, e))?;
        }
        Ok(())
    }

    async fn remove_image(&self, image: &str, force: bool) -> Result<(), DockerError> {
        self.docker
            .remove_image(
                image,
                Some(RemoveImageOptions {
                    force,
                    ..Default::default()
                }),
                None,
            )
            .await
            .map(|_| ())
            .map_err(|e| map_error("remove image", image, e))
    }
}
