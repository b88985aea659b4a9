use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key in the declared ports map naming the server's listening port.
pub const MCP_PORT_KEY: &str = "mcp";

/// Descriptive fields shared by catalog entries and installed servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerMetadata {
    pub description: String,
    pub setup_description: String,
    pub support_url: String,
    pub license: String,
    pub maintainer: String,
    pub tags: Vec<String>,
    pub architecture: Vec<String>,
    pub health_check: HashMap<String, serde_json::Value>,
    pub resource_requirements: HashMap<String, serde_json::Value>,
    pub docker_command: String,
    pub environment_variables: HashMap<String, serde_json::Value>,
    pub ports: HashMap<String, serde_json::Value>,
    pub volumes: Vec<serde_json::Value>,
}

impl ServerMetadata {
    /// Declared MCP port: a number or a numeric string under `ports.mcp`, else 0.
    pub fn mcp_port(&self) -> u16 {
        match self.ports.get(MCP_PORT_KEY) {
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(0),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

/// A server as published by a catalog, before it is installed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub docker_image: String,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub metadata: ServerMetadata,
    #[serde(default)]
    pub source_registry_name: String,
    #[serde(default)]
    pub is_official: bool,
}

/// An image that has been pulled and can be instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledServer {
    pub id: String,
    pub name: String,
    pub docker_image: String,
    pub version: String,
    #[serde(flatten)]
    pub metadata: ServerMetadata,
    pub install_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub source_registry: String,
    #[serde(default)]
    pub is_official: bool,
}

impl InstalledServer {
    pub fn from_catalog(id: impl Into<String>, entry: CatalogEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: entry.name,
            docker_image: entry.docker_image,
            version: entry.version,
            metadata: entry.metadata,
            install_date: now,
            last_updated: now,
            source_registry: entry.source_registry_name,
            is_official: entry.is_official,
        }
    }

    pub fn container_port(&self) -> u16 {
        self.metadata.mcp_port()
    }
}

/// Where a record stands in a multi-step recreation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecreationPhase {
    Stopping,
    Removing,
    Creating,
    Starting,
}

impl RecreationPhase {
    /// Whether the previous container may already be gone in this phase.
    pub fn old_container_gone(&self) -> bool {
        matches!(self, RecreationPhase::Creating | RecreationPhase::Starting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecreationPhase::Stopping => "stopping",
            RecreationPhase::Removing => "removing",
            RecreationPhase::Creating => "creating",
            RecreationPhase::Starting => "starting",
        }
    }
}

impl std::fmt::Display for RecreationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted while a recreation is in flight, and left behind when one fails
/// after the old container was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecreationMarker {
    pub phase: RecreationPhase,
    pub previous_container_id: String,
    pub target_port: u16,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Desired state for one server instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredServer {
    pub id: String,
    pub name: String,
    pub container_name: String,
    /// Empty until the first container is created. May be abbreviated.
    #[serde(default)]
    pub container_id: String,
    pub installed_server_id: String,
    #[serde(default)]
    pub version: String,
    pub docker_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_command: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub container_port: u16,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Host path to container path.
    #[serde(default)]
    pub volumes: HashMap<String, String>,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub last_started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recreation: Option<RecreationMarker>,
}

impl ConfiguredServer {
    pub fn is_linked(&self) -> bool {
        !self.container_id.is_empty()
    }

    pub fn is_dangling(&self) -> bool {
        self.recreation
            .as_ref()
            .map(|m| m.phase.old_container_gone())
            .unwrap_or(false)
    }

    /// Internal port, falling back to the host port when unset.
    pub fn effective_container_port(&self) -> u16 {
        if self.container_port == 0 {
            self.port
        } else {
            self.container_port
        }
    }
}
