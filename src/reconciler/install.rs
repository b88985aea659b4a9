//! Installing images and turning them into configured servers.

use super::core::Reconciler;
use super::report::BulkReport;
use crate::config::ServerDefaults;
use crate::docker::client::short_id;
use crate::docker::CreateRequest;
use crate::error::{Error, Result};
use crate::port::next_free_port;
use crate::records::{CatalogEntry, ConfiguredServer, InstalledServer, ServerMetadata};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

const MANUAL_SOURCE: &str = "Custom Docker";

/// Parameters for materializing an installed server as a container.
#[derive(Debug, Clone, Default)]
pub struct InstantiateRequest {
    pub installed_server_id: String,
    pub container_name: String,
    /// Explicit host port; allocated from the defaults when `None`.
    pub port: Option<u16>,
    pub environment: HashMap<String, String>,
    pub volumes: HashMap<String, String>,
    /// Overrides `ServerDefaults::auto_start`.
    pub auto_start: Option<bool>,
}

/// An installed server next to the newest version its catalog offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateStatus {
    pub installed: InstalledServer,
    pub update_available: bool,
    /// Catalog version for the image, or the installed one when the image is
    /// not in the catalog.
    pub latest_version: String,
}

/// Match installed servers to catalog entries by image.
///
/// Versions are compared as plain strings, so any difference counts as an
/// update. When the catalog lists an image twice the later entry wins.
pub fn check_updates(installed: &[InstalledServer], catalog: &[CatalogEntry]) -> Vec<UpdateStatus> {
    let by_image: HashMap<&str, &CatalogEntry> = catalog
        .iter()
        .map(|entry| (entry.docker_image.as_str(), entry))
        .collect();

    installed
        .iter()
        .map(|server| match by_image.get(server.docker_image.as_str()) {
            Some(entry) => UpdateStatus {
                installed: server.clone(),
                update_available: entry.version != server.version,
                latest_version: entry.version.clone(),
            },
            None => UpdateStatus {
                installed: server.clone(),
                update_available: false,
                latest_version: server.version.clone(),
            },
        })
        .collect()
}

/// Lowercased name with spaces replaced by dashes.
fn slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

fn installed_id(name: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", slug(name), now.timestamp())
}

/// `configured-<unix ts>`, suffixed when a record already uses it.
fn configured_id(existing: &[ConfiguredServer], now: DateTime<Utc>) -> String {
    let base = format!("configured-{}", now.timestamp());
    if !existing.iter().any(|s| s.id == base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !existing.iter().any(|s| &s.id == candidate))
        .unwrap_or(base)
}

impl Reconciler {
    /// Pull a catalog entry's image and record it as installed.
    ///
    /// Re-installing a server with the same name and image updates the
    /// existing record in place.
    pub async fn install_server(&self, entry: CatalogEntry) -> Result<InstalledServer> {
        self.client.pull_image(&entry.docker_image).await?;

        let _guard = self.exclusive().await;
        let now = Utc::now();
        let existing = self
            .records
            .installed_servers()
            .await?
            .into_iter()
            .find(|s| s.name == entry.name && s.docker_image == entry.docker_image);

        let server = match existing {
            Some(previous) => {
                let mut updated =
                    InstalledServer::from_catalog(previous.id.clone(), entry, now);
                updated.install_date = previous.install_date;
                updated
            }
            None => {
                let id = installed_id(&entry.name, now);
                InstalledServer::from_catalog(id, entry, now)
            }
        };

        self.records.upsert_installed_server(server.clone()).await?;
        self.logger.info(format_args!(
            "Installed {} {} ({})",
            server.name, server.version, server.docker_image
        ));
        Ok(server)
    }

    /// Installed servers with their update status against `catalog`.
    pub async fn installed_with_updates(&self, catalog: &[CatalogEntry]) -> Result<Vec<UpdateStatus>> {
        let installed = self.records.installed_servers().await?;
        Ok(check_updates(&installed, catalog))
    }

    /// Register an image that is not in any catalog.
    pub async fn install_manual(
        &self,
        image: &str,
        name: &str,
        description: &str,
    ) -> Result<InstalledServer> {
        self.client.pull_image(image).await?;

        let _guard = self.exclusive().await;
        let now = Utc::now();
        let server = InstalledServer {
            id: format!("manual-{}", installed_id(name, now)),
            name: name.to_string(),
            docker_image: image.to_string(),
            version: "latest".to_string(),
            metadata: ServerMetadata {
                description: description.to_string(),
                setup_description: format!(
                    "Manually configured Docker container from image {}",
                    image
                ),
                license: "Unknown".to_string(),
                maintainer: "Custom".to_string(),
                tags: vec!["manual".to_string(), "custom".to_string()],
                architecture: vec!["amd64".to_string()],
                ..Default::default()
            },
            install_date: now,
            last_updated: now,
            source_registry: MANUAL_SOURCE.to_string(),
            is_official: false,
        };

        self.records.upsert_installed_server(server.clone()).await?;
        self.logger
            .info(format_args!("Installed custom image {} as {}", image, server.id));
        Ok(server)
    }

    /// Remove an installed server and everything instantiated from it.
    ///
    /// Dependent containers are force-removed best effort, their records are
    /// deleted, and the image is removed when asked (a failure there is only
    /// logged).
    pub async fn uninstall_server(&self, id: &str, remove_image: bool) -> Result<BulkReport> {
        let _guard = self.exclusive().await;
        let installed = self
            .records
            .installed_server(id)
            .await?
            .ok_or_else(|| Error::installed_not_found(id))?;

        let mut report = BulkReport::new("uninstall server");
        let dependents: Vec<_> = self
            .records
            .configured_servers()
            .await?
            .into_iter()
            .filter(|s| s.installed_server_id == id)
            .collect();

        for dependent in dependents {
            if dependent.is_linked() {
                if let Err(e) = self.client.remove(&dependent.container_id, true).await {
                    self.logger.warn(format_args!(
                        "Could not remove container {} of {}: {}",
                        short_id(&dependent.container_id),
                        dependent.name,
                        e
                    ));
                }
            }
            match self.records.remove_configured_server(&dependent.id).await {
                Ok(_) => report.succeed(&dependent.id),
                Err(e) => report.fail(&dependent.id, e),
            }
        }

        if remove_image {
            if let Err(e) = self.client.remove_image(&installed.docker_image, false).await {
                self.logger.warn(format_args!(
                    "Failed to remove image {}: {}",
                    installed.docker_image, e
                ));
            }
        }

        self.records.remove_installed_server(id).await?;
        self.logger
            .info(format_args!("Uninstalled {} ({})", installed.name, id));
        Ok(report)
    }

    /// Create a container for an installed server and record it.
    ///
    /// The container is started when auto-start is on. If the record cannot
    /// be saved the new container is removed again.
    pub async fn instantiate(
        &self,
        request: InstantiateRequest,
        defaults: &ServerDefaults,
    ) -> Result<ConfiguredServer> {
        let _guard = self.exclusive().await;
        let installed = self
            .records
            .installed_server(&request.installed_server_id)
            .await?
            .ok_or_else(|| Error::installed_not_found(&request.installed_server_id))?;

        let existing = self.records.configured_servers().await?;
        let used: HashSet<u16> = existing.iter().map(|s| s.port).collect();
        let port = match request.port {
            Some(port) if port > 0 => {
                if let Some(holder) = existing.iter().find(|s| s.port == port) {
                    return Err(Error::Validation(format!(
                        "Port {} is already assigned to {}",
                        port, holder.name
                    )));
                }
                port
            }
            _ => next_free_port(defaults.default_port, &used)?,
        };

        let container_port = installed.container_port();
        let command = Some(installed.metadata.docker_command.clone()).filter(|c| !c.trim().is_empty());
        let create = CreateRequest {
            name: request.container_name.clone(),
            image: installed.docker_image.clone(),
            host_port: port,
            container_port,
            env: request.environment.clone(),
            volumes: request.volumes.clone(),
            labels: HashMap::new(),
            command: command.clone(),
            memory_limit_mb: defaults.max_memory_mb,
            restart_policy: defaults.restart_policy().to_string(),
        };
        let container_id = self.client.create(&create).await?;

        let now = Utc::now();
        let mut server = ConfiguredServer {
            id: configured_id(&existing, now),
            name: installed.name.clone(),
            container_name: request.container_name,
            container_id: container_id.clone(),
            installed_server_id: installed.id.clone(),
            version: installed.version.clone(),
            docker_image: installed.docker_image.clone(),
            docker_command: command,
            port,
            container_port,
            environment: request.environment,
            volumes: request.volumes,
            created_date: now,
            last_started: None,
            auto_start: request.auto_start.unwrap_or(defaults.auto_start),
            recreation: None,
        };

        if let Err(e) = self.records.upsert_configured_server(server.clone()).await {
            self.logger.error(format_args!(
                "Failed to save {}, removing its container: {}",
                server.name, e
            ));
            if let Err(cleanup) = self.client.remove(&container_id, true).await {
                self.logger.warn(format_args!(
                    "Compensating removal of {} failed: {}",
                    short_id(&container_id),
                    cleanup
                ));
            }
            return Err(e);
        }

        if server.auto_start {
            self.client.start(&container_id).await?;
            server.last_started = Some(Utc::now());
            self.records.upsert_configured_server(server.clone()).await?;
        }

        self.logger.info(format_args!(
            "Configured {} on port {} ({})",
            server.name,
            port,
            short_id(&container_id)
        ));
        Ok(server)
    }
}
