//! Settings application by recreation.
//!
//! A running container's port, memory ceiling and restart policy cannot be
//! changed in place, so they are applied by rebuilding it:
//!
//! ```text
//! Stopping -> Removing -> Creating -> Starting -> (marker cleared)
//! ```
//!
//! The record carries a [`RecreationMarker`] for the phase about to run,
//! persisted before the step starts. A failure while stopping or removing
//! leaves the old container in place, so the marker is dropped again. A
//! failure while creating or starting means the old container is gone; the
//! marker stays (with the error) and the record is reported as dangling until
//! [`Reconciler::resolve_dangling`] repairs it. Nothing is retried.

use super::core::Reconciler;
use super::identity::{find_container, ids_match};
use crate::config::ServerDefaults;
use crate::docker::client::short_id;
use crate::docker::{ContainerInfo, CreateRequest};
use crate::error::{Error, Result};
use crate::records::{ConfiguredServer, RecreationMarker, RecreationPhase};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

/// Container settings that only take effect through recreation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSettings {
    pub memory_limit_mb: u64,
    pub restart_policy: String,
}

impl DesiredSettings {
    pub fn from_defaults(defaults: &ServerDefaults) -> Self {
        Self {
            memory_limit_mb: defaults.max_memory_mb,
            restart_policy: defaults.restart_policy().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecreateOutcome {
    /// The container was not running; the new settings apply on next start.
    NotRunning,
    Recreated { container_id: String },
}

/// Linkage between a record and the runtime, as far as reconciliation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Unlinked,
    Stopped,
    Running,
    Recreating,
    Dangling,
}

/// Why a record needs attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DanglingReason {
    /// A rebuild failed after the previous container was removed.
    FailedRecreation {
        phase: RecreationPhase,
        error: Option<String>,
    },
    /// The referenced container no longer exists.
    MissingContainer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DanglingServer {
    pub server: ConfiguredServer,
    #[serde(flatten)]
    pub reason: DanglingReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    /// Record was not marked and its container exists.
    NothingToRepair,
    /// Container exists; the stale marker was dropped.
    MarkerCleared,
    /// Container is gone; the record no longer references it.
    Unlinked,
}

/// Derive the link state of a record from the observed container, if any.
pub fn link_state(record: &ConfiguredServer, observed: Option<&ContainerInfo>) -> LinkState {
    if let Some(marker) = &record.recreation {
        if marker.error.is_some() || (marker.phase.old_container_gone() && observed.is_none()) {
            return LinkState::Dangling;
        }
        return LinkState::Recreating;
    }
    if !record.is_linked() {
        return LinkState::Unlinked;
    }
    match observed {
        None => LinkState::Dangling,
        Some(info) if info.is_running() => LinkState::Running,
        Some(_) => LinkState::Stopped,
    }
}

/// Parse `source:destination` volume strings. The last `:` splits.
fn volumes_from_info(info: &ContainerInfo) -> HashMap<String, String> {
    info.volumes
        .iter()
        .filter_map(|v| v.rsplit_once(':'))
        .map(|(source, dest)| (source.to_string(), dest.to_string()))
        .collect()
}

impl Reconciler {
    /// Rebuild `existing`'s container with a new host port and settings.
    pub async fn recreate(
        &self,
        existing: &ConfiguredServer,
        info: &ContainerInfo,
        port: u16,
        settings: &DesiredSettings,
    ) -> Result<RecreateOutcome> {
        let _guard = self.exclusive().await;
        self.recreate_locked(existing, info, port, settings).await
    }

    pub(super) async fn recreate_locked(
        &self,
        existing: &ConfiguredServer,
        info: &ContainerInfo,
        port: u16,
        settings: &DesiredSettings,
    ) -> Result<RecreateOutcome> {
        if !info.is_running() {
            self.logger.debug(format_args!(
                "{} is not running, new settings apply on next start",
                existing.name
            ));
            return Ok(RecreateOutcome::NotRunning);
        }

        let old_id = info.full_id.clone();
        let mut record = existing.clone();
        self.logger.info(format_args!(
            "Recreating {} ({}) on port {}",
            record.name,
            short_id(&old_id),
            port
        ));

        // Stop and remove: the old container survives a failure here.
        for phase in [RecreationPhase::Stopping, RecreationPhase::Removing] {
            self.mark(&mut record, phase, &old_id, port, None).await?;
            let step = match phase {
                RecreationPhase::Stopping => self.client.stop(&old_id).await,
                _ => self.client.remove(&old_id, true).await,
            };
            if let Err(e) = step {
                self.logger.warn(format_args!(
                    "Recreation of {} failed while {}: {}",
                    record.name, phase, e
                ));
                record.recreation = None;
                if let Err(persist) = self.records.upsert_configured_server(record).await {
                    self.logger.error(format_args!(
                        "Could not clear recreation marker: {}",
                        persist
                    ));
                }
                return Err(e);
            }
        }

        self.mark(&mut record, RecreationPhase::Creating, &old_id, port, None)
            .await?;
        let request = CreateRequest {
            name: info.name.clone(),
            image: info.image.clone(),
            host_port: port,
            container_port: record.container_port,
            env: info.env.clone(),
            volumes: volumes_from_info(info),
            labels: info.labels.clone(),
            command: record.docker_command.clone(),
            memory_limit_mb: settings.memory_limit_mb,
            restart_policy: settings.restart_policy.clone(),
        };
        let new_id = match self.client.create(&request).await {
            Ok(id) => id,
            Err(e) => return Err(self.leave_dangling(record, RecreationPhase::Creating, port, e).await),
        };

        record.container_id = new_id.clone();
        record.port = port;
        self.mark(&mut record, RecreationPhase::Starting, &old_id, port, None)
            .await?;

        if let Err(e) = self.client.start(&new_id).await {
            return Err(self.leave_dangling(record, RecreationPhase::Starting, port, e).await);
        }

        record.recreation = None;
        record.last_started = Some(Utc::now());
        self.records.upsert_configured_server(record.clone()).await?;
        self.logger.info(format_args!(
            "Recreated {}: {} -> {}",
            record.name,
            short_id(&old_id),
            short_id(&new_id)
        ));

        Ok(RecreateOutcome::Recreated {
            container_id: new_id,
        })
    }

    async fn mark(
        &self,
        record: &mut ConfiguredServer,
        phase: RecreationPhase,
        previous: &str,
        port: u16,
        error: Option<String>,
    ) -> Result<()> {
        record.recreation = Some(RecreationMarker {
            phase,
            previous_container_id: previous.to_string(),
            target_port: port,
            updated_at: Utc::now(),
            error,
        });
        self.records.upsert_configured_server(record.clone()).await
    }

    /// Persist the failure on the marker and build the `Dangling` error.
    async fn leave_dangling(
        &self,
        mut record: ConfiguredServer,
        phase: RecreationPhase,
        port: u16,
        cause: Error,
    ) -> Error {
        self.logger.error(format_args!(
            "Recreation of {} failed while {} after the old container was removed: {}",
            record.name, phase, cause
        ));

        let previous = record
            .recreation
            .as_ref()
            .map(|m| m.previous_container_id.clone())
            .unwrap_or_default();
        if let Err(e) = self
            .mark(&mut record, phase, &previous, port, Some(cause.to_string()))
            .await
        {
            self.logger
                .error(format_args!("Could not persist dangling marker: {}", e));
        }

        Error::Dangling {
            server: record.id,
            container_id: record.container_id,
            phase: phase.to_string(),
        }
    }

    /// Records needing manual attention: any record still carrying a
    /// recreation marker, and linked records whose container no longer exists.
    pub async fn dangling_servers(&self) -> Result<Vec<DanglingServer>> {
        let _guard = self.exclusive().await;
        let records = self.records.configured_servers().await?;
        let containers = self.client.list_managed().await?;

        let mut dangling = Vec::new();
        for record in records {
            if let Some(marker) = record.recreation.as_ref() {
                let reason = DanglingReason::FailedRecreation {
                    phase: marker.phase,
                    error: marker.error.clone(),
                };
                dangling.push(DanglingServer {
                    server: record,
                    reason,
                });
                continue;
            }
            if record.is_linked() && find_container(&containers, &record).is_none() {
                dangling.push(DanglingServer {
                    server: record,
                    reason: DanglingReason::MissingContainer,
                });
            }
        }
        Ok(dangling)
    }

    /// Manual repair of one record.
    ///
    /// If the referenced container exists the marker is dropped; otherwise the
    /// record is unlinked so it can be instantiated again.
    pub async fn resolve_dangling(&self, server_id: &str) -> Result<RepairOutcome> {
        let _guard = self.exclusive().await;
        let mut record = self
            .records
            .configured_server(server_id)
            .await?
            .ok_or_else(|| Error::server_not_found(server_id))?;

        let exists = if record.is_linked() {
            match self.client.get_info(&record.container_id).await {
                Ok(info) => ids_match(&record.container_id, &info.full_id),
                Err(e) if e.is_not_found() => false,
                Err(e) => return Err(e),
            }
        } else {
            false
        };

        let outcome = match (exists, record.recreation.is_some()) {
            (true, false) => return Ok(RepairOutcome::NothingToRepair),
            (true, true) => RepairOutcome::MarkerCleared,
            (false, _) => {
                record.container_id.clear();
                RepairOutcome::Unlinked
            }
        };
        record.recreation = None;
        self.records.upsert_configured_server(record).await?;
        self.logger.info(format_args!(
            "Repaired server {}: {:?}",
            server_id, outcome
        ));
        Ok(outcome)
    }
}
