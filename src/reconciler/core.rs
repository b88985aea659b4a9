use super::identity::find_record;
use super::monitoring::RuntimeStatus;
use super::orphans::OrphanCleaner;
use crate::docker::{ContainerClient, ContainerInfo, CreateRequest};
use crate::error::Result;
use crate::logging::{LogEntry, Logger};
use crate::records::RecordStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Keeps configured server records and managed containers in agreement.
///
/// All methods take `&self`. Operations that read-modify-write records run
/// inside one exclusive section, so two reconciliations over the same store
/// never interleave. Internal helpers assume the section is already held.
pub struct Reconciler {
    pub(super) client: ContainerClient,
    pub(super) records: Arc<dyn RecordStore>,
    pub(super) logger: Logger,
    exclusive: Mutex<()>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(client: ContainerClient, records: Arc<dyn RecordStore>, logger: Logger) -> Self {
        Self {
            client,
            records,
            logger,
            exclusive: Mutex::new(()),
        }
    }

    pub fn builder() -> super::ReconcilerBuilder {
        super::ReconcilerBuilder::new()
    }

    pub fn client(&self) -> &ContainerClient {
        &self.client
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub(super) async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.exclusive.lock().await
    }

    /// Managed containers with display name and version merged in from their
    /// records. Orphans are cleaned up first; a cleanup failure is only logged.
    pub async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let _guard = self.exclusive().await;
        let records = self.records.configured_servers().await?;

        match OrphanCleaner::new(self).cleanup(&records).await {
            Ok(report) if report.has_failures() => self.logger.warn(format_args!(
                "Orphan cleanup left {} container(s) behind",
                report.failures.len()
            )),
            Ok(_) => {}
            Err(e) => self
                .logger
                .warn(format_args!("Orphan cleanup before listing failed: {}", e)),
        }

        let mut containers = self.client.list_managed().await?;
        for info in &mut containers {
            if let Some(record) = find_record(&records, &info.full_id) {
                info.display_name = record.name.clone();
                if !record.version.is_empty() {
                    info.version = record.version.clone();
                }
            }
        }
        Ok(containers)
    }

    /// Start a container and stamp `last_started` on its record.
    pub async fn start(&self, id: &str) -> Result<()> {
        let _guard = self.exclusive().await;
        self.client.start(id).await?;
        self.stamp_started(id).await;
        Ok(())
    }

    pub async fn stop(&self, id: &str) -> Result<()> {
        self.client.stop(id).await
    }

    pub async fn restart(&self, id: &str) -> Result<()> {
        let _guard = self.exclusive().await;
        self.client.restart(id).await?;
        self.stamp_started(id).await;
        Ok(())
    }

    /// Remove a container, then the record pointing at it (if any). Once the
    /// container is gone a record failure is only logged.
    pub async fn remove(&self, id: &str, force: bool) -> Result<()> {
        let _guard = self.exclusive().await;
        self.client.remove(id, force).await?;

        let records = match self.records.configured_servers().await {
            Ok(records) => records,
            Err(e) => {
                self.logger
                    .warn(format_args!("Container {} removed, records unreadable: {}", id, e));
                return Ok(());
            }
        };
        if let Some(record) = find_record(&records, id) {
            match self.records.remove_configured_server(&record.id).await {
                Ok(_) => self
                    .logger
                    .info(format_args!("Removed configured server {}", record.id)),
                Err(e) => self.logger.warn(format_args!(
                    "Container {} removed but record {} was kept: {}",
                    id, record.id, e
                )),
            }
        }
        Ok(())
    }

    pub async fn create(&self, request: &CreateRequest) -> Result<String> {
        self.client.create(request).await
    }

    pub async fn pull_image(&self, image: &str) -> Result<()> {
        self.client.pull_image(image).await
    }

    /// Probe the runtime endpoint once.
    pub async fn runtime_status(&self) -> RuntimeStatus {
        match self.client.ping().await {
            Ok(()) => RuntimeStatus::Running,
            Err(e) => {
                self.logger.debug(format_args!("Runtime ping failed: {}", e));
                RuntimeStatus::Unreachable
            }
        }
    }

    pub fn recent_logs(&self, count: usize) -> Vec<LogEntry> {
        self.logger.recent(count)
    }

    async fn stamp_started(&self, id: &str) {
        let records = match self.records.configured_servers().await {
            Ok(records) => records,
            Err(e) => {
                self.logger
                    .warn(format_args!("Could not load records to stamp start: {}", e));
                return;
            }
        };
        if let Some(record) = find_record(&records, id) {
            let mut record = record.clone();
            record.last_started = Some(Utc::now());
            if let Err(e) = self.records.upsert_configured_server(record).await {
                self.logger
                    .warn(format_args!("Could not record start time for {}: {}", id, e));
            }
        }
    }
}
