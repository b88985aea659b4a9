//! Orphan detection and cleanup.
//!
//! An orphan is a container carrying the ownership label that no configured
//! server references. Orphans are produced when a record is deleted while its
//! container removal fails, or when the record store is reset.

use super::core::Reconciler;
use super::identity::is_tracked;
use super::report::BulkReport;
use crate::docker::client::short_id;
use crate::docker::ContainerInfo;
use crate::error::Result;
use crate::records::ConfiguredServer;

/// Short-lived helper borrowing a [`Reconciler`].
pub(super) struct OrphanCleaner<'a> {
    reconciler: &'a Reconciler,
}

impl<'a> OrphanCleaner<'a> {
    pub fn new(reconciler: &'a Reconciler) -> Self {
        Self { reconciler }
    }

    /// Managed containers not referenced by any record.
    pub async fn detect(&self, configured: &[ConfiguredServer]) -> Result<Vec<ContainerInfo>> {
        let containers = self.reconciler.client.list_managed().await?;
        Ok(containers
            .into_iter()
            .filter(|c| !is_tracked(configured, &c.full_id))
            .collect())
    }

    /// Stop (if running) and force-remove every orphan. Failures are logged
    /// and the remaining orphans are still processed.
    pub async fn cleanup(&self, configured: &[ConfiguredServer]) -> Result<BulkReport> {
        let logger = &self.reconciler.logger;
        let client = &self.reconciler.client;
        let mut report = BulkReport::new("cleanup orphans");

        for orphan in self.detect(configured).await? {
            let label = format!("{} ({})", orphan.name, orphan.id);
            logger.info(format_args!("Removing orphaned container {}", label));

            if orphan.is_running() {
                if let Err(e) = client.stop(&orphan.full_id).await {
                    logger.warn(format_args!(
                        "Failed to stop orphaned container {}: {}",
                        short_id(&orphan.full_id),
                        e
                    ));
                }
            }

            match client.remove(&orphan.full_id, true).await {
                Ok(()) => report.succeed(label),
                Err(e) => {
                    logger.error(format_args!(
                        "Failed to remove orphaned container {}: {}",
                        label, e
                    ));
                    report.fail(label, e);
                }
            }
        }

        Ok(report)
    }
}

impl Reconciler {
    pub async fn detect_orphans(&self) -> Result<Vec<ContainerInfo>> {
        let records = self.records.configured_servers().await?;
        OrphanCleaner::new(self).detect(&records).await
    }

    pub async fn cleanup_orphans(&self) -> Result<BulkReport> {
        let _guard = self.exclusive().await;
        let records = self.records.configured_servers().await?;
        OrphanCleaner::new(self).cleanup(&records).await
    }

    /// Detection against an explicit record set rather than the store.
    pub async fn detect_orphans_in(
        &self,
        configured: &[ConfiguredServer],
    ) -> Result<Vec<ContainerInfo>> {
        OrphanCleaner::new(self).detect(configured).await
    }
}
