//! Host port reallocation after the default base port changes.

use super::core::Reconciler;
use super::identity::find_container;
use super::recreate::{DesiredSettings, RecreateOutcome};
use super::report::BulkReport;
use crate::config::ServerDefaults;
use crate::docker::ContainerInfo;
use crate::error::Result;
use crate::port::PortAssigner;

impl Reconciler {
    /// Renumber every configured server from `base`, in stored order.
    ///
    /// Each record is persisted with its new port as it is assigned. Running
    /// linked containers whose port changed are recreated with the new port
    /// and `defaults`' memory/restart settings; stopped ones pick the port up
    /// at their next start. Running out of ports aborts the pass with
    /// `RangeExhausted`, keeping assignments already persisted.
    pub async fn reallocate_ports(&self, base: u16, defaults: &ServerDefaults) -> Result<BulkReport> {
        let _guard = self.exclusive().await;
        self.reallocate_ports_locked(base, defaults).await
    }

    pub(super) async fn reallocate_ports_locked(
        &self,
        base: u16,
        defaults: &ServerDefaults,
    ) -> Result<BulkReport> {
        let records = self.records.configured_servers().await?;
        let settings = DesiredSettings::from_defaults(defaults);
        let mut report = BulkReport::new("reallocate ports");

        if records.is_empty() {
            return Ok(report);
        }

        let containers: Vec<ContainerInfo> = match self.client.list_managed().await {
            Ok(containers) => containers,
            Err(e) if e.is_unavailable() => {
                self.logger.warn(format_args!(
                    "Runtime unavailable, updating port records only: {}",
                    e
                ));
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut assigner = PortAssigner::new(base);
        for mut record in records {
            let port = match assigner.assign() {
                Ok(port) => port,
                Err(e) => {
                    self.logger
                        .error(format_args!("Port reallocation from {} aborted: {}", base, e));
                    return Err(e);
                }
            };

            let old_port = record.port;
            record.port = port;
            if let Err(e) = self.records.upsert_configured_server(record.clone()).await {
                self.logger
                    .warn(format_args!("Failed to save port for {}: {}", record.id, e));
                report.fail(&record.id, e);
                continue;
            }
            self.logger.debug(format_args!(
                "Assigned port {} to {} (was {})",
                port, record.name, old_port
            ));

            if !record.is_linked() || old_port == port {
                report.succeed(&record.id);
                continue;
            }

            let Some(info) = find_container(&containers, &record) else {
                report.skip(&record.id, "container not found, port applies on next create");
                continue;
            };

            match self.recreate_locked(&record, info, port, &settings).await {
                Ok(RecreateOutcome::Recreated { .. }) => report.recreate(&record.id),
                Ok(RecreateOutcome::NotRunning) => report.succeed(&record.id),
                Err(e) => {
                    self.logger.warn(format_args!(
                        "Failed to move {} to port {}: {}",
                        record.name, port, e
                    ));
                    report.fail(&record.id, e);
                }
            }
        }

        Ok(report)
    }
}
