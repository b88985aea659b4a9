//! Propagating server default changes to existing containers.

use super::core::Reconciler;
use super::identity::find_container;
use super::recreate::{DesiredSettings, RecreateOutcome};
use super::report::BulkReport;
use crate::config::ServerDefaults;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;

/// Which recreation-relevant defaults differ between two versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SettingsChange {
    pub port_changed: bool,
    pub memory_changed: bool,
    pub restart_policy_changed: bool,
}

impl SettingsChange {
    pub fn between(old: &ServerDefaults, new: &ServerDefaults) -> Self {
        Self {
            port_changed: old.default_port != new.default_port,
            memory_changed: old.max_memory_mb != new.max_memory_mb,
            restart_policy_changed: old.restart_on_failure != new.restart_on_failure,
        }
    }

    pub fn affects_containers(&self) -> bool {
        self.port_changed || self.memory_changed || self.restart_policy_changed
    }

    fn affects_runtime_settings(&self) -> bool {
        self.memory_changed || self.restart_policy_changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultsChangeOutcome {
    pub change: SettingsChange,
    pub ports: Option<BulkReport>,
    pub settings: Option<BulkReport>,
}

impl DefaultsChangeOutcome {
    pub fn recreation_needed(&self) -> bool {
        self.change.affects_containers()
    }
}

impl Reconciler {
    /// Recreate every running linked container with `defaults`' memory and
    /// restart settings, keeping each record's port.
    ///
    /// Records whose container is missing are treated as not running. One
    /// record's failure does not stop the others.
    pub async fn apply_settings_to_existing(&self, defaults: &ServerDefaults) -> Result<BulkReport> {
        let _guard = self.exclusive().await;
        self.apply_settings_locked(defaults, &HashSet::new()).await
    }

    async fn apply_settings_locked(
        &self,
        defaults: &ServerDefaults,
        exclude: &HashSet<String>,
    ) -> Result<BulkReport> {
        let settings = DesiredSettings::from_defaults(defaults);
        let mut report = BulkReport::new("apply settings");

        let records: Vec<_> = self
            .records
            .configured_servers()
            .await?
            .into_iter()
            .filter(|r| r.is_linked() && !exclude.contains(&r.id))
            .collect();
        if records.is_empty() {
            return Ok(report);
        }

        let containers = self.client.list_managed().await?;
        for record in records {
            if record.is_dangling() {
                report.skip(&record.id, "needs repair after a failed recreation");
                continue;
            }
            let Some(info) = find_container(&containers, &record) else {
                self.logger.debug(format_args!(
                    "Container for {} not found, treating as not running",
                    record.name
                ));
                report.skip(&record.id, "container not found");
                continue;
            };

            match self
                .recreate_locked(&record, info, record.port, &settings)
                .await
            {
                Ok(RecreateOutcome::Recreated { .. }) => report.recreate(&record.id),
                Ok(RecreateOutcome::NotRunning) => report.skip(&record.id, "not running"),
                Err(e) => {
                    self.logger.warn(format_args!(
                        "Failed to apply settings to {}: {}",
                        record.name, e
                    ));
                    report.fail(&record.id, e);
                }
            }
        }

        Ok(report)
    }

    /// React to an edit of the server defaults.
    ///
    /// A port change renumbers all records (recreating running containers
    /// with the new settings as it goes); memory or restart changes are then
    /// applied to whatever the renumbering did not already rebuild. Cosmetic
    /// changes recreate nothing.
    pub async fn apply_defaults_change(
        &self,
        old: &ServerDefaults,
        new: &ServerDefaults,
    ) -> Result<DefaultsChangeOutcome> {
        let change = SettingsChange::between(old, new);
        let mut outcome = DefaultsChangeOutcome {
            change,
            ports: None,
            settings: None,
        };
        if !change.affects_containers() {
            self.logger
                .debug("Server defaults change does not affect containers");
            return Ok(outcome);
        }

        let _guard = self.exclusive().await;
        let mut rebuilt = HashSet::new();
        if change.port_changed {
            let report = self.reallocate_ports_locked(new.default_port, new).await?;
            rebuilt.extend(report.recreated.iter().cloned());
            outcome.ports = Some(report);
        }
        if change.affects_runtime_settings() {
            outcome.settings = Some(self.apply_settings_locked(new, &rebuilt).await?);
        }
        Ok(outcome)
    }
}
