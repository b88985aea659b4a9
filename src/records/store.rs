use super::types::{ConfiguredServer, InstalledServer};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read/write access to the persisted server records.
///
/// Collections keep their stored order. Upserts replace an existing record
/// in place and append new ones.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn installed_servers(&self) -> Result<Vec<InstalledServer>>;

    async fn upsert_installed_server(&self, server: InstalledServer) -> Result<()>;

    /// Returns whether a record was removed.
    async fn remove_installed_server(&self, id: &str) -> Result<bool>;

    async fn configured_servers(&self) -> Result<Vec<ConfiguredServer>>;

    async fn upsert_configured_server(&self, server: ConfiguredServer) -> Result<()>;

    /// Returns whether a record was removed.
    async fn remove_configured_server(&self, id: &str) -> Result<bool>;

    async fn installed_server(&self, id: &str) -> Result<Option<InstalledServer>> {
        Ok(self
            .installed_servers()
            .await?
            .into_iter()
            .find(|s| s.id == id))
    }

    async fn configured_server(&self, id: &str) -> Result<Option<ConfiguredServer>> {
        Ok(self
            .configured_servers()
            .await?
            .into_iter()
            .find(|s| s.id == id))
    }
}

/// Both record collections, as serialized to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub installed_servers: Vec<InstalledServer>,
    #[serde(default)]
    pub configured_servers: Vec<ConfiguredServer>,
}

impl RecordSet {
    pub fn upsert_installed(&mut self, server: InstalledServer) {
        match self.installed_servers.iter_mut().find(|s| s.id == server.id) {
            Some(existing) => *existing = server,
            None => self.installed_servers.push(server),
        }
    }

    pub fn remove_installed(&mut self, id: &str) -> bool {
        let before = self.installed_servers.len();
        self.installed_servers.retain(|s| s.id != id);
        self.installed_servers.len() != before
    }

    pub fn upsert_configured(&mut self, server: ConfiguredServer) {
        match self.configured_servers.iter_mut().find(|s| s.id == server.id) {
            Some(existing) => *existing = server,
            None => self.configured_servers.push(server),
        }
    }

    pub fn remove_configured(&mut self, id: &str) -> bool {
        let before = self.configured_servers.len();
        self.configured_servers.retain(|s| s.id != id);
        self.configured_servers.len() != before
    }
}
