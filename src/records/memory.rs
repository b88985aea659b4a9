use super::store::{RecordSet, RecordStore};
use super::types::{ConfiguredServer, InstalledServer};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

/// Non-persistent store. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<RecordSet>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: RecordSet) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn snapshot(&self) -> RecordSet {
        self.records.read().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn installed_servers(&self) -> Result<Vec<InstalledServer>> {
        Ok(self.records.read().installed_servers.clone())
    }

    async fn upsert_installed_server(&self, server: InstalledServer) -> Result<()> {
        self.records.write().upsert_installed(server);
        Ok(())
    }

    async fn remove_installed_server(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().remove_installed(id))
    }

    async fn configured_servers(&self) -> Result<Vec<ConfiguredServer>> {
        Ok(self.records.read().configured_servers.clone())
    }

    async fn upsert_configured_server(&self, server: ConfiguredServer) -> Result<()> {
        self.records.write().upsert_configured(server);
        Ok(())
    }

    async fn remove_configured_server(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().remove_configured(id))
    }
}
