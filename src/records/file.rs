//! JSON file backed record store.

use super::store::{RecordSet, RecordStore};
use super::types::{ConfiguredServer, InstalledServer};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Keeps the record set in memory and rewrites the file on every change.
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    records: Mutex<RecordSet>,
}

impl FileRecordStore {
    /// Open a store, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => RecordSet::default(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordSet::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write-then-rename so a crash mid-write leaves the old file intact.
    async fn persist(&self, records: &RecordSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let contents = serde_json::to_string_pretty(records)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn installed_servers(&self) -> Result<Vec<InstalledServer>> {
        Ok(self.records.lock().await.installed_servers.clone())
    }

    async fn upsert_installed_server(&self, server: InstalledServer) -> Result<()> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.upsert_installed(server);
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn remove_installed_server(&self, id: &str) -> Result<bool> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        if !next.remove_installed(id) {
            return Ok(false);
        }
        self.persist(&next).await?;
        *records = next;
        Ok(true)
    }

    async fn configured_servers(&self) -> Result<Vec<ConfiguredServer>> {
        Ok(self.records.lock().await.configured_servers.clone())
    }

    async fn upsert_configured_server(&self, server: ConfiguredServer) -> Result<()> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.upsert_configured(server);
        self.persist(&next).await?;
        *records = next;
        Ok(())
    }

    async fn remove_configured_server(&self, id: &str) -> Result<bool> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        if !next.remove_configured(id) {
            return Ok(false);
        }
        self.persist(&next).await?;
        *records = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{CatalogEntry, InstalledServer};
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("records.json");

        let store = FileRecordStore::open(&path).await.unwrap();
        let entry = CatalogEntry {
            name: "Echo".into(),
            docker_image: "mcp/echo:1".into(),
            version: "1.0.0".into(),
            ..Default::default()
        };
        store
            .upsert_installed_server(InstalledServer::from_catalog("echo-1", entry, Utc::now()))
            .await
            .unwrap();
        assert!(!path.with_extension("tmp").exists());

        let reopened = FileRecordStore::open(&path).await.unwrap();
        let installed = reopened.installed_servers().await.unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].docker_image, "mcp/echo:1");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileRecordStore::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
