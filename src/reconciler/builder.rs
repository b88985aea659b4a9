use super::Reconciler;
use crate::docker::{ContainerClient, ContainerRuntime, OwnershipLabels};
use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::records::{MemoryRecordStore, RecordStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builder for constructing a `Reconciler` with a fluent API.
///
/// # Example
///
/// ```no_run
/// use mcp_fleet::docker::DockerEngine;
/// use mcp_fleet::records::FileRecordStore;
/// use mcp_fleet::Reconciler;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), mcp_fleet::Error> {
/// let reconciler = Reconciler::builder()
///     .runtime(Arc::new(DockerEngine::connect()?))
///     .records(Arc::new(FileRecordStore::open("records.json").await?))
///     .build()?;
/// let containers = reconciler.list_containers().await?;
/// # Ok(())
/// # }
/// ```
pub struct ReconcilerBuilder {
    runtime: Option<Arc<dyn ContainerRuntime>>,
    records: Option<Arc<dyn RecordStore>>,
    logger: Option<Logger>,
    labels: OwnershipLabels,
    cancel: Option<CancellationToken>,
}

impl ReconcilerBuilder {
    pub fn new() -> Self {
        Self {
            runtime: None,
            records: None,
            logger: None,
            labels: OwnershipLabels::default(),
            cancel: None,
        }
    }

    /// Set the container runtime. Required.
    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Set the record store. Defaults to an in-memory store.
    pub fn records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Override the ownership label namespace.
    pub fn labels(mut self, labels: OwnershipLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Token that cancels in-flight runtime calls.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<Reconciler> {
        let runtime = self
            .runtime
            .ok_or_else(|| Error::Config("Reconciler requires a container runtime".to_string()))?;
        let logger = self.logger.unwrap_or_default();
        let records = self
            .records
            .unwrap_or_else(|| Arc::new(MemoryRecordStore::new()));

        let mut client = ContainerClient::new(runtime, logger.clone()).with_labels(self.labels);
        if let Some(token) = self.cancel {
            client = client.with_cancellation(token);
        }

        Ok(Reconciler::new(client, records, logger))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
