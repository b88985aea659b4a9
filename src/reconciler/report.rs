use crate::error::{Error, Result};
use serde::Serialize;

/// One item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub item: String,
    pub error: String,
}

/// One item that was left alone, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub item: String,
    pub reason: String,
}

/// Per-item outcome of a continue-on-error operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub operation: &'static str,
    pub succeeded: Vec<String>,
    /// Subset of `succeeded` whose container was rebuilt.
    pub recreated: Vec<String>,
    pub skipped: Vec<SkippedItem>,
    pub failures: Vec<ItemFailure>,
}

impl BulkReport {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            succeeded: Vec::new(),
            recreated: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn succeed(&mut self, item: impl Into<String>) {
        self.succeeded.push(item.into());
    }

    pub fn recreate(&mut self, item: impl Into<String>) {
        let item = item.into();
        self.recreated.push(item.clone());
        self.succeeded.push(item);
    }

    pub fn skip(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedItem {
            item: item.into(),
            reason: reason.into(),
        });
    }

    pub fn fail(&mut self, item: impl Into<String>, error: impl std::fmt::Display) {
        self.failures.push(ItemFailure {
            item: item.into(),
            error: error.to_string(),
        });
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }

    /// `Err(PartialFailure)` if any item failed, for callers that want it strict.
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(Error::PartialFailure {
            operation: self.operation,
            failed: self.failures.len(),
            total: self.total(),
            details: self
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.item, f.error))
                .collect(),
        })
    }
}
