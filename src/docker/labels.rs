//! Ownership tagging for containers this system creates.
//!
//! Discovery of "managed" containers works purely through labels. The label
//! vocabulary lives here so runtime adapters only have to understand two
//! things: attach a label map at create time, and list by [`LabelSelector`].

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

/// Default label namespace.
pub const DEFAULT_LABEL_PREFIX: &str = "mcp-fleet";

/// Value carried by the ownership label.
pub const MANAGED_VALUE: &str = "true";

/// A set of `key=value` label requirements, all of which must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    pairs: Vec<(String, String)>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Selector rendered as runtime filter strings (`key=value`).
    pub fn to_filters(&self) -> Vec<String> {
        self.pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.pairs
            .iter()
            .all(|(k, v)| labels.get(k).map(|actual| actual == v).unwrap_or(false))
    }
}

/// Produces the mandatory labels and the discovery selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipLabels {
    prefix: String,
}

impl Default for OwnershipLabels {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_PREFIX)
    }
}

impl OwnershipLabels {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn managed_key(&self) -> String {
        format!("{}.managed-by", self.prefix)
    }

    pub fn created_at_key(&self) -> String {
        format!("{}.created-at", self.prefix)
    }

    pub fn selector(&self) -> LabelSelector {
        LabelSelector::new().with(self.managed_key(), MANAGED_VALUE)
    }

    /// Merge the ownership and creation-time labels into `labels`.
    ///
    /// Caller-supplied values for these two keys are overwritten.
    pub fn apply(&self, labels: &mut HashMap<String, String>, now: DateTime<Utc>) {
        labels.insert(self.managed_key(), MANAGED_VALUE.to_string());
        labels.insert(
            self.created_at_key(),
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }

    pub fn is_managed(&self, labels: &HashMap<String, String>) -> bool {
        self.selector().matches(labels)
    }
}
