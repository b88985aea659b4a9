//! Reconciliation of configured servers against managed containers.
//!
//! [`Reconciler`] exposes the named operations (start, stop, remove,
//! reallocate ports, apply settings, orphan handling, install and
//! instantiate). The operations are split by concern across this module's
//! files, all as `impl Reconciler` blocks.

mod builder;
mod core;
mod identity;
mod install;
mod monitoring;
mod orphans;
mod ports;
mod recreate;
mod report;
mod settings;

pub use builder::ReconcilerBuilder;
pub use core::Reconciler;
pub use identity::{find_container, find_record, ids_match, is_tracked};
pub use install::{check_updates, InstantiateRequest, UpdateStatus};
pub use monitoring::{RuntimeMonitor, RuntimeStatus, RuntimeStatusEvent};
pub use recreate::{
    link_state, DanglingReason, DanglingServer, DesiredSettings, LinkState, RecreateOutcome,
    RepairOutcome,
};
pub use report::{BulkReport, ItemFailure, SkippedItem};
pub use settings::{DefaultsChangeOutcome, SettingsChange};
