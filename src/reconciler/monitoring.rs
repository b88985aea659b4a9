//! Periodic runtime health polling.
//!
//! # Architecture
//!
//! [`RuntimeMonitor`] owns a background task that pings the runtime after an
//! initial delay and then on a fixed interval, publishing a
//! [`RuntimeStatusEvent`] per probe on an `mpsc` channel. It shares no state
//! with the [`super::Reconciler`]; consumers only see events. Sends never
//! wait: when the receiver falls behind, events are dropped. The task ends
//! when its token is cancelled or the receiver is dropped.

use crate::config::MonitorConfig;
use crate::docker::ContainerRuntime;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Buffered events before new ones are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    Running,
    Unreachable,
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeStatus::Running => f.write_str("running"),
            RuntimeStatus::Unreachable => f.write_str("not running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeStatusEvent {
    pub status: RuntimeStatus,
    pub checked_at: DateTime<Utc>,
}

pub struct RuntimeMonitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RuntimeMonitor {
    /// Start polling. Cancelling `parent` also stops the monitor.
    pub fn spawn(
        runtime: Arc<dyn ContainerRuntime>,
        config: MonitorConfig,
        parent: &CancellationToken,
    ) -> (Self, mpsc::Receiver<RuntimeStatusEvent>) {
        let cancel = parent.child_token();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = tokio::spawn(run_monitor(runtime, config, tx, cancel.clone()));
        (Self { cancel, handle }, rx)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!("Runtime monitor task ended abnormally: {}", e);
        }
    }
}

async fn probe(runtime: &dyn ContainerRuntime, timeout: Duration) -> RuntimeStatus {
    match tokio::time::timeout(timeout, runtime.ping()).await {
        Ok(Ok(())) => RuntimeStatus::Running,
        Ok(Err(e)) => {
            tracing::debug!("Runtime probe failed: {}", e);
            RuntimeStatus::Unreachable
        }
        Err(_) => {
            tracing::debug!("Runtime probe timed out after {:?}", timeout);
            RuntimeStatus::Unreachable
        }
    }
}

async fn run_monitor(
    runtime: Arc<dyn ContainerRuntime>,
    config: MonitorConfig,
    tx: mpsc::Sender<RuntimeStatusEvent>,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(config.initial_delay) => {}
    }

    let mut last: Option<RuntimeStatus> = None;
    loop {
        let status = tokio::select! {
            _ = cancel.cancelled() => return,
            status = probe(runtime.as_ref(), config.probe_timeout) => status,
        };

        if last != Some(status) {
            match status {
                RuntimeStatus::Running => tracing::info!("Container runtime is running"),
                RuntimeStatus::Unreachable => tracing::warn!("Container runtime is not reachable"),
            }
            last = Some(status);
        }

        let event = RuntimeStatusEvent {
            status,
            checked_at: Utc::now(),
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Runtime status receiver is behind, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}
