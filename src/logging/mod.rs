//! Logging capability handed to the reconciler.
//!
//! [`Logger`] forwards every message to `tracing` and keeps a copy in a shared
//! [`LogBuffer`] so recent history can be shown to the user. It is created
//! explicitly by the process root and cloned into whoever needs it.

mod buffer;

pub use buffer::{LogBuffer, LogEntry, LogLevel, DEFAULT_BUFFER_SIZE};

use chrono::Utc;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Logger {
    buffer: Arc<LogBuffer>,
    debug_enabled: bool,
    active: Arc<AtomicBool>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Arc::new(LogBuffer::default()))
    }
}

impl Logger {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self {
            buffer,
            debug_enabled: false,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Also buffer debug entries.
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn buffer(&self) -> &Arc<LogBuffer> {
        &self.buffer
    }

    pub fn debug(&self, message: impl Display) {
        let message = message.to_string();
        tracing::debug!("{}", message);
        if self.debug_enabled {
            self.record(LogLevel::Debug, message);
        }
    }

    pub fn info(&self, message: impl Display) {
        let message = message.to_string();
        tracing::info!("{}", message);
        self.record(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Display) {
        let message = message.to_string();
        tracing::warn!("{}", message);
        self.record(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Display) {
        let message = message.to_string();
        tracing::error!("{}", message);
        self.record(LogLevel::Error, message);
    }

    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        self.buffer.recent(count)
    }

    /// Record a final entry and stop buffering. Shared by all clones.
    pub fn shutdown(&self) {
        if self.active.load(Ordering::SeqCst) {
            self.info("Logger shutting down");
            self.active.store(false, Ordering::SeqCst);
        }
    }

    fn record(&self, level: LogLevel, message: String) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        self.buffer.push(LogEntry {
            level,
            message,
            timestamp: Utc::now(),
        });
    }
}
