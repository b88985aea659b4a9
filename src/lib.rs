//! # MCP Fleet
//!
//! Lifecycle management for a local fleet of containerized MCP servers.
//!
//! ## Features
//!
//! - **Convention-aware runtime client**: ownership labels, loopback port
//!   publishing, memory ceilings, restart policies, quoted command parsing
//! - **Reconciliation**: configured server records are kept in agreement with
//!   the containers actually present, matching abbreviated identifiers
//! - **Settings propagation**: port, memory and restart-policy changes are
//!   applied by recreating running containers, with a persisted marker so a
//!   failed rebuild is detectable and repairable
//! - **Orphan cleanup**: labeled containers no record references are removed
//! - **Runtime monitor**: periodic health polling reported over a channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use mcp_fleet::docker::DockerEngine;
//! use mcp_fleet::records::FileRecordStore;
//! use mcp_fleet::{Parser, Reconciler};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), mcp_fleet::Error> {
//! let config = Parser::new().load_or_default(None)?;
//!
//! let reconciler = Reconciler::builder()
//!     .runtime(Arc::new(DockerEngine::connect()?))
//!     .records(Arc::new(FileRecordStore::open(config.records_path()).await?))
//!     .build()?;
//!
//! // Renumber ports from 9000, recreating running containers as needed
//! let report = reconciler
//!     .reallocate_ports(9000, &config.server_defaults)
//!     .await?;
//! println!("{} servers updated", report.succeeded.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! - Every `Reconciler` method takes `&self`
//! - Record-mutating operations are serialized by one exclusive section
//! - Runtime calls race a `CancellationToken`
//! - The runtime monitor runs independently and only communicates by events

pub mod config;
pub mod docker;
pub mod error;
pub mod logging;
pub mod port;
pub mod reconciler;
pub mod records;

pub use config::{FleetConfig, MonitorConfig, Parser, ServerDefaults};
pub use docker::{ContainerClient, ContainerInfo, ContainerRuntime, DockerEngine, DockerError};
pub use error::{Error, Result};
pub use logging::{LogBuffer, Logger};
pub use reconciler::{BulkReport, Reconciler, ReconcilerBuilder};
