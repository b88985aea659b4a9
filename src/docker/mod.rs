//! Container runtime access.
//!
//! Layers, bottom up:
//! - [`runtime`]: the [`ContainerRuntime`] trait, the only seam to an engine
//! - [`engine`]: [`DockerEngine`], the Docker Engine API implementation
//! - [`client`]: [`ContainerClient`], which applies this system's container
//!   conventions on top of any runtime

pub mod client;
pub mod command;
pub mod engine;
pub mod error;
pub mod labels;
pub mod runtime;
pub mod stats;

pub use client::{ContainerClient, ContainerInfo, ContainerState, CreateRequest};
pub use engine::DockerEngine;
pub use error::DockerError;
pub use labels::{LabelSelector, OwnershipLabels};
pub use runtime::{ContainerDetails, ContainerRuntime, ContainerSpec};
pub use stats::ResourceUsage;

use std::time::Duration;

/// Grace period given to a container on stop/restart before it is killed.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Host address published ports are bound to.
pub const LOOPBACK_HOST_IP: &str = "127.0.0.1";
