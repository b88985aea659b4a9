// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings on the named fields.
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(fleet::config::error))]
    Config(String),

    #[error("Validation error: {0}")]
    #[diagnostic(code(fleet::config::invalid))]
    Validation(String),

    #[error("{kind} not found: {id}")]
    #[diagnostic(
        code(fleet::not_found),
        help("List known containers with `fleet list`")
    )]
    NotFound { kind: &'static str, id: String },

    #[error("Container runtime unavailable: {0}")]
    #[diagnostic(
        code(fleet::runtime::unavailable),
        help("Check that Docker is running with `docker ps`")
    )]
    Unavailable(String),

    #[error("{operation}: {failed} of {total} item(s) failed")]
    #[diagnostic(code(fleet::bulk::partial_failure))]
    PartialFailure {
        operation: &'static str,
        failed: usize,
        total: usize,
        details: Vec<String>,
    },

    #[error("No free port between {start} and 65535")]
    #[diagnostic(
        code(fleet::port::exhausted),
        help("Choose a lower base port")
    )]
    RangeExhausted { start: u16 },

    #[error("Server '{server}' references missing container '{container_id}' (recreation failed while {phase})")]
    #[diagnostic(
        code(fleet::record::dangling),
        help("Repair the record with `fleet repair <server-id>`")
    )]
    Dangling {
        server: String,
        container_id: String,
        phase: String,
    },

    #[error("Failed to create container '{name}': {source}")]
    #[diagnostic(code(fleet::container::create_failed))]
    CreateFailed {
        name: String,
        #[source]
        source: DockerError,
    },

    #[error("Docker error: {0}")]
    #[diagnostic(code(fleet::docker::error))]
    Docker(DockerError),

    #[error("Failed to parse container stats: {0}")]
    #[diagnostic(code(fleet::stats::parse))]
    StatsParse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<DockerError> for Error {
    fn from(err: DockerError) -> Self {
        match err {
            DockerError::Unavailable { reason } => Error::Unavailable(reason),
            DockerError::ContainerNotFound { container } => Error::NotFound {
                kind: "Container",
                id: container,
            },
            other => Error::Docker(other),
        }
    }
}

impl Error {
    pub fn container_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "Container",
            id: id.into(),
        }
    }

    pub fn server_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "Server",
            id: id.into(),
        }
    }

    pub fn installed_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "Installed server",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable(_))
    }

    /// Get a helpful suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Unavailable(_) => Some(
                "Start Docker (or point DOCKER_HOST at a running daemon) and retry.".to_string(),
            ),
            Error::NotFound { kind: "Container", id } => Some(format!(
                "No managed container matches '{}'. Run 'fleet list' to see managed containers.",
                id
            )),
            Error::RangeExhausted { start } => Some(format!(
                "Every port from {} to 65535 is already assigned. Pick a lower base with 'fleet reallocate-ports <base>'.",
                start
            )),
            Error::Dangling { server, .. } => Some(format!(
                "The previous container is gone. Run 'fleet repair {}' to clear the record, then recreate it.",
                server
            )),
            Error::PartialFailure { details, .. } if !details.is_empty() => {
                Some(format!("Failed items:\n  {}", details.join("\n  ")))
            }
            Error::Validation(_) => {
                Some("Check fleet.yaml against the documented settings.".to_string())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
