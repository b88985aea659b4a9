use std::fmt;

/// Structured error type for container runtime operations.
///
/// Every runtime adapter maps its native failures onto these variants so the
/// convention layer and the reconciler can branch on the failure kind rather
/// than on error strings.
#[derive(Debug)]
pub enum DockerError {
    /// Runtime endpoint could not be reached (socket missing, daemon down).
    Unavailable { reason: String },

    /// The runtime answered but rejected the call.
    Api {
        operation: &'static str,
        target: String,
        status: Option<u16>,
        message: String,
    },

    /// Container doesn't exist.
    ContainerNotFound { container: String },

    /// Image doesn't exist locally or in the registry.
    ImageNotFound { image: String },

    /// The request could not be expressed to the runtime (bad restart policy etc.).
    InvalidSpec { reason: String },
}

impl DockerError {
    /// Create an unavailable error from anything printable.
    pub fn unavailable(reason: impl fmt::Display) -> Self {
        DockerError::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Create an API error for an operation against a target.
    pub fn api(
        operation: &'static str,
        target: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        DockerError::Api {
            operation,
            target: target.into(),
            status,
            message: message.into(),
        }
    }

    pub fn container_not_found(container: impl Into<String>) -> Self {
        DockerError::ContainerNotFound {
            container: container.into(),
        }
    }

    pub fn invalid_spec(reason: impl Into<String>) -> Self {
        DockerError::InvalidSpec {
            reason: reason.into(),
        }
    }

    /// True when the failure means the runtime endpoint itself is unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DockerError::Unavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DockerError::ContainerNotFound { .. } | DockerError::ImageNotFound { .. }
        )
    }
}

impl fmt::Display for DockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerError::Unavailable { reason } => {
                write!(f, "Container runtime is not reachable: {}", reason)
            }
            DockerError::Api {
                operation,
                target,
                status,
                message,
            } => {
                if let Some(code) = status {
                    write!(f, "{} '{}' failed (HTTP {}): {}", operation, target, code, message)
                } else {
                    write!(f, "{} '{}' failed: {}", operation, target, message)
                }
            }
            DockerError::ContainerNotFound { container } => {
                write!(f, "No such container: {}", container)
            }
            DockerError::ImageNotFound { image } => write!(f, "No such image: {}", image),
            DockerError::InvalidSpec { reason } => {
                write!(f, "Invalid container specification: {}", reason)
            }
        }
    }
}

impl std::error::Error for DockerError {}
