//! Runtime client error types.

use thiserror::Error;

/// Result type alias for runtime client operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors reported by a container runtime client.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The engine could not be reached (connect failure, timeout, broken stream).
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("no such container: {0}")]
    NotFound(String),

    /// A kill was sent to a container that is not running.
    #[error("container is not running: {0}")]
    NotRunning(String),

    #[error("engine error ({status}): {message}")]
    Engine { status: u16, message: String },

    #[error("failed to pull {image}: {message}")]
    Pull { image: String, message: String },

    #[error("malformed engine response: {0}")]
    Decode(String),

    /// `start` was given a host configuration other than the one the
    /// container was created with.
    #[error("host configuration for {0} differs from the one it was created with")]
    HostConfigMismatch(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl RuntimeError {
    /// True when the failure means the engine itself is unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
