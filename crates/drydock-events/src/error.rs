//! Error types for the event log.

use drydock_runtime::RuntimeError;
use thiserror::Error;

/// Result type alias for event log operations.
pub type EventResult<T> = Result<T, EventError>;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to open event log: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("engine event stream: {0}")]
    Runtime(#[from] RuntimeError),
}
