//! Scheduler error types.

use drydock_events::EventError;
use drydock_runtime::{ReplicaId, RuntimeError};
use thiserror::Error;

use crate::launcher::LaunchFailure;

/// Errors that can occur during scheduling operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("failed to kill {id}: {source}")]
    Kill { id: ReplicaId, source: RuntimeError },

    /// The kill step passed but removal did not. The replica is left
    /// stopped and still present.
    #[error("replica {id} was killed but not removed: {source}")]
    DestroyInconsistent { id: ReplicaId, source: RuntimeError },

    #[error("launched {} of {requested} replicas, {} failed", .launched.len(), .failures.len())]
    PartialLaunch {
        requested: usize,
        launched: Vec<ReplicaId>,
        failures: Vec<LaunchFailure>,
    },

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("event log error: {0}")]
    Events(#[from] EventError),
}

impl SchedulerError {
    /// True when the engine could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Runtime(e) | Self::Kill { source: e, .. } => e.is_unavailable(),
            Self::DestroyInconsistent { source, .. } => source.is_unavailable(),
            _ => false,
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
