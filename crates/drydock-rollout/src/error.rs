//! Redeployment error types.

use drydock_events::EventError;
use drydock_runtime::{ReplicaId, RuntimeError};
use drydock_scheduler::SchedulerError;
use thiserror::Error;

use crate::controller::RedeployStep;

pub type RedeployResult<T> = Result<T, RedeployError>;

#[derive(Debug, Error)]
pub enum RedeployError {
    #[error("failed to list replicas: {0}")]
    List(RuntimeError),

    /// A step failed for one replica. `deployed` replicas were already
    /// replaced before the failure and stay that way.
    #[error("redeploy aborted at {step} of {replica} after {deployed} replaced: {source}")]
    Aborted {
        replica: ReplicaId,
        step: RedeployStep,
        deployed: usize,
        source: SchedulerError,
    },

    #[error("{deployed} replaced but the deploy event was not recorded: {source}")]
    Events { deployed: usize, source: EventError },
}

impl RedeployError {
    /// Replicas replaced before the error.
    pub fn deployed(&self) -> usize {
        match self {
            Self::List(_) => 0,
            Self::Aborted { deployed, .. } | Self::Events { deployed, .. } => *deployed,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::List(e) => e.is_unavailable(),
            Self::Aborted { source, .. } => source.is_unavailable(),
            Self::Events { .. } => false,
        }
    }
}
