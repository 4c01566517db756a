//! Scaling controller: one-shot reconciliation of a class's replica count.
//!
//! Reads the live class of a reference replica, compares its size with
//! the desired count, and either destroys the surplus (listing order,
//! stop at the first failure) or launches the shortfall through the
//! [`Launcher`]. Nothing is retried and nothing is rolled back.

use std::sync::Arc;

use drydock_events::{Event, EventSink};
use drydock_runtime::{ContainerRuntime, ReplicaDescriptor, ReplicaId};
use serde::Serialize;
use tracing::{debug, info};

use crate::destroy::destroy;
use crate::error::{SchedulerError, SchedulerResult};
use crate::fleet::Fleet;
use crate::launcher::Launcher;

/// What a reconciliation has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    NoChange,
    /// Destroy this many replicas.
    ScaleDown(usize),
    /// Launch this many replicas.
    ScaleUp(usize),
}

impl ScaleDecision {
    pub fn plan(current: usize, desired: usize) -> Self {
        match current.cmp(&desired) {
            std::cmp::Ordering::Greater => Self::ScaleDown(current - desired),
            std::cmp::Ordering::Less => Self::ScaleUp(desired - current),
            std::cmp::Ordering::Equal => Self::NoChange,
        }
    }
}

/// What a successful reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScaleOutcome {
    NoChange {
        count: usize,
    },
    ScaledDown {
        from: usize,
        to: usize,
        destroyed: Vec<ReplicaId>,
    },
    ScaledUp {
        from: usize,
        to: usize,
        launched: Vec<ReplicaId>,
    },
}

pub struct Scaler {
    fleet: Fleet,
    launcher: Launcher,
    events: Arc<dyn EventSink>,
}

impl Scaler {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, events: Arc<dyn EventSink>) -> Self {
        Self {
            fleet: Fleet::new(Arc::clone(&runtime)),
            launcher: Launcher::new(runtime),
            events,
        }
    }

    /// Bring the class of `reference` to `desired` replicas.
    ///
    /// Stopped replicas count as members. On scale-up the reference is the
    /// template for new replicas, with its hostname cleared.
    pub async fn scale(
        &self,
        reference: &ReplicaDescriptor,
        desired: usize,
    ) -> SchedulerResult<ScaleOutcome> {
        let class = self.fleet.class_of(reference, true).await?;
        let current = class.len();

        let outcome = match ScaleDecision::plan(current, desired) {
            ScaleDecision::NoChange => {
                debug!(class = %class.key(), count = current, "already at desired count");
                return Ok(ScaleOutcome::NoChange { count: current });
            }
            ScaleDecision::ScaleDown(surplus) => {
                let mut destroyed = Vec::with_capacity(surplus);
                for replica in class.members().iter().take(surplus) {
                    destroy(self.fleet.runtime(), &replica.id).await?;
                    destroyed.push(replica.id.clone());
                }
                ScaleOutcome::ScaledDown {
                    from: current,
                    to: desired,
                    destroyed,
                }
            }
            ScaleDecision::ScaleUp(shortfall) => {
                let mut template = reference.clone();
                template.config.hostname.clear();
                let launched = self
                    .launcher
                    .launch(&template, shortfall, false)
                    .await
                    .into_result()?;
                ScaleOutcome::ScaledUp {
                    from: current,
                    to: desired,
                    launched,
                }
            }
        };

        info!(class = %class.key(), from = current, to = desired, "class scaled");
        self.events
            .record(&Event::scaled(&reference.image, current, desired))?;
        Ok(outcome)
    }

    /// Scale the class of the container whose ID starts with `prefix`.
    pub async fn scale_replica(
        &self,
        prefix: &str,
        desired: usize,
    ) -> SchedulerResult<ScaleOutcome> {
        let reference = self
            .fleet
            .container(prefix)
            .await?
            .ok_or_else(|| SchedulerError::ContainerNotFound(prefix.to_string()))?;
        self.scale(&reference, desired).await
    }
}
