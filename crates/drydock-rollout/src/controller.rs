//! Redeployment controller.

use std::fmt;
use std::sync::Arc;

use drydock_events::{Event, EventSink};
use drydock_runtime::{ContainerRuntime, ReplicaId, RuntimeError, short_id};
use drydock_scheduler::{SchedulerError, destroy, image_matches};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{RedeployError, RedeployResult};

/// Per-replica step of a redeployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedeployStep {
    Inspect,
    Pull,
    Destroy,
    Create,
    Start,
}

impl fmt::Display for RedeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inspect => "inspect",
            Self::Pull => "pull",
            Self::Destroy => "destroy",
            Self::Create => "create",
            Self::Start => "start",
        };
        f.write_str(name)
    }
}

/// One replaced replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub old: ReplicaId,
    pub new: ReplicaId,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedeployReport {
    /// The image substring that selected the replicas.
    pub query: String,
    pub replaced: Vec<Replacement>,
}

impl RedeployReport {
    pub fn deployed(&self) -> usize {
        self.replaced.len()
    }

    /// Distinct image references that were redeployed, in order.
    pub fn images(&self) -> Vec<String> {
        let mut images: Vec<String> = Vec::new();
        for r in &self.replaced {
            if !images.contains(&r.image) {
                images.push(r.image.clone());
            }
        }
        images
    }
}

pub struct Redeployer {
    runtime: Arc<dyn ContainerRuntime>,
    events: Arc<dyn EventSink>,
}

impl Redeployer {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, events: Arc<dyn EventSink>) -> Self {
        Self { runtime, events }
    }

    /// Replace every replica (stopped ones included) whose image contains
    /// `query` with a fresh one built from its captured configuration.
    ///
    /// Emits one aggregate "deploy" event when at least one replica was
    /// replaced, whether or not the call later aborted.
    pub async fn redeploy(&self, query: &str) -> RedeployResult<RedeployReport> {
        let listing = self.runtime.list(true).await.map_err(RedeployError::List)?;
        let matches: Vec<ReplicaId> = listing
            .into_iter()
            .filter(|c| image_matches(&c.image, query))
            .map(|c| c.id)
            .collect();
        debug!(%query, matches = matches.len(), "redeploy targets resolved");

        let mut report = RedeployReport {
            query: query.to_string(),
            replaced: Vec::new(),
        };

        for id in &matches {
            match self.replace(id).await {
                Ok(replacement) => report.replaced.push(replacement),
                Err((step, source)) => {
                    error!(
                        replica = %short_id(id),
                        %step,
                        error = %source,
                        deployed = report.deployed(),
                        "redeploy aborted"
                    );
                    if let Err(e) = self.emit(&report) {
                        error!(error = %e, "failed to record deploy event");
                    }
                    return Err(RedeployError::Aborted {
                        replica: id.clone(),
                        step,
                        deployed: report.deployed(),
                        source,
                    });
                }
            }
        }

        self.emit(&report).map_err(|source| RedeployError::Events {
            deployed: report.deployed(),
            source,
        })?;
        info!(%query, deployed = report.deployed(), "redeploy finished");
        Ok(report)
    }

    /// Inspect, pull, destroy, create and start one replica.
    async fn replace(&self, id: &str) -> Result<Replacement, (RedeployStep, SchedulerError)> {
        let fail =
            |step: RedeployStep| move |e: RuntimeError| (step, SchedulerError::Runtime(e));

        let old = self
            .runtime
            .inspect(id)
            .await
            .map_err(fail(RedeployStep::Inspect))?;
        let mut config = old.config.clone();
        config.image = old.image.clone();

        debug!(replica = %old.short_id(), image = %old.image, "pulling latest image");
        self.runtime
            .pull(&old.image)
            .await
            .map_err(fail(RedeployStep::Pull))?;

        destroy(self.runtime.as_ref(), id)
            .await
            .map_err(|e| (RedeployStep::Destroy, e))?;

        let new = self
            .runtime
            .create(&config)
            .await
            .map_err(fail(RedeployStep::Create))?;
        self.runtime
            .start(&new, old.host_config())
            .await
            .map_err(fail(RedeployStep::Start))?;

        info!(
            old = %old.short_id(),
            new = %short_id(&new),
            image = %old.image,
            "replica redeployed"
        );
        Ok(Replacement {
            old: old.id,
            new,
            image: old.image,
        })
    }

    fn emit(&self, report: &RedeployReport) -> Result<(), drydock_events::EventError> {
        if report.replaced.is_empty() {
            return Ok(());
        }
        self.events.record(&Event::deployed(&report.images()))
    }
}
