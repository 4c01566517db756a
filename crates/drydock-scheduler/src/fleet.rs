//! Fleet inventory: listing, lookup and per-replica lifecycle calls.

use std::sync::Arc;

use drydock_runtime::{
    ContainerRuntime, ContainerSummary, ReplicaDescriptor, RuntimeError, short_id,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{ReplicaClass, image_matches};
use crate::destroy::destroy;
use crate::error::SchedulerResult;

/// Grace period for stop and restart before the engine kills.
pub const STOP_TIMEOUT_SECS: u32 = 10;

/// Engine-wide totals plus the controller version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterInfo {
    pub cpus: i64,
    pub memory: i64,
    pub containers: i64,
    pub images: i64,
    pub version: String,
}

/// Read-mostly view of the replicas on one runtime endpoint.
#[derive(Clone)]
pub struct Fleet {
    runtime: Arc<dyn ContainerRuntime>,
}

impl Fleet {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    pub async fn containers(&self, all: bool) -> SchedulerResult<Vec<ContainerSummary>> {
        Ok(self.runtime.list(all).await?)
    }

    /// Inspect the first container (stopped ones included) whose ID starts
    /// with `prefix`.
    pub async fn container(&self, prefix: &str) -> SchedulerResult<Option<ReplicaDescriptor>> {
        let listing = self.runtime.list(true).await?;
        let Some(summary) = listing.iter().find(|c| c.id.starts_with(prefix)) else {
            return Ok(None);
        };
        match self.runtime.inspect(&summary.id).await {
            Ok(replica) => Ok(Some(replica)),
            Err(RuntimeError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Descriptors of every container whose image contains `substring`,
    /// in listing order.
    ///
    /// A container that disappears between the listing and its inspect is
    /// skipped.
    pub async fn containers_by_image(
        &self,
        substring: &str,
        all: bool,
    ) -> SchedulerResult<Vec<ReplicaDescriptor>> {
        let listing = self.runtime.list(all).await?;
        let mut replicas = Vec::new();
        for summary in listing.iter().filter(|c| image_matches(&c.image, substring)) {
            match self.runtime.inspect(&summary.id).await {
                Ok(replica) => replicas.push(replica),
                Err(RuntimeError::NotFound(_)) => {
                    debug!(replica = %short_id(&summary.id), "container vanished before inspect");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(replicas)
    }

    /// The live class of `reference`, recomputed from a fresh listing.
    pub async fn class_of(
        &self,
        reference: &ReplicaDescriptor,
        all: bool,
    ) -> SchedulerResult<ReplicaClass> {
        let candidates = self.containers_by_image(&reference.image, all).await?;
        let class = ReplicaClass::resolve(reference, candidates);
        debug!(class = %class.key(), members = class.len(), "class resolved");
        Ok(class)
    }

    pub async fn stop(&self, id: &str) -> SchedulerResult<()> {
        self.runtime.stop(id, STOP_TIMEOUT_SECS).await?;
        info!(replica = %short_id(id), "replica stopped");
        Ok(())
    }

    pub async fn restart(&self, id: &str) -> SchedulerResult<()> {
        self.runtime.restart(id, STOP_TIMEOUT_SECS).await?;
        info!(replica = %short_id(id), "replica restarted");
        Ok(())
    }

    pub async fn destroy(&self, id: &str) -> SchedulerResult<()> {
        destroy(self.runtime.as_ref(), id).await
    }

    pub async fn cluster_info(&self) -> SchedulerResult<ClusterInfo> {
        let info = self.runtime.info().await?;
        Ok(ClusterInfo {
            cpus: info.cpus,
            memory: info.memory,
            containers: info.containers,
            images: info.images,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_runtime::{Call, MockRuntime, Op, descriptor};

    fn fleet() -> (Arc<MockRuntime>, Fleet) {
        let runtime = Arc::new(MockRuntime::new());
        runtime.add(descriptor("aaa111", "myapp:v1"));
        runtime.add(descriptor("bbb222", "redis:7"));
        let mut stopped = descriptor("ccc333", "myapp:v1");
        stopped.running = false;
        runtime.add(stopped);
        let fleet = Fleet::new(runtime.clone());
        (runtime, fleet)
    }

    #[tokio::test]
    async fn container_by_prefix() {
        let (_, fleet) = fleet();
        assert_eq!(fleet.container("bbb").await.unwrap().unwrap().image, "redis:7");
        // Stopped containers are found too.
        assert_eq!(fleet.container("ccc").await.unwrap().unwrap().id, "ccc333");
        assert!(fleet.container("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn by_image_filters_on_substring() {
        let (_, fleet) = fleet();
        let running = fleet.containers_by_image("myapp", false).await.unwrap();
        assert_eq!(running.len(), 1);
        let all = fleet.containers_by_image("myapp", true).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["aaa111", "ccc333"]);
    }

    #[tokio::test]
    async fn class_of_refines_by_structure() {
        let (runtime, fleet) = fleet();
        let mut bigger = descriptor("ddd444", "myapp:v1");
        bigger.config.host_config.memory = 512;
        runtime.add(bigger);

        let reference = runtime.inspect("aaa111").await.unwrap();
        let class = fleet.class_of(&reference, true).await.unwrap();
        assert_eq!(class.len(), 2);
    }

    #[tokio::test]
    async fn stop_and_restart_use_grace_period() {
        let (runtime, fleet) = fleet();
        fleet.stop("aaa111").await.unwrap();
        assert!(!runtime.inspect("aaa111").await.unwrap().running);
        fleet.restart("aaa111").await.unwrap();
        assert!(runtime.inspect("aaa111").await.unwrap().running);
        assert!(runtime.calls().contains(&Call::Stop("aaa111".into())));
    }

    #[tokio::test]
    async fn cluster_info_reports_version() {
        let (_, fleet) = fleet();
        let info = fleet.cluster_info().await.unwrap();
        assert_eq!(info.containers, 3);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn listing_errors_propagate() {
        let (runtime, fleet) = fleet();
        runtime.fail(Op::List);
        assert!(fleet.containers(true).await.is_err());
        assert!(fleet.containers_by_image("myapp", true).await.is_err());
    }
}
