//! Concurrent launcher.
//!
//! Fans out N independent pull/create/start attempts from one template.
//! Each attempt runs as its own task and hands back exactly one
//! [`LaunchOutcome`]; the batch is joined by a single collector, so a
//! failed attempt can neither hang the caller nor clobber another
//! attempt's result. Policy is continue-on-error with no rollback.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use drydock_runtime::{
    ContainerConfig, ContainerRuntime, ReplicaDescriptor, ReplicaId, RuntimeError, short_id,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{SchedulerError, SchedulerResult};

/// Why a single launch attempt failed.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("pull {image}: {source}")]
    Pull { image: String, source: RuntimeError },

    #[error("create: {0}")]
    Create(RuntimeError),

    /// Created but never started; the container is left behind.
    #[error("start {id}: {source}")]
    Start { id: ReplicaId, source: RuntimeError },

    #[error("cancelled before completion")]
    Cancelled,

    #[error("launch task aborted: {0}")]
    Aborted(String),
}

/// Result of one attempt.
pub type LaunchOutcome = Result<ReplicaId, LaunchError>;

/// A failed attempt and its position in the batch.
#[derive(Debug)]
pub struct LaunchFailure {
    pub attempt: usize,
    pub error: LaunchError,
}

impl fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt {}: {}", self.attempt, self.error)
    }
}

/// Every outcome of a batch. `launched.len() + failures.len() == requested`.
#[derive(Debug, Default)]
pub struct LaunchReport {
    pub requested: usize,
    /// New replica IDs in completion order.
    pub launched: Vec<ReplicaId>,
    /// Failures sorted by attempt.
    pub failures: Vec<LaunchFailure>,
}

impl LaunchReport {
    fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    fn record(&mut self, attempt: usize, outcome: LaunchOutcome) {
        match outcome {
            Ok(id) => {
                debug!(attempt, replica = %short_id(&id), "launch attempt succeeded");
                self.launched.push(id);
            }
            Err(error) => {
                warn!(attempt, error = %error, "launch attempt failed");
                self.failures.push(LaunchFailure { attempt, error });
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.launched.len() == self.requested
    }

    /// The launched IDs, or `PartialLaunch` if any attempt failed.
    pub fn into_result(self) -> SchedulerResult<Vec<ReplicaId>> {
        if self.failures.is_empty() {
            Ok(self.launched)
        } else {
            Err(SchedulerError::PartialLaunch {
                requested: self.requested,
                launched: self.launched,
                failures: self.failures,
            })
        }
    }
}

/// Launches batches of replicas from a template.
#[derive(Clone)]
pub struct Launcher {
    runtime: Arc<dyn ContainerRuntime>,
}

impl Launcher {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Launch `count` replicas of `template` and wait for every attempt.
    pub async fn launch(
        &self,
        template: &ReplicaDescriptor,
        count: usize,
        pull_first: bool,
    ) -> LaunchReport {
        let (_keep, never) = watch::channel(false);
        self.launch_until(template, count, pull_first, never).await
    }

    /// Like [`launch`](Self::launch), but gives up when `cancel` becomes
    /// `true`: in-flight attempts are aborted and reported as
    /// [`LaunchError::Cancelled`]. Replicas that already started stay up.
    pub async fn launch_until(
        &self,
        template: &ReplicaDescriptor,
        count: usize,
        pull_first: bool,
        mut cancel: watch::Receiver<bool>,
    ) -> LaunchReport {
        let mut config = template.config.clone();
        config.image = template.image.clone();
        config.hostname.clear();
        let config = Arc::new(config);

        let mut report = LaunchReport::new(count);
        let mut pending: BTreeSet<usize> = (0..count).collect();
        let mut tasks = JoinSet::new();
        let mut cancelled = *cancel.borrow_and_update();
        let mut cancel_open = true;
        let mut panicked = None;

        if !cancelled {
            for attempt in 0..count {
                let runtime = Arc::clone(&self.runtime);
                let config = Arc::clone(&config);
                tasks.spawn(async move {
                    (attempt, launch_one(runtime.as_ref(), &config, pull_first).await)
                });
            }
            debug!(image = %config.image, count, pull_first, "launch batch started");
        }

        while !cancelled {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((attempt, outcome))) => {
                        pending.remove(&attempt);
                        report.record(attempt, outcome);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "launch task panicked");
                        panicked = Some(e.to_string());
                    }
                },
                changed = cancel.changed(), if cancel_open => match changed {
                    Ok(()) => cancelled = *cancel.borrow_and_update(),
                    Err(_) => cancel_open = false,
                },
            }
        }

        if cancelled {
            tasks.abort_all();
            while let Some(joined) = tasks.join_next().await {
                if let Ok((attempt, outcome)) = joined {
                    pending.remove(&attempt);
                    report.record(attempt, outcome);
                }
            }
            info!(unfinished = pending.len(), "launch batch cancelled");
        }

        for attempt in pending {
            let error = match &panicked {
                Some(reason) if !cancelled => LaunchError::Aborted(reason.clone()),
                _ => LaunchError::Cancelled,
            };
            report.failures.push(LaunchFailure { attempt, error });
        }
        report.failures.sort_by_key(|f| f.attempt);

        info!(
            image = %config.image,
            requested = count,
            launched = report.launched.len(),
            failed = report.failures.len(),
            "launch batch finished"
        );
        report
    }
}

async fn launch_one(
    runtime: &dyn ContainerRuntime,
    config: &ContainerConfig,
    pull_first: bool,
) -> LaunchOutcome {
    if pull_first {
        runtime
            .pull(&config.image)
            .await
            .map_err(|source| LaunchError::Pull {
                image: config.image.clone(),
                source,
            })?;
    }
    let id = runtime.create(config).await.map_err(LaunchError::Create)?;
    runtime
        .start(&id, &config.host_config)
        .await
        .map_err(|source| LaunchError::Start {
            id: id.clone(),
            source,
        })?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use drydock_runtime::{Call, MockRuntime, Op, descriptor};

    fn template() -> ReplicaDescriptor {
        let mut t = descriptor("0123456789abcdef", "web:1");
        t.config.hostname = "web-primary".to_string();
        t.config.cmd = Some(vec!["serve".into(), "--port".into(), "80".into()]);
        t.config.host_config.memory = 64 * 1024 * 1024;
        t
    }

    #[tokio::test]
    async fn all_attempts_succeed() {
        let runtime = Arc::new(MockRuntime::new().with_latency(Duration::from_millis(20)));
        let launcher = Launcher::new(runtime.clone());

        let report = launcher.launch(&template(), 5, false).await;

        assert!(report.is_complete());
        assert_eq!(report.launched.len(), 5);
        let unique: HashSet<_> = report.launched.iter().collect();
        assert_eq!(unique.len(), 5);
        // Every attempt finished before the call returned.
        assert_eq!(runtime.count(Op::Start), 5);
        assert!(runtime.containers().iter().all(|c| c.running));
        assert_eq!(runtime.count(Op::Pull), 0);
    }

    #[tokio::test]
    async fn attempts_run_concurrently() {
        let runtime = Arc::new(MockRuntime::new().with_latency(Duration::from_millis(50)));
        let launcher = Launcher::new(runtime.clone());

        launcher.launch(&template(), 4, false).await;

        assert!(runtime.peak_concurrent_creates() > 1);
    }

    #[tokio::test]
    async fn partial_failure_reports_every_outcome() {
        let runtime = Arc::new(MockRuntime::new());
        runtime.fail_nth(Op::Create, 1);
        runtime.fail_nth(Op::Start, 0);
        let launcher = Launcher::new(runtime.clone());

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            launcher.launch(&template(), 6, false),
        )
        .await
        .expect("launch must not hang");

        assert_eq!(report.launched.len(), 4);
        assert_eq!(report.failures.len(), 2);
        let attempts: HashSet<_> = report.failures.iter().map(|f| f.attempt).collect();
        assert_eq!(attempts.len(), 2);
        assert!(report.failures.iter().any(|f| matches!(f.error, LaunchError::Create(_))));
        assert!(report.failures.iter().any(|f| matches!(f.error, LaunchError::Start { .. })));
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn every_attempt_failing_still_returns() {
        let runtime = Arc::new(MockRuntime::new());
        runtime.fail(Op::Create);
        let launcher = Launcher::new(runtime.clone());

        let report = launcher.launch(&template(), 3, false).await;

        assert!(report.launched.is_empty());
        let attempts: Vec<_> = report.failures.iter().map(|f| f.attempt).collect();
        assert_eq!(attempts, vec![0, 1, 2]);
        assert!(matches!(
            report.into_result(),
            Err(SchedulerError::PartialLaunch { requested: 3, .. })
        ));
    }

    #[tokio::test]
    async fn clears_hostname_and_keeps_config() {
        let runtime = Arc::new(MockRuntime::new());
        let launcher = Launcher::new(runtime.clone());

        launcher.launch(&template(), 2, false).await;

        for call in runtime.calls() {
            if let Call::Create(config) = call {
                assert!(config.hostname.is_empty());
                assert_eq!(config.image, "web:1");
                assert_eq!(config.host_config.memory, 64 * 1024 * 1024);
            }
        }
        for replica in runtime.containers() {
            assert_eq!(replica.args, vec!["--port", "80"]);
        }
    }

    #[tokio::test]
    async fn pull_first_pulls_per_attempt() {
        let runtime = Arc::new(MockRuntime::new());
        runtime.fail_nth(Op::Pull, 0);
        let launcher = Launcher::new(runtime.clone());

        let report = launcher.launch(&template(), 3, true).await;

        assert_eq!(runtime.count(Op::Pull), 3);
        assert_eq!(runtime.count(Op::Create), 2);
        assert_eq!(report.launched.len(), 2);
        assert!(matches!(report.failures[0].error, LaunchError::Pull { .. }));
    }

    #[tokio::test]
    async fn zero_count_is_empty() {
        let runtime = Arc::new(MockRuntime::new());
        let report = Launcher::new(runtime.clone()).launch(&template(), 0, false).await;
        assert!(report.is_complete());
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_attempts() {
        let runtime = Arc::new(MockRuntime::new().with_latency(Duration::from_secs(30)));
        let launcher = Launcher::new(runtime.clone());
        let (tx, rx) = watch::channel(false);

        let handle = {
            let launcher = launcher.clone();
            tokio::spawn(async move { launcher.launch_until(&template(), 3, false, rx).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("cancel must end the batch")
            .unwrap();
        assert!(report.launched.is_empty());
        assert_eq!(report.failures.len(), 3);
        assert!(report.failures.iter().all(|f| matches!(f.error, LaunchError::Cancelled)));
        assert!(runtime.containers().is_empty());
    }

    #[tokio::test]
    async fn already_cancelled_launches_nothing() {
        let runtime = Arc::new(MockRuntime::new());
        let (_tx, rx) = watch::channel(true);

        let report = Launcher::new(runtime.clone())
            .launch_until(&template(), 2, false, rx)
            .await;

        assert_eq!(report.failures.len(), 2);
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn dropped_cancel_sender_is_ignored() {
        let runtime = Arc::new(MockRuntime::new().with_latency(Duration::from_millis(10)));
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let report = Launcher::new(runtime.clone())
            .launch_until(&template(), 2, false, rx)
            .await;

        assert!(report.is_complete());
    }
}
