//! Container runtime interface.
//!
//! The controllers never talk to an engine directly; they hold an
//! `Arc<dyn ContainerRuntime>` handed to them at construction. Every
//! method is a network round trip in the real implementation and may
//! fail with [`RuntimeError::Unavailable`](crate::RuntimeError::Unavailable).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::RuntimeResult;
use crate::types::*;

/// Operations consumed from a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List containers. `all` includes stopped ones.
    async fn list(&self, all: bool) -> RuntimeResult<Vec<ContainerSummary>>;

    /// Snapshot the full configuration of one container.
    async fn inspect(&self, id: &str) -> RuntimeResult<ReplicaDescriptor>;

    /// Pull the latest version of an image reference.
    async fn pull(&self, image: &str) -> RuntimeResult<()>;

    /// Create a container and return its ID. The container is not started.
    async fn create(&self, config: &ContainerConfig) -> RuntimeResult<ReplicaId>;

    /// Start a created container.
    ///
    /// Host configuration is applied at create. `host_config` must be the
    /// one the container was created with, or `HostConfig::default()` to
    /// start it as created; anything else fails with
    /// [`RuntimeError::HostConfigMismatch`](crate::RuntimeError::HostConfigMismatch).
    async fn start(&self, id: &str, host_config: &HostConfig) -> RuntimeResult<()>;

    /// Send a signal (e.g. "KILL") to a running container.
    async fn kill(&self, id: &str, signal: &str) -> RuntimeResult<()>;

    /// Remove a container; `force` removes it even while running.
    async fn remove(&self, id: &str, force: bool) -> RuntimeResult<()>;

    /// Stop a container, killing it after `timeout_secs`.
    async fn stop(&self, id: &str, timeout_secs: u32) -> RuntimeResult<()>;

    /// Restart a container, killing it after `timeout_secs`.
    async fn restart(&self, id: &str, timeout_secs: u32) -> RuntimeResult<()>;

    /// Engine-wide counters.
    async fn info(&self) -> RuntimeResult<EngineInfo>;

    /// Subscribe to container lifecycle events.
    ///
    /// The channel closes when the engine ends the stream.
    async fn events(&self) -> RuntimeResult<mpsc::Receiver<EngineEvent>>;
}
