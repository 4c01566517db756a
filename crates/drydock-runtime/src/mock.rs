//! In-process container runtime for tests and dry runs.
//!
//! `MockRuntime` keeps containers in listing order, records every call in
//! a journal, and can be told to fail specific operations (every call, or
//! only the n-th call of an operation). An optional per-call latency
//! makes concurrent behaviour observable: the runtime tracks how many
//! creates were in flight at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::ContainerRuntime;
use crate::types::*;

/// Runtime operations that can be faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Inspect,
    Pull,
    Create,
    Start,
    Kill,
    Remove,
    Stop,
    Restart,
    Info,
}

/// A journaled runtime call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { all: bool },
    Inspect(String),
    Pull(String),
    Create(ContainerConfig),
    Start { id: String, host_config: HostConfig },
    Kill(String),
    Remove { id: String, force: bool },
    Stop(String),
    Restart(String),
    Info,
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Self::List { .. } => Op::List,
            Self::Inspect(_) => Op::Inspect,
            Self::Pull(_) => Op::Pull,
            Self::Create(_) => Op::Create,
            Self::Start { .. } => Op::Start,
            Self::Kill(_) => Op::Kill,
            Self::Remove { .. } => Op::Remove,
            Self::Stop(_) => Op::Stop,
            Self::Restart(_) => Op::Restart,
            Self::Info => Op::Info,
        }
    }
}

#[derive(Debug, Clone)]
struct Fault {
    op: Op,
    /// Fail only this zero-based call of `op`; `None` fails every call.
    nth: Option<usize>,
}

#[derive(Default)]
struct MockState {
    containers: Vec<ReplicaDescriptor>,
    journal: Vec<Call>,
    faults: Vec<Fault>,
    counters: HashMap<Op, usize>,
    unavailable: bool,
    subscribers: Vec<mpsc::Sender<EngineEvent>>,
}

/// Fake container engine.
pub struct MockRuntime {
    state: Mutex<MockState>,
    next_id: AtomicU64,
    latency: Duration,
    creates_in_flight: AtomicUsize,
    peak_creates: AtomicUsize,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a descriptor for seeding a mock. Arguments are empty and the
/// memory limit is unlimited; adjust the fields as needed.
pub fn descriptor(id: &str, image: &str) -> ReplicaDescriptor {
    let mut config = ContainerConfig::for_image(image);
    config.hostname = short_id(id).to_string();
    ReplicaDescriptor {
        id: id.to_string(),
        name: format!("{}-{}", image.split(':').next().unwrap_or(image), short_id(id)),
        image: image.to_string(),
        args: Vec::new(),
        running: true,
        config,
    }
}

/// Arguments the engine derives from a config: the command line minus
/// its first word.
fn engine_args(config: &ContainerConfig) -> Vec<String> {
    let mut line: Vec<String> = config.entrypoint.clone().unwrap_or_default();
    line.extend(config.cmd.clone().unwrap_or_default());
    line.into_iter().skip(1).collect()
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            next_id: AtomicU64::new(1),
            latency: Duration::ZERO,
            creates_in_flight: AtomicUsize::new(0),
            peak_creates: AtomicUsize::new(0),
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a container to the listing.
    pub fn add(&self, replica: ReplicaDescriptor) {
        self.lock().containers.push(replica);
    }

    /// Fail every call of `op`.
    pub fn fail(&self, op: Op) {
        self.lock().faults.push(Fault { op, nth: None });
    }

    /// Fail only the `nth` (zero-based) call of `op`.
    pub fn fail_nth(&self, op: Op, nth: usize) {
        self.lock().faults.push(Fault { op, nth: Some(nth) });
    }

    /// Make every call fail as if the engine were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Current containers in listing order.
    pub fn containers(&self) -> Vec<ReplicaDescriptor> {
        self.lock().containers.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().journal.clone()
    }

    /// Number of journaled calls of `op`, failed ones included.
    pub fn count(&self, op: Op) -> usize {
        self.lock().journal.iter().filter(|c| c.op() == op).count()
    }

    /// Highest number of creates observed in flight at once.
    pub fn peak_concurrent_creates(&self) -> usize {
        self.peak_creates.load(Ordering::SeqCst)
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&self, event: EngineEvent) {
        let mut state = self.lock();
        state.subscribers.retain(|tx| {
            !matches!(
                tx.try_send(event.clone()),
                Err(mpsc::error::TrySendError::Closed(_))
            )
        });
    }

    /// Drop all subscriptions, ending their streams.
    pub fn close_events(&self) {
        self.lock().subscribers.clear();
    }

    /// Journal a call and decide whether it fails.
    async fn enter(&self, call: Call) -> RuntimeResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.lock();
        let op = call.op();
        state.journal.push(call);

        if state.unavailable {
            return Err(RuntimeError::Unavailable("mock engine offline".to_string()));
        }

        let counter = state.counters.entry(op).or_insert(0);
        let index = *counter;
        *counter += 1;

        let faulted = state
            .faults
            .iter()
            .any(|f| f.op == op && f.nth.is_none_or(|n| n == index));
        if faulted {
            debug!(?op, index, "[MOCK] injected fault");
            return Err(RuntimeError::Engine {
                status: 500,
                message: format!("injected {op:?} fault"),
            });
        }
        Ok(())
    }

    fn find(state: &mut MockState, id: &str) -> RuntimeResult<usize> {
        state
            .containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    fn set_running(&self, id: &str, running: bool) -> RuntimeResult<()> {
        let mut state = self.lock();
        let idx = Self::find(&mut state, id)?;
        state.containers[idx].running = running;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list(&self, all: bool) -> RuntimeResult<Vec<ContainerSummary>> {
        self.enter(Call::List { all }).await?;
        let state = self.lock();
        Ok(state
            .containers
            .iter()
            .filter(|c| all || c.running)
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                image: c.image.clone(),
                names: vec![format!("/{}", c.name)],
                state: if c.running { "running" } else { "exited" }.to_string(),
                status: String::new(),
            })
            .collect())
    }

    async fn inspect(&self, id: &str) -> RuntimeResult<ReplicaDescriptor> {
        self.enter(Call::Inspect(id.to_string())).await?;
        let mut state = self.lock();
        let idx = Self::find(&mut state, id)?;
        Ok(state.containers[idx].clone())
    }

    async fn pull(&self, image: &str) -> RuntimeResult<()> {
        self.enter(Call::Pull(image.to_string())).await
    }

    async fn create(&self, config: &ContainerConfig) -> RuntimeResult<ReplicaId> {
        let in_flight = self.creates_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_creates.fetch_max(in_flight, Ordering::SeqCst);
        let entered = self.enter(Call::Create(config.clone())).await;
        self.creates_in_flight.fetch_sub(1, Ordering::SeqCst);
        entered?;

        let id = format!("replica-{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let replica = ReplicaDescriptor {
            id: id.clone(),
            name: id.clone(),
            image: config.image.clone(),
            args: engine_args(config),
            running: false,
            config: config.clone(),
        };
        self.lock().containers.push(replica);
        debug!(%id, image = %config.image, "[MOCK] container created");
        Ok(id)
    }

    async fn start(&self, id: &str, host_config: &HostConfig) -> RuntimeResult<()> {
        self.enter(Call::Start {
            id: id.to_string(),
            host_config: host_config.clone(),
        })
        .await?;
        let mut state = self.lock();
        let idx = Self::find(&mut state, id)?;
        let replica = &mut state.containers[idx];
        if *host_config != HostConfig::default() && *host_config != replica.config.host_config {
            return Err(RuntimeError::HostConfigMismatch(id.to_string()));
        }
        replica.running = true;
        Ok(())
    }

    async fn kill(&self, id: &str, _signal: &str) -> RuntimeResult<()> {
        self.enter(Call::Kill(id.to_string())).await?;
        let mut state = self.lock();
        let idx = Self::find(&mut state, id)?;
        if !state.containers[idx].running {
            return Err(RuntimeError::NotRunning(id.to_string()));
        }
        state.containers[idx].running = false;
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> RuntimeResult<()> {
        self.enter(Call::Remove {
            id: id.to_string(),
            force,
        })
        .await?;
        let mut state = self.lock();
        let idx = Self::find(&mut state, id)?;
        if state.containers[idx].running && !force {
            return Err(RuntimeError::Engine {
                status: 409,
                message: format!("container {id} is running"),
            });
        }
        state.containers.remove(idx);
        Ok(())
    }

    async fn stop(&self, id: &str, _timeout_secs: u32) -> RuntimeResult<()> {
        self.enter(Call::Stop(id.to_string())).await?;
        self.set_running(id, false)
    }

    async fn restart(&self, id: &str, _timeout_secs: u32) -> RuntimeResult<()> {
        self.enter(Call::Restart(id.to_string())).await?;
        self.set_running(id, true)
    }

    async fn info(&self) -> RuntimeResult<EngineInfo> {
        self.enter(Call::Info).await?;
        let state = self.lock();
        Ok(EngineInfo {
            cpus: 4,
            memory: 8 * 1024 * 1024 * 1024,
            containers: state.containers.len() as i64,
            images: 1,
        })
    }

    async fn events(&self) -> RuntimeResult<mpsc::Receiver<EngineEvent>> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(RuntimeError::Unavailable("mock engine offline".to_string()));
        }
        let (tx, rx) = mpsc::channel(64);
        state.subscribers.push(tx);
        Ok(rx)
    }
}
