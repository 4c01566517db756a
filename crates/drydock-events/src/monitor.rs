//! Engine event monitor.
//!
//! Relays the engine's container lifecycle stream into an [`EventSink`]
//! so start/die/destroy transitions end up in the same log as the
//! controllers' own events.

use std::sync::Arc;

use drydock_runtime::{ContainerRuntime, EngineEvent, short_id};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::EventResult;
use crate::sink::EventSink;
use crate::types::{DOCKER_TAG, Event, epoch_secs};

pub struct EngineMonitor {
    runtime: Arc<dyn ContainerRuntime>,
    sink: Arc<dyn EventSink>,
}

impl EngineMonitor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, sink: Arc<dyn EventSink>) -> Self {
        Self { runtime, sink }
    }

    /// Subscribe to the engine and relay events until shutdown or until
    /// the engine closes the stream. Returns the number of events recorded.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> EventResult<u64> {
        let stream = self.runtime.events().await?;
        info!("engine monitor started");
        Ok(self.relay(stream, shutdown).await)
    }

    /// Relay an already-open stream.
    ///
    /// Stops once `shutdown` turns true. A dropped sender only disables
    /// the shutdown branch; relaying then goes on until the stream ends.
    pub async fn relay(
        &self,
        mut stream: mpsc::Receiver<EngineEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut recorded = 0;
        if *shutdown.borrow_and_update() {
            return recorded;
        }
        let mut shutdown_open = true;
        loop {
            tokio::select! {
                next = stream.recv() => {
                    let Some(engine_event) = next else {
                        info!(recorded, "engine event stream closed");
                        break;
                    };
                    let event = to_event(&engine_event);
                    match self.sink.record(&event) {
                        Ok(()) => {
                            recorded += 1;
                            debug!(
                                container = %short_id(&engine_event.id),
                                status = %engine_event.status,
                                "engine event recorded"
                            );
                        }
                        Err(e) => warn!(error = %e, status = %engine_event.status, "failed to record engine event"),
                    }
                }
                changed = shutdown.changed(), if shutdown_open => match changed {
                    Ok(()) if *shutdown.borrow_and_update() => {
                        info!(recorded, "engine monitor shutting down");
                        break;
                    }
                    Ok(()) => {}
                    Err(_) => {
                        debug!("shutdown sender dropped, relaying until the stream ends");
                        shutdown_open = false;
                    }
                },
            }
        }
        recorded
    }
}

fn to_event(engine_event: &EngineEvent) -> Event {
    let time = if engine_event.time > 0 {
        engine_event.time
    } else {
        epoch_secs()
    };
    Event::new(engine_event.status.clone(), String::new())
        .with_container(engine_event.id.clone())
        .with_tags([DOCKER_TAG])
        .at(time)
}
