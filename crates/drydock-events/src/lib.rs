//! drydock-events: the operational event log.
//!
//! Controllers report state changes (a class was scaled, an image was
//! redeployed) as [`Event`]s through the append-only [`EventSink`] trait.
//! [`EventStore`] is the persistent sink, backed by
//! [redb](https://docs.rs/redb); [`EngineMonitor`] feeds container
//! lifecycle events from the engine into any sink.
//!
//! Events are keyed by `(time, sequence)` so a scan is chronological and
//! two events in the same second never collide.

pub mod error;
pub mod monitor;
pub mod sink;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{EventError, EventResult};
pub use monitor::EngineMonitor;
pub use sink::EventSink;
pub use store::EventStore;
pub use types::*;
