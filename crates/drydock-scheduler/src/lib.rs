//! drydock-scheduler: replica classes and count reconciliation.
//!
//! Everything here works against a point-in-time listing from a
//! [`ContainerRuntime`](drydock_runtime::ContainerRuntime); nothing about
//! the fleet is cached between calls.
//!
//! # Architecture
//!
//! ```text
//! Scaler
//!   ├── Fleet (list, inspect, class lookup)
//!   │     └── classifier (image, arg count, memory limit)
//!   ├── destroy (kill, then forced remove)
//!   ├── Launcher (N concurrent pull/create/start attempts)
//!   └── EventSink ("scale" events)
//! ```
//!
//! Scale-down is sequential and stops at the first failure. Scale-up fans
//! out through the launcher, which runs every attempt to completion and
//! reports each outcome separately.

pub mod classifier;
pub mod destroy;
pub mod error;
pub mod fleet;
pub mod launcher;
pub mod scaler;

pub use classifier::{ClassKey, ReplicaClass, image_matches, same_class};
pub use destroy::destroy;
pub use error::{SchedulerError, SchedulerResult};
pub use fleet::{ClusterInfo, Fleet};
pub use launcher::{LaunchError, LaunchFailure, LaunchOutcome, LaunchReport, Launcher};
pub use scaler::{ScaleDecision, ScaleOutcome, Scaler};
