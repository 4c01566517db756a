//! drydock-runtime: the container runtime client used by Drydock.
//!
//! Everything the controllers know about containers comes through the
//! [`ContainerRuntime`] trait: listing, inspecting, pulling, creating,
//! starting, killing and removing. Two implementations ship here:
//!
//! - **`DockerClient`**: talks to a Docker Engine over its HTTP API
//! - **`MockRuntime`**: in-process fake with fault injection and a call
//!   journal, used by the controller test suites
//!
//! # Data model
//!
//! ```text
//! ContainerSummary   (list)     id, image, names, state
//! ReplicaDescriptor  (inspect)  id, name, image, args, running
//!   └── ContainerConfig         hostname, cmd, env, labels, ports, networks
//!         └── HostConfig        memory, binds, port bindings, network mode
//! ```
//!
//! The wire types use the Engine's PascalCase field names so the same
//! structs are sent to `/containers/create` and read from
//! `/containers/{id}/json`. Host configuration travels with create; a
//! later `start` only checks that it was handed the same one.

pub mod docker;
pub mod error;
pub mod mock;
pub mod runtime;
pub mod types;

pub use docker::{DockerClient, DockerConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use mock::{Call, MockRuntime, Op, descriptor};
pub use runtime::ContainerRuntime;
pub use types::*;
