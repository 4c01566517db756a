//! drydock-rollout: image-triggered redeployment.
//!
//! A redeploy finds every replica whose image contains a query string and
//! replaces each one in turn:
//!
//! ```text
//! inspect ─► pull (exact image) ─► destroy ─► create (captured config) ─► start
//! ```
//!
//! Replicas are handled strictly one after another. The first failing
//! step aborts the whole call; replicas already replaced stay replaced.

pub mod controller;
pub mod error;

pub use controller::{RedeployReport, RedeployStep, Redeployer, Replacement};
pub use error::{RedeployError, RedeployResult};
