//! Event record.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Event type for a redeployment.
pub const DEPLOY: &str = "deploy";
/// Event type for a scaling change.
pub const SCALE: &str = "scale";
/// Tag attached to events relayed from the container engine.
pub const DOCKER_TAG: &str = "docker";

/// One entry in the operational event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    /// Container the event concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Unix timestamp (seconds).
    pub time: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Event {
    /// A new event stamped with the current time.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            container: None,
            time: epoch_secs(),
            message: message.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_container(mut self, id: impl Into<String>) -> Self {
        self.container = Some(id.into());
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, time: i64) -> Self {
        self.time = time;
        self
    }

    /// Aggregate event for a redeployment of the given image references.
    pub fn deployed(images: &[String]) -> Self {
        Self::new(DEPLOY, format!("{} deployed", images.join(", "))).with_tags([DEPLOY])
    }

    /// Event for a class whose replica count changed.
    pub fn scaled(image: &str, from: usize, to: usize) -> Self {
        Self::new(SCALE, format!("{image} scaled from {from} to {to}")).with_tags([SCALE])
    }
}

pub(crate) fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
