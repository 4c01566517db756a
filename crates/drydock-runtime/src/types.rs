//! Container data model.
//!
//! `ContainerConfig` and `HostConfig` mirror the Docker Engine API shapes
//! (PascalCase on the wire) so they can be captured from an inspect and
//! replayed into a create unchanged. Fields the controllers never read
//! (`Tty`, `Volumes`, `CapAdd`, `Mounts`, ...) are kept verbatim in
//! `extra`. `ReplicaDescriptor` is the transient snapshot the controllers
//! reason about.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Engine-assigned container identifier.
pub type ReplicaId = String;

/// Number of characters shown for abbreviated container IDs.
pub const SHORT_ID_LEN: usize = 12;

/// Abbreviate a container ID for logs and tables.
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Treat an explicit JSON `null` like a missing field.
///
/// The Engine sends `null` for empty `Cmd`, `Env`, `Binds`, `Labels`, ...
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Listing ────────────────────────────────────────────────────────

/// One row of a container listing (`GET /containers/json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: ReplicaId,
    /// Image reference as the container was created with.
    pub image: String,
    #[serde(default, deserialize_with = "null_default")]
    pub names: Vec<String>,
    /// Lifecycle state: "running", "exited", "created", ...
    #[serde(default)]
    pub state: String,
    /// Human-readable status, e.g. "Up 3 minutes".
    #[serde(default)]
    pub status: String,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

// ── Configuration ──────────────────────────────────────────────────

/// Creation-time configuration of a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    #[serde(default)]
    pub hostname: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_default")]
    pub env: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: BTreeMap<String, String>,
    /// Exposed ports keyed by "port/proto"; values are empty objects.
    #[serde(default, deserialize_with = "null_default")]
    pub exposed_ports: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Sent along with create; inspect reports it at the top level instead.
    #[serde(default)]
    pub host_config: HostConfig,
    /// Endpoint settings per network. Inspect reports these under
    /// `NetworkSettings.Networks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking_config: Option<NetworkingConfig>,
    /// Engine fields not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContainerConfig {
    /// Minimal configuration for an image.
    pub fn for_image(image: &str) -> Self {
        Self {
            image: image.to_string(),
            ..Self::default()
        }
    }
}

/// Host-side configuration: limits, bindings and networking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    /// Memory limit in bytes; 0 means unlimited.
    #[serde(default)]
    pub memory: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub binds: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub port_bindings: BTreeMap<String, Vec<PortBinding>>,
    #[serde(default, deserialize_with = "null_default")]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub dns: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub publish_all_ports: bool,
    /// Engine fields not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single host port binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    #[serde(default)]
    pub host_ip: String,
    #[serde(default)]
    pub host_port: String,
}

/// Restart behaviour applied by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RestartPolicy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub maximum_retry_count: u32,
}

/// Network attachments sent with create.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkingConfig {
    #[serde(default, deserialize_with = "null_default")]
    pub endpoints_config: BTreeMap<String, EndpointSettings>,
}

/// The user-settable part of a network endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSettings {
    #[serde(
        rename = "IPAMConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ipam_config: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_default")]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub aliases: Vec<String>,
}

// ── Descriptor ─────────────────────────────────────────────────────

/// Point-in-time snapshot of one container, as returned by inspect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaDescriptor {
    pub id: ReplicaId,
    /// Container name without the leading slash.
    pub name: String,
    /// Image reference from the container configuration.
    pub image: String,
    /// Launch arguments (the command line after the executable).
    pub args: Vec<String>,
    pub running: bool,
    pub config: ContainerConfig,
}

impl ReplicaDescriptor {
    pub fn memory_limit(&self) -> i64 {
        self.config.host_config.memory
    }

    pub fn hostname(&self) -> &str {
        &self.config.hostname
    }

    pub fn host_config(&self) -> &HostConfig {
        &self.config.host_config
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

// ── Engine ─────────────────────────────────────────────────────────

/// Engine-wide counters from `GET /info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineInfo {
    #[serde(rename = "NCPU", default)]
    pub cpus: i64,
    #[serde(rename = "MemTotal", default)]
    pub memory: i64,
    #[serde(rename = "Containers", default)]
    pub containers: i64,
    #[serde(rename = "Images", default)]
    pub images: i64,
}

/// A container lifecycle event from the engine's event stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineEvent {
    /// Lifecycle action: "create", "start", "die", "destroy", ...
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub id: String,
    /// Image the container was created from.
    #[serde(default)]
    pub from: String,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub time: i64,
}
