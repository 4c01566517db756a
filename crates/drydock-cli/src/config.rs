//! drydock.toml configuration.
//!
//! ```toml
//! [runtime]
//! endpoint = "http://127.0.0.1:2375"
//! api_version = "v1.41"
//! timeout = "30s"
//!
//! [events]
//! path = "/var/lib/drydock/events.redb"
//!
//! [log]
//! filter = "info"
//! format = "text"   # or "json"
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use drydock_runtime::DockerConfig;
use serde::{Deserialize, Serialize};

/// File read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "drydock.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrydockConfig {
    pub runtime: RuntimeSection,
    pub events: EventsSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub endpoint: String,
    pub api_version: String,
    pub timeout: String,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:2375".to_string(),
            api_version: "v1.41".to_string(),
            timeout: "30s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    pub path: PathBuf,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/drydock/events.redb"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl DrydockConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `drydock.toml` in the
    /// working directory is used if present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Engine connection settings.
    pub fn docker_config(&self) -> anyhow::Result<DockerConfig> {
        Ok(DockerConfig {
            endpoint: self.runtime.endpoint.trim_end_matches('/').to_string(),
            api_version: self.runtime.api_version.clone(),
            timeout: parse_duration(&self.runtime.timeout)
                .context("invalid [runtime] timeout")?,
        })
    }
}

/// Parse `"30s"`, `"2m"` or a bare number of seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (digits, scale) = if let Some(mins) = s.strip_suffix('m') {
        (mins, 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s, 1)
    };
    let Ok(value) = digits.trim().parse::<u64>() else {
        bail!("expected a duration like \"30s\" or \"2m\", got {s:?}");
    };
    Ok(Duration::from_secs(value * scale))
}
