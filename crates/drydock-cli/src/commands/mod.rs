//! Subcommand implementations.
//!
//! Each command returns its rendered output; `main` prints it. Text output
//! is a plain table, JSON output is the serialized result.

pub mod events;
pub mod fleet;
pub mod redeploy;
pub mod scale;

use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;
use drydock_events::EventStore;
use drydock_runtime::{ContainerRuntime, DockerClient};
use drydock_scheduler::Fleet;
use serde::Serialize;

use crate::config::DrydockConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Shared handles for one CLI invocation.
pub struct App {
    pub config: DrydockConfig,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub format: OutputFormat,
}

impl App {
    /// Connect to the engine named in `config`.
    pub fn connect(config: DrydockConfig, format: OutputFormat) -> anyhow::Result<Self> {
        let docker = DockerClient::new(&config.docker_config()?)?;
        Ok(Self::with_runtime(config, Arc::new(docker), format))
    }

    pub fn with_runtime(
        config: DrydockConfig,
        runtime: Arc<dyn ContainerRuntime>,
        format: OutputFormat,
    ) -> Self {
        Self {
            config,
            runtime,
            format,
        }
    }

    pub fn fleet(&self) -> Fleet {
        Fleet::new(Arc::clone(&self.runtime))
    }

    /// Open the event log, creating its directory if needed.
    pub fn events(&self) -> anyhow::Result<EventStore> {
        let path = &self.config.events.path;
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        EventStore::open(path).with_context(|| format!("opening event log {}", path.display()))
    }

    /// Render `value` as JSON, or as text via `text`.
    pub fn render<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> anyhow::Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Text => Ok(text(value)),
        }
    }
}
