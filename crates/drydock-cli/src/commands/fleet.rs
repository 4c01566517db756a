//! `ps`, `info`, `stop`, `restart` and `destroy`.

use drydock_runtime::{ContainerSummary, ReplicaDescriptor, short_id};
use drydock_scheduler::{ClusterInfo, SchedulerError};
use serde::Serialize;

use super::App;

/// `drydock ps`
pub async fn ps(app: &App, all: bool, image: Option<&str>) -> anyhow::Result<String> {
    let fleet = app.fleet();
    match image {
        Some(substring) => {
            let replicas = fleet.containers_by_image(substring, all).await?;
            app.render(&replicas, |r| replica_table(r))
        }
        None => {
            let containers = fleet.containers(all).await?;
            app.render(&containers, |c| summary_table(c))
        }
    }
}

/// `drydock info`
pub async fn info(app: &App) -> anyhow::Result<String> {
    let info = app.fleet().cluster_info().await?;
    app.render(&info, info_text)
}

/// Per-replica lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Stop,
    Restart,
    Destroy,
}

impl Action {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Stop => "stopped",
            Self::Restart => "restarted",
            Self::Destroy => "destroyed",
        }
    }
}

#[derive(Serialize)]
struct Done {
    action: Action,
    id: String,
}

/// `drydock stop|restart|destroy`: resolve an ID prefix and act on it.
pub async fn lifecycle(app: &App, action: Action, prefix: &str) -> anyhow::Result<String> {
    let fleet = app.fleet();
    let replica = fleet
        .container(prefix)
        .await?
        .ok_or_else(|| SchedulerError::ContainerNotFound(prefix.to_string()))?;
    match action {
        Action::Stop => fleet.stop(&replica.id).await?,
        Action::Restart => fleet.restart(&replica.id).await?,
        Action::Destroy => fleet.destroy(&replica.id).await?,
    }
    let done = Done {
        action,
        id: replica.id,
    };
    app.render(&done, |d| format!("{} {}", d.action.past_tense(), short_id(&d.id)))
}

fn summary_table(containers: &[ContainerSummary]) -> String {
    let mut out = format!("{:<12}  {:<32}  {:<10}  {}", "ID", "IMAGE", "STATE", "NAME");
    for c in containers {
        let name = c.names.first().map(|n| n.trim_start_matches('/')).unwrap_or("");
        out.push_str(&format!(
            "\n{:<12}  {:<32}  {:<10}  {}",
            short_id(&c.id),
            c.image,
            c.state,
            name
        ));
    }
    out
}

fn replica_table(replicas: &[ReplicaDescriptor]) -> String {
    let mut out = format!(
        "{:<12}  {:<32}  {:<8}  {:>4}  {:>12}  {}",
        "ID", "IMAGE", "RUNNING", "ARGS", "MEMORY", "NAME"
    );
    for r in replicas {
        out.push_str(&format!(
            "\n{:<12}  {:<32}  {:<8}  {:>4}  {:>12}  {}",
            r.short_id(),
            r.image,
            if r.running { "yes" } else { "no" },
            r.args.len(),
            r.memory_limit(),
            r.name
        ));
    }
    out
}

fn info_text(info: &ClusterInfo) -> String {
    format!(
        "cpus:       {}\nmemory:     {}\ncontainers: {}\nimages:     {}\nversion:    {}",
        info.cpus, info.memory, info.containers, info.images, info.version
    )
}
