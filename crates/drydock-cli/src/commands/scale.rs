//! `run` and `scale`.

use std::sync::Arc;

use anyhow::bail;
use drydock_runtime::{ContainerConfig, ReplicaDescriptor, ReplicaId, short_id};
use drydock_scheduler::{Launcher, ScaleOutcome, Scaler};
use serde::Serialize;

use super::App;

/// Options for `drydock run`.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub image: String,
    pub count: usize,
    pub pull: bool,
    pub memory: i64,
    pub args: Vec<String>,
}

impl RunSpec {
    fn template(&self) -> ReplicaDescriptor {
        let mut config = ContainerConfig::for_image(&self.image);
        if !self.args.is_empty() {
            config.cmd = Some(self.args.clone());
        }
        config.host_config.memory = self.memory;
        ReplicaDescriptor {
            id: ReplicaId::new(),
            name: String::new(),
            image: self.image.clone(),
            args: self.args.iter().skip(1).cloned().collect(),
            running: false,
            config,
        }
    }
}

#[derive(Serialize)]
struct Launched {
    launched: Vec<ReplicaId>,
}

/// `drydock run`: launch a batch of new replicas.
pub async fn run(app: &App, spec: &RunSpec) -> anyhow::Result<String> {
    let report = Launcher::new(Arc::clone(&app.runtime))
        .launch(&spec.template(), spec.count, spec.pull)
        .await;

    if !report.failures.is_empty() {
        let lines: Vec<String> = report.failures.iter().map(|f| f.to_string()).collect();
        bail!(
            "launched {} of {} replicas ({})\n  {}",
            report.launched.len(),
            report.requested,
            report
                .launched
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", "),
            lines.join("\n  ")
        );
    }

    let launched = Launched {
        launched: report.launched,
    };
    app.render(&launched, |l| {
        l.launched
            .iter()
            .map(|id| short_id(id))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// `drydock scale`: reconcile the class of a replica to `count`.
pub async fn scale(app: &App, prefix: &str, count: usize) -> anyhow::Result<String> {
    let events = app.events()?;
    let scaler = Scaler::new(Arc::clone(&app.runtime), Arc::new(events));
    let outcome = scaler.scale_replica(prefix, count).await?;
    app.render(&outcome, outcome_text)
}

fn outcome_text(outcome: &ScaleOutcome) -> String {
    match outcome {
        ScaleOutcome::NoChange { count } => format!("already at {count} replicas"),
        ScaleOutcome::ScaledDown {
            from,
            to,
            destroyed,
        } => format!(
            "scaled from {from} to {to}, destroyed {}",
            destroyed.iter().map(|id| short_id(id)).collect::<Vec<_>>().join(", ")
        ),
        ScaleOutcome::ScaledUp { from, to, launched } => format!(
            "scaled from {from} to {to}, launched {}",
            launched.iter().map(|id| short_id(id)).collect::<Vec<_>>().join(", ")
        ),
    }
}
