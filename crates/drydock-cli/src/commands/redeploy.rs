//! `redeploy`.

use std::sync::Arc;

use drydock_rollout::{RedeployReport, Redeployer};
use drydock_runtime::short_id;

use super::App;

pub async fn redeploy(app: &App, image: &str) -> anyhow::Result<String> {
    let events = app.events()?;
    let redeployer = Redeployer::new(Arc::clone(&app.runtime), Arc::new(events));
    let report = redeployer.redeploy(image).await?;
    app.render(&report, report_text)
}

fn report_text(report: &RedeployReport) -> String {
    if report.replaced.is_empty() {
        return format!("no replicas match {:?}", report.query);
    }
    let mut out = format!("redeployed {} replica(s)", report.deployed());
    for r in &report.replaced {
        out.push_str(&format!(
            "\n  {} -> {}  {}",
            short_id(&r.old),
            short_id(&r.new),
            r.image
        ));
    }
    out
}
