//! `events` and `watch`.

use std::sync::Arc;

use drydock_events::{EngineMonitor, Event};
use drydock_runtime::short_id;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use super::App;

#[derive(Serialize)]
struct Purged {
    purged: u64,
}

/// `drydock events`: show the newest events, or purge them all.
pub fn events(app: &App, limit: Option<usize>, purge: bool) -> anyhow::Result<String> {
    let store = app.events()?;
    if purge {
        let purged = store.purge()?;
        return app.render(&Purged { purged }, |p| format!("purged {} events", p.purged));
    }
    let events = store.list(limit)?;
    app.render(&events, |e| event_table(e))
}

/// `drydock watch`: record engine events until Ctrl-C.
pub async fn watch(app: &App) -> anyhow::Result<String> {
    let store = app.events()?;
    let monitor = EngineMonitor::new(Arc::clone(&app.runtime), Arc::new(store));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for ctrl-c, watching until the engine stops");
            }
        }
    });

    let recorded = monitor.run(shutdown_rx).await?;
    Ok(format!("recorded {recorded} events"))
}

fn event_table(events: &[Event]) -> String {
    let mut out = format!(
        "{:<12}  {:<10}  {:<12}  {:<40}  {}",
        "TIME", "TYPE", "CONTAINER", "MESSAGE", "TAGS"
    );
    for e in events {
        out.push_str(&format!(
            "\n{:<12}  {:<10}  {:<12}  {:<40}  {}",
            e.time,
            e.kind,
            e.container.as_deref().map(short_id).unwrap_or("-"),
            e.message,
            e.tags.join(",")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputFormat;
    use crate::commands::testing::mock_app;

    #[test]
    fn lists_and_purges() {
        let (_, app, _dir) = mock_app(OutputFormat::Text);
        let store = app.events().unwrap();
        store.record(&Event::deployed(&["web:1".to_string()]).at(10)).unwrap();
        store
            .record(&Event::new("start", "").with_container("0123456789abcdef").at(20))
            .unwrap();
        drop(store);

        let out = events(&app, Some(1), false).unwrap();
        assert!(out.contains("0123456789ab"));
        assert!(!out.contains("web:1 deployed"));

        assert_eq!(events(&app, None, true).unwrap(), "purged 2 events");
        assert_eq!(events(&app, None, false).unwrap().lines().count(), 1);
    }

    #[test]
    fn json_listing() {
        let (_, app, _dir) = mock_app(OutputFormat::Json);
        let store = app.events().unwrap();
        store.record(&Event::scaled("web:1", 1, 2)).unwrap();
        drop(store);

        let out = events(&app, None, false).unwrap();
        let parsed: Vec<Event> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0].kind, "scale");
    }
}
