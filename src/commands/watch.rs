//! Watch command implementation.
//!
//! Follows one node on the live feed and redraws its charts periodically.

use anyhow::Context;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use fleetpulse::{format_uptime, ChartView, DashboardSession, WebSocketConnector};

use crate::commands::history::{load_capacities, load_seed};
use crate::commands::render::render_chart_line;
use crate::config::Config;

fn render_status(session: &DashboardSession, node: &str) -> String {
    let Some(feed) = session.feed() else {
        return "feed: not started".to_string();
    };
    let stats = feed.stats().snapshot();
    let (online, uptime) = match feed.latest() {
        Some(message) => (
            if message.is_online(node) { "online" } else { "offline" },
            message
                .sample(node)
                .map(|s| format_uptime(s.uptime))
                .unwrap_or_else(|| "-".to_string()),
        ),
        None => ("unknown", "-".to_string()),
    };
    format!(
        "[{}] node {} {}  up {}  messages {}  reconnects {}",
        feed.status(),
        node,
        online,
        uptime,
        stats.messages_received,
        stats.reconnects_scheduled
    )
}

fn render_view(view: &ChartView) -> String {
    render_chart_line(
        view.family(),
        &view.snapshot(),
        view.capacity(),
        view.axis_upper_bound(),
    )
}

/// Renders a node's charts until Ctrl+C or `iterations` redraws.
pub async fn command_watch(
    node: &str,
    instance: bool,
    no_history: bool,
    iterations: usize,
    config: &Config,
) -> anyhow::Result<()> {
    let mut session = DashboardSession::new(config.window_sizes()).context("creating session")?;
    session.set_capacities(load_capacities(config).await);

    let views: Vec<ChartView> = if instance {
        vec![session.mount_instance(node)?]
    } else {
        session.mount_node_dashboard(node)?.into_charts()
    };

    if !no_history {
        let outcome = load_seed(node, config).await;
        if let Some(e) = &outcome.error {
            println!("⚠️  History unavailable, starting with empty charts: {}", e);
        }
        for view in &views {
            view.seed(&outcome.samples);
        }
        debug!(samples = outcome.samples.len(), "Charts seeded");
    }

    let feed = config.feed_config().context("building live feed settings")?;
    info!(url = %feed.url, node, "Starting live feed");
    session
        .start(feed, Arc::new(WebSocketConnector::new()))
        .await;

    let mut ticker = interval(config.render_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rendered = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}", render_status(&session, node));
                for view in &views {
                    println!("  {}", render_view(view));
                }
                println!();

                rendered += 1;
                if iterations > 0 && rendered >= iterations {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing live feed");
                break;
            }
        }
    }

    drop(views);
    session.shutdown().await;
    Ok(())
}
