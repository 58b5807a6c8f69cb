//! Check command implementation.
//!
//! Validates configuration and connectivity to the dashboard server.

use std::sync::Arc;
use std::time::Duration;

use fleetpulse::{
    FanoutRegistry, FeedConfig, FeedStatsSnapshot, LiveDataResponse, LiveFeedClient,
    WebSocketConnector,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{validate_effective_config, Config};

/// Connects a short-lived feed and waits for its first decoded message.
pub async fn await_first_message(
    feed: FeedConfig,
    wait: Duration,
) -> (Option<LiveDataResponse>, FeedStatsSnapshot) {
    let registry = FanoutRegistry::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = registry.subscribe(move |message: &LiveDataResponse| {
        let _ = tx.send(message.clone());
    });

    let client = LiveFeedClient::new(feed, Arc::new(WebSocketConnector::new()), registry);
    let handle = client.connect();

    let first = tokio::time::timeout(wait, rx.recv()).await.ok().flatten();
    let stats = handle.stats().snapshot();
    handle.teardown().await;

    debug!(received = first.is_some(), "Probe connection finished");
    (first, stats)
}

/// Validates configuration, the HTTP endpoints and the push channel.
pub async fn command_check(wait_secs: u64, config: &Config) -> anyhow::Result<()> {
    println!("🔍 Fleetpulse - Connectivity Check");
    println!("==================================");

    let mut all_ok = true;

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    // Check node directory
    println!("\n🌐 Checking node directory at {}...", config.server_url());
    match config.history_client() {
        Ok(client) => match client.fetch_nodes().await {
            Ok(nodes) => {
                println!("   ✅ /api/nodes returned {} nodes", nodes.len());
                if let Some(first) = nodes.first() {
                    let outcome = client.seed_for(&first.uuid).await;
                    match outcome.error {
                        None => println!(
                            "   ✅ /api/recent/{} returned {} samples",
                            first.uuid,
                            outcome.samples.len()
                        ),
                        Some(e) => println!("   ⚠️  Recent history unavailable: {}", e),
                    }
                }
            }
            Err(e) => {
                println!("   ❌ Node directory unavailable: {}", e);
                all_ok = false;
            }
        },
        Err(e) => {
            println!("   ❌ Cannot build HTTP client: {}", e);
            all_ok = false;
        }
    }

    // Check push channel
    match config.feed_config() {
        Ok(feed) => {
            println!("\n📡 Checking push channel at {}...", feed.url);
            let (first, stats) = await_first_message(feed, Duration::from_secs(wait_secs)).await;
            match first {
                Some(message) => println!(
                    "   ✅ Live message received: {} nodes online, {} samples",
                    message.data.online.len(),
                    message.data.data.len()
                ),
                None => {
                    println!(
                        "   ❌ No live message within {}s ({} connect attempts, {} failures, {} decode errors)",
                        wait_secs, stats.connect_attempts, stats.connect_failures, stats.decode_errors
                    );
                    all_ok = false;
                }
            }
        }
        Err(e) => {
            println!("\n📡 Push channel URL invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the output above");
        std::process::exit(1);
    }
}
