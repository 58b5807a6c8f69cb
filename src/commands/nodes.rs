//! Nodes command implementation.
//!
//! Lists the node directory together with the current online set.

use anyhow::Context;
use std::time::Duration;

use fleetpulse::{format_bytes, format_os, format_uptime, NodeIdentity};

use crate::commands::check::await_first_message;
use crate::config::Config;

/// How long to wait for the online set before listing without it.
const ONLINE_WAIT: Duration = Duration::from_secs(3);

fn describe_billing(node: &NodeIdentity) -> String {
    if node.price <= 0.0 {
        return "free".to_string();
    }
    let cycle = match node.billing_cycle {
        0 => "once".to_string(),
        30 | 31 => "month".to_string(),
        365 | 366 => "year".to_string(),
        days => format!("{}d", days),
    };
    format!("{:.2}/{}", node.price, cycle)
}

/// Lists nodes from `/api/nodes`, heaviest weight first.
pub async fn command_nodes(verbose: bool, config: &Config) -> anyhow::Result<()> {
    let client = config.history_client().context("building HTTP client")?;
    let mut nodes = client
        .fetch_nodes()
        .await
        .with_context(|| format!("fetching node directory from {}", config.server_url()))?;
    nodes.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let live = match config.feed_config() {
        Ok(feed) => await_first_message(feed, ONLINE_WAIT).await.0,
        Err(_) => None,
    };

    println!("📋 {} nodes", nodes.len());
    println!("==================");
    for node in &nodes {
        let (marker, uptime) = match &live {
            Some(message) if message.is_online(&node.uuid) => (
                "🟢",
                message
                    .sample(&node.uuid)
                    .map(|s| format_uptime(s.uptime))
                    .unwrap_or_default(),
            ),
            Some(_) => ("🔴", String::new()),
            None => ("⚪", String::new()),
        };

        println!(
            "{} {:<24} {:<10} {:<8} {:>3} cores  mem {:<10} disk {:<10} {:<6} {}",
            marker,
            node.name,
            format_os(&node.os),
            node.arch,
            node.cpu_cores,
            format_bytes(node.mem_total as f64, 2),
            format_bytes(node.disk_total as f64, 2),
            node.region,
            uptime
        );

        if verbose {
            println!("     uuid:           {}", node.uuid);
            println!("     cpu:            {}", node.cpu_name);
            if !node.gpu_name.is_empty() {
                println!("     gpu:            {}", node.gpu_name);
            }
            println!("     virtualization: {}", node.virtualization);
            println!("     swap:           {}", format_bytes(node.swap_total as f64, 2));
            println!("     agent version:  {}", node.version);
            println!("     billing:        {}", describe_billing(node));
            if !node.expired_at.is_empty() {
                println!("     expires:        {}", node.expired_at);
            }
        }
    }

    if live.is_none() {
        println!("\n⚠️  Online status unavailable (no live message within {}s)", ONLINE_WAIT.as_secs());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_billing() {
        let mut node = NodeIdentity::default();
        assert_eq!(describe_billing(&node), "free");

        node.price = 5.0;
        node.billing_cycle = 30;
        assert_eq!(describe_billing(&node), "5.00/month");

        node.billing_cycle = 90;
        assert_eq!(describe_billing(&node), "5.00/90d");
    }
}
