//! History command implementation.
//!
//! Seeds one window from a node's recent history and prints it.

use anyhow::Context;
use tracing::warn;

use fleetpulse::history::load_samples_from_file;
use fleetpulse::{
    CapacityTable, DedupPolicy, MetricFamily, NodeCapacity, RawSample, SampleWindow, SeedOutcome,
};

use crate::cli::ConfigFormat;
use crate::commands::render::{describe_point, render_chart_line};
use crate::config::Config;

/// Loads the seed batch for a node: the test data file when configured,
/// otherwise the history endpoint. Failures degrade to an empty seed.
pub async fn load_seed(node: &str, config: &Config) -> SeedOutcome {
    if let Some(path) = &config.test_data_file {
        return SeedOutcome::from(load_samples_from_file(path));
    }
    match config.history_client() {
        Ok(client) => client.seed_for(node).await,
        Err(e) => SeedOutcome::failed(e),
    }
}

/// Capacity totals for a node from the node directory, zeros if unavailable.
pub async fn load_capacities(config: &Config) -> CapacityTable {
    if config.test_data_file.is_some() {
        return CapacityTable::new();
    }
    let result = match config.history_client() {
        Ok(client) => client.fetch_nodes().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(nodes) => CapacityTable::from_nodes(&nodes),
        Err(e) => {
            warn!(error = %e, "Node directory unavailable, percentages use sample totals");
            CapacityTable::new()
        }
    }
}

fn seeded_window(
    family: MetricFamily,
    config: &Config,
    history: &[RawSample],
    capacity: &NodeCapacity,
) -> anyhow::Result<SampleWindow> {
    let sizes = config.window_sizes();
    let (size, dedup) = match family {
        MetricFamily::Instance => (sizes.instance, DedupPolicy::LastTimeLabel),
        _ => (sizes.dashboard, DedupPolicy::None),
    };
    let mut window = SampleWindow::new(family, size, dedup).context("creating window")?;
    window.seed_with(history, capacity);
    Ok(window)
}

/// Prints a window seeded from recent history.
pub async fn command_history(
    node: &str,
    family: &str,
    format: Option<ConfigFormat>,
    config: &Config,
) -> anyhow::Result<()> {
    let family: MetricFamily = family.parse().map_err(anyhow::Error::msg)?;

    let outcome = load_seed(node, config).await;
    if let Some(e) = &outcome.error {
        println!("⚠️  History unavailable: {}", e);
    }
    let capacity = load_capacities(config).await.get(node);
    let window = seeded_window(family, config, &outcome.samples, &capacity)?;
    let points = window.snapshot();

    match format {
        Some(ConfigFormat::Json) => println!("{}", serde_json::to_string_pretty(&points)?),
        Some(ConfigFormat::Yaml) => print!("{}", serde_yaml::to_string(&points)?),
        Some(ConfigFormat::Toml) => {
            #[derive(serde::Serialize)]
            struct Points<'a> {
                points: &'a [fleetpulse::ChartPoint],
            }
            print!("{}", toml::to_string_pretty(&Points { points: &points })?);
        }
        None => {
            println!(
                "{}",
                render_chart_line(family, &points, window.capacity(), window.axis_upper_bound())
            );
            for point in &points {
                println!("  {}  {}", point.time, describe_point(point));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpulse::sample::CpuStats;

    fn sample(usage: f64, second: u32) -> RawSample {
        RawSample {
            cpu: CpuStats { usage },
            updated_at: format!("2024-05-01T10:00:{:02}Z", second),
            ..Default::default()
        }
    }

    #[test]
    fn test_seeded_window_uses_configured_sizes() {
        let config = Config {
            dashboard_window: Some(2),
            instance_window: Some(3),
            ..Default::default()
        };
        let history: Vec<_> = (0..5).map(|i| sample(i as f64, i)).collect();

        let cpu = seeded_window(MetricFamily::Cpu, &config, &history, &NodeCapacity::default())
            .unwrap();
        assert_eq!(cpu.len(), 2);

        let instance =
            seeded_window(MetricFamily::Instance, &config, &history, &NodeCapacity::default())
                .unwrap();
        assert_eq!(instance.len(), 3);
        assert_eq!(instance.dedup_policy(), DedupPolicy::LastTimeLabel);
    }

    #[tokio::test]
    async fn test_load_seed_from_missing_file_degrades() {
        let config = Config {
            test_data_file: Some("/nonexistent/history.json".into()),
            ..Default::default()
        };
        let outcome = load_seed("n1", &config).await;
        assert!(outcome.is_degraded());
        assert!(outcome.samples.is_empty());
    }
}
