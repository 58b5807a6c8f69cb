//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("fleetpulse.yaml"),
    };

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Fleetpulse Configuration
# ========================
#
# Server
# ------
# server_url: "http://127.0.0.1:25774"  # Dashboard base URL (http or https)
# feed_path: "/api/clients"             # Push channel path (ws/wss derived from server_url)
# request_timeout_secs: 10              # Timeout for history and node directory requests
#
# Live Feed
# ---------
# reconnect_delay_ms: 2000     # Fixed delay before reconnecting after a close
# keepalive_interval_ms: 2000  # Keep-alive probe interval while connected
# probe_message: "get"         # Text sent as keep-alive probe
# max_reconnect_attempts: 0    # 0 = retry forever
#
# Windows
# -------
# dashboard_window: 50         # Points per dashboard mini-chart
# instance_window: 180         # Points in the node detail view
# render_interval_ms: 2000     # Terminal redraw interval for `watch`
#
# Logging
# -------
# log_level: "warn"            # off, error, warn, info, debug, trace
#
# Test Data
# ---------
# test_data_file: null         # JSON history file used instead of /api/recent
"#;

    format!("{comments}\n{yaml}")
}
