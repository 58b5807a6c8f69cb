//! Configuration management for fleetpulse.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use fleetpulse::feed::{
    DEFAULT_FEED_PATH, DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_PROBE_MESSAGE, DEFAULT_RECONNECT_DELAY,
};
use fleetpulse::window::{DASHBOARD_CAPACITY, INSTANCE_CAPACITY};
use fleetpulse::{
    feed_url, FeedConfig, FeedError, HistoryClient, HistoryError, ReconnectPolicy, WindowSizes,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:25774";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RENDER_INTERVAL_MS: u64 = 2000;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    #[serde(alias = "server-url")]
    pub server_url: Option<String>,
    #[serde(alias = "feed-path")]
    pub feed_path: Option<String>,
    #[serde(alias = "request-timeout-secs")]
    pub request_timeout_secs: Option<u64>,

    // Live feed
    #[serde(alias = "reconnect-delay-ms")]
    pub reconnect_delay_ms: Option<u64>,
    #[serde(alias = "keepalive-interval-ms")]
    pub keepalive_interval_ms: Option<u64>,
    #[serde(alias = "probe-message")]
    pub probe_message: Option<String>,
    /// 0 = retry forever
    #[serde(alias = "max-reconnect-attempts")]
    pub max_reconnect_attempts: Option<u32>,

    // Windows
    #[serde(alias = "dashboard-window")]
    pub dashboard_window: Option<usize>,
    #[serde(alias = "instance-window")]
    pub instance_window: Option<usize>,
    #[serde(alias = "render-interval-ms")]
    pub render_interval_ms: Option<u64>,

    // Logging
    pub log_level: Option<String>,

    /// Path to JSON test data file (used instead of the history endpoint)
    #[serde(alias = "test-data-file")]
    pub test_data_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: Some(DEFAULT_SERVER_URL.to_string()),
            feed_path: Some(DEFAULT_FEED_PATH.to_string()),
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect_delay_ms: Some(DEFAULT_RECONNECT_DELAY.as_millis() as u64),
            keepalive_interval_ms: Some(DEFAULT_KEEPALIVE_INTERVAL.as_millis() as u64),
            probe_message: Some(DEFAULT_PROBE_MESSAGE.to_string()),
            max_reconnect_attempts: Some(0),
            dashboard_window: Some(DASHBOARD_CAPACITY),
            instance_window: Some(INSTANCE_CAPACITY),
            render_interval_ms: Some(DEFAULT_RENDER_INTERVAL_MS),
            log_level: Some("warn".into()),
            test_data_file: None,
        }
    }
}

impl Config {
    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.unwrap_or(DEFAULT_RENDER_INTERVAL_MS))
    }

    pub fn window_sizes(&self) -> WindowSizes {
        WindowSizes {
            dashboard: self.dashboard_window.unwrap_or(DASHBOARD_CAPACITY),
            instance: self.instance_window.unwrap_or(INSTANCE_CAPACITY),
        }
    }

    /// Live feed settings derived from the server URL and feed options.
    pub fn feed_config(&self) -> Result<FeedConfig, FeedError> {
        let url = feed_url(
            self.server_url(),
            self.feed_path.as_deref().unwrap_or(DEFAULT_FEED_PATH),
        )?;

        let policy = match self.max_reconnect_attempts.unwrap_or(0) {
            0 => ReconnectPolicy::Forever,
            n => ReconnectPolicy::MaxAttempts(n),
        };

        let feed = FeedConfig::new(url)
            .with_reconnect_delay(
                self.reconnect_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_RECONNECT_DELAY),
            )
            .with_keepalive_interval(
                self.keepalive_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_KEEPALIVE_INTERVAL),
            )
            .with_probe_message(
                self.probe_message
                    .as_deref()
                    .unwrap_or(DEFAULT_PROBE_MESSAGE),
            )
            .with_reconnect_policy(policy);
        feed.validate()?;
        Ok(feed)
    }

    pub fn history_client(&self) -> Result<HistoryClient, HistoryError> {
        HistoryClient::new(self.server_url(), self.request_timeout())
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Server URL must be an absolute http(s) URL
    let server = cfg.server_url();
    let url = Url::parse(server).map_err(|e| format!("Invalid server_url '{}': {}", server, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(format!(
                "Invalid server_url scheme '{}', expected 'http' or 'https'",
                other
            )
            .into());
        }
    }

    if let Some(path) = cfg.feed_path.as_deref() {
        if !path.starts_with('/') {
            return Err(format!("feed_path must start with '/', got '{}'", path).into());
        }
    }

    // Windows: a zero capacity is a misconfiguration, not something to clamp
    if cfg.dashboard_window == Some(0) {
        return Err("dashboard_window must be at least 1".into());
    }
    if cfg.instance_window == Some(0) {
        return Err("instance_window must be at least 1".into());
    }

    // Timers
    for (name, value) in [
        ("reconnect_delay_ms", cfg.reconnect_delay_ms),
        ("keepalive_interval_ms", cfg.keepalive_interval_ms),
        ("render_interval_ms", cfg.render_interval_ms),
        ("request_timeout_secs", cfg.request_timeout_secs),
    ] {
        if value == Some(0) {
            return Err(format!("{} must be greater than 0", name).into());
        }
    }

    if cfg.probe_message.as_deref() == Some("") {
        return Err("probe_message must not be empty".into());
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !matches!(
            level.to_ascii_lowercase().as_str(),
            "off" | "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(format!(
                "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                level
            )
            .into());
        }
    }

    if let Some(path) = &cfg.test_data_file {
        if !path.exists() {
            return Err(format!("Test data file not found: {}", path.display()).into());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(server) = &args.server {
        config.server_url = Some(server.clone());
    }
    if let Some(delay) = args.reconnect_delay_ms {
        config.reconnect_delay_ms = Some(delay);
    }
    if let Some(interval) = args.keepalive_interval_ms {
        config.keepalive_interval_ms = Some(interval);
    }
    if let Some(attempts) = args.max_reconnect_attempts {
        config.max_reconnect_attempts = Some(attempts);
    }

    // Test data file: CLI wins if provided
    if let Some(test_file) = &args.test_data_file {
        config.test_data_file = Some(test_file.clone());
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/fleetpulse/fleetpulse.yaml",
                "/etc/fleetpulse/fleetpulse.yml",
                "/etc/fleetpulse/fleetpulse.json",
                "./fleetpulse.yaml",
                "./fleetpulse.yml",
                "./fleetpulse.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = render_config(config, &format)?;
    println!("{output}");
    Ok(())
}
