//! CLI arguments and subcommands for fleetpulse.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "fleetpulse",
    about = "Terminal client for the live telemetry feed of a server-fleet dashboard",
    long_about = "Terminal client for the live telemetry feed of a server-fleet dashboard.\n\n\
                  Connects to the dashboard's push channel, keeps rolling chart windows per \
                  node (seeded from recent history) and renders them as text. Reconnects \
                  automatically with a fixed delay while the server is unreachable.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Dashboard server base URL (http:// or https://)
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Log level (overrides log_level from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Delay before reconnecting the push channel (milliseconds)
    #[arg(long)]
    pub reconnect_delay_ms: Option<u64>,

    /// Keep-alive probe interval while connected (milliseconds)
    #[arg(long)]
    pub keepalive_interval_ms: Option<u64>,

    /// Give up after N consecutive reconnects (0 = retry forever)
    #[arg(long)]
    pub max_reconnect_attempts: Option<u32>,

    /// Path to JSON test data file (used instead of the history endpoint)
    #[arg(short = 't', long)]
    pub test_data_file: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow one node live and render its charts
    Watch {
        /// Node id (uuid)
        node: String,

        /// Render the detail view instead of the six mini-charts
        #[arg(long)]
        instance: bool,

        /// Skip seeding from recent history
        #[arg(long)]
        no_history: bool,

        /// Stop after N renders (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value_t = 0)]
        iterations: usize,
    },

    /// List nodes from the node directory
    Nodes {
        /// Show hardware and billing details
        #[arg(long)]
        verbose: bool,
    },

    /// Print a window seeded from a node's recent history
    History {
        /// Node id (uuid)
        node: String,

        /// Metric family (cpu, memory, disk, network, connections, process, instance)
        #[arg(short = 'f', long, default_value = "cpu")]
        family: String,

        /// Output format for the points
        #[arg(long, value_enum)]
        format: Option<ConfigFormat>,
    },

    /// Check connectivity to the history endpoint and the push channel
    Check {
        /// Seconds to wait for the first push message
        #[arg(long, default_value_t = 10)]
        wait_secs: u64,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Generate synthetic history JSON file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.json")]
        output: PathBuf,

        /// Number of samples
        #[arg(long, default_value_t = 180)]
        count: usize,

        /// Seconds between consecutive samples
        #[arg(long, default_value_t = 2)]
        interval_secs: u64,
    },
}
