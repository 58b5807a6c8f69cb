//! fleetpulse - version 0.1.0
//!
//! Terminal client for the live telemetry feed of a server-fleet dashboard.
//! This is the main entry point that resolves configuration, initializes
//! logging and dispatches subcommands.

mod cli;
mod commands;
mod config;

use clap::{CommandFactory, Parser};
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;

use cli::{Args, Commands, LogLevel};
use commands::{
    command_check, command_config, command_generate_testdata, command_history, command_nodes,
    command_watch,
};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Resolves the effective log level (CLI > config > warn).
fn effective_log_level(config: &Config, args: &Args) -> LevelFilter {
    let level = match &args.log_level {
        Some(level) => level.clone(),
        None => match config.log_level.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("off") => LogLevel::Off,
            Some("error") => LogLevel::Error,
            Some("info") => LogLevel::Info,
            Some("debug") => LogLevel::Debug,
            Some("trace") => LogLevel::Trace,
            _ => LogLevel::Warn,
        },
    };

    match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) {
    let log_level = effective_log_level(config, args);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {}", log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config inspection flags short-circuit everything else
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            if !args.show_config {
                return Ok(());
            }
        }

        return show_config(&config, args.config_format.clone());
    }

    // Commands that do not need a validated configuration
    match &args.command {
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => {
            return command_config(output.clone(), format.clone(), *commented);
        }
        Some(Commands::GenerateTestdata {
            output,
            count,
            interval_secs,
        }) => {
            return command_generate_testdata(output.clone(), *count, *interval_secs);
        }
        _ => {}
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config, &args);
    debug!(server = config.server_url(), "Effective configuration loaded");

    let result = match args.command {
        Some(Commands::Watch {
            node,
            instance,
            no_history,
            iterations,
        }) => command_watch(&node, instance, no_history, iterations, &config).await,
        Some(Commands::Nodes { verbose }) => command_nodes(verbose, &config).await,
        Some(Commands::History {
            node,
            family,
            format,
        }) => command_history(&node, &family, format, &config).await,
        Some(Commands::Check { wait_secs }) => command_check(wait_secs, &config).await,
        Some(Commands::Config { .. }) | Some(Commands::GenerateTestdata { .. }) => Ok(()),
        None => {
            Args::command().print_help()?;
            println!();
            Ok(())
        }
    };

    result.map_err(|e| format!("{:#}", e).into())
}
