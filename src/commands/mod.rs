//! CLI command implementations for fleetpulse.
//!
//! This module provides implementations for all CLI subcommands:
//! - `watch`: Live charts for one node
//! - `nodes`: Node directory listing
//! - `history`: Window seeded from recent history
//! - `check`: Connectivity validation
//! - `config`: Configuration file generation
//! - `generate`: Test data generation

pub mod check;
pub mod config;
pub mod generate;
pub mod history;
pub mod nodes;
pub mod render;
pub mod watch;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use generate::command_generate_testdata;
pub use history::command_history;
pub use nodes::command_nodes;
pub use watch::command_watch;
