//! CLI interface for odds-watch
//!
//! Provides subcommands for:
//! - `run`: Start the monitoring loop
//! - `config`: Show the effective configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "odds-watch")]
#[command(about = "Prematch odds-drop monitor and alert bot for sportsbook betting markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the polling monitor
    Run(RunArgs),
    /// Show effective configuration
    Config,
}
