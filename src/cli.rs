//! CLI definitions for Sentinel.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sentinel CLI.
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Server-health alert engine")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config/sentinel.toml",
        env = "SENTINEL_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the monitor in foreground (default)
    Run,

    /// Validate the configuration and exit
    Check,

    /// Run a single sampling cycle, wait for deliveries and exit
    Once,
}
