//! Sentinel - server-health alert engine
//!
//! Main entry point for the Sentinel CLI.

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sentinel_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use sentinel_daemon::{DaemonError, Sentinel};
use sentinel_monitor::SystemProvider;

use crate::cli::{Cli, Commands};

/// Get the Sentinel home directory (~/.sentinel).
fn sentinel_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sentinel")
}

/// Initialize tracing with console and rolling file output.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = match logging.directory {
        Some(ref dir) => PathBuf::from(ConfigLoader::expand_path(dir)),
        None => sentinel_dir().join("logs"),
    };
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("sentinel")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The worker flushes until the guard drops.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn load_config(path: &std::path::Path) -> Result<Config, DaemonError> {
    Ok(ConfigLoader::load(path)?)
}

/// Validate the configuration and print every finding.
fn check_config(config: &Config) -> ExitCode {
    let result = match ConfigValidator::validate(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for err in &result.errors {
        println!("error: {}: {}", err.path, err.message);
    }

    if result.is_valid() {
        println!("Configuration OK");
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

async fn execute(command: Commands, config: Config) -> Result<(), DaemonError> {
    let sentinel = Sentinel::new(config)?;
    match command {
        Commands::Once => {
            let results = sentinel.run_once(Arc::new(SystemProvider::new())).await?;
            let delivered = results.iter().filter(|r| r.success).count();
            info!(delivered, failed = results.len() - delivered, "Done");
            Ok(())
        }
        _ => sentinel.run().await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", cli.config.display(), e);
            return ExitCode::from(e.exit_code());
        }
    };

    if let Commands::Check = command {
        return check_config(&config);
    }

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match execute(command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
