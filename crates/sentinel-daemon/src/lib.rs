//! # Sentinel Daemon
//!
//! Process lifecycle for the Sentinel server-health monitor.
//!
//! ## Features
//!
//! - Configuration validation before anything starts
//! - Control requests (SIGTERM/SIGINT stop, SIGHUP forces an immediate re-check)
//! - Wiring of the sampling loop, event bridge and audit-log watch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_config::ConfigLoader;
//! use sentinel_daemon::Sentinel;
//!
//! let config = ConfigLoader::load(path)?;
//! let sentinel = Sentinel::new(config)?;
//! sentinel.run().await?;
//! ```

pub mod control;
pub mod daemon;
pub mod error;

// Re-exports
pub use daemon::Sentinel;
pub use error::{DaemonError, DaemonState};
pub use control::{Control, ControlHandle};
