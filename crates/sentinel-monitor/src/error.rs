//! Monitor errors.

use std::time::Duration;

use thiserror::Error;

/// Monitor error types.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A metrics provider could not produce a reading.
    #[error("Failed to sample {dimension}: {reason}")]
    Provider {
        dimension: &'static str,
        reason: String,
    },

    /// Alert delivery failed.
    #[error("Alert delivery failed: {0}")]
    Delivery(String),

    /// A bounded operation did not finish in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The lifecycle event stream failed.
    #[error("Event source error: {0}")]
    EventSource(String),

    /// The audit-log watcher could not be installed.
    #[error("File watch error: {0}")]
    Watch(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MonitorError {
    /// Shorthand for a provider failure.
    pub fn provider(dimension: &'static str, reason: impl Into<String>) -> Self {
        MonitorError::Provider {
            dimension,
            reason: reason.into(),
        }
    }
}
