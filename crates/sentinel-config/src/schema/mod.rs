//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

mod schema_channels;
mod schema_checks;

pub use schema_channels::*;
pub use schema_checks::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    #[serde(default)]
    pub events: EventsConfig,

    /// Email channel; absent means no email delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,

    /// Chat webhook channel; absent means no chat delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Alert engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum seconds between two deliveries of the same alert key.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Seconds between scheduled sampling cycles.
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,

    /// Append-only audit trail path.
    #[serde(default = "default_audit_log")]
    pub audit_log: String,

    /// Run an extra cycle when the audit log changes.
    #[serde(default = "default_true")]
    pub recheck_on_audit_change: bool,

    /// Re-check triggers this soon after a finished cycle are dropped.
    #[serde(default = "default_recheck_debounce_secs")]
    pub recheck_debounce_secs: u64,

    /// Offset applied to human-readable timestamps in notifications.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl EngineConfig {
    /// Cooldown window as a duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Sampling period as a duration.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    /// Re-check debounce as a duration.
    pub fn recheck_debounce(&self) -> Duration {
        Duration::from_secs(self.recheck_debounce_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            sample_interval_secs: default_sample_interval_secs(),
            audit_log: default_audit_log(),
            recheck_on_audit_change: default_true(),
            recheck_debounce_secs: default_recheck_debounce_secs(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_cooldown_secs() -> u64 {
    1800
}

fn default_sample_interval_secs() -> u64 {
    300
}

fn default_audit_log() -> String {
    "resource_monitor.log".to_string()
}

fn default_recheck_debounce_secs() -> u64 {
    10
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files (default: ~/.sentinel/logs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
