//! Threshold and lifecycle-event configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::default_true;

/// Breach thresholds for sampled host metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    /// Memory used/total percentage.
    #[serde(default = "default_memory_percent")]
    pub memory_percent: f64,

    /// Filesystem used/total percentage.
    #[serde(default = "default_storage_percent")]
    pub storage_percent: f64,

    /// Mount point checked for storage usage.
    #[serde(default = "default_storage_mount")]
    pub storage_mount: String,

    /// Aggregate CPU utilization percentage.
    #[serde(default = "default_cpu_percent")]
    pub cpu_percent: f64,

    /// Combined receive and transmit rate.
    #[serde(default = "default_network_bytes_per_sec")]
    pub network_bytes_per_sec: f64,

    /// Running process count.
    #[serde(default = "default_process_count")]
    pub process_count: usize,

    /// 1-minute load average divided by logical CPU count.
    #[serde(default = "default_load_per_cpu")]
    pub load_per_cpu: f64,

    /// Main CPU sensor temperature.
    #[serde(default = "default_cpu_temperature")]
    pub cpu_temperature_celsius: f64,

    /// Uptime below this is reported as a possible reboot.
    #[serde(default = "default_min_uptime_secs")]
    pub min_uptime_secs: u64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            memory_percent: default_memory_percent(),
            storage_percent: default_storage_percent(),
            storage_mount: default_storage_mount(),
            cpu_percent: default_cpu_percent(),
            network_bytes_per_sec: default_network_bytes_per_sec(),
            process_count: default_process_count(),
            load_per_cpu: default_load_per_cpu(),
            cpu_temperature_celsius: default_cpu_temperature(),
            min_uptime_secs: default_min_uptime_secs(),
        }
    }
}

fn default_memory_percent() -> f64 {
    80.0
}

fn default_storage_percent() -> f64 {
    90.0
}

fn default_storage_mount() -> String {
    "/".to_string()
}

fn default_cpu_percent() -> f64 {
    80.0
}

fn default_network_bytes_per_sec() -> f64 {
    1_000_000.0
}

fn default_process_count() -> usize {
    200
}

fn default_load_per_cpu() -> f64 {
    1.0
}

fn default_cpu_temperature() -> f64 {
    70.0
}

fn default_min_uptime_secs() -> u64 {
    3600
}

/// Process lifecycle event kind reported by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleKind {
    #[serde(alias = "start")]
    Started,
    #[serde(alias = "error")]
    Errored,
    #[serde(alias = "stop")]
    Stopped,
}

impl LifecycleKind {
    /// All supported kinds.
    pub const ALL: [LifecycleKind; 3] = [
        LifecycleKind::Started,
        LifecycleKind::Errored,
        LifecycleKind::Stopped,
    ];

    /// Short name used in alert keys and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleKind::Started => "start",
            LifecycleKind::Errored => "error",
            LifecycleKind::Stopped => "stop",
        }
    }

    /// Whether the event means the process is unhealthy.
    pub fn is_failure(&self) -> bool {
        matches!(self, LifecycleKind::Errored | LifecycleKind::Stopped)
    }
}

impl std::fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "started" => Ok(LifecycleKind::Started),
            "error" | "errored" => Ok(LifecycleKind::Errored),
            "stop" | "stopped" => Ok(LifecycleKind::Stopped),
            other => Err(format!("unknown lifecycle kind '{}'", other)),
        }
    }
}

/// Process-supervisor event configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Whether lifecycle events are consumed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Unix socket streaming newline-delimited JSON events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<String>,

    /// Event kinds that raise alerts.
    #[serde(default = "default_monitored_kinds")]
    pub monitored_kinds: Vec<LifecycleKind>,

    /// Process ids whose events are ignored.
    #[serde(default)]
    pub excluded_process_ids: Vec<u32>,

    /// Seconds to wait before reconnecting to the event socket.
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            socket_path: None,
            monitored_kinds: default_monitored_kinds(),
            excluded_process_ids: Vec::new(),
            reconnect_secs: default_reconnect_secs(),
        }
    }
}

fn default_monitored_kinds() -> Vec<LifecycleKind> {
    LifecycleKind::ALL.to_vec()
}

fn default_reconnect_secs() -> u64 {
    5
}
