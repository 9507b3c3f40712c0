//! Alert types and core trait definitions.

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_config::LifecycleKind;

use crate::render::DisplayZone;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Critical.
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "INFO"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Error => write!(f, "ERROR"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl AlertSeverity {
    /// Get emoji for severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "\u{2139}\u{fe0f}",
            AlertSeverity::Warning => "\u{26a0}\u{fe0f}",
            AlertSeverity::Error => "\u{274c}",
            AlertSeverity::Critical => "\u{1f6a8}",
        }
    }
}

/// A sampled host dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Memory,
    Storage,
    Cpu,
    Network,
    ProcessCount,
    Load,
    Temperature,
    Uptime,
}

impl MetricKind {
    /// Every dimension, in evaluation order.
    pub const ALL: [MetricKind; 8] = [
        MetricKind::Memory,
        MetricKind::Storage,
        MetricKind::Cpu,
        MetricKind::Network,
        MetricKind::ProcessCount,
        MetricKind::Load,
        MetricKind::Temperature,
        MetricKind::Uptime,
    ];

    /// Stable cooldown key.
    pub fn key(&self) -> &'static str {
        match self {
            MetricKind::Memory => "memory",
            MetricKind::Storage => "storage",
            MetricKind::Cpu => "cpu",
            MetricKind::Network => "network",
            MetricKind::ProcessCount => "process-count",
            MetricKind::Load => "load",
            MetricKind::Temperature => "temperature",
            MetricKind::Uptime => "uptime",
        }
    }

    /// Human-readable alert type.
    pub fn title(&self) -> &'static str {
        match self {
            MetricKind::Memory => "High Memory Usage",
            MetricKind::Storage => "High Storage Usage",
            MetricKind::Cpu => "High CPU Usage",
            MetricKind::Network => "High Network Usage",
            MetricKind::ProcessCount => "High Process Count",
            MetricKind::Load => "High System Load",
            MetricKind::Temperature => "High CPU Temperature",
            MetricKind::Uptime => "Possible Reboot Detected",
        }
    }

    /// Short label used in audit lines.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Memory => "Memory",
            MetricKind::Storage => "Storage",
            MetricKind::Cpu => "CPU",
            MetricKind::Network => "Network",
            MetricKind::ProcessCount => "Process",
            MetricKind::Load => "Load",
            MetricKind::Temperature => "Temperature",
            MetricKind::Uptime => "Uptime",
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            MetricKind::Storage => AlertSeverity::Critical,
            MetricKind::Temperature => AlertSeverity::Error,
            _ => AlertSeverity::Warning,
        }
    }

    /// Accent color for rendered messages.
    pub fn color(&self) -> &'static str {
        match self {
            MetricKind::Memory => "#ff9800",
            MetricKind::Storage => "#f44336",
            MetricKind::Cpu => "#e91e63",
            MetricKind::Network => "#9c27b0",
            MetricKind::ProcessCount => "#3f51b5",
            MetricKind::Load => "#2196f3",
            MetricKind::Temperature => "#ff5722",
            MetricKind::Uptime => "#4caf50",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Deterministic identity of a recurring alert condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey(String);

impl AlertKey {
    /// Key for a sampled metric breach, e.g. `memory`.
    pub fn metric(kind: MetricKind) -> Self {
        Self(kind.key().to_string())
    }

    /// Key for a process lifecycle event, e.g. `process:3:stop`.
    pub fn lifecycle(process_id: u32, kind: LifecycleKind) -> Self {
        Self(format!("process:{}:{}", process_id, kind.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AlertKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A supervised process as reported by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process name.
    #[serde(default = "unknown_process_name")]
    pub name: String,
    /// Supervisor-assigned id.
    #[serde(alias = "pm_id")]
    pub id: u32,
}

fn unknown_process_name() -> String {
    "Unknown".to_string()
}

/// What raised the alert.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertOrigin {
    /// A sampled metric crossed its threshold.
    Metric(MetricKind),
    /// A supervised process changed state.
    Lifecycle {
        process: ProcessInfo,
        kind: LifecycleKind,
    },
}

/// An alert message.
///
/// The same value flows from construction to every renderer, so no channel
/// has to recover structure from formatted text.
#[derive(Debug, Clone)]
pub struct Alert {
    /// Cooldown identity.
    pub key: AlertKey,
    /// Originating condition.
    pub origin: AlertOrigin,
    /// Alert title.
    pub title: String,
    /// Severity level.
    pub severity: AlertSeverity,
    /// One-line metrics summary.
    pub metrics: String,
    /// Multi-line description.
    pub message: String,
    /// When the condition was observed.
    pub timestamp: DateTime<Utc>,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}

impl Alert {
    /// Create an alert for a metric breach.
    pub fn metric(
        kind: MetricKind,
        metrics: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            key: AlertKey::metric(kind),
            origin: AlertOrigin::Metric(kind),
            title: kind.title().to_string(),
            severity: kind.severity(),
            metrics: metrics.into(),
            message: message.into(),
            timestamp,
            details: None,
        }
    }

    /// Create an alert for a process lifecycle event.
    pub fn lifecycle(process: ProcessInfo, kind: LifecycleKind, timestamp: DateTime<Utc>) -> Self {
        let severity = if kind.is_failure() {
            AlertSeverity::Error
        } else {
            AlertSeverity::Info
        };
        Self {
            key: AlertKey::lifecycle(process.id, kind),
            title: format!("Process {}: {}", kind.as_str().to_uppercase(), process.name),
            severity,
            metrics: format!("{} (ID: {})", process.name, process.id),
            message: format!(
                "Process \"{}\" (ID: {}) {}",
                process.name,
                process.id,
                kind.as_str()
            ),
            origin: AlertOrigin::Lifecycle { process, kind },
            timestamp,
            details: None,
        }
    }

    /// Set details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Name used to look up mail recipients.
    pub fn route(&self) -> &str {
        match &self.origin {
            AlertOrigin::Metric(_) => self.key.as_str(),
            AlertOrigin::Lifecycle { process, .. } => &process.name,
        }
    }

    /// Mail subject line.
    pub fn subject(&self) -> String {
        match &self.origin {
            AlertOrigin::Metric(_) => format!("Server Alert: {}", self.title),
            AlertOrigin::Lifecycle { .. } => self.title.clone(),
        }
    }

    /// Accent color for rendered messages.
    pub fn color(&self) -> &'static str {
        match &self.origin {
            AlertOrigin::Metric(kind) => kind.color(),
            AlertOrigin::Lifecycle { kind, .. } if kind.is_failure() => "#dc3545",
            AlertOrigin::Lifecycle { .. } => "#28a745",
        }
    }

    /// Label written to the audit trail.
    pub fn audit_label(&self) -> String {
        match &self.origin {
            AlertOrigin::Metric(kind) => kind.label().to_string(),
            AlertOrigin::Lifecycle { process, kind } => {
                format!("Process {} ({}, ID: {})", kind.as_str(), process.name, process.id)
            }
        }
    }

    /// Format for plain-text output.
    pub fn format_text(&self, zone: &DisplayZone) -> String {
        let time = zone.format(&self.timestamp);
        match &self.origin {
            AlertOrigin::Metric(_) => format!("{}\nTime: {}", self.message, time),
            AlertOrigin::Lifecycle { .. } => format!("{} at {}.", self.message, time),
        }
    }
}

/// Outcome of one channel's delivery attempt(s) for one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResult {
    /// Channel name.
    pub channel: String,
    /// Whether the alert reached the transport.
    pub success: bool,
    /// Last error, if delivery failed.
    pub error: Option<String>,
    /// Attempts made.
    pub attempts: u32,
}

impl ChannelResult {
    pub fn delivered(channel: impl Into<String>, attempts: u32) -> Self {
        Self {
            channel: channel.into(),
            success: true,
            error: None,
            attempts,
        }
    }

    pub fn failed(channel: impl Into<String>, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            success: false,
            error: Some(error.into()),
            attempts,
        }
    }
}

/// Notification channel trait.
///
/// Implementations own their retry policy and never return an error: every
/// failure is folded into the returned [`ChannelResult`].
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// Deliver an alert.
    async fn send(&self, alert: &Alert) -> ChannelResult;
}
