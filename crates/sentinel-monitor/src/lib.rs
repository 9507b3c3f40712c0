//! # Sentinel Monitor
//!
//! Alert engine for server-health monitoring.
//!
//! ## Features
//!
//! - Periodic host sampling (memory, storage, CPU, network, processes,
//!   load, temperature, uptime) with per-metric thresholds
//! - Process-supervisor lifecycle events
//! - Per-key cooldown shared by both alert sources
//! - Alert notifications (mail/chat webhook) with an append-only audit trail

pub mod error;
pub mod alerts;
pub mod alert_channels;
pub mod audit;
pub mod cooldown;
pub mod dispatcher;
pub mod evaluator;
pub mod event_bridge;
pub mod event_source;
pub mod mailer;
pub mod provider;
pub mod recheck;
pub mod render;
pub mod sampling;
pub mod system_provider;

pub use error::MonitorError;
pub use alerts::{
    Alert, AlertKey, AlertOrigin, AlertSeverity, ChannelResult, MetricKind, NotificationChannel,
    ProcessInfo,
};
pub use alert_channels::{ChatWebhookChannel, MailChannel};
pub use audit::AuditLog;
pub use cooldown::CooldownTracker;
pub use dispatcher::Dispatcher;
pub use event_bridge::{BridgeOutcome, EventBridge, EventFilter, ProcessEvent};
#[cfg(unix)]
pub use event_source::SocketEventSource;
pub use mailer::{MailTransport, OutgoingMail, SmtpMailer};
pub use provider::{HostSnapshot, MetricsProvider};
pub use recheck::{watch_file, AuditWatcher, RecheckSignal};
pub use render::DisplayZone;
pub use sampling::{CycleReport, LoopState, SamplingLoop, SamplingSettings};
pub use system_provider::SystemProvider;
