//! Alert dispatcher fanning one alert out to every channel.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use sentinel_config::Config;

use crate::alert_channels::{ChatWebhookChannel, MailChannel};
use crate::audit::AuditLog;
use crate::error::MonitorError;
use crate::mailer::SmtpMailer;
use crate::render::DisplayZone;

use super::alerts::{Alert, ChannelResult, NotificationChannel};

/// Alert dispatcher.
pub struct Dispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    audit: Arc<AuditLog>,
}

impl Dispatcher {
    /// Create a dispatcher with no channels.
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self {
            channels: Vec::new(),
            audit,
        }
    }

    /// Create from config.
    pub fn from_config(
        config: &Config,
        audit: Arc<AuditLog>,
        zone: DisplayZone,
    ) -> Result<Self, MonitorError> {
        let mut dispatcher = Self::new(audit);

        if let Some(ref mail) = config.mail {
            info!(host = %mail.smtp_host, "Adding mail alert channel");
            let transport = Arc::new(SmtpMailer::from_config(mail)?);
            dispatcher.add_channel(Arc::new(MailChannel::new(mail.clone(), transport, zone)));
        }

        if let Some(ref chat) = config.chat {
            info!("Adding chat webhook alert channel");
            dispatcher.add_channel(Arc::new(ChatWebhookChannel::new(chat, zone)?));
        }

        Ok(dispatcher)
    }

    /// Add a channel.
    pub fn add_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        self.channels.push(channel);
    }

    /// Get list of channel names.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Record the alert and deliver it to every channel concurrently.
    ///
    /// Never fails: a channel that errors or panics shows up as a failed
    /// [`ChannelResult`].
    pub async fn dispatch(&self, alert: Alert) -> Vec<ChannelResult> {
        if let Err(e) = self.audit.record_alert(&alert).await {
            warn!(key = %alert.key, error = %e, "Failed to write audit record");
        }

        let alert = Arc::new(alert);
        let names: Vec<String> = self.channels.iter().map(|c| c.name().to_string()).collect();
        let tasks = self.channels.iter().map(|channel| {
            let channel = Arc::clone(channel);
            let alert = Arc::clone(&alert);
            tokio::spawn(async move { channel.send(&alert).await })
        });

        let joined = join_all(tasks).await;

        let results: Vec<ChannelResult> = joined
            .into_iter()
            .zip(names)
            .map(|(outcome, name)| match outcome {
                Ok(result) => result,
                Err(e) => ChannelResult::failed(name, 0, format!("channel task aborted: {}", e)),
            })
            .collect();

        for result in &results {
            if result.success {
                info!(
                    key = %alert.key,
                    channel = %result.channel,
                    attempts = result.attempts,
                    "Alert delivered"
                );
            } else {
                error!(
                    key = %alert.key,
                    channel = %result.channel,
                    attempts = result.attempts,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "Alert delivery failed"
                );
            }
        }

        results
    }

    /// Dispatch on a detached task so the caller never waits on channels.
    pub fn spawn(self: &Arc<Self>, alert: Alert) -> JoinHandle<Vec<ChannelResult>> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.dispatch(alert).await })
    }
}
