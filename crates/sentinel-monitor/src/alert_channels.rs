//! Alert channel implementations (mail, chat webhook).

#[cfg(test)]
#[path = "alert_channels_tests.rs"]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use sentinel_config::{ChatConfig, MailConfig};

use crate::error::MonitorError;
use crate::mailer::{MailTransport, OutgoingMail};
use crate::render::{chat_payload, mail_html, DisplayZone};

use super::alerts::{Alert, ChannelResult, NotificationChannel};

/// Chat webhook channel.
///
/// Each attempt is bounded by the client timeout. Failed attempts are
/// retried immediately until `max_retries` is exhausted.
pub struct ChatWebhookChannel {
    webhook_url: String,
    max_retries: u32,
    zone: DisplayZone,
    client: reqwest::Client,
}

impl ChatWebhookChannel {
    /// Create a new chat webhook channel.
    pub fn new(config: &ChatConfig, zone: DisplayZone) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| MonitorError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            webhook_url: config.webhook_url.clone(),
            max_retries: config.max_retries,
            zone,
            client,
        })
    }

    async fn post_once(&self, payload: &serde_json::Value) -> Result<(), MonitorError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| MonitorError::Delivery(format!("Webhook request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(MonitorError::Delivery(format!(
                "Webhook returned {}: {}",
                status, body
            )))
        }
    }
}

#[async_trait]
impl NotificationChannel for ChatWebhookChannel {
    fn name(&self) -> &str {
        "chat"
    }

    async fn send(&self, alert: &Alert) -> ChannelResult {
        let payload = chat_payload(alert, &self.zone);
        let max_attempts = self.max_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.post_once(&payload).await {
                Ok(()) => {
                    debug!(key = %alert.key, attempt, "Chat alert sent");
                    return ChannelResult::delivered(self.name(), attempt);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        warn!(key = %alert.key, attempt, error = %e, "Chat delivery failed, retrying");
                    }
                }
            }
        }

        error!(
            key = %alert.key,
            attempts = max_attempts,
            error = %last_error,
            "Chat delivery failed after retries"
        );
        ChannelResult::failed(self.name(), max_attempts, last_error)
    }
}

/// Mail channel.
///
/// Recipients come from the route table keyed by [`Alert::route`], falling
/// back to the default pair. A single attempt under the configured timeout.
pub struct MailChannel {
    config: MailConfig,
    transport: Arc<dyn MailTransport>,
    zone: DisplayZone,
}

impl MailChannel {
    /// Create a new mail channel.
    pub fn new(config: MailConfig, transport: Arc<dyn MailTransport>, zone: DisplayZone) -> Self {
        Self {
            config,
            transport,
            zone,
        }
    }

    /// Render the mail for an alert.
    pub fn compose(&self, alert: &Alert) -> OutgoingMail {
        let recipients = self.config.recipients_for(alert.route());
        OutgoingMail {
            from: self.config.from.clone(),
            to: recipients.to.clone(),
            cc: recipients.cc.clone(),
            subject: alert.subject(),
            text: alert.format_text(&self.zone),
            html: mail_html(alert, &self.zone),
        }
    }
}

#[async_trait]
impl NotificationChannel for MailChannel {
    fn name(&self) -> &str {
        "mail"
    }

    async fn send(&self, alert: &Alert) -> ChannelResult {
        let mail = self.compose(alert);
        if mail.to.is_empty() {
            warn!(key = %alert.key, route = alert.route(), "No mail recipients, skipping");
            return ChannelResult::failed(self.name(), 0, "no recipients configured");
        }

        let timeout = self.config.timeout();
        let outcome = match tokio::time::timeout(timeout, self.transport.deliver(&mail)).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Timeout(timeout)),
        };

        match outcome {
            Ok(()) => {
                debug!(key = %alert.key, to = ?mail.to, "Mail alert sent");
                ChannelResult::delivered(self.name(), 1)
            }
            Err(e) => {
                error!(key = %alert.key, error = %e, "Mail delivery failed");
                ChannelResult::failed(self.name(), 1, e.to_string())
            }
        }
    }
}
