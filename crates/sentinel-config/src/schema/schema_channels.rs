//! Notification channel configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP server host.
    pub smtp_host: String,

    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Transport security mode.
    #[serde(default)]
    pub security: SmtpSecurity,

    /// SMTP username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// SMTP password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Sender address.
    pub from: String,

    /// Network timeout for a single send.
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,

    /// Recipients used when no route matches.
    #[serde(default)]
    pub default: Recipients,

    /// Recipients per process name or alert key.
    #[serde(default)]
    pub routes: HashMap<String, Recipients>,
}

impl MailConfig {
    /// Send timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve recipients for a route name, falling back to the default pair.
    pub fn recipients_for(&self, route: &str) -> &Recipients {
        self.routes.get(route).unwrap_or(&self.default)
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_timeout() -> u64 {
    30
}

/// SMTP transport security.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS on port 465, STARTTLS elsewhere.
    #[default]
    Auto,
    /// Implicit TLS.
    Wrapper,
    /// STARTTLS upgrade.
    StartTls,
    /// Plain connection (local relays only).
    None,
}

impl SmtpSecurity {
    /// Resolve `Auto` against the configured port.
    pub fn resolve(self, port: u16) -> SmtpSecurity {
        match self {
            SmtpSecurity::Auto if port == 465 => SmtpSecurity::Wrapper,
            SmtpSecurity::Auto => SmtpSecurity::StartTls,
            other => other,
        }
    }
}

/// A to/cc recipient pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipients {
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
}

impl Recipients {
    /// Whether there is nobody to send to.
    pub fn is_empty(&self) -> bool {
        self.to.is_empty()
    }
}

/// Accept either a list or a single comma-separated string.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let addresses = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.split(',').map(str::to_string).collect(),
        OneOrMany::Many(v) => v,
    };

    Ok(addresses
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect())
}

/// Chat webhook channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Incoming-webhook URL.
    pub webhook_url: String,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt.
    #[serde(default = "default_chat_retries")]
    pub max_retries: u32,
}

impl ChatConfig {
    /// Per-attempt timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_chat_timeout() -> u64 {
    5
}

fn default_chat_retries() -> u32 {
    2
}
