//! SMTP transport.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use sentinel_config::{MailConfig, SmtpSecurity};

use crate::error::MonitorError;

/// A fully rendered mail ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Something that can deliver an [`OutgoingMail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), MonitorError>;
}

/// `lettre` SMTP transport built from [`MailConfig`].
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MonitorError> {
        let security = config.security.resolve(config.smtp_port);
        let builder = match security {
            SmtpSecurity::Wrapper | SmtpSecurity::Auto => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            }
            SmtpSecurity::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.smtp_host,
            )),
        }
        .map_err(|e| MonitorError::InvalidConfig(format!("Failed to create SMTP transport: {}", e)))?;

        let mut builder = builder
            .port(config.smtp_port)
            .timeout(Some(config.timeout()));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        debug!(
            host = %config.smtp_host,
            port = config.smtp_port,
            ?security,
            "SMTP transport configured"
        );

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), MonitorError> {
        let message = build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MonitorError::Delivery(format!("SMTP send failed: {}", e)))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MonitorError> {
    address
        .trim()
        .parse()
        .map_err(|e| MonitorError::Delivery(format!("Invalid address '{}': {}", address, e)))
}

/// Build a multipart plain/HTML message.
pub fn build_message(mail: &OutgoingMail) -> Result<Message, MonitorError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .subject(mail.subject.clone());

    for to in &mail.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    for cc in &mail.cc {
        builder = builder.cc(parse_mailbox(cc)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            mail.html.clone(),
        ))
        .map_err(|e| MonitorError::Delivery(format!("Failed to build email: {}", e)))
}
