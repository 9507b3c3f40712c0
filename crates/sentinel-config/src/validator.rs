//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Largest accepted display offset (UTC+14:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn collected errors into a single startup failure.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.is_valid() {
            return Ok(self.warnings);
        }
        let summary = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Rejected(summary))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_engine(config, &mut result);
        Self::validate_thresholds(config, &mut result);
        Self::validate_events(config, &mut result);
        Self::validate_channels(config, &mut result);

        Ok(result)
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        let engine = &config.engine;

        if engine.cooldown_secs == 0 {
            result.add_error(ValidationError::new(
                "engine.cooldown_secs",
                "cooldown_secs must be greater than 0",
            ));
        }

        if engine.sample_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "engine.sample_interval_secs",
                "sample_interval_secs must be greater than 0",
            ));
        }

        if engine.audit_log.trim().is_empty() {
            result.add_error(ValidationError::new(
                "engine.audit_log",
                "Audit log path cannot be empty",
            ));
        }

        if engine.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            result.add_error(ValidationError::new(
                "engine.utc_offset_minutes",
                format!(
                    "Offset {} is outside the +/-{} minute range",
                    engine.utc_offset_minutes, MAX_UTC_OFFSET_MINUTES
                ),
            ));
        }

        if engine.cooldown_secs > 0 && engine.cooldown_secs < engine.sample_interval_secs {
            result.add_warning(ValidationWarning::new(
                "engine.cooldown_secs",
                "Cooldown is shorter than the sampling interval; persistent breaches alert every cycle",
            ));
        }
    }

    fn validate_thresholds(config: &Config, result: &mut ValidationResult) {
        let t = &config.thresholds;
        let percents = [
            ("thresholds.memory_percent", t.memory_percent),
            ("thresholds.storage_percent", t.storage_percent),
            ("thresholds.cpu_percent", t.cpu_percent),
        ];

        for (path, value) in percents {
            if !(value > 0.0 && value <= 100.0) {
                result.add_error(ValidationError::new(
                    path,
                    format!("Percentage must be in (0, 100], got {}", value),
                ));
            }
        }

        if t.load_per_cpu <= 0.0 {
            result.add_error(ValidationError::new(
                "thresholds.load_per_cpu",
                "load_per_cpu must be positive",
            ));
        }

        if t.network_bytes_per_sec <= 0.0 {
            result.add_error(ValidationError::new(
                "thresholds.network_bytes_per_sec",
                "network_bytes_per_sec must be positive",
            ));
        }

        if t.storage_mount.is_empty() {
            result.add_error(ValidationError::new(
                "thresholds.storage_mount",
                "Storage mount point cannot be empty",
            ));
        }
    }

    fn validate_events(config: &Config, result: &mut ValidationResult) {
        let events = &config.events;
        if !events.enabled {
            return;
        }

        if events.monitored_kinds.is_empty() {
            result.add_warning(ValidationWarning::new(
                "events.monitored_kinds",
                "No lifecycle kinds are monitored, every event will be dropped",
            ));
        }

        if events.socket_path.is_none() {
            result.add_warning(ValidationWarning::new(
                "events.socket_path",
                "No event socket configured, lifecycle alerts are disabled",
            ));
        }

        if events.reconnect_secs == 0 {
            result.add_error(ValidationError::new(
                "events.reconnect_secs",
                "reconnect_secs must be greater than 0",
            ));
        }
    }

    fn validate_channels(config: &Config, result: &mut ValidationResult) {
        if config.mail.is_none() && config.chat.is_none() {
            result.add_error(ValidationError::new(
                "mail/chat",
                "At least one notification channel must be configured",
            ));
        }

        if let Some(ref chat) = config.chat {
            if chat.webhook_url.is_empty() {
                result.add_error(ValidationError::new(
                    "chat.webhook_url",
                    "Webhook URL cannot be empty",
                ));
            } else if !chat.webhook_url.starts_with("http://")
                && !chat.webhook_url.starts_with("https://")
            {
                result.add_error(ValidationError::new(
                    "chat.webhook_url",
                    "webhook_url must start with http:// or https://",
                ));
            }

            if chat.timeout_secs == 0 {
                result.add_error(ValidationError::new(
                    "chat.timeout_secs",
                    "timeout_secs must be greater than 0",
                ));
            }
        }

        if let Some(ref mail) = config.mail {
            if mail.smtp_host.is_empty() {
                result.add_error(ValidationError::new(
                    "mail.smtp_host",
                    "SMTP host cannot be empty",
                ));
            }

            if mail.from.is_empty() {
                result.add_error(ValidationError::new(
                    "mail.from",
                    "Sender address cannot be empty",
                ));
            }

            if mail.default.is_empty() {
                result.add_error(ValidationError::new(
                    "mail.default.to",
                    "Default recipients are required for unrouted alerts",
                ));
            }

            if mail.username.is_some() != mail.password.is_some() {
                result.add_warning(ValidationWarning::new(
                    "mail.username",
                    "Only one of username/password is set, SMTP auth is skipped",
                ));
            }

            for (name, recipients) in &mail.routes {
                if recipients.is_empty() {
                    result.add_warning(ValidationWarning::new(
                        format!("mail.routes.{}", name),
                        "Route has no 'to' recipients",
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
