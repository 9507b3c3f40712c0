//! Append-only audit trail.
//!
//! One line per triggered alert and per evaluation error, each prefixed
//! with an ISO-8601 UTC timestamp. The file's change notifications also
//! drive the re-check signal (see [`crate::recheck`]).

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::alerts::Alert;
use crate::error::MonitorError;

pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file if missing. A newly created file starts with a
    /// "Monitoring started" line; an existing one is left untouched.
    pub async fn ensure_exists(&self) -> Result<(), MonitorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let _guard = self.lock.lock().await;
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        file.write_all(format_line(Utc::now(), "Monitoring started").as_bytes())
            .await?;
        file.flush().await?;
        Ok(())
    }

    /// Record that an alert passed its cooldown.
    pub async fn record_alert(&self, alert: &Alert) -> Result<(), MonitorError> {
        self.append(
            alert.timestamp,
            &format!("{} alert triggered", alert.audit_label()),
        )
        .await
    }

    /// Record an evaluation error.
    pub async fn record_error(&self, message: &str) -> Result<(), MonitorError> {
        self.append(Utc::now(), &format!("Error: {}", message)).await
    }

    async fn append(&self, at: DateTime<Utc>, entry: &str) -> Result<(), MonitorError> {
        let line = format_line(at, entry);

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn format_line(at: DateTime<Utc>, entry: &str) -> String {
    // Entries are single-line.
    let entry = entry.replace('\n', " ");
    format!(
        "{} - {}\n",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        entry
    )
}
