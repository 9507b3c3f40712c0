//! Supervisor event stream.
//!
//! Events arrive as newline-delimited JSON over a Unix socket. The source
//! reconnects after the supervisor goes away and never gives up on its own.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::MonitorError;
use crate::event_bridge::ProcessEvent;

/// Parse one line. Blank lines yield `None`.
pub fn parse_event(line: &str) -> Result<Option<ProcessEvent>, MonitorError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Forward every parseable line from `reader` to `tx`.
///
/// Malformed lines are logged and skipped. Returns the number of events
/// forwarded once the reader hits EOF, or an error if the receiver is gone.
pub async fn pump_lines<R>(reader: R, tx: &mpsc::Sender<ProcessEvent>) -> Result<usize, MonitorError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        match parse_event(&line) {
            Ok(Some(event)) => {
                tx.send(event)
                    .await
                    .map_err(|_| MonitorError::EventSource("event consumer closed".to_string()))?;
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Malformed supervisor event skipped"),
        }
    }

    Ok(forwarded)
}

/// Unix socket client for the supervisor event stream.
#[cfg(unix)]
pub struct SocketEventSource {
    path: PathBuf,
    reconnect: Duration,
}

#[cfg(unix)]
impl SocketEventSource {
    pub fn new(path: impl Into<PathBuf>, reconnect: Duration) -> Self {
        Self {
            path: path.into(),
            reconnect,
        }
    }

    /// Stream events into `tx` until `shutdown` fires or the consumer closes.
    pub async fn run(self, tx: mpsc::Sender<ProcessEvent>, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Event source stopping");
                    return;
                }
                result = self.session(&tx) => match result {
                    Ok(count) => info!(path = %self.path.display(), count, "Event socket closed"),
                    Err(MonitorError::EventSource(reason)) => {
                        info!(reason = %reason, "Event source stopping");
                        return;
                    }
                    Err(e) => warn!(path = %self.path.display(), error = %e, "Event socket unavailable"),
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Event source stopping");
                    return;
                }
                _ = tokio::time::sleep(self.reconnect) => {
                    debug!(path = %self.path.display(), "Reconnecting to event socket");
                }
            }
        }
    }

    async fn session(&self, tx: &mpsc::Sender<ProcessEvent>) -> Result<usize, MonitorError> {
        let stream = tokio::net::UnixStream::connect(&self.path).await?;
        info!(path = %self.path.display(), "Connected to event socket");
        pump_lines(tokio::io::BufReader::new(stream), tx).await
    }
}
