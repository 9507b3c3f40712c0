//! Out-of-band control of a running monitor: stop and re-check requests
//! from OS signals or from code holding a [`ControlHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::DaemonError;

/// Request delivered to the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Stop sampling and exit (SIGTERM, SIGINT).
    Stop,
    /// Sample now instead of waiting for the next tick (SIGHUP).
    Recheck,
}

/// Cloneable handle shared by the run loop and whoever controls it.
///
/// A stop request is latched, so a run loop that subscribes late still
/// sees it.
#[derive(Clone)]
pub struct ControlHandle {
    tx: broadcast::Sender<Control>,
    stopping: Arc<AtomicBool>,
}

impl ControlHandle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Control> {
        self.tx.subscribe()
    }

    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.publish(Control::Stop);
    }

    pub fn recheck(&self) {
        self.publish(Control::Recheck);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    fn publish(&self, control: Control) {
        debug!(?control, "Control request");
        // No receiver just means nothing is running yet.
        let _ = self.tx.send(control);
    }

    /// Forward SIGTERM and SIGINT as stop requests and SIGHUP as a re-check.
    #[cfg(unix)]
    pub fn listen_os_signals(&self) -> Result<(), DaemonError> {
        use tokio::signal::unix::{signal, SignalKind};

        let bindings = [
            ("SIGTERM", SignalKind::terminate(), Control::Stop),
            ("SIGINT", SignalKind::interrupt(), Control::Stop),
            ("SIGHUP", SignalKind::hangup(), Control::Recheck),
        ];

        for (name, kind, control) in bindings {
            let mut stream =
                signal(kind).map_err(|e| DaemonError::SignalSetup(format!("{}: {}", name, e)))?;
            let handle = self.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!(signal = name, "Received signal");
                    handle.apply(control);
                }
            });
        }

        Ok(())
    }

    /// Forward Ctrl+C as a stop request.
    #[cfg(not(unix))]
    pub fn listen_os_signals(&self) -> Result<(), DaemonError> {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(signal = "Ctrl+C", "Received signal");
                handle.stop();
            }
        });
        Ok(())
    }

    fn apply(&self, control: Control) {
        match control {
            Control::Stop => self.stop(),
            Control::Recheck => self.recheck(),
        }
    }
}

impl Default for ControlHandle {
    fn default() -> Self {
        Self::new()
    }
}
