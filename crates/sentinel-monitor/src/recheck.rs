//! Edge-triggered re-check signal.
//!
//! Triggers raised while idle coalesce into a single pending cycle.
//! Triggers raised while a cycle is running are dropped.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::MonitorError;

#[derive(Debug, Default)]
struct Inner {
    busy: AtomicBool,
    pending: Notify,
    dropped: AtomicU64,
}

/// Cloneable handle to the shared signal.
#[derive(Debug, Clone, Default)]
pub struct RecheckSignal {
    inner: Arc<Inner>,
}

impl RecheckSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a cycle. Returns `false` if a cycle is already running.
    pub fn trigger(&self) -> bool {
        if self.inner.busy.load(Ordering::Acquire) {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.inner.pending.notify_one();
        true
    }

    /// Mark a cycle as running until the guard drops.
    ///
    /// Any trigger that arrived before the cycle started is absorbed.
    pub fn begin_cycle(&self) -> CycleGuard {
        self.inner.busy.store(true, Ordering::Release);
        let _ = self.inner.pending.notified().now_or_never();
        CycleGuard {
            signal: self.clone(),
        }
    }

    /// Wait for the next trigger.
    pub async fn triggered(&self) {
        self.inner.pending.notified().await;
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Triggers dropped because a cycle was running.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

/// Clears the busy flag on drop.
#[derive(Debug)]
pub struct CycleGuard {
    signal: RecheckSignal,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.signal.inner.busy.store(false, Ordering::Release);
    }
}

/// Live file watch; notifications stop when it is dropped.
pub type AuditWatcher = RecommendedWatcher;

/// Trigger `signal` whenever `path` is modified.
pub fn watch_file(path: &Path, signal: RecheckSignal) -> Result<AuditWatcher, MonitorError> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
            let accepted = signal.trigger();
            debug!(accepted, "Audit log changed, re-check requested");
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "Audit log watch error, re-check requested");
            signal.trigger();
        }
    })
    .map_err(|e| MonitorError::Watch(e.to_string()))?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|e| MonitorError::Watch(format!("{}: {}", path.display(), e)))?;

    Ok(watcher)
}
