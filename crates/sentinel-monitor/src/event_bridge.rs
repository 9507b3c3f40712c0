//! Process-supervisor lifecycle events to alerts.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use sentinel_config::{EventsConfig, LifecycleKind};

use crate::alerts::{Alert, AlertKey, ChannelResult, ProcessInfo};
use crate::cooldown::CooldownTracker;
use crate::dispatcher::Dispatcher;

/// A lifecycle event as emitted by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEvent {
    /// Raw event kind; unknown kinds are carried through and filtered out.
    #[serde(alias = "event")]
    pub kind: String,
    pub process: ProcessInfo,
}

impl ProcessEvent {
    pub fn new(kind: impl Into<String>, process: ProcessInfo) -> Self {
        Self {
            kind: kind.into(),
            process,
        }
    }

    /// The recognized lifecycle kind, if any.
    pub fn lifecycle_kind(&self) -> Option<LifecycleKind> {
        LifecycleKind::from_str(&self.kind).ok()
    }
}

/// Exclusion set and kind allow-list.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    excluded: HashSet<u32>,
    monitored: HashSet<LifecycleKind>,
}

impl EventFilter {
    pub fn new(
        excluded: impl IntoIterator<Item = u32>,
        monitored: impl IntoIterator<Item = LifecycleKind>,
    ) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
            monitored: monitored.into_iter().collect(),
        }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(
            config.excluded_process_ids.iter().copied(),
            config.monitored_kinds.iter().copied(),
        )
    }

    pub fn is_excluded(&self, process_id: u32) -> bool {
        self.excluded.contains(&process_id)
    }

    pub fn is_monitored(&self, kind: LifecycleKind) -> bool {
        self.monitored.contains(&kind)
    }
}

/// What happened to one event.
#[derive(Debug)]
pub enum BridgeOutcome {
    /// Process id is in the exclusion set.
    Excluded,
    /// Kind is unknown or not in the allow-list.
    Unmonitored,
    /// Same key fired within the cooldown window.
    Suppressed(AlertKey),
    /// Alert handed to the dispatcher.
    Dispatched(AlertKey, JoinHandle<Vec<ChannelResult>>),
}

/// Routes lifecycle events through the cooldown tracker to the dispatcher.
pub struct EventBridge {
    filter: EventFilter,
    cooldown: Arc<CooldownTracker>,
    window: Duration,
    dispatcher: Arc<Dispatcher>,
}

impl EventBridge {
    pub fn new(
        filter: EventFilter,
        cooldown: Arc<CooldownTracker>,
        window: Duration,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            filter,
            cooldown,
            window,
            dispatcher,
        }
    }

    pub fn handle(&self, event: ProcessEvent) -> BridgeOutcome {
        self.handle_at(event, Utc::now())
    }

    /// Handle one event as if the wall clock read `now`.
    pub fn handle_at(&self, event: ProcessEvent, now: DateTime<Utc>) -> BridgeOutcome {
        if self.filter.is_excluded(event.process.id) {
            debug!(id = event.process.id, kind = %event.kind, "Event from excluded process dropped");
            return BridgeOutcome::Excluded;
        }

        let Some(kind) = event
            .lifecycle_kind()
            .filter(|k| self.filter.is_monitored(*k))
        else {
            debug!(kind = %event.kind, "Unmonitored event kind dropped");
            return BridgeOutcome::Unmonitored;
        };

        let alert = Alert::lifecycle(event.process, kind, now);
        if !self.cooldown.should_fire(&alert.key, now, self.window) {
            debug!(key = %alert.key, "Lifecycle alert suppressed by cooldown");
            return BridgeOutcome::Suppressed(alert.key);
        }

        info!(key = %alert.key, "Process lifecycle alert");
        let key = alert.key.clone();
        BridgeOutcome::Dispatched(key, self.dispatcher.spawn(alert))
    }

    /// Consume events until the channel closes or `shutdown` fires.
    pub async fn run(self, mut events: mpsc::Receiver<ProcessEvent>, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Event bridge stopping");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle(event);
                    }
                    None => {
                        info!("Event stream closed");
                        break;
                    }
                }
            }
        }
    }
}
