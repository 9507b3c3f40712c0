//! Monitor process lifecycle.

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use sentinel_config::{Config, ConfigLoader, ConfigValidator};
use sentinel_monitor::event_bridge::{EventBridge, EventFilter};
use sentinel_monitor::{
    watch_file, AuditLog, AuditWatcher, ChannelResult, CooldownTracker, Dispatcher, DisplayZone,
    MetricsProvider, RecheckSignal, SamplingLoop, SamplingSettings, SystemProvider,
};

use crate::error::{DaemonError, DaemonState};
use crate::control::{Control, ControlHandle};

/// How long background loops get to notice shutdown.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Capacity of the supervisor event queue.
const EVENT_QUEUE: usize = 256;

/// The assembled monitor.
pub struct Sentinel {
    config: Config,
    state: AtomicU8,
    control: ControlHandle,
}

/// Handles to the started background work.
struct Components {
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
    recheck: RecheckSignal,
    _watcher: Option<AuditWatcher>,
}

/// Shared components built at start.
struct Engine {
    audit: Arc<AuditLog>,
    cooldown: Arc<CooldownTracker>,
    dispatcher: Arc<Dispatcher>,
}

impl Sentinel {
    /// Validate `config` and create a stopped monitor.
    pub fn new(config: Config) -> Result<Self, DaemonError> {
        let validation = ConfigValidator::validate(&config)?;
        for warning in validation.into_result()? {
            warn!(path = %warning.path, "{}", warning.message);
        }

        Ok(Self {
            config,
            state: AtomicU8::new(DaemonState::Stopped as u8),
            control: ControlHandle::new(),
        })
    }

    /// Get the current daemon state.
    pub fn state(&self) -> DaemonState {
        DaemonState::from(self.state.load(Ordering::SeqCst))
    }

    /// Handle for stopping or re-checking the running monitor.
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn transition(&self, from: DaemonState, to: DaemonState) -> Result<(), DaemonError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|current| DaemonError::InvalidStateTransition {
                from: DaemonState::from(current),
                to,
            })
    }

    async fn build_engine(&self) -> Result<Engine, DaemonError> {
        let audit_path = ConfigLoader::expand_path(&self.config.engine.audit_log);
        let audit = Arc::new(AuditLog::new(audit_path));
        audit.ensure_exists().await?;

        let zone = DisplayZone::from_minutes(self.config.engine.utc_offset_minutes);
        let dispatcher = Dispatcher::from_config(&self.config, Arc::clone(&audit), zone)?;
        info!(channels = ?dispatcher.channel_names(), "Dispatcher ready");

        Ok(Engine {
            audit,
            cooldown: Arc::new(CooldownTracker::new()),
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Install OS signal handlers and run against the local host until
    /// a shutdown signal arrives.
    pub async fn run(&self) -> Result<(), DaemonError> {
        self.control.listen_os_signals()?;
        self.run_with(Arc::new(SystemProvider::new())).await
    }

    /// Run with an explicit metrics provider until a stop is requested
    /// through [`Sentinel::control`].
    ///
    /// In-flight deliveries are not awaited on the way out.
    pub async fn run_with(&self, provider: Arc<dyn MetricsProvider>) -> Result<(), DaemonError> {
        self.transition(DaemonState::Stopped, DaemonState::Starting)?;
        info!("Sentinel starting...");

        let mut controls = self.control.subscribe();
        let components = match self.start_components(provider).await {
            Ok(components) => components,
            Err(e) => {
                self.state.store(DaemonState::Stopped as u8, Ordering::SeqCst);
                return Err(e);
            }
        };

        self.state.store(DaemonState::Running as u8, Ordering::SeqCst);
        info!(pid = std::process::id(), "Sentinel running");

        while !self.control.is_stopping() {
            match controls.recv().await {
                Ok(Control::Stop) => break,
                Ok(Control::Recheck) => {
                    if !components.recheck.trigger() {
                        info!("Re-check ignored, a cycle is already running");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        self.state
            .store(DaemonState::ShuttingDown as u8, Ordering::SeqCst);
        info!("Sentinel shutting down...");
        let _ = components.shutdown.send(());

        for task in components.tasks {
            if tokio::time::timeout(STOP_GRACE, task).await.is_err() {
                warn!("Background task did not stop in time");
            }
        }

        self.state.store(DaemonState::Stopped as u8, Ordering::SeqCst);
        info!("Sentinel stopped");
        Ok(())
    }

    async fn start_components(
        &self,
        provider: Arc<dyn MetricsProvider>,
    ) -> Result<Components, DaemonError> {
        let engine = self.build_engine().await?;
        let (shutdown, _) = broadcast::channel::<()>(4);
        let mut tasks = Vec::new();

        let sampling = SamplingLoop::new(
            provider,
            Arc::clone(&engine.cooldown),
            Arc::clone(&engine.dispatcher),
            Arc::clone(&engine.audit),
            SamplingSettings::from_config(&self.config),
        );
        let recheck = sampling.signal();

        let watcher = if self.config.engine.recheck_on_audit_change {
            match watch_file(engine.audit.path(), recheck.clone()) {
                Ok(watcher) => {
                    info!(path = %engine.audit.path().display(), "Watching audit log for re-checks");
                    Some(watcher)
                }
                Err(e) => {
                    warn!(error = %e, "Audit log watch unavailable, re-checks limited to SIGHUP");
                    None
                }
            }
        } else {
            None
        };

        tasks.push(tokio::spawn(sampling.run(shutdown.subscribe())));

        if let Some(task) = self.start_event_bridge(&engine, &shutdown) {
            tasks.extend(task);
        }

        Ok(Components {
            shutdown,
            tasks,
            recheck,
            _watcher: watcher,
        })
    }

    #[cfg(unix)]
    fn start_event_bridge(
        &self,
        engine: &Engine,
        shutdown: &broadcast::Sender<()>,
    ) -> Option<[JoinHandle<()>; 2]> {
        use sentinel_monitor::SocketEventSource;

        let events = &self.config.events;
        if !events.enabled {
            return None;
        }
        let Some(ref socket) = events.socket_path else {
            return None;
        };

        let (tx, rx) = tokio::sync::mpsc::channel(EVENT_QUEUE);
        let source = SocketEventSource::new(
            ConfigLoader::expand_path(socket),
            Duration::from_secs(events.reconnect_secs),
        );
        let bridge = EventBridge::new(
            EventFilter::from_config(events),
            Arc::clone(&engine.cooldown),
            self.config.engine.cooldown(),
            Arc::clone(&engine.dispatcher),
        );

        info!(socket = %socket, "Listening for supervisor events");
        Some([
            tokio::spawn(source.run(tx, shutdown.subscribe())),
            tokio::spawn(bridge.run(rx, shutdown.subscribe())),
        ])
    }

    #[cfg(not(unix))]
    fn start_event_bridge(
        &self,
        _engine: &Engine,
        _shutdown: &broadcast::Sender<()>,
    ) -> Option<[JoinHandle<()>; 2]> {
        if self.config.events.enabled && self.config.events.socket_path.is_some() {
            warn!("Supervisor event socket is only supported on Unix");
        }
        None
    }

    /// Run a single sampling cycle and wait for its deliveries.
    ///
    /// CPU and network need two samples, so they never breach here.
    pub async fn run_once(
        &self,
        provider: Arc<dyn MetricsProvider>,
    ) -> Result<Vec<ChannelResult>, DaemonError> {
        let engine = self.build_engine().await?;
        let mut sampling = SamplingLoop::new(
            provider,
            engine.cooldown,
            engine.dispatcher,
            engine.audit,
            SamplingSettings::from_config(&self.config),
        );

        let mut report = sampling.run_cycle().await;
        info!(
            fired = report.fired.len(),
            errors = report.errors,
            "Single cycle complete"
        );
        let results = report.wait_deliveries().await;
        for failed in results.iter().filter(|r| !r.success) {
            error!(channel = %failed.channel, error = ?failed.error, "Delivery failed");
        }
        Ok(results)
    }
}
