//! Periodic sampling loop.
//!
//! `Idle -> Sampling -> Evaluating -> Idle`, driven by a fixed-period timer
//! plus the re-check signal. Breaches go through the cooldown tracker and
//! are dispatched on detached tasks so a slow channel never delays the
//! next cycle.

#[cfg(test)]
#[path = "sampling_tests.rs"]
mod tests;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use sentinel_config::{Config, ThresholdsConfig};

use crate::alerts::{AlertKey, ChannelResult, MetricKind};
use crate::audit::AuditLog;
use crate::cooldown::CooldownTracker;
use crate::dispatcher::Dispatcher;
use crate::error::MonitorError;
use crate::evaluator::{self, EngineState, Reading};
use crate::provider::{HostSnapshot, MetricsProvider};
use crate::recheck::RecheckSignal;

/// Sampling loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    Idle = 0,
    Sampling = 1,
    Evaluating = 2,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoopState::Sampling,
            2 => LoopState::Evaluating,
            _ => LoopState::Idle,
        }
    }
}

/// Timing and thresholds used by the loop.
#[derive(Debug, Clone)]
pub struct SamplingSettings {
    pub thresholds: ThresholdsConfig,
    pub interval: Duration,
    pub cooldown: Duration,
    /// Re-check triggers this soon after a finished cycle are ignored.
    pub debounce: Duration,
}

impl SamplingSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            interval: config.engine.sample_interval(),
            cooldown: config.engine.cooldown(),
            debounce: config.engine.recheck_debounce(),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub samples: Vec<(MetricKind, f64)>,
    pub fired: Vec<AlertKey>,
    pub suppressed: Vec<AlertKey>,
    /// Dimensions skipped because their reading failed.
    pub errors: usize,
    pub deliveries: Vec<JoinHandle<Vec<ChannelResult>>>,
}

impl CycleReport {
    /// Wait for every dispatch started by this cycle.
    pub async fn wait_deliveries(&mut self) -> Vec<ChannelResult> {
        let mut results = Vec::new();
        for handle in self.deliveries.drain(..) {
            if let Ok(batch) = handle.await {
                results.extend(batch);
            }
        }
        results
    }
}

/// Periodic host sampler.
pub struct SamplingLoop {
    provider: Arc<dyn MetricsProvider>,
    cooldown: Arc<CooldownTracker>,
    dispatcher: Arc<Dispatcher>,
    audit: Arc<AuditLog>,
    settings: SamplingSettings,
    state: EngineState,
    phase: AtomicU8,
    signal: RecheckSignal,
}

impl SamplingLoop {
    pub fn new(
        provider: Arc<dyn MetricsProvider>,
        cooldown: Arc<CooldownTracker>,
        dispatcher: Arc<Dispatcher>,
        audit: Arc<AuditLog>,
        settings: SamplingSettings,
    ) -> Self {
        Self {
            provider,
            cooldown,
            dispatcher,
            audit,
            settings,
            state: EngineState::default(),
            phase: AtomicU8::new(LoopState::Idle as u8),
            signal: RecheckSignal::new(),
        }
    }

    /// Handle used to request an out-of-schedule cycle.
    pub fn signal(&self) -> RecheckSignal {
        self.signal.clone()
    }

    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LoopState) {
        self.phase.store(state as u8, Ordering::Release);
    }

    /// Run one cycle now.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if the wall clock read `now`.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        let signal = self.signal.clone();
        let _cycle = signal.begin_cycle();
        let mut report = CycleReport::default();

        self.set_state(LoopState::Sampling);
        let provider = Arc::clone(&self.provider);
        let mount = self.settings.thresholds.storage_mount.clone();
        let snapshot =
            tokio::task::spawn_blocking(move || HostSnapshot::collect(provider.as_ref(), &mount))
                .await;

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.report_error(&format!("Sampling task failed: {}", e)).await;
                report.errors += 1;
                self.set_state(LoopState::Idle);
                return report;
            }
        };

        self.set_state(LoopState::Evaluating);
        let readings = evaluate_snapshot(&mut self.state, &self.settings.thresholds, snapshot, now);

        for reading in readings {
            match reading {
                Ok(reading) => self.handle_reading(reading, now, &mut report),
                Err(e) => {
                    self.report_error(&e.to_string()).await;
                    report.errors += 1;
                }
            }
        }

        self.set_state(LoopState::Idle);
        debug!(
            fired = report.fired.len(),
            suppressed = report.suppressed.len(),
            errors = report.errors,
            "Sampling cycle complete"
        );
        report
    }

    fn handle_reading(&self, reading: Reading, now: DateTime<Utc>, report: &mut CycleReport) {
        report.samples.push((reading.kind, reading.value));
        let Some(alert) = reading.alert else {
            return;
        };

        if self
            .cooldown
            .should_fire(&alert.key, now, self.settings.cooldown)
        {
            info!(key = %alert.key, metrics = %alert.metrics, "Threshold breached");
            report.fired.push(alert.key.clone());
            report.deliveries.push(self.dispatcher.spawn(alert));
        } else {
            debug!(key = %alert.key, "Breach suppressed by cooldown");
            report.suppressed.push(alert.key);
        }
    }

    async fn report_error(&self, message: &str) {
        warn!(error = %message, "Sampling error, dimension skipped");
        if let Err(e) = self.audit.record_error(message).await {
            warn!(error = %e, "Failed to write audit record");
        }
    }

    /// Run until `shutdown` fires. The first cycle starts immediately.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let signal = self.signal.clone();
        let mut last_finished: Option<Instant> = None;

        info!(
            interval_secs = self.settings.interval.as_secs(),
            "Sampling loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Sampling loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                    last_finished = Some(Instant::now());
                }
                _ = signal.triggered() => {
                    if last_finished.is_some_and(|t| t.elapsed() < self.settings.debounce) {
                        debug!("Re-check ignored, last cycle just finished");
                        continue;
                    }
                    info!("Re-check triggered");
                    self.run_cycle().await;
                    last_finished = Some(Instant::now());
                }
            }
        }
    }
}

/// Judge every dimension of a snapshot.
///
/// CPU and network yield nothing until a previous sample exists.
pub fn evaluate_snapshot(
    state: &mut EngineState,
    thresholds: &ThresholdsConfig,
    snapshot: HostSnapshot,
    now: DateTime<Utc>,
) -> Vec<Result<Reading, MonitorError>> {
    let mut readings = Vec::with_capacity(MetricKind::ALL.len());

    readings.push(
        snapshot
            .memory
            .and_then(|m| evaluator::evaluate_memory(&m, thresholds, now)),
    );
    readings.push(
        snapshot
            .filesystem
            .and_then(|fs| evaluator::evaluate_storage(&fs, thresholds, now)),
    );

    match snapshot.cpu_times {
        Ok(times) => {
            if let Some(usage) = state.cpu.observe(times) {
                readings.push(Ok(evaluator::evaluate_cpu(usage, thresholds, now)));
            }
        }
        Err(e) => readings.push(Err(e)),
    }

    match snapshot.network {
        Ok(counters) => {
            if let Some(rate) = state.network.observe(counters, now) {
                readings.push(Ok(evaluator::evaluate_network(rate, thresholds, now)));
            }
        }
        Err(e) => readings.push(Err(e)),
    }

    readings.push(
        snapshot
            .process_count
            .map(|n| evaluator::evaluate_process_count(n, thresholds, now)),
    );

    let cpu_count = snapshot.cpu_count;
    readings.push(snapshot.load_average.and_then(|load| {
        cpu_count.and_then(|n| evaluator::evaluate_load(load, n, thresholds, now))
    }));

    readings.push(
        snapshot
            .cpu_temperature
            .map(|t| evaluator::evaluate_temperature(t, thresholds, now)),
    );
    readings.push(
        snapshot
            .uptime_secs
            .map(|s| evaluator::evaluate_uptime(s, thresholds, now)),
    );

    readings
}
