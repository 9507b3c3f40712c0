//! Threshold evaluation for sampled host metrics.
//!
//! Every dimension has its own function so that one failing reading never
//! prevents the others from being judged. CPU and network need two
//! consecutive samples; their previous readings live in [`EngineState`].

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;

use chrono::{DateTime, Utc};
use serde_json::json;

use sentinel_config::ThresholdsConfig;

use crate::alerts::{Alert, MetricKind};
use crate::error::MonitorError;
use crate::provider::{CpuTimes, FilesystemStats, MemoryStats, NetworkCounters};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// A judged sample.
#[derive(Debug, Clone)]
pub struct Reading {
    pub kind: MetricKind,
    /// Value compared against the threshold.
    pub value: f64,
    /// Populated when the threshold was crossed.
    pub alert: Option<Alert>,
}

impl Reading {
    fn quiet(kind: MetricKind, value: f64) -> Self {
        Self {
            kind,
            value,
            alert: None,
        }
    }

    fn breach(
        kind: MetricKind,
        value: f64,
        threshold: f64,
        metrics: String,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        let alert = Alert::metric(kind, metrics, message, now)
            .with_details(json!({ "value": value, "threshold": threshold }));
        Self {
            kind,
            value,
            alert: Some(alert),
        }
    }

    pub fn is_breach(&self) -> bool {
        self.alert.is_some()
    }
}

fn percent(used: u64, total: u64) -> f64 {
    used as f64 / total as f64 * 100.0
}

pub fn evaluate_memory(
    stats: &MemoryStats,
    thresholds: &ThresholdsConfig,
    now: DateTime<Utc>,
) -> Result<Reading, MonitorError> {
    if stats.total == 0 {
        return Err(MonitorError::provider("memory", "total memory is 0"));
    }
    let used = stats.used();
    let pct = percent(used, stats.total);
    if pct <= thresholds.memory_percent {
        return Ok(Reading::quiet(MetricKind::Memory, pct));
    }

    let used_gb = used as f64 / GIB;
    let message = format!(
        "Server memory usage has exceeded {}%.\nCurrent usage: {:.2}%\nTotal Memory: {:.2} GB\nUsed Memory: {:.2} GB",
        thresholds.memory_percent,
        pct,
        stats.total as f64 / GIB,
        used_gb
    );
    Ok(Reading::breach(
        MetricKind::Memory,
        pct,
        thresholds.memory_percent,
        format!("{:.2}% ({:.2} GB used)", pct, used_gb),
        message,
        now,
    ))
}

pub fn evaluate_storage(
    stats: &FilesystemStats,
    thresholds: &ThresholdsConfig,
    now: DateTime<Utc>,
) -> Result<Reading, MonitorError> {
    if stats.total == 0 {
        return Err(MonitorError::provider(
            "storage",
            format!("{} reports zero capacity", thresholds.storage_mount),
        ));
    }
    let used = stats.used();
    let pct = percent(used, stats.total);
    if pct <= thresholds.storage_percent {
        return Ok(Reading::quiet(MetricKind::Storage, pct));
    }

    let used_gb = used as f64 / GIB;
    let message = format!(
        "Server storage usage has exceeded {}%.\nCurrent usage: {:.2}%\nTotal Storage: {:.2} GB\nUsed Storage: {:.2} GB",
        thresholds.storage_percent,
        pct,
        stats.total as f64 / GIB,
        used_gb
    );
    Ok(Reading::breach(
        MetricKind::Storage,
        pct,
        thresholds.storage_percent,
        format!("{:.2}% ({:.2} GB used)", pct, used_gb),
        message,
        now,
    ))
}

pub fn evaluate_cpu(usage_percent: f64, thresholds: &ThresholdsConfig, now: DateTime<Utc>) -> Reading {
    if usage_percent <= thresholds.cpu_percent {
        return Reading::quiet(MetricKind::Cpu, usage_percent);
    }
    let message = format!(
        "Server CPU usage has exceeded {}%.\nCurrent usage: {:.2}%",
        thresholds.cpu_percent, usage_percent
    );
    Reading::breach(
        MetricKind::Cpu,
        usage_percent,
        thresholds.cpu_percent,
        format!("{:.2}%", usage_percent),
        message,
        now,
    )
}

pub fn evaluate_network(
    bytes_per_sec: f64,
    thresholds: &ThresholdsConfig,
    now: DateTime<Utc>,
) -> Reading {
    if bytes_per_sec <= thresholds.network_bytes_per_sec {
        return Reading::quiet(MetricKind::Network, bytes_per_sec);
    }
    let mb = bytes_per_sec / MIB;
    Reading::breach(
        MetricKind::Network,
        bytes_per_sec,
        thresholds.network_bytes_per_sec,
        format!("{:.2} MB/s", mb),
        format!("Server network usage is high.\nCurrent usage: {:.2} MB/s", mb),
        now,
    )
}

pub fn evaluate_process_count(
    count: usize,
    thresholds: &ThresholdsConfig,
    now: DateTime<Utc>,
) -> Reading {
    if count <= thresholds.process_count {
        return Reading::quiet(MetricKind::ProcessCount, count as f64);
    }
    Reading::breach(
        MetricKind::ProcessCount,
        count as f64,
        thresholds.process_count as f64,
        format!("{} processes", count),
        format!("Server has too many running processes.\nCurrent count: {}", count),
        now,
    )
}

pub fn evaluate_load(
    load_one: f64,
    cpu_count: usize,
    thresholds: &ThresholdsConfig,
    now: DateTime<Utc>,
) -> Result<Reading, MonitorError> {
    if cpu_count == 0 {
        return Err(MonitorError::provider("load", "logical CPU count is 0"));
    }
    let per_cpu = load_one / cpu_count as f64;
    if per_cpu <= thresholds.load_per_cpu {
        return Ok(Reading::quiet(MetricKind::Load, per_cpu));
    }
    let message = format!(
        "Server load average is high.\n1-min Load Avg: {:.2}\nLoad per CPU: {:.2}\nCPU Count: {}",
        load_one, per_cpu, cpu_count
    );
    Ok(Reading::breach(
        MetricKind::Load,
        per_cpu,
        thresholds.load_per_cpu,
        format!("Load: {:.2} (CPUs: {})", per_cpu, cpu_count),
        message,
        now,
    ))
}

/// Judge the main CPU sensor. A host without a sensor reads as 0°C.
pub fn evaluate_temperature(
    celsius: Option<f64>,
    thresholds: &ThresholdsConfig,
    now: DateTime<Utc>,
) -> Reading {
    let temp = celsius.unwrap_or(0.0);
    if temp <= thresholds.cpu_temperature_celsius {
        return Reading::quiet(MetricKind::Temperature, temp);
    }
    Reading::breach(
        MetricKind::Temperature,
        temp,
        thresholds.cpu_temperature_celsius,
        format!("{:.1}°C", temp),
        format!("Server CPU temperature is high.\nCurrent temp: {:.1}°C", temp),
        now,
    )
}

pub fn evaluate_uptime(secs: u64, thresholds: &ThresholdsConfig, now: DateTime<Utc>) -> Reading {
    if secs >= thresholds.min_uptime_secs {
        return Reading::quiet(MetricKind::Uptime, secs as f64);
    }
    let minutes = secs as f64 / 60.0;
    Reading::breach(
        MetricKind::Uptime,
        secs as f64,
        thresholds.min_uptime_secs as f64,
        format!("{:.2} minutes", minutes),
        format!(
            "Server uptime is unusually low.\nCurrent uptime: {:.2} minutes",
            minutes
        ),
        now,
    )
}

/// Aggregate CPU utilization from consecutive per-core tick samples.
#[derive(Debug, Default)]
pub struct CpuUsageTracker {
    previous: Option<Vec<CpuTimes>>,
}

impl CpuUsageTracker {
    /// Record `current` and return utilization since the previous sample.
    ///
    /// Returns `None` on the first sample, when the core count changed,
    /// when any counter went backwards, or when no ticks elapsed.
    pub fn observe(&mut self, current: Vec<CpuTimes>) -> Option<f64> {
        let previous = self.previous.replace(current);
        let previous = previous?;
        let current = self.previous.as_deref()?;

        if previous.len() != current.len() {
            return None;
        }

        let mut idle = 0u64;
        let mut total = 0u64;
        for (last, now) in previous.iter().zip(current) {
            idle += now.idle.checked_sub(last.idle)?;
            total += now.total().checked_sub(last.total())?;
        }

        if total == 0 {
            return None;
        }
        Some(100.0 - (idle as f64 / total as f64) * 100.0)
    }
}

/// Combined receive and transmit rate from consecutive counter samples.
#[derive(Debug, Default)]
pub struct NetworkRateTracker {
    previous: Option<(NetworkCounters, DateTime<Utc>)>,
}

impl NetworkRateTracker {
    /// Record `counters` observed at `at` and return bytes per second since
    /// the previous sample.
    pub fn observe(&mut self, counters: NetworkCounters, at: DateTime<Utc>) -> Option<f64> {
        let (last, last_at) = self.previous.replace((counters, at))?;

        let elapsed = (at - last_at).num_milliseconds();
        if elapsed <= 0 {
            return None;
        }
        let delta = counters.total().checked_sub(last.total())?;
        Some(delta as f64 * 1000.0 / elapsed as f64)
    }
}

/// Evaluator state carried from one sampling cycle to the next.
#[derive(Debug, Default)]
pub struct EngineState {
    pub cpu: CpuUsageTracker,
    pub network: NetworkRateTracker,
}
