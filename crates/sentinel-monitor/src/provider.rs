//! Host metrics source abstraction.
//!
//! The sampling loop only sees [`MetricsProvider`]; the production
//! implementation lives in [`crate::system_provider`] and tests supply
//! fixed readings.

use std::ffi::OsStr;

use crate::error::MonitorError;

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Physical memory in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryStats {
    pub total: u64,
    pub free: u64,
}

impl MemoryStats {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }
}

/// Capacity of one mounted filesystem in bytes.
///
/// `free` includes blocks reserved for the superuser, so reserved space
/// is not reported as used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilesystemStats {
    pub total: u64,
    pub free: u64,
}

impl FilesystemStats {
    /// From raw `statvfs` counts (`f_blocks`, `f_bfree`, `f_frsize`).
    pub fn from_blocks(blocks: u64, blocks_free: u64, block_size: u64) -> Self {
        Self {
            total: blocks.saturating_mul(block_size),
            free: blocks_free.saturating_mul(block_size),
        }
    }

    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }
}

/// Cumulative scheduler ticks for one logical CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub irq: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.irq
    }
}

/// Cumulative interface byte counters, summed across interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkCounters {
    pub received: u64,
    pub transmitted: u64,
}

impl NetworkCounters {
    pub fn total(&self) -> u64 {
        self.received.saturating_add(self.transmitted)
    }
}

/// Source of raw host readings.
///
/// Calls may block on the operating system; the sampling loop runs them on
/// the blocking pool.
pub trait MetricsProvider: Send + Sync {
    fn memory(&self) -> Result<MemoryStats>;

    /// Usage of the filesystem mounted at `mount`.
    fn filesystem(&self, mount: &str) -> Result<FilesystemStats>;

    /// Per-core tick counters.
    fn cpu_times(&self) -> Result<Vec<CpuTimes>>;

    fn network(&self) -> Result<NetworkCounters>;

    fn process_count(&self) -> Result<usize>;

    /// 1-minute load average.
    fn load_average(&self) -> Result<f64>;

    fn cpu_count(&self) -> Result<usize>;

    /// Main CPU sensor in Celsius, `None` when the host exposes no sensor.
    fn cpu_temperature(&self) -> Result<Option<f64>>;

    fn uptime_secs(&self) -> Result<u64>;
}

/// One cycle's raw readings, each dimension independently fallible.
#[derive(Debug)]
pub struct HostSnapshot {
    pub memory: Result<MemoryStats>,
    pub filesystem: Result<FilesystemStats>,
    pub cpu_times: Result<Vec<CpuTimes>>,
    pub network: Result<NetworkCounters>,
    pub process_count: Result<usize>,
    pub load_average: Result<f64>,
    pub cpu_count: Result<usize>,
    pub cpu_temperature: Result<Option<f64>>,
    pub uptime_secs: Result<u64>,
}

impl HostSnapshot {
    /// Read every dimension once.
    pub fn collect(provider: &dyn MetricsProvider, mount: &str) -> Self {
        Self {
            memory: provider.memory(),
            filesystem: provider.filesystem(mount),
            cpu_times: provider.cpu_times(),
            network: provider.network(),
            process_count: provider.process_count(),
            load_average: provider.load_average(),
            cpu_count: provider.cpu_count(),
            cpu_temperature: provider.cpu_temperature(),
            uptime_secs: provider.uptime_secs(),
        }
    }
}

/// Count the process entries in a `/proc` listing.
///
/// Only thread-group leaders get a top-level numeric entry, so threads are
/// not counted.
pub fn count_pid_entries<I, S>(names: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    names
        .into_iter()
        .filter(|name| {
            name.as_ref()
                .to_str()
                .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        })
        .count()
}

/// Parse the per-core `cpuN` lines of `/proc/stat`.
///
/// The aggregate `cpu` line is skipped. Missing trailing columns read as 0.
pub fn parse_proc_stat(content: &str) -> Result<Vec<CpuTimes>> {
    let mut cores = Vec::new();

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else {
            continue;
        };
        if !label.starts_with("cpu") || label == "cpu" {
            continue;
        }

        let values = fields
            .map(|f| f.parse::<u64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MonitorError::provider("cpu", format!("{}: {}", label, e)))?;

        if values.len() < 4 {
            return Err(MonitorError::provider(
                "cpu",
                format!("{}: expected at least 4 columns, got {}", label, values.len()),
            ));
        }

        let column = |i: usize| values.get(i).copied().unwrap_or(0);
        cores.push(CpuTimes {
            user: column(0),
            nice: column(1),
            system: column(2),
            idle: column(3),
            irq: column(5),
        });
    }

    if cores.is_empty() {
        return Err(MonitorError::provider("cpu", "no per-core lines found"));
    }
    Ok(cores)
}
