//! `sysinfo`-backed host metrics.

use parking_lot::Mutex;
use sysinfo::{Components, Networks, System};
use tracing::debug;

use crate::error::MonitorError;
use crate::provider::{
    CpuTimes, FilesystemStats, MemoryStats, MetricsProvider, NetworkCounters, Result,
};

/// Reads the local host through `sysinfo` and `/proc/stat`.
pub struct SystemProvider {
    system: Mutex<System>,
}

impl SystemProvider {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for SystemProvider {
    fn memory(&self) -> Result<MemoryStats> {
        let mut sys = self.system.lock();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(MonitorError::provider("memory", "total memory reported as 0"));
        }
        Ok(MemoryStats {
            total,
            free: sys.free_memory(),
        })
    }

    #[cfg(unix)]
    fn filesystem(&self, mount: &str) -> Result<FilesystemStats> {
        let stat = nix::sys::statvfs::statvfs(mount)
            .map_err(|e| MonitorError::provider("storage", format!("{}: {}", mount, e)))?;
        Ok(FilesystemStats::from_blocks(
            stat.blocks() as u64,
            stat.blocks_free() as u64,
            stat.fragment_size() as u64,
        ))
    }

    #[cfg(not(unix))]
    fn filesystem(&self, mount: &str) -> Result<FilesystemStats> {
        let disks = sysinfo::Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new(mount))
            .map(|d| FilesystemStats {
                total: d.total_space(),
                free: d.available_space(),
            })
            .ok_or_else(|| MonitorError::provider("storage", format!("mount {} not found", mount)))
    }

    #[cfg(target_os = "linux")]
    fn cpu_times(&self) -> Result<Vec<CpuTimes>> {
        let content = std::fs::read_to_string("/proc/stat")
            .map_err(|e| MonitorError::provider("cpu", e.to_string()))?;
        crate::provider::parse_proc_stat(&content)
    }

    #[cfg(not(target_os = "linux"))]
    fn cpu_times(&self) -> Result<Vec<CpuTimes>> {
        Err(MonitorError::provider(
            "cpu",
            "per-core tick counters are only available on Linux",
        ))
    }

    fn network(&self) -> Result<NetworkCounters> {
        let networks = Networks::new_with_refreshed_list();
        let counters = networks
            .list()
            .iter()
            .filter(|(name, _)| name.as_str() != "lo")
            .fold(NetworkCounters::default(), |acc, (_, data)| NetworkCounters {
                received: acc.received.saturating_add(data.total_received()),
                transmitted: acc.transmitted.saturating_add(data.total_transmitted()),
            });
        Ok(counters)
    }

    /// `sysinfo` lists every thread as a process on Linux, so read `/proc`.
    #[cfg(target_os = "linux")]
    fn process_count(&self) -> Result<usize> {
        let entries = std::fs::read_dir("/proc")
            .map_err(|e| MonitorError::provider("processes", e.to_string()))?;
        Ok(crate::provider::count_pid_entries(
            entries.filter_map(|entry| entry.ok()).map(|entry| entry.file_name()),
        ))
    }

    #[cfg(not(target_os = "linux"))]
    fn process_count(&self) -> Result<usize> {
        let mut sys = self.system.lock();
        sys.refresh_processes();
        Ok(sys.processes().len())
    }

    fn load_average(&self) -> Result<f64> {
        Ok(System::load_average().one)
    }

    fn cpu_count(&self) -> Result<usize> {
        let mut sys = self.system.lock();
        sys.refresh_cpu();
        Ok(sys.cpus().len())
    }

    fn cpu_temperature(&self) -> Result<Option<f64>> {
        let components = Components::new_with_refreshed_list();
        let list = components.list();
        let main = list
            .iter()
            .find(|c| {
                let label = c.label().to_ascii_lowercase();
                label.contains("package") || label.contains("tctl") || label.contains("cpu")
            })
            .or_else(|| list.first());

        if main.is_none() {
            debug!("No temperature sensors exposed by host");
        }
        Ok(main.map(|c| f64::from(c.temperature())))
    }

    fn uptime_secs(&self) -> Result<u64> {
        Ok(System::uptime())
    }
}
