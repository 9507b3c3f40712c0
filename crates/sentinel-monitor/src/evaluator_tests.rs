use super::*;
use chrono::TimeZone;

const GB: u64 = 1024 * 1024 * 1024;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
}

fn thresholds() -> ThresholdsConfig {
    ThresholdsConfig::default()
}

fn core(busy: u64, idle: u64) -> CpuTimes {
    CpuTimes {
        user: busy,
        nice: 0,
        system: 0,
        idle,
        irq: 0,
    }
}

#[test]
fn test_memory_breach() {
    let stats = MemoryStats {
        total: 16 * GB,
        free: 2 * GB,
    };
    let reading = evaluate_memory(&stats, &thresholds(), now()).unwrap();
    let alert = reading.alert.unwrap();

    assert_eq!(alert.title, "High Memory Usage");
    assert_eq!(alert.metrics, "87.50% (14.00 GB used)");
    assert_eq!(
        alert.message,
        "Server memory usage has exceeded 80%.\nCurrent usage: 87.50%\nTotal Memory: 16.00 GB\nUsed Memory: 14.00 GB"
    );
    assert_eq!(alert.details.unwrap()["threshold"], 80.0);
}

#[test]
fn test_memory_below_threshold() {
    let stats = MemoryStats {
        total: 16 * GB,
        free: 8 * GB,
    };
    let reading = evaluate_memory(&stats, &thresholds(), now()).unwrap();
    assert!(!reading.is_breach());
    assert_eq!(reading.value, 50.0);
}

#[test]
fn test_memory_zero_total_is_error() {
    let stats = MemoryStats { total: 0, free: 0 };
    assert!(evaluate_memory(&stats, &thresholds(), now()).is_err());
}

#[test]
fn test_storage_breach() {
    let stats = FilesystemStats {
        total: 100 * GB,
        free: 5 * GB,
    };
    let alert = evaluate_storage(&stats, &thresholds(), now())
        .unwrap()
        .alert
        .unwrap();
    assert_eq!(alert.metrics, "95.00% (95.00 GB used)");
    assert!(alert.message.starts_with("Server storage usage has exceeded 90%."));
}

#[test]
fn test_storage_reserved_blocks_do_not_count_as_used() {
    // 14% free in total, 9% of it usable by unprivileged users.
    let stats = FilesystemStats::from_blocks(1_000_000, 140_000, 4096);
    let reading = evaluate_storage(&stats, &thresholds(), now()).unwrap();
    assert!(!reading.is_breach());
    assert!((reading.value - 86.0).abs() < 1e-9);
}

#[test]
fn test_storage_at_threshold_is_quiet() {
    let stats = FilesystemStats {
        total: 100 * GB,
        free: 10 * GB,
    };
    assert!(!evaluate_storage(&stats, &thresholds(), now()).unwrap().is_breach());
}

#[test]
fn test_process_count_breach() {
    let reading = evaluate_process_count(201, &thresholds(), now());
    assert_eq!(reading.alert.unwrap().metrics, "201 processes");
    assert!(!evaluate_process_count(200, &thresholds(), now()).is_breach());
}

#[test]
fn test_load_breach() {
    let reading = evaluate_load(6.0, 4, &thresholds(), now()).unwrap();
    let alert = reading.alert.unwrap();
    assert_eq!(alert.metrics, "Load: 1.50 (CPUs: 4)");
    assert!(alert.message.contains("CPU Count: 4"));
}

#[test]
fn test_load_without_cpus_is_error() {
    assert!(evaluate_load(1.0, 0, &thresholds(), now()).is_err());
}

#[test]
fn test_temperature_missing_sensor_never_breaches() {
    let reading = evaluate_temperature(None, &thresholds(), now());
    assert!(!reading.is_breach());
    assert_eq!(reading.value, 0.0);
}

#[test]
fn test_temperature_breach() {
    let alert = evaluate_temperature(Some(82.5), &thresholds(), now())
        .alert
        .unwrap();
    assert_eq!(alert.metrics, "82.5°C");
}

#[test]
fn test_temperature_sensor_float_is_rounded() {
    let celsius = f64::from(71.3f32);
    let alert = evaluate_temperature(Some(celsius), &thresholds(), now())
        .alert
        .unwrap();
    assert_eq!(alert.metrics, "71.3°C");
    assert!(alert.message.ends_with("Current temp: 71.3°C"));
    assert_eq!(alert.title, "High CPU Temperature");
}

#[test]
fn test_uptime_breach() {
    let alert = evaluate_uptime(120, &thresholds(), now()).alert.unwrap();
    assert_eq!(alert.title, "Possible Reboot Detected");
    assert_eq!(alert.metrics, "2.00 minutes");
    assert!(!evaluate_uptime(3600, &thresholds(), now()).is_breach());
}

#[test]
fn test_network_breach_uses_mebibytes() {
    let alert = evaluate_network(3.0 * 1024.0 * 1024.0, &thresholds(), now())
        .alert
        .unwrap();
    assert_eq!(alert.metrics, "3.00 MB/s");
}

#[test]
fn test_cpu_breach() {
    let alert = evaluate_cpu(93.1, &thresholds(), now()).alert.unwrap();
    assert_eq!(alert.metrics, "93.10%");
}

#[test]
fn test_cpu_tracker_first_sample_primes() {
    let mut tracker = CpuUsageTracker::default();
    assert!(tracker.observe(vec![core(100, 100)]).is_none());
    assert!(tracker.observe(vec![core(150, 150)]).is_some());
}

#[test]
fn test_cpu_tracker_delta() {
    let mut tracker = CpuUsageTracker::default();
    tracker.observe(vec![core(100, 100), core(100, 100)]);

    // 90 busy + 10 idle per core
    let usage = tracker
        .observe(vec![core(190, 110), core(190, 110)])
        .unwrap();
    assert!((usage - 90.0).abs() < 1e-9);
}

#[test]
fn test_cpu_tracker_core_count_change() {
    let mut tracker = CpuUsageTracker::default();
    tracker.observe(vec![core(1, 1)]);
    assert!(tracker.observe(vec![core(2, 2), core(2, 2)]).is_none());
    // The new layout becomes the baseline.
    assert!(tracker.observe(vec![core(4, 4), core(4, 4)]).is_some());
}

#[test]
fn test_cpu_tracker_counter_reset() {
    let mut tracker = CpuUsageTracker::default();
    tracker.observe(vec![core(100, 100)]);
    assert!(tracker.observe(vec![core(5, 5)]).is_none());
}

#[test]
fn test_network_tracker_rate() {
    let mut tracker = NetworkRateTracker::default();
    let first = NetworkCounters {
        received: 1_000,
        transmitted: 1_000,
    };
    assert!(tracker.observe(first, now()).is_none());

    let second = NetworkCounters {
        received: 6_001_000,
        transmitted: 4_001_000,
    };
    let rate = tracker
        .observe(second, now() + chrono::Duration::seconds(10))
        .unwrap();
    assert!((rate - 1_000_000.0).abs() < 1e-6);
}

#[test]
fn test_network_tracker_same_instant() {
    let mut tracker = NetworkRateTracker::default();
    tracker.observe(NetworkCounters::default(), now());
    assert!(tracker.observe(NetworkCounters::default(), now()).is_none());
}
