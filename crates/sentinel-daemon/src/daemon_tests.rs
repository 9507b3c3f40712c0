use super::*;
use sentinel_config::ChatConfig;
use sentinel_monitor::provider::{
    CpuTimes, FilesystemStats, MemoryStats, NetworkCounters, Result as ProviderResult,
};
use sentinel_monitor::MonitorError;
use tempfile::TempDir;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

const GB: u64 = 1024 * 1024 * 1024;

/// Host with memory over the default threshold and nothing else wrong.
struct BusyHost;

impl MetricsProvider for BusyHost {
    fn memory(&self) -> ProviderResult<MemoryStats> {
        Ok(MemoryStats {
            total: 16 * GB,
            free: 2 * GB,
        })
    }

    fn filesystem(&self, mount: &str) -> ProviderResult<FilesystemStats> {
        Err(MonitorError::provider("storage", format!("mount {} not found", mount)))
    }

    fn cpu_times(&self) -> ProviderResult<Vec<CpuTimes>> {
        Ok(vec![CpuTimes::default()])
    }

    fn network(&self) -> ProviderResult<NetworkCounters> {
        Ok(NetworkCounters::default())
    }

    fn process_count(&self) -> ProviderResult<usize> {
        Ok(42)
    }

    fn load_average(&self) -> ProviderResult<f64> {
        Ok(0.2)
    }

    fn cpu_count(&self) -> ProviderResult<usize> {
        Ok(2)
    }

    fn cpu_temperature(&self) -> ProviderResult<Option<f64>> {
        Ok(Some(45.0))
    }

    fn uptime_secs(&self) -> ProviderResult<u64> {
        Ok(86_400)
    }
}

fn config(dir: &TempDir, webhook_url: String) -> Config {
    let mut config = Config::default();
    config.engine.audit_log = dir.path().join("audit.log").display().to_string();
    config.engine.recheck_on_audit_change = false;
    config.events.enabled = false;
    config.chat = Some(ChatConfig {
        webhook_url,
        timeout_secs: 5,
        max_retries: 2,
    });
    config
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[test]
fn test_new_rejects_config_without_channels() {
    let result = Sentinel::new(Config::default());
    let err = result.err().unwrap();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_new_starts_stopped() {
    let dir = TempDir::new().unwrap();
    let sentinel = Sentinel::new(config(&dir, "https://hooks.example.com/x".to_string())).unwrap();
    assert_eq!(sentinel.state(), DaemonState::Stopped);
}

#[tokio::test]
async fn test_run_once_delivers_breach() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sentinel = Sentinel::new(config(&dir, server.uri())).unwrap();

    let results = sentinel.run_once(Arc::new(BusyHost)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].success);

    let audit = tokio::fs::read_to_string(dir.path().join("audit.log"))
        .await
        .unwrap();
    assert!(audit.contains("Monitoring started"));
    assert!(audit.contains("Memory alert triggered"));
    assert!(audit.contains("Error: Failed to sample storage"));
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sentinel = Arc::new(Sentinel::new(config(&dir, server.uri())).unwrap());

    let runner = Arc::clone(&sentinel);
    let handle = tokio::spawn(async move { runner.run_with(Arc::new(BusyHost)).await });

    wait_for(|| sentinel.state() == DaemonState::Running).await;

    // The first cycle runs immediately and breaches memory.
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.received_requests().await.unwrap_or_default().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    sentinel.control().stop();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(sentinel.state(), DaemonState::Stopped);
}

#[tokio::test]
async fn test_run_twice_concurrently_fails() {
    let dir = TempDir::new().unwrap();
    let sentinel = Arc::new(
        Sentinel::new(config(&dir, "http://127.0.0.1:1/hook".to_string())).unwrap(),
    );

    let runner = Arc::clone(&sentinel);
    let handle = tokio::spawn(async move { runner.run_with(Arc::new(BusyHost)).await });
    wait_for(|| sentinel.state() == DaemonState::Running).await;

    let second = sentinel.run_with(Arc::new(BusyHost)).await;
    assert!(matches!(
        second,
        Err(DaemonError::InvalidStateTransition { .. })
    ));

    sentinel.control().stop();
    handle.await.unwrap().unwrap();
}
