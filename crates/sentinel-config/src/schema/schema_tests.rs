use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.engine.cooldown_secs, 1800);
    assert_eq!(config.engine.sample_interval_secs, 300);
    assert_eq!(config.engine.audit_log, "resource_monitor.log");
    assert!(config.mail.is_none());
    assert!(config.chat.is_none());
}

#[test]
fn test_engine_durations() {
    let engine = EngineConfig::default();
    assert_eq!(engine.cooldown(), Duration::from_secs(30 * 60));
    assert_eq!(engine.sample_interval(), Duration::from_secs(5 * 60));
    assert_eq!(engine.recheck_debounce(), Duration::from_secs(10));
}

#[test]
fn test_thresholds_default() {
    let thresholds = ThresholdsConfig::default();
    assert_eq!(thresholds.memory_percent, 80.0);
    assert_eq!(thresholds.storage_percent, 90.0);
    assert_eq!(thresholds.storage_mount, "/");
    assert_eq!(thresholds.cpu_percent, 80.0);
    assert_eq!(thresholds.network_bytes_per_sec, 1_000_000.0);
    assert_eq!(thresholds.process_count, 200);
    assert_eq!(thresholds.load_per_cpu, 1.0);
    assert_eq!(thresholds.cpu_temperature_celsius, 70.0);
    assert_eq!(thresholds.min_uptime_secs, 3600);
}

#[test]
fn test_events_default_monitors_all_kinds() {
    let events = EventsConfig::default();
    assert!(events.enabled);
    assert_eq!(events.monitored_kinds.len(), 3);
    assert!(events.excluded_process_ids.is_empty());
}

#[test]
fn test_lifecycle_kind_accepts_wire_names() {
    let kinds: Vec<LifecycleKind> =
        serde_json::from_str(r#"["start", "errored", "stop"]"#).unwrap();
    assert_eq!(
        kinds,
        vec![
            LifecycleKind::Started,
            LifecycleKind::Errored,
            LifecycleKind::Stopped
        ]
    );
}

#[test]
fn test_lifecycle_kind_from_str() {
    assert_eq!("STOP".parse::<LifecycleKind>().unwrap(), LifecycleKind::Stopped);
    assert_eq!("started".parse::<LifecycleKind>().unwrap(), LifecycleKind::Started);
    assert!("restart".parse::<LifecycleKind>().is_err());
}

#[test]
fn test_lifecycle_kind_failure() {
    assert!(LifecycleKind::Errored.is_failure());
    assert!(LifecycleKind::Stopped.is_failure());
    assert!(!LifecycleKind::Started.is_failure());
}

#[test]
fn test_recipients_from_comma_string() {
    let recipients: Recipients =
        serde_json::from_str(r#"{"to": "a@example.com, b@example.com", "cc": "c@example.com"}"#)
            .unwrap();
    assert_eq!(recipients.to, vec!["a@example.com", "b@example.com"]);
    assert_eq!(recipients.cc, vec!["c@example.com"]);
}

#[test]
fn test_recipients_from_list() {
    let recipients: Recipients =
        serde_json::from_str(r#"{"to": ["a@example.com"]}"#).unwrap();
    assert_eq!(recipients.to, vec!["a@example.com"]);
    assert!(recipients.cc.is_empty());
}

#[test]
fn test_mail_routes_fall_back_to_default() {
    let mut mail = MailConfig {
        smtp_host: "smtp.example.com".to_string(),
        smtp_port: 587,
        security: SmtpSecurity::Auto,
        username: None,
        password: None,
        from: "alerts@example.com".to_string(),
        timeout_secs: 30,
        default: Recipients {
            to: vec!["ops@example.com".to_string()],
            cc: vec![],
        },
        routes: Default::default(),
    };
    mail.routes.insert(
        "worker-service".to_string(),
        Recipients {
            to: vec!["team@example.com".to_string()],
            cc: vec!["lead@example.com".to_string()],
        },
    );

    assert_eq!(mail.recipients_for("worker-service").to, vec!["team@example.com"]);
    assert_eq!(mail.recipients_for("unknown").to, vec!["ops@example.com"]);
}

#[test]
fn test_smtp_security_resolve() {
    assert_eq!(SmtpSecurity::Auto.resolve(465), SmtpSecurity::Wrapper);
    assert_eq!(SmtpSecurity::Auto.resolve(587), SmtpSecurity::StartTls);
    assert_eq!(SmtpSecurity::None.resolve(465), SmtpSecurity::None);
}

#[test]
fn test_chat_defaults() {
    let chat: ChatConfig =
        serde_json::from_str(r#"{"webhook_url": "https://hooks.example.com/x"}"#).unwrap();
    assert_eq!(chat.timeout(), Duration::from_secs(5));
    assert_eq!(chat.max_retries, 2);
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("resource_monitor.log"));
    assert!(!json.contains("webhook_url"));
}
