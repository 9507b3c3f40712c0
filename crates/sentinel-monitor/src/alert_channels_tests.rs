use super::*;
use crate::alerts::{MetricKind, ProcessInfo};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use sentinel_config::{LifecycleKind, Recipients, SmtpSecurity};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn memory_alert() -> Alert {
    Alert::metric(
        MetricKind::Memory,
        "87.50% (14.00 GB used)",
        "Server memory usage has exceeded 80%.",
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
    )
}

fn stop_alert(name: &str) -> Alert {
    Alert::lifecycle(
        ProcessInfo {
            name: name.to_string(),
            id: 7,
        },
        LifecycleKind::Stopped,
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
    )
}

fn chat_config(url: String) -> ChatConfig {
    ChatConfig {
        webhook_url: url,
        timeout_secs: 5,
        max_retries: 2,
    }
}

fn mail_config() -> MailConfig {
    let mut routes = HashMap::new();
    routes.insert(
        "worker-service".to_string(),
        Recipients {
            to: vec!["team@example.com".to_string()],
            cc: vec!["lead@example.com".to_string()],
        },
    );
    MailConfig {
        smtp_host: "smtp.example.com".to_string(),
        smtp_port: 587,
        security: SmtpSecurity::Auto,
        username: None,
        password: None,
        from: "alerts@example.com".to_string(),
        timeout_secs: 1,
        default: Recipients {
            to: vec!["ops@example.com".to_string()],
            cc: vec![],
        },
        routes,
    }
}

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
    delay: Option<Duration>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), MonitorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(MonitorError::Delivery("connection refused".to_string()));
        }
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

mod chat {
    use super::*;

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel =
            ChatWebhookChannel::new(&chat_config(format!("{}/hook", server.uri())), DisplayZone::utc())
                .unwrap();
        let result = channel.send(&memory_alert()).await;

        assert!(result.success);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.channel, "chat");
    }

    #[tokio::test]
    async fn test_two_failures_then_success() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Error"))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .with_priority(2)
            .mount(&server)
            .await;

        let channel =
            ChatWebhookChannel::new(&chat_config(server.uri()), DisplayZone::utc()).unwrap();
        let result = channel.send(&memory_alert()).await;

        assert!(result.success);
        assert_eq!(result.attempts, 3);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Error"))
            .expect(3)
            .mount(&server)
            .await;

        let channel =
            ChatWebhookChannel::new(&chat_config(server.uri()), DisplayZone::utc()).unwrap();
        let result = channel.send(&memory_alert()).await;

        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert!(result.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_payload_shape() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({
                "blocks": [{
                    "type": "header",
                    "text": { "text": "System Alert: High Memory Usage" }
                }]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel =
            ChatWebhookChannel::new(&chat_config(server.uri()), DisplayZone::utc()).unwrap();
        assert!(channel.send(&memory_alert()).await.success);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let mut config = chat_config("http://127.0.0.1:1/hook".to_string());
        config.max_retries = 0;

        let channel = ChatWebhookChannel::new(&config, DisplayZone::utc()).unwrap();
        let result = channel.send(&memory_alert()).await;

        assert!(!result.success);
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out_each_attempt() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = ChatConfig {
            webhook_url: server.uri(),
            timeout_secs: 1,
            max_retries: 2,
        };
        let channel = ChatWebhookChannel::new(&config, DisplayZone::utc()).unwrap();

        let started = std::time::Instant::now();
        let result = channel.send(&memory_alert()).await;
        let elapsed = started.elapsed();

        assert!(!result.success);
        assert_eq!(result.attempts, 3);
        assert!(result.error.is_some());
        assert!(elapsed < Duration::from_millis(4500), "took {:?}", elapsed);
    }
}

mod mail {
    use super::*;

    #[tokio::test]
    async fn test_routes_by_process_name() {
        let transport = Arc::new(RecordingTransport::default());
        let channel = MailChannel::new(mail_config(), transport.clone(), DisplayZone::utc());

        let result = channel.send(&stop_alert("worker-service")).await;
        assert!(result.success);

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["team@example.com"]);
        assert_eq!(sent[0].cc, vec!["lead@example.com"]);
        assert_eq!(sent[0].subject, "Process STOP: worker-service");
    }

    #[tokio::test]
    async fn test_falls_back_to_default_recipients() {
        let transport = Arc::new(RecordingTransport::default());
        let channel = MailChannel::new(mail_config(), transport.clone(), DisplayZone::utc());

        assert!(channel.send(&memory_alert()).await.success);

        let sent = transport.sent.lock();
        assert_eq!(sent[0].to, vec!["ops@example.com"]);
        assert_eq!(sent[0].subject, "Server Alert: High Memory Usage");
        assert!(sent[0].html.contains("High Memory Usage"));
        assert!(sent[0].text.contains("Time: 2026-03-01 10:00:00 +00:00"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let channel = MailChannel::new(mail_config(), transport, DisplayZone::utc());

        let result = channel.send(&memory_alert()).await;
        assert!(!result.success);
        assert_eq!(result.attempts, 1);
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported() {
        let transport = Arc::new(RecordingTransport {
            delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let channel = MailChannel::new(mail_config(), transport.clone(), DisplayZone::utc());

        let result = channel.send(&memory_alert()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Timed out"));
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients() {
        let mut config = mail_config();
        config.default = Recipients::default();
        let transport = Arc::new(RecordingTransport::default());
        let channel = MailChannel::new(config, transport.clone(), DisplayZone::utc());

        let result = channel.send(&memory_alert()).await;
        assert!(!result.success);
        assert_eq!(result.attempts, 0);
        assert!(transport.sent.lock().is_empty());
    }
}
