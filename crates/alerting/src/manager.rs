//! Alert Manager Implementation
//!
//! Runs one alert through the gate, the classifier, and delivery, keeping
//! stats and the audit log in step.

use std::sync::Arc;
use storage::{AuditRecord, AuditSink};
use tracing::{info, warn};

use crate::audit;
use crate::classifier::Classifier;
use crate::config::AlertConfig;
use crate::delivery::{AlertSender, DeliveryEngine, DeliverySettings, DeliveryState, RetryHandle};
use crate::error::ConfigError;
use crate::gate::{Admission, AdmissionGate, Clock, Rejection, SystemClock};
use crate::model::{AlertOutcome, AlertRequest, Reason};
use crate::stats::AlertStats;

const SENT_MESSAGE: &str = "Alert sent successfully";
const DISABLED_MESSAGE: &str = "Alerts are currently disabled";
const OUTSIDE_HOURS_MESSAGE: &str = "Outside working hours";

/// Outcome of `AlertManager::process`
#[derive(Debug)]
pub struct ProcessedAlert {
    pub outcome: AlertOutcome,
    /// Label sent upstream, set once the alert passed the gate
    pub label: Option<String>,
    /// Pending critical retry, if one was scheduled
    pub retry: Option<RetryHandle>,
}

/// Admission, classification, and delivery pipeline
pub struct AlertManager {
    config: AlertConfig,
    classifier: Classifier,
    gate: AdmissionGate,
    delivery: DeliveryEngine,
    stats: AlertStats,
    audit: Arc<dyn AuditSink>,
}

impl AlertManager {
    /// Create a manager on the system clock
    pub fn new(
        config: AlertConfig,
        sender: Arc<dyn AlertSender>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(config, sender, audit, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AlertConfig,
        sender: Arc<dyn AlertSender>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            enabled = config.enabled,
            working_hours = %config.working_hours_range(),
            rate_limit_max = config.rate_limit_max,
            rate_limit_window_ms = config.rate_limit_window_ms,
            audit_backend = audit.backend(),
            "Creating alert manager"
        );
        if !config.enabled {
            warn!("Alerts are currently DISABLED - enable via POST /config/enable");
        }

        Ok(Self {
            classifier: Classifier::new(config.default_alert_body.clone()),
            gate: AdmissionGate::new(&config, clock),
            delivery: DeliveryEngine::new(
                DeliverySettings::from(&config),
                sender,
                audit.clone(),
            ),
            stats: AlertStats::new(),
            audit,
            config,
        })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn stats(&self) -> &AlertStats {
        &self.stats
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Run one alert through the pipeline
    pub async fn process(&self, request: AlertRequest) -> ProcessedAlert {
        self.stats.record_received(request.critical);

        if let Admission::Rejected(rejection) = self.gate.admit() {
            return ProcessedAlert {
                outcome: self.reject(&request, rejection).await,
                label: None,
                retry: None,
            };
        }

        let label = self.classifier.classify(
            &request.message,
            request.critical,
            request.alert_type.as_deref(),
        );

        let report = self.delivery.deliver(&request, &label).await;
        let outcome = match (report.state, &report.error) {
            (DeliveryState::Sent, _) => {
                self.stats.record_success();
                self.audit_request(&request, true, None).await;
                AlertOutcome::delivered(SENT_MESSAGE)
            }
            (_, error) => {
                self.stats.record_failure();
                self.audit_request(&request, false, Some(Reason::SendFailed))
                    .await;
                let message = error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "Delivery failed".to_string());
                AlertOutcome::send_failed(message)
            }
        };

        ProcessedAlert {
            outcome,
            label: Some(label),
            retry: report.retry,
        }
    }

    async fn reject(&self, request: &AlertRequest, rejection: Rejection) -> AlertOutcome {
        let reason = rejection.reason();
        match rejection {
            Rejection::RateLimited => {
                self.stats.record_throttled();
                let snapshot = self.gate.rate_limit_snapshot();
                warn!(
                    "RATE LIMITED: {} ({}/{} in {}s)",
                    request.message, snapshot.current, snapshot.max, snapshot.window_seconds
                );
                let record = self
                    .base_record(request, format!("[THROTTLED] {}", request.message), false)
                    .with_reason(reason.as_str());
                audit::record(self.audit.as_ref(), record).await;
                AlertOutcome::rejected(reason, self.config.throttle_message.clone())
            }
            Rejection::AlertsDisabled => {
                self.stats.record_disabled();
                warn!("ALERT (DISABLED): {}", request.message);
                self.audit_request(request, false, Some(reason)).await;
                AlertOutcome::rejected(reason, DISABLED_MESSAGE)
            }
            Rejection::OutsideHours => {
                info!("ALERT (OUTSIDE HOURS): {}", request.message);
                self.audit_request(request, false, Some(reason)).await;
                AlertOutcome::rejected(reason, OUTSIDE_HOURS_MESSAGE)
            }
        }
    }

    fn base_record(&self, request: &AlertRequest, message: String, success: bool) -> AuditRecord {
        AuditRecord::now(message, request.critical, success)
            .with_url(request.url.clone())
            .with_source_ip(request.source_ip.clone())
    }

    async fn audit_request(&self, request: &AlertRequest, success: bool, reason: Option<Reason>) {
        let mut record = self.base_record(request, request.message.clone(), success);
        if let Some(reason) = reason {
            record = record.with_reason(reason.as_str());
        }
        audit::record(self.audit.as_ref(), record).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendError;
    use crate::delivery::OutboundRequest;
    use crate::gate::ManualClock;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use storage::{MemoryAuditLog, StorageError, StoredAuditRecord};

    #[derive(Default)]
    struct MockSender {
        calls: Mutex<Vec<OutboundRequest>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl AlertSender for MockSender {
        async fn send(&self, request: &OutboundRequest) -> Result<(), SendError> {
            self.calls.lock().push(request.clone());
            if self.fail.load(Ordering::SeqCst) {
                Err(SendError::Request("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Sink whose appends always fail
    #[derive(Default)]
    struct BrokenSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl AuditSink for BrokenSink {
        async fn append(&self, _record: &AuditRecord) -> Result<(), StorageError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Database("disk I/O error".to_string()))
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<StoredAuditRecord>, StorageError> {
            Err(StorageError::Database("disk I/O error".to_string()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn config() -> AlertConfig {
        AlertConfig {
            api_url: "https://push.example.com/SendAlert".to_string(),
            auth_header: "Basic dGVzdA==".to_string(),
            ..Default::default()
        }
    }

    struct Fixture {
        manager: AlertManager,
        sender: Arc<MockSender>,
        audit: Arc<MemoryAuditLog>,
        clock: Arc<ManualClock>,
    }

    fn fixture(config: AlertConfig) -> Fixture {
        let sender = Arc::new(MockSender::default());
        let audit = Arc::new(MemoryAuditLog::default());
        let clock = Arc::new(ManualClock::new(10));
        let manager =
            AlertManager::with_clock(config, sender.clone(), audit.clone(), clock.clone()).unwrap();
        Fixture {
            manager,
            sender,
            audit,
            clock,
        }
    }

    #[test]
    fn test_starting_disabled_logs_a_warning() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let manager = tracing::subscriber::with_default(subscriber, || {
            AlertManager::with_clock(
                AlertConfig {
                    enabled: false,
                    ..config()
                },
                Arc::new(MockSender::default()),
                Arc::new(MemoryAuditLog::default()),
                Arc::new(ManualClock::new(10)),
            )
            .unwrap()
        });

        assert!(!manager.gate().is_enabled());
        let output = String::from_utf8_lossy(&logs.0.lock()).into_owned();
        assert!(output.contains("WARN"));
        assert!(output.contains("Alerts are currently DISABLED"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = AlertManager::new(
            AlertConfig::default(),
            Arc::new(MockSender::default()),
            Arc::new(MemoryAuditLog::default()),
        );
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[tokio::test]
    async fn test_successful_delivery() {
        let f = fixture(config());
        let request = AlertRequest::new("device battery low").from_source("10.1.1.1");

        let processed = f.manager.process(request).await;
        assert!(processed.outcome.is_success());
        assert_eq!(processed.outcome.message, "Alert sent successfully");
        assert_eq!(processed.label.as_deref(), Some("Device Alert"));
        assert!(processed.retry.is_none());

        let calls = f.sender.calls.lock().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].payload.body, "Device Alert");
        assert_eq!(calls[0].payload.content, "device battery low");

        let stats = f.manager.stats().snapshot();
        assert_eq!(stats.total_alerts, 1);
        assert_eq!(stats.successful_alerts, 1);

        let records = f.audit.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].record.success);
        assert_eq!(records[0].record.reason, None);
        assert_eq!(records[0].record.source_ip.as_deref(), Some("10.1.1.1"));
    }

    #[tokio::test]
    async fn test_throttled_alert_is_tagged_and_counted() {
        let f = fixture(AlertConfig {
            rate_limit_max: 1,
            ..config()
        });

        f.manager.process(AlertRequest::new("first")).await;
        let processed = f.manager.process(AlertRequest::new("second")).await;

        assert_eq!(processed.outcome.reason, Reason::RateLimited);
        assert_eq!(
            processed.outcome.message,
            "Alert rate limit exceeded - throttling alerts"
        );
        assert!(processed.label.is_none());
        assert_eq!(f.sender.calls.lock().len(), 1);

        let stats = f.manager.stats().snapshot();
        assert_eq!(stats.total_alerts, 2);
        assert_eq!(stats.throttled_alerts, 1);

        let records = f.audit.recent(1).await.unwrap();
        assert_eq!(records[0].record.message, "[THROTTLED] second");
        assert_eq!(records[0].record.reason.as_deref(), Some("rate_limited"));
    }

    #[tokio::test]
    async fn test_disabled_alert() {
        let f = fixture(config());
        f.manager.gate().set_enabled(false);

        let processed = f.manager.process(AlertRequest::new("disk full")).await;
        assert_eq!(processed.outcome.reason, Reason::AlertsDisabled);
        assert_eq!(processed.outcome.message, "Alerts are currently disabled");
        assert_eq!(f.manager.stats().snapshot().alerts_disabled, 1);
        assert!(f.sender.calls.lock().is_empty());

        let records = f.audit.recent(1).await.unwrap();
        assert_eq!(records[0].record.message, "disk full");
        assert_eq!(records[0].record.reason.as_deref(), Some("alerts_disabled"));
    }

    #[tokio::test]
    async fn test_outside_hours() {
        let f = fixture(config());
        f.clock.set_hour(22);

        let processed = f.manager.process(AlertRequest::new("disk full")).await;
        assert_eq!(processed.outcome.reason, Reason::OutsideHours);
        assert!(!processed.outcome.accepted);
        assert!(f.sender.calls.lock().is_empty());

        let stats = f.manager.stats().snapshot();
        assert_eq!(stats.total_alerts, 1);
        assert_eq!(stats.failed_alerts, 0);
    }

    #[tokio::test]
    async fn test_send_failure() {
        let f = fixture(config());
        f.sender.fail.store(true, Ordering::SeqCst);

        let processed = f
            .manager
            .process(AlertRequest::new("db down").critical(true))
            .await;
        assert_eq!(processed.outcome.reason, Reason::SendFailed);
        assert!(processed.outcome.accepted);
        assert_eq!(processed.outcome.message, "Request failed: connection refused");
        assert!(processed.retry.is_none());

        let stats = f.manager.stats().snapshot();
        assert_eq!(stats.failed_alerts, 1);
        assert_eq!(stats.critical_alerts, 1);

        let records = f.audit.recent(1).await.unwrap();
        assert_eq!(records[0].record.reason.as_deref(), Some("send_failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_alert_is_retried_once() {
        let f = fixture(config());

        let processed = f
            .manager
            .process(AlertRequest::new("db down").critical(true).with_alert_type("database"))
            .await;
        assert!(processed.outcome.is_success());
        assert_eq!(processed.label.as_deref(), Some("Critical Alert"));

        let state = processed.retry.unwrap().wait().await;
        assert_eq!(state, DeliveryState::RetrySent);
        assert_eq!(f.sender.calls.lock().len(), 2);

        let messages: Vec<String> = f
            .audit
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.record.message)
            .collect();
        assert_eq!(messages, vec!["[RETRY] db down", "db down"]);

        // retries are not counted as new alerts
        assert_eq!(f.manager.stats().snapshot().successful_alerts, 1);
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_outcome() {
        let sender = Arc::new(MockSender::default());
        let sink = Arc::new(BrokenSink::default());
        let manager = AlertManager::with_clock(
            config(),
            sender.clone(),
            sink.clone(),
            Arc::new(ManualClock::new(10)),
        )
        .unwrap();

        let processed = manager.process(AlertRequest::new("disk full")).await;
        assert!(processed.outcome.is_success());
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(sender.calls.lock().len(), 1);
    }
}
