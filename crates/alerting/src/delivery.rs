//! Delivery Engine
//!
//! Forwards admitted alerts to the push endpoint. Critical alerts that were
//! sent successfully get exactly one more send after the retry delay, run as a
//! detached task:
//!
//! ```text
//! Pending -> Sent | Failed
//! Sent -> RetryPending -> RetrySent | RetryFailed   (critical only)
//! ```

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use storage::{AuditRecord, AuditSink};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::audit;
use crate::config::AlertConfig;
use crate::error::SendError;
use crate::model::{AlertRequest, DeliveryResult};

/// Longest upstream error body kept in a `SendError`
const MAX_ERROR_BODY: usize = 200;

/// Query parameters understood by the push endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertPayload {
    pub topic: String,
    /// Classifier label, shown as the notification title
    pub body: String,
    /// Original alert message
    pub content: String,
    pub keep: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Everything needed for one outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub endpoint: String,
    pub authorization: String,
    pub payload: AlertPayload,
    pub timeout: Duration,
}

/// Outbound network call to the push service
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<(), SendError>;
}

/// `AlertSender` over HTTP: a bodiless POST with the payload as query string
#[derive(Debug, Clone)]
pub struct HttpAlertSender {
    client: reqwest::Client,
}

impl HttpAlertSender {
    pub fn new() -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("alert-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AlertSender for HttpAlertSender {
    async fn send(&self, request: &OutboundRequest) -> Result<(), SendError> {
        let response = self
            .client
            .post(&request.endpoint)
            .query(&request.payload)
            .header(AUTHORIZATION, request.authorization.as_str())
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SendError::Status {
            code: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        })
    }
}

/// Lifecycle of a single alert delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Sent,
    Failed,
    RetryPending,
    RetrySent,
    RetryFailed,
}

impl DeliveryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryState::Pending | DeliveryState::RetryPending)
    }
}

/// Handle to a scheduled critical retry. Dropping it does not cancel the retry.
#[derive(Debug)]
pub struct RetryHandle {
    inner: JoinHandle<DeliveryState>,
}

impl RetryHandle {
    /// Wait for the retry to finish
    pub async fn wait(self) -> DeliveryState {
        self.inner.await.unwrap_or(DeliveryState::RetryFailed)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// Result of a primary delivery
#[derive(Debug)]
pub struct DeliveryReport {
    pub state: DeliveryState,
    pub error: Option<SendError>,
    pub retry: Option<RetryHandle>,
}

impl DeliveryReport {
    pub fn result(&self) -> DeliveryResult {
        DeliveryResult {
            success: self.state == DeliveryState::Sent,
            is_retry: false,
        }
    }
}

/// Endpoint, credential, and timing for outbound calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    pub endpoint: String,
    pub authorization: String,
    pub topic: String,
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl From<&AlertConfig> for DeliverySettings {
    fn from(config: &AlertConfig) -> Self {
        Self {
            endpoint: config.api_url.clone(),
            authorization: config.auth_header.clone(),
            topic: config.topic.clone(),
            timeout: config.send_timeout(),
            retry_delay: config.retry_delay(),
        }
    }
}

/// Snapshot handed to the retry task
struct RetryJob {
    request: AlertRequest,
    outbound: OutboundRequest,
}

impl RetryJob {
    async fn run(self, sender: &dyn AlertSender, audit: &dyn AuditSink) -> DeliveryState {
        let request = &self.request;
        let (state, record) = match sender.send(&self.outbound).await {
            Ok(()) => {
                info!("Critical alert retry sent successfully: {}", request.message);
                (
                    DeliveryState::RetrySent,
                    AuditRecord::now(format!("[RETRY] {}", request.message), request.critical, true)
                        .with_reason("retry"),
                )
            }
            Err(e) => {
                error!(error = %e, "Critical alert retry failed: {}", request.message);
                (
                    DeliveryState::RetryFailed,
                    AuditRecord::now(
                        format!("[RETRY FAILED] {}", request.message),
                        request.critical,
                        false,
                    )
                    .with_reason("retry_failed"),
                )
            }
        };

        let record = record
            .with_url(request.url.clone())
            .with_source_ip(request.source_ip.clone());
        audit::record(audit, record).await;
        state
    }
}

/// Sends alerts and schedules critical retries
pub struct DeliveryEngine {
    sender: Arc<dyn AlertSender>,
    audit: Arc<dyn AuditSink>,
    settings: DeliverySettings,
}

impl DeliveryEngine {
    pub fn new(
        settings: DeliverySettings,
        sender: Arc<dyn AlertSender>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            sender,
            audit,
            settings,
        }
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Build the outbound call for an alert and its label
    pub fn build_request(&self, request: &AlertRequest, label: &str) -> OutboundRequest {
        OutboundRequest {
            endpoint: self.settings.endpoint.clone(),
            authorization: self.settings.authorization.clone(),
            payload: AlertPayload {
                topic: self.settings.topic.clone(),
                body: label.to_string(),
                content: request.message.clone(),
                keep: 1,
                url: request.url.clone(),
            },
            timeout: self.settings.timeout,
        }
    }

    /// Primary send. Returns as soon as it completes; a critical retry runs
    /// in the background.
    pub async fn deliver(&self, request: &AlertRequest, label: &str) -> DeliveryReport {
        let outbound = self.build_request(request, label);

        match self.sender.send(&outbound).await {
            Ok(()) => {
                info!("Alert sent successfully: {}", request.message);
                let retry = request.critical.then(|| {
                    self.schedule_retry(RetryJob {
                        request: request.clone(),
                        outbound,
                    })
                });
                DeliveryReport {
                    state: DeliveryState::Sent,
                    error: None,
                    retry,
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to send alert: {}", request.message);
                DeliveryReport {
                    state: DeliveryState::Failed,
                    error: Some(e),
                    retry: None,
                }
            }
        }
    }

    fn schedule_retry(&self, job: RetryJob) -> RetryHandle {
        let delay = self.settings.retry_delay;
        info!("Sending critical alert retry in {}ms", delay.as_millis());

        let sender = self.sender.clone();
        let audit = self.audit.clone();
        let inner = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.run(sender.as_ref(), audit.as_ref()).await
        });

        RetryHandle { inner }
    }
}
