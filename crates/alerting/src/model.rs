//! Alert request and outcome types

use serde::{Deserialize, Serialize};
use std::fmt;

/// An incoming alert, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub message: String,
    pub url: Option<String>,
    pub critical: bool,
    pub alert_type: Option<String>,
    pub source_ip: String,
}

impl AlertRequest {
    /// Build a non-critical request; the message is trimmed
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            message: message.as_ref().trim().to_string(),
            url: None,
            critical: false,
            alert_type: None,
            source_ip: "unknown".to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn with_alert_type(mut self, alert_type: impl Into<String>) -> Self {
        self.alert_type = Some(alert_type.into());
        self
    }

    pub fn from_source(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = source_ip.into();
        self
    }
}

/// Why an alert ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Ok,
    RateLimited,
    AlertsDisabled,
    OutsideHours,
    SendFailed,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Ok => "ok",
            Reason::RateLimited => "rate_limited",
            Reason::AlertsDisabled => "alerts_disabled",
            Reason::OutsideHours => "outside_hours",
            Reason::SendFailed => "send_failed",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one outbound send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub success: bool,
    pub is_retry: bool,
}

/// Final answer for one alert request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOutcome {
    /// Passed the admission gate
    pub accepted: bool,
    pub reason: Reason,
    /// Caller-facing description
    pub message: String,
    pub delivery: Option<DeliveryResult>,
}

impl AlertOutcome {
    pub fn rejected(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason,
            message: message.into(),
            delivery: None,
        }
    }

    pub fn delivered(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: Reason::Ok,
            message: message.into(),
            delivery: Some(DeliveryResult {
                success: true,
                is_retry: false,
            }),
        }
    }

    pub fn send_failed(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: Reason::SendFailed,
            message: message.into(),
            delivery: Some(DeliveryResult {
                success: false,
                is_retry: false,
            }),
        }
    }

    /// Alert was admitted and forwarded
    pub fn is_success(&self) -> bool {
        self.reason == Reason::Ok
    }

    /// Reason for the caller, `None` on success
    pub fn failure_reason(&self) -> Option<Reason> {
        (!self.is_success()).then_some(self.reason)
    }
}
