//! Audit Record Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit entry, written after an admission decision or delivery attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Alert message, possibly prefixed with a tag such as `[THROTTLED]`
    pub message: String,
    pub url: Option<String>,
    pub critical: bool,
    pub success: bool,
    pub reason: Option<String>,
    #[serde(rename = "sourceIP")]
    pub source_ip: Option<String>,
}

impl AuditRecord {
    /// Create a record stamped with the current time
    pub fn now(message: impl Into<String>, critical: bool, success: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            url: None,
            critical,
            success,
            reason: None,
            source_ip: None,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }
}

/// An audit entry as read back from a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuditRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: AuditRecord,
}
