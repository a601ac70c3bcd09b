//! Audit Sink Interface

use async_trait::async_trait;
use tracing::trace;

use crate::{AuditRecord, StorageError, StoredAuditRecord};

/// Destination for audit records.
///
/// Implementations must be safe for concurrent appends. Callers treat an
/// `append` error as non-fatal: it is logged and the in-flight alert decision
/// stands.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append a record to the log
    async fn append(&self, record: &AuditRecord) -> Result<(), StorageError>;

    /// Read up to `limit` records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<StoredAuditRecord>, StorageError>;

    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;

    /// Whether records can be read back
    fn is_available(&self) -> bool {
        true
    }
}

/// Sink used when no audit backend is configured.
///
/// Appends are accepted and dropped; reads report the log as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn append(&self, record: &AuditRecord) -> Result<(), StorageError> {
        trace!(message = %record.message, "Audit sink disabled, dropping record");
        Ok(())
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<StoredAuditRecord>, StorageError> {
        Err(StorageError::Unavailable(
            "no audit backend configured".to_string(),
        ))
    }

    fn backend(&self) -> &'static str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_accepts_appends() {
        let sink = NoopAuditSink;
        let record = AuditRecord::now("disk full", false, true);
        assert!(sink.append(&record).await.is_ok());
        assert!(!sink.is_available());
    }

    #[tokio::test]
    async fn test_noop_reads_are_unavailable() {
        let sink = NoopAuditSink;
        match sink.recent(10).await {
            Err(StorageError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
