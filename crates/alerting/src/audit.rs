//! Audit helpers shared by the pipeline and the retry task

use storage::{AuditRecord, AuditSink};
use tracing::warn;

/// Append a record; a sink failure is logged and otherwise ignored
pub(crate) async fn record(sink: &dyn AuditSink, record: AuditRecord) {
    if let Err(e) = sink.append(&record).await {
        warn!(
            backend = sink.backend(),
            error = %e,
            "Audit logging failed"
        );
    }
}
