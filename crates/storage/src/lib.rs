//! Storage Layer
//!
//! Audit log for every admission decision and delivery attempt. Backends are
//! selected once at startup: a no-op sink, a bounded in-memory log, or SQLite.

mod record;
mod repository;
mod sink;
mod sqlite;

pub use record::{AuditRecord, StoredAuditRecord};
pub use repository::MemoryAuditLog;
pub use sink::{AuditSink, NoopAuditSink};
pub use sqlite::SqliteAuditLog;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Audit log not available: {0}")]
    Unavailable(String),
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}
