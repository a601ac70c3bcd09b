//! In-Memory Audit Log

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::{AuditRecord, AuditSink, StorageError, StoredAuditRecord};

/// Bounded in-memory audit log.
///
/// Oldest records are evicted once `max_records` is reached. Ids keep
/// increasing across evictions.
pub struct MemoryAuditLog {
    /// Records, oldest at the front
    records: Mutex<VecDeque<StoredAuditRecord>>,
    /// Retention limit
    max_records: usize,
    /// Next record ID
    next_id: Mutex<i64>,
}

impl MemoryAuditLog {
    /// Create a new in-memory audit log
    pub fn new(max_records: usize) -> Self {
        info!("Creating in-memory audit log (capacity {})", max_records);
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records.min(1024))),
            max_records: max_records.max(1),
            next_id: Mutex::new(1),
        }
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all records (for testing)
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn insert(&self, record: AuditRecord) -> Result<i64, StorageError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        let mut id = self
            .next_id
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        let assigned = *id;
        *id += 1;

        // Enforce retention
        while records.len() >= self.max_records {
            records.pop_front();
        }

        records.push_back(StoredAuditRecord {
            id: assigned,
            record,
        });
        debug!("Inserted audit record with ID {}", assigned);

        Ok(assigned)
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), StorageError> {
        self.insert(record.clone()).map(|_| ())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredAuditRecord>, StorageError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
