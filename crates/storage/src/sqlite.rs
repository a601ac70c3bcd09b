//! SQLite Audit Log

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::{AuditRecord, AuditSink, StorageError, StoredAuditRecord};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS alert_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    message TEXT NOT NULL,
    url TEXT NULL,
    critical INTEGER NOT NULL DEFAULT 0,
    success INTEGER NOT NULL DEFAULT 0,
    reason TEXT NULL,
    source_ip TEXT NULL
)
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS ix_alert_log_timestamp ON alert_log (timestamp)";

/// Column widths carried over from the audit table layout
const MAX_MESSAGE_LEN: usize = 500;
const MAX_URL_LEN: usize = 200;
const MAX_REASON_LEN: usize = 100;
const MAX_SOURCE_IP_LEN: usize = 50;

/// Audit log backed by a SQLite database
pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    /// Connect to `database_url`, creating the file if needed.
    ///
    /// In-memory databases are pinned to a single long-lived connection so
    /// every query sees the same schema.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        debug!(database_url, "Connecting to SQLite audit database");
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        info!(database_url, "Connected to SQLite audit database");
        Ok(Self { pool })
    }

    /// Connect and make sure the audit table exists
    pub async fn open(database_url: &str) -> Result<Self, StorageError> {
        let log = Self::connect(database_url).await?;
        log.init_schema().await?;
        Ok(log)
    }

    /// Create the audit table and its timestamp index if missing
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        info!("Audit table initialized");
        Ok(())
    }

    /// Total number of stored records
    pub async fn count(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM alert_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

fn decode_row(row: &SqliteRow) -> Result<StoredAuditRecord, StorageError> {
    let raw_timestamp: String = row.try_get("timestamp")?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_timestamp)
        .map_err(|e| StorageError::Serialization(format!("bad timestamp {raw_timestamp}: {e}")))?
        .with_timezone(&Utc);

    Ok(StoredAuditRecord {
        id: row.try_get("id")?,
        record: AuditRecord {
            timestamp,
            message: row.try_get("message")?,
            url: row.try_get("url")?,
            critical: row.try_get("critical")?,
            success: row.try_get("success")?,
            reason: row.try_get("reason")?,
            source_ip: row.try_get("source_ip")?,
        },
    })
}

#[async_trait]
impl AuditSink for SqliteAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO alert_log (timestamp, message, url, critical, success, reason, source_ip) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(truncate(&record.message, MAX_MESSAGE_LEN))
        .bind(record.url.as_deref().map(|u| truncate(u, MAX_URL_LEN)))
        .bind(record.critical)
        .bind(record.success)
        .bind(record.reason.as_deref().map(|r| truncate(r, MAX_REASON_LEN)))
        .bind(record.source_ip.as_deref().map(|ip| truncate(ip, MAX_SOURCE_IP_LEN)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredAuditRecord>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, timestamp, message, url, critical, success, reason, source_ip \
             FROM alert_log ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> SqliteAuditLog {
        SqliteAuditLog::open("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let log = setup().await;
        let record = AuditRecord::now("[THROTTLED] disk full", true, false)
            .with_url(Some("https://status.example.com".to_string()))
            .with_reason("rate_limited")
            .with_source_ip("10.0.0.7");

        log.append(&record).await.unwrap();

        let rows = log.recent(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        let stored = &rows[0].record;
        assert_eq!(stored.message, "[THROTTLED] disk full");
        assert_eq!(stored.url.as_deref(), Some("https://status.example.com"));
        assert!(stored.critical);
        assert!(!stored.success);
        assert_eq!(stored.reason.as_deref(), Some("rate_limited"));
        assert_eq!(stored.source_ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(
            stored.timestamp.timestamp_millis(),
            record.timestamp.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_limited() {
        let log = setup().await;
        for i in 0..5 {
            let record = AuditRecord::now(format!("alert {}", i), false, true);
            log.append(&record).await.unwrap();
        }

        let rows = log.recent(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.message, "alert 4");
        assert_eq!(rows[1].record.message, "alert 3");
        assert_eq!(log.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let log = setup().await;
        log.init_schema().await.unwrap();
        assert_eq!(log.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_long_message_is_truncated() {
        let log = setup().await;
        let record = AuditRecord::now("x".repeat(800), false, true);
        log.append(&record).await.unwrap();

        let rows = log.recent(1).await.unwrap();
        assert_eq!(rows[0].record.message.len(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 10), "short");
    }
}
