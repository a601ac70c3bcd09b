//! Audit log route

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{StorageError, StoredAuditRecord};

use crate::error::ApiError;
use crate::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 1000;

/// Query parameters for `GET /logs`
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    /// Kept as text so a malformed value falls back to the default
    pub limit: Option<String>,
}

impl LogQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|&limit| limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub success: bool,
    pub count: usize,
    pub logs: Vec<StoredAuditRecord>,
}

/// Newest audit records first
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let audit = state.manager.audit();
    if !audit.is_available() {
        return Err(ApiError::unavailable(
            "Audit log not available",
            "No audit backend is configured",
        ));
    }

    match audit.recent(query.effective_limit()).await {
        Ok(logs) => Ok(Json(LogsResponse {
            success: true,
            count: logs.len(),
            logs,
        })),
        Err(StorageError::Unavailable(message)) => {
            Err(ApiError::unavailable("Audit log not available", message))
        }
        Err(e) => Err(ApiError::Backend {
            error: "Database error".to_string(),
            message: e.to_string(),
        }),
    }
}
