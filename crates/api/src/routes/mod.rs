//! HTTP route handlers

pub mod alerts;
pub mod policy;
pub mod logs;
pub mod status;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Advertised on 404
pub const ENDPOINTS: &[&str] = &[
    "GET /health - Service health check",
    "POST /alert - Send alert (message, url, critical, alertType)",
    "GET /config - Get configuration",
    "POST /config/enable - Enable alerts",
    "POST /config/disable - Disable alerts",
    "GET /alert-types - Get available alert types",
    "GET /stats - Get statistics",
    "POST /test - Send test alert",
    "POST /reset-rate-limit - Reset rate limit window",
    "GET /logs - Get audit logs",
    "GET /metrics - Prometheus metrics",
];

/// Fallback for unmatched routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "availableEndpoints": ENDPOINTS,
        })),
    )
}
