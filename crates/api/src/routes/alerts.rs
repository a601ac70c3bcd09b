//! Alert Routes

use alerting::{AlertRequest, ProcessedAlert, Reason};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    Json,
};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Rate-limit figures echoed with every alert response
#[derive(Debug, Serialize)]
pub struct RateLimitSummary {
    pub current: usize,
    pub max: usize,
    pub remaining: usize,
}

/// Response for `POST /alert`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub success: bool,
    pub message: String,
    pub reason: Option<Reason>,
    pub timestamp: DateTime<Utc>,
    pub critical: bool,
    /// Caller-supplied type, or `auto-detected`
    pub alert_type: String,
    pub working_hours: bool,
    pub rate_limit: RateLimitSummary,
}

/// Response for `POST /test`
#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub test: bool,
    pub success: bool,
    pub message: String,
    pub reason: Option<Reason>,
    pub timestamp: DateTime<Utc>,
}

pub(crate) fn source_ip(connect: Option<ConnectInfo<SocketAddr>>) -> String {
    connect
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Validate a raw `/alert` body into a pipeline request
pub fn parse_alert(body: &Value, source_ip: &str) -> Result<AlertRequest, ApiError> {
    let body = body
        .as_object()
        .ok_or_else(|| ApiError::validation("Request body must be a JSON object"))?;

    let message = match body.get("message") {
        None | Some(Value::Null) => {
            return Err(ApiError::validation("Missing required parameter: message"))
        }
        Some(Value::String(s)) if s.is_empty() => {
            return Err(ApiError::validation("Missing required parameter: message"))
        }
        Some(Value::String(s)) if !s.trim().is_empty() => s.as_str(),
        Some(_) => return Err(ApiError::validation("Message must be a non-empty string")),
    };

    let alert_type = match body.get("alertType") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(_) => {
            return Err(ApiError::validation(
                "alertType must be a non-empty string if provided",
            ))
        }
    };

    let url = match body.get("url") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ApiError::validation("url must be a string if provided")),
    };

    let critical = matches!(body.get("critical"), Some(Value::Bool(true)))
        || matches!(body.get("critical"), Some(Value::String(s)) if s == "true");

    let mut request = AlertRequest::new(message)
        .critical(critical)
        .from_source(source_ip);
    if let Some(url) = url {
        request = request.with_url(url);
    }
    if let Some(alert_type) = alert_type {
        request = request.with_alert_type(alert_type);
    }
    Ok(request)
}

/// Accept an alert and run it through the pipeline
pub async fn send_alert(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AlertResponse>, ApiError> {
    let Json(body) = payload?;
    let source_ip = source_ip(connect);
    let request = parse_alert(&body, &source_ip)?;

    info!(
        "Received alert request from {}: {}{}{}",
        source_ip,
        request.message,
        if request.critical { " (CRITICAL)" } else { "" },
        request
            .alert_type
            .as_deref()
            .map(|t| format!(" [{}]", t))
            .unwrap_or_default()
    );

    let critical = request.critical;
    let alert_type = request
        .alert_type
        .clone()
        .unwrap_or_else(|| "auto-detected".to_string());

    let ProcessedAlert { outcome, .. } = state.manager.process(request).await;

    let gate = state.manager.gate();
    let window = gate.rate_limit_snapshot();

    Ok(Json(AlertResponse {
        success: outcome.is_success(),
        reason: outcome.failure_reason(),
        message: outcome.message,
        timestamp: Utc::now(),
        critical,
        alert_type,
        working_hours: gate.is_working_hours(),
        rate_limit: RateLimitSummary {
            current: window.current,
            max: window.max,
            remaining: window.remaining,
        },
    }))
}

/// Push a synthetic, non-critical alert through the full pipeline
pub async fn send_test_alert(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Json<TestResponse> {
    info!("Test alert triggered");

    let message = format!(
        "Test alert from alert-gateway at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let request = AlertRequest::new(message).from_source(source_ip(connect));
    let ProcessedAlert { outcome, .. } = state.manager.process(request).await;

    Json(TestResponse {
        test: true,
        success: outcome.is_success(),
        reason: outcome.failure_reason(),
        message: outcome.message,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_body() {
        let body = json!({
            "message": "  disk nearly full ",
            "url": "https://status.example.com",
            "critical": "true",
            "alertType": "maintenance",
        });
        let request = parse_alert(&body, "10.0.0.7").unwrap();
        assert_eq!(request.message, "disk nearly full");
        assert_eq!(request.url.as_deref(), Some("https://status.example.com"));
        assert!(request.critical);
        assert_eq!(request.alert_type.as_deref(), Some("maintenance"));
        assert_eq!(request.source_ip, "10.0.0.7");
    }

    #[test]
    fn test_critical_only_for_true_values() {
        for value in [json!(false), json!("yes"), json!(1), json!("TRUE")] {
            let body = json!({ "message": "x", "critical": value });
            assert!(!parse_alert(&body, "unknown").unwrap().critical);
        }
        let body = json!({ "message": "x", "critical": true });
        assert!(parse_alert(&body, "unknown").unwrap().critical);
    }

    #[test]
    fn test_validation_messages() {
        let cases = [
            (json!({}), "Missing required parameter: message"),
            (json!({ "message": "" }), "Missing required parameter: message"),
            (json!({ "message": null }), "Missing required parameter: message"),
            (json!({ "message": "   " }), "Message must be a non-empty string"),
            (json!({ "message": 42 }), "Message must be a non-empty string"),
            (
                json!({ "message": "ok", "alertType": " " }),
                "alertType must be a non-empty string if provided",
            ),
            (
                json!({ "message": "ok", "alertType": 3 }),
                "alertType must be a non-empty string if provided",
            ),
            (json!([1, 2]), "Request body must be a JSON object"),
        ];

        for (body, expected) in cases {
            match parse_alert(&body, "unknown") {
                Err(ApiError::Validation(message)) => assert_eq!(message, expected),
                other => panic!("expected validation error for {}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_source_ip_defaults_to_unknown() {
        assert_eq!(source_ip(None), "unknown");
        let addr: SocketAddr = "192.168.1.20:5000".parse().unwrap();
        assert_eq!(source_ip(Some(ConnectInfo(addr))), "192.168.1.20");
    }
}
