//! Policy Routes
//!
//! Read and toggle the live alert policy.

use alerting::{CRITICAL_LABEL, KEYWORD_GROUPS};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

const CUSTOM_TYPE_EXAMPLES: &[&str] = &[
    "maintenance",
    "deployment",
    "performance",
    "integration",
    "user-notification",
    "api-alert",
    "scheduled-task",
    "custom-category",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRateLimit {
    pub max: usize,
    pub window_seconds: f64,
    pub current: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertTypeInfo {
    pub dynamic: bool,
    pub description: &'static str,
    pub examples: &'static [&'static str],
}

/// Response for `GET /config`; never carries the push URL or credential
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub enabled: bool,
    pub working_hours_start: u32,
    pub working_hours_end: u32,
    pub topic: String,
    /// Milliseconds
    pub retry_delay: u64,
    pub rate_limit: ConfigRateLimit,
    pub default_alert_body: String,
    pub alert_type_info: AlertTypeInfo,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub message: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetRateLimit {
    pub current: usize,
    pub max: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub message: &'static str,
    pub rate_limit: ResetRateLimit,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTypeUsage {
    pub auto_detection: &'static str,
    pub custom_type: &'static str,
    pub formatting: &'static str,
}

/// Response for `GET /alert-types`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTypesResponse {
    pub dynamic: bool,
    pub description: &'static str,
    pub default_alert_body: String,
    pub auto_detected_types: Vec<String>,
    pub custom_type_examples: &'static [&'static str],
    pub usage: AlertTypeUsage,
}

/// Current policy values
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let config = state.manager.config();
    let gate = state.manager.gate();
    let window = gate.rate_limit_snapshot();

    Json(ConfigResponse {
        enabled: gate.is_enabled(),
        working_hours_start: config.working_hours_start,
        working_hours_end: config.working_hours_end,
        topic: config.topic.clone(),
        retry_delay: config.retry_delay_ms,
        rate_limit: ConfigRateLimit {
            max: window.max,
            window_seconds: window.window_seconds,
            current: window.current,
        },
        default_alert_body: config.default_alert_body.clone(),
        alert_type_info: AlertTypeInfo {
            dynamic: true,
            description: "Any custom alert type can be specified. If not provided, auto-detection based on message content will be used.",
            examples: &CUSTOM_TYPE_EXAMPLES[..4],
        },
    })
}

pub async fn enable_alerts(State(state): State<Arc<AppState>>) -> Json<ToggleResponse> {
    state.manager.gate().set_enabled(true);
    Json(ToggleResponse {
        success: true,
        message: "Alerts enabled",
        enabled: true,
    })
}

pub async fn disable_alerts(State(state): State<Arc<AppState>>) -> Json<ToggleResponse> {
    state.manager.gate().set_enabled(false);
    Json(ToggleResponse {
        success: true,
        message: "Alerts disabled",
        enabled: false,
    })
}

/// Empty the rate-limit window
pub async fn reset_rate_limit(State(state): State<Arc<AppState>>) -> Json<ResetResponse> {
    let gate = state.manager.gate();
    gate.reset_window();

    Json(ResetResponse {
        success: true,
        message: "Rate limit window reset",
        rate_limit: ResetRateLimit {
            current: 0,
            max: state.manager.config().rate_limit_max,
        },
    })
}

/// Classifier documentation built from the keyword table
pub fn auto_detected_types() -> Vec<String> {
    KEYWORD_GROUPS
        .iter()
        .map(|group| format!("{} (keywords: {})", group.label, group.keywords.join(", ")))
        .chain(std::iter::once(format!(
            "{} (when critical: true)",
            CRITICAL_LABEL
        )))
        .collect()
}

pub async fn alert_types(State(state): State<Arc<AppState>>) -> Json<AlertTypesResponse> {
    Json(AlertTypesResponse {
        dynamic: true,
        description: "Any custom alert type can be specified, or the type is auto-detected from the message content.",
        default_alert_body: state.manager.classifier().default_label().to_string(),
        auto_detected_types: auto_detected_types(),
        custom_type_examples: CUSTOM_TYPE_EXAMPLES,
        usage: AlertTypeUsage {
            auto_detection: "Send without alertType to auto-detect based on message content",
            custom_type: "Send with alertType to choose the alert title",
            formatting: "Custom types are formatted as 'Name Alert' (e.g. 'maintenance' becomes 'Maintenance Alert')",
        },
    })
}
