//! Health, statistics and metrics routes

use alerting::StatsSnapshot;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use sysinfo::System;

use crate::error::ApiError;
use crate::AppState;

/// Counters as exposed over HTTP
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub start_time: DateTime<Utc>,
    pub total_alerts: u64,
    pub successful_alerts: u64,
    pub failed_alerts: u64,
    pub critical_alerts: u64,
    pub alerts_disabled: u64,
    pub throttled_alerts: u64,
    /// Seconds
    pub uptime: u64,
    /// Percent, one decimal
    pub success_rate: f64,
    pub alerts_per_hour: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(s: StatsSnapshot) -> Self {
        Self {
            start_time: s.start_time,
            total_alerts: s.total_alerts,
            successful_alerts: s.successful_alerts,
            failed_alerts: s.failed_alerts,
            critical_alerts: s.critical_alerts,
            alerts_disabled: s.alerts_disabled,
            throttled_alerts: s.throttled_alerts,
            uptime: s.uptime_seconds,
            success_rate: round1(s.success_rate * 100.0),
            alerts_per_hour: round1(s.alerts_per_hour),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRateLimit {
    pub current: usize,
    pub max: usize,
    pub window_seconds: f64,
    pub next_reset: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    pub rss: String,
    #[serde(rename = "virtual")]
    pub virtual_memory: String,
}

/// Response for `GET /health`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: String,
    pub uptime: u64,
    pub uptime_formatted: String,
    pub alerts_enabled: bool,
    pub working_hours: bool,
    pub current_hour: u32,
    pub working_hours_range: String,
    pub rate_limit: HealthRateLimit,
    pub memory: Option<MemoryUsage>,
    pub audit_sink: &'static str,
    pub stats: StatsResponse,
}

/// `"{h}h {m}m"`
pub fn format_uptime(seconds: u64) -> String {
    format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
}

fn process_memory() -> Option<MemoryUsage> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_process(pid);
    let process = system.process(pid)?;
    Some(MemoryUsage {
        rss: format!("{}MB", process.memory() / 1024 / 1024),
        virtual_memory: format!("{}MB", process.virtual_memory() / 1024 / 1024),
    })
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let manager = &state.manager;
    let gate = manager.gate();
    let window = gate.rate_limit_snapshot();
    let uptime = state.start_time.elapsed().as_secs();

    Json(HealthResponse {
        status: "healthy",
        service: "alert-gateway",
        version: state.version.clone(),
        uptime,
        uptime_formatted: format_uptime(uptime),
        alerts_enabled: gate.is_enabled(),
        working_hours: gate.is_working_hours(),
        current_hour: gate.current_hour(),
        working_hours_range: manager.config().working_hours_range(),
        rate_limit: HealthRateLimit {
            current: window.current,
            max: window.max,
            window_seconds: window.window_seconds,
            next_reset: window.next_reset,
        },
        memory: process_memory(),
        audit_sink: manager.audit().backend(),
        stats: manager.stats().snapshot().into(),
    })
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(state.manager.stats().snapshot().into())
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => ApiError::unavailable(
            "Metrics not available",
            "Prometheus recorder is not installed",
        )
        .into_response(),
    }
}
