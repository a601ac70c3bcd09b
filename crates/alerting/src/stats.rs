//! Running alert counters

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-lifetime counters, safe for concurrent increments.
///
/// Every increment is mirrored to the `metrics` facade so an installed
/// exporter sees the same numbers.
#[derive(Debug)]
pub struct AlertStats {
    start_time: DateTime<Utc>,
    started: Instant,
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    critical: AtomicU64,
    disabled: AtomicU64,
    throttled: AtomicU64,
}

/// Counter values plus derived rates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub start_time: DateTime<Utc>,
    pub total_alerts: u64,
    pub successful_alerts: u64,
    pub failed_alerts: u64,
    pub critical_alerts: u64,
    pub alerts_disabled: u64,
    pub throttled_alerts: u64,
    pub uptime_seconds: u64,
    /// successful / total, 0 when nothing was received
    pub success_rate: f64,
    pub alerts_per_hour: f64,
}

impl AlertStats {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            started: Instant::now(),
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            critical: AtomicU64::new(0),
            disabled: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
        }
    }

    /// Count an incoming alert before any policy check
    pub fn record_received(&self, critical: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        counter!("alert_gateway_alerts_received_total").increment(1);
        if critical {
            self.critical.fetch_add(1, Ordering::Relaxed);
            counter!("alert_gateway_critical_alerts_total").increment(1);
        }
    }

    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
        counter!("alert_gateway_alerts_delivered_total").increment(1);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        counter!("alert_gateway_alerts_failed_total").increment(1);
    }

    pub fn record_disabled(&self) {
        self.disabled.fetch_add(1, Ordering::Relaxed);
        counter!("alert_gateway_alerts_rejected_total", "reason" => "alerts_disabled").increment(1);
    }

    pub fn record_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
        counter!("alert_gateway_alerts_rejected_total", "reason" => "rate_limited").increment(1);
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let uptime = self.uptime();
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);

        StatsSnapshot {
            start_time: self.start_time,
            total_alerts: total,
            successful_alerts: successful,
            failed_alerts: self.failed.load(Ordering::Relaxed),
            critical_alerts: self.critical.load(Ordering::Relaxed),
            alerts_disabled: self.disabled.load(Ordering::Relaxed),
            throttled_alerts: self.throttled.load(Ordering::Relaxed),
            uptime_seconds: uptime.as_secs(),
            success_rate: success_rate(successful, total),
            alerts_per_hour: alerts_per_hour(total, uptime),
        }
    }
}

impl Default for AlertStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of received alerts that were delivered
pub fn success_rate(successful: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    successful as f64 / total as f64
}

/// Received alerts per hour of uptime
pub fn alerts_per_hour(total: u64, uptime: Duration) -> f64 {
    let hours = uptime.as_secs_f64() / 3600.0;
    if total == 0 || hours <= 0.0 {
        return 0.0;
    }
    total as f64 / hours
}
