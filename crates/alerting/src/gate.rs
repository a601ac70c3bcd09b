//! Admission Gate
//!
//! Decides whether an alert may be forwarded. Checks run in a fixed order and
//! stop at the first rejection:
//!
//! 1. sliding-window rate limit (an admitted check consumes a slot)
//! 2. global enabled flag
//! 3. working hours
//!
//! A slot taken in step 1 is kept even if step 2 or 3 rejects the alert.

use chrono::{DateTime, Local, Timelike, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::AlertConfig;
use crate::model::Reason;

/// Time source for the gate
pub trait Clock: Send + Sync + fmt::Debug {
    /// Monotonic now, used for the rate-limit window
    fn now(&self) -> Instant;
    /// Current local hour (0-23), used for working hours
    fn local_hour(&self) -> u32;
}

/// Wall clock and local timezone of the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Hand-driven clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    hour: AtomicU32,
}

impl ManualClock {
    pub fn new(hour: u32) -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            hour: AtomicU32::new(hour),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    fn local_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}

/// Upper bound on slots reserved up front; larger windows grow on demand
const MAX_PREALLOCATED: usize = 1024;

/// Timestamps of admissions inside the trailing window
#[derive(Debug)]
pub struct RateLimitWindow {
    /// Oldest first
    timestamps: VecDeque<Instant>,
    duration: Duration,
    max: usize,
}

impl RateLimitWindow {
    pub fn new(max: usize, duration: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max.min(MAX_PREALLOCATED)),
            duration,
            max,
        }
    }

    /// Drop entries at or before `now - duration`
    pub fn purge(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.duration) else {
            return;
        };
        while self.timestamps.front().is_some_and(|t| *t <= cutoff) {
            self.timestamps.pop_front();
        }
    }

    /// Record `now` if a slot is free. A full window is left untouched.
    pub fn try_record(&mut self, now: Instant) -> bool {
        self.purge(now);
        if self.timestamps.len() >= self.max {
            return false;
        }
        self.timestamps.push_back(now);
        true
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn oldest(&self) -> Option<Instant> {
        self.timestamps.front().copied()
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
    }
}

/// Why the gate turned an alert away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    RateLimited,
    AlertsDisabled,
    OutsideHours,
}

impl Rejection {
    pub fn reason(&self) -> Reason {
        match self {
            Rejection::RateLimited => Reason::RateLimited,
            Rejection::AlertsDisabled => Reason::AlertsDisabled,
            Rejection::OutsideHours => Reason::OutsideHours,
        }
    }
}

impl From<Rejection> for Reason {
    fn from(rejection: Rejection) -> Self {
        rejection.reason()
    }
}

/// Gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected(Rejection),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }

    pub fn reason(&self) -> Reason {
        match self {
            Admission::Allowed => Reason::Ok,
            Admission::Rejected(rejection) => rejection.reason(),
        }
    }
}

/// Point-in-time view of the rate-limit window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    pub current: usize,
    pub max: usize,
    pub remaining: usize,
    pub window_seconds: f64,
    /// When the oldest entry leaves the window
    pub next_reset: Option<DateTime<Utc>>,
}

/// Rate limit, enabled flag, and working hours
pub struct AdmissionGate {
    window: Mutex<RateLimitWindow>,
    enabled: AtomicBool,
    working_hours_start: u32,
    working_hours_end: u32,
    clock: Arc<dyn Clock>,
}

impl AdmissionGate {
    pub fn new(config: &AlertConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Mutex::new(RateLimitWindow::new(
                config.rate_limit_max,
                config.rate_limit_window(),
            )),
            enabled: AtomicBool::new(config.enabled),
            working_hours_start: config.working_hours_start,
            working_hours_end: config.working_hours_end,
            clock,
        }
    }

    /// Run all checks in order
    pub fn admit(&self) -> Admission {
        if !self.check_rate_limit() {
            return Admission::Rejected(Rejection::RateLimited);
        }

        if !self.is_enabled() {
            return Admission::Rejected(Rejection::AlertsDisabled);
        }

        if !self.is_working_hours() {
            return Admission::Rejected(Rejection::OutsideHours);
        }

        Admission::Allowed
    }

    /// Take a slot in the window if one is free
    pub fn check_rate_limit(&self) -> bool {
        let now = self.clock.now();
        let mut window = self.window.lock();
        let allowed = window.try_record(now);
        debug!(
            allowed,
            current = window.len(),
            max = window.max(),
            "Rate limit check"
        );
        allowed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if enabled {
            info!("Alerts ENABLED");
        } else {
            info!("Alerts DISABLED");
        }
    }

    pub fn current_hour(&self) -> u32 {
        self.clock.local_hour()
    }

    /// Current local hour falls in `[start, end]`
    pub fn is_working_hours(&self) -> bool {
        let hour = self.current_hour();
        hour >= self.working_hours_start && hour <= self.working_hours_end
    }

    /// Empty the rate-limit window
    pub fn reset_window(&self) {
        self.window.lock().clear();
        info!("Rate limit window reset");
    }

    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        let now = self.clock.now();
        let mut window = self.window.lock();
        window.purge(now);

        let next_reset = window
            .oldest()
            .map(|oldest| (oldest + window.duration()).saturating_duration_since(now))
            .and_then(|remaining| chrono::Duration::from_std(remaining).ok())
            .map(|remaining| Utc::now() + remaining);

        RateLimitSnapshot {
            current: window.len(),
            max: window.max(),
            remaining: window.max().saturating_sub(window.len()),
            window_seconds: window.duration().as_secs_f64(),
            next_reset,
        }
    }
}
