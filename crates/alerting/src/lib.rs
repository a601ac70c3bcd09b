//! Alerting System
//!
//! Admission control and delivery for the alert gateway: a sliding-window
//! rate limiter with enabled/working-hours gating, keyword classification of
//! alert bodies, push delivery with a single delayed retry for critical
//! alerts, and running counters.

mod audit;
mod classifier;
mod config;
mod delivery;
mod error;
mod gate;
mod manager;
mod model;
mod stats;

pub use classifier::{Classifier, KeywordGroup, CRITICAL_LABEL, KEYWORD_GROUPS};
pub use config::AlertConfig;
pub use delivery::{
    AlertPayload, AlertSender, DeliveryEngine, DeliveryReport, DeliverySettings, DeliveryState,
    HttpAlertSender, OutboundRequest, RetryHandle,
};
pub use error::{ConfigError, SendError};
pub use gate::{
    Admission, AdmissionGate, Clock, ManualClock, RateLimitSnapshot, RateLimitWindow, Rejection,
    SystemClock,
};
pub use manager::{AlertManager, ProcessedAlert};
pub use model::{AlertOutcome, AlertRequest, DeliveryResult, Reason};
pub use stats::{AlertStats, StatsSnapshot};
