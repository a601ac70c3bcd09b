//! Alert Policy Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Process-wide alert policy.
///
/// Set once at startup. Only `enabled` and the rate-limit window change at
/// runtime, and those live on the admission gate rather than here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Initial state of the enabled toggle
    pub enabled: bool,
    /// First working hour, inclusive (0-23)
    pub working_hours_start: u32,
    /// Last working hour, inclusive (0-23)
    pub working_hours_end: u32,
    /// Push endpoint receiving accepted alerts
    pub api_url: String,
    /// Value of the `Authorization` header sent to the push endpoint
    pub auth_header: String,
    /// Delay before the single retry of a critical alert (ms)
    pub retry_delay_ms: u64,
    /// Topic attached to every outbound alert
    pub topic: String,
    /// Sliding rate-limit window (ms)
    pub rate_limit_window_ms: u64,
    /// Admissions allowed per window
    pub rate_limit_max: usize,
    /// Message returned to callers when throttled
    pub throttle_message: String,
    /// Label used when no keyword matches
    pub default_alert_body: String,
    /// Timeout for each outbound call (ms)
    pub send_timeout_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            working_hours_start: 7,
            working_hours_end: 18,
            api_url: String::new(),
            auth_header: String::new(),
            retry_delay_ms: 3000,
            topic: "IT".to_string(),
            rate_limit_window_ms: 30_000,
            rate_limit_max: 5,
            throttle_message: "Alert rate limit exceeded - throttling alerts".to_string(),
            default_alert_body: "System Alert".to_string(),
            send_timeout_ms: 10_000,
        }
    }
}

impl AlertConfig {
    /// Check policy values before the pipeline is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.working_hours_start > 23 {
            return Err(ConfigError::InvalidHour {
                field: "working_hours_start",
                value: self.working_hours_start,
            });
        }
        if self.working_hours_end > 23 {
            return Err(ConfigError::InvalidHour {
                field: "working_hours_end",
                value: self.working_hours_end,
            });
        }
        if self.rate_limit_window_ms == 0 {
            return Err(ConfigError::Zero("rate_limit_window"));
        }
        if self.rate_limit_max == 0 {
            return Err(ConfigError::Zero("rate_limit_max"));
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::Zero("send_timeout"));
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::Missing("alert_topic"));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Missing("push_api_url"));
        }
        if self.auth_header.trim().is_empty() {
            return Err(ConfigError::Missing("push_api_auth"));
        }
        Ok(())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Human-readable working hours, e.g. `7:00 - 18:00`
    pub fn working_hours_range(&self) -> String {
        format!(
            "{}:00 - {}:00",
            self.working_hours_start, self.working_hours_end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AlertConfig {
        AlertConfig {
            api_url: "https://push.example.com/SendAlert".to_string(),
            auth_header: "Basic dGVzdA==".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AlertConfig::default();
        assert!(config.enabled);
        assert_eq!(config.working_hours_start, 7);
        assert_eq!(config.working_hours_end, 18);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(30));
        assert_eq!(config.rate_limit_max, 5);
        assert_eq!(config.retry_delay(), Duration::from_secs(3));
        assert_eq!(config.send_timeout(), Duration::from_secs(10));
        assert_eq!(config.working_hours_range(), "7:00 - 18:00");
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_hours() {
        let config = AlertConfig {
            working_hours_end: 24,
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidHour {
                field: "working_hours_end",
                value: 24
            })
        );
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = AlertConfig {
            auth_header: "  ".to_string(),
            ..valid()
        };
        assert_eq!(config.validate(), Err(ConfigError::Missing("push_api_auth")));

        assert_eq!(
            AlertConfig::default().validate(),
            Err(ConfigError::Missing("push_api_url"))
        );
    }

    #[test]
    fn test_validate_rejects_empty_window() {
        let config = AlertConfig {
            rate_limit_max: 0,
            ..valid()
        };
        assert_eq!(config.validate(), Err(ConfigError::Zero("rate_limit_max")));
    }
}
