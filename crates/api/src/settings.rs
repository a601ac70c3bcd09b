//! Service settings
//!
//! Layered with the `config` crate: serde defaults, then an optional settings
//! file, then the process environment. Keys are the environment variable
//! names, lower-cased (`WORKING_HOURS_START` -> `working_hours_start`).

use alerting::AlertConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid alert policy: {0}")]
    Policy(#[from] alerting::ConfigError),

    #[error("Failed to install log subscriber: {0}")]
    Logging(String),

    #[error("Unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

/// Where audit records go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSinkKind {
    None,
    Memory,
    Sqlite,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_true")]
    pub alerts_enabled: bool,
    #[serde(default = "default_working_hours_start")]
    pub working_hours_start: u32,
    #[serde(default = "default_working_hours_end")]
    pub working_hours_end: u32,
    #[serde(default, alias = "tasty_api_url")]
    pub push_api_url: String,
    #[serde(default, alias = "tasty_api_auth")]
    pub push_api_auth: String,
    /// Milliseconds
    #[serde(default = "default_retry_delay")]
    pub alert_retry_delay: u64,
    #[serde(default = "default_topic")]
    pub alert_topic: String,
    /// Milliseconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window: u64,
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: usize,
    #[serde(default = "default_throttle_message")]
    pub throttle_message: String,
    #[serde(default = "default_alert_body")]
    pub default_alert_body: String,
    /// Milliseconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout: u64,

    /// `none`, `memory` or `sqlite`
    #[serde(default = "default_audit_sink")]
    pub audit_sink: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_audit_memory_capacity")]
    pub audit_memory_capacity: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_port() -> u16 {
    3008
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_working_hours_start() -> u32 {
    AlertConfig::default().working_hours_start
}

fn default_working_hours_end() -> u32 {
    AlertConfig::default().working_hours_end
}

fn default_retry_delay() -> u64 {
    AlertConfig::default().retry_delay_ms
}

fn default_topic() -> String {
    AlertConfig::default().topic
}

fn default_rate_limit_window() -> u64 {
    AlertConfig::default().rate_limit_window_ms
}

fn default_rate_limit_max() -> usize {
    AlertConfig::default().rate_limit_max
}

fn default_throttle_message() -> String {
    AlertConfig::default().throttle_message
}

fn default_alert_body() -> String {
    AlertConfig::default().default_alert_body
}

fn default_send_timeout() -> u64 {
    AlertConfig::default().send_timeout_ms
}

fn default_audit_sink() -> String {
    "none".to_string()
}

fn default_database_url() -> String {
    "sqlite://alert-gateway.db".to_string()
}

fn default_audit_memory_capacity() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Settings {
    /// Load from `CONFIG_FILE` (default `alert-gateway.*`, optional) and the
    /// environment
    pub fn load() -> Result<Self, SettingsError> {
        let file = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "alert-gateway".to_string());
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(&file).required(false))
                .add_source(Environment::default()),
        )
    }

    /// Build and validate from prepared sources
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.alert_config().validate()?;
        settings.audit_sink_kind()?;
        settings.logging()?;
        Ok(settings)
    }

    /// Policy values for the alert pipeline
    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            enabled: self.alerts_enabled,
            working_hours_start: self.working_hours_start,
            working_hours_end: self.working_hours_end,
            api_url: self.push_api_url.clone(),
            auth_header: self.push_api_auth.clone(),
            retry_delay_ms: self.alert_retry_delay,
            topic: self.alert_topic.clone(),
            rate_limit_window_ms: self.rate_limit_window,
            rate_limit_max: self.rate_limit_max,
            throttle_message: self.throttle_message.clone(),
            default_alert_body: self.default_alert_body.clone(),
            send_timeout_ms: self.send_timeout,
        }
    }

    pub fn audit_sink_kind(&self) -> Result<AuditSinkKind, SettingsError> {
        match self.audit_sink.trim().to_lowercase().as_str() {
            "" | "none" => Ok(AuditSinkKind::None),
            "memory" => Ok(AuditSinkKind::Memory),
            "sqlite" => Ok(AuditSinkKind::Sqlite),
            other => Err(SettingsError::UnknownValue {
                field: "audit_sink",
                value: other.to_string(),
            }),
        }
    }

    pub fn logging(&self) -> Result<LoggingSettings, SettingsError> {
        let format = match self.log_format.trim().to_lowercase().as_str() {
            "" | "text" | "pretty" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(SettingsError::UnknownValue {
                    field: "log_format",
                    value: other.to_string(),
                })
            }
        };
        Ok(LoggingSettings {
            level: self.log_level.clone(),
            format,
        })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert(key.to_string(), value.to_string());
        }
        Environment::default().source(Some(map))
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("PUSH_API_URL", "https://push.example.com/SendAlert"),
            ("PUSH_API_AUTH", "Basic dGVzdA=="),
        ]
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_builder(Config::builder().add_source(env(&required()))).unwrap();

        assert_eq!(settings.port, 3008);
        assert_eq!(settings.listen_address(), "0.0.0.0:3008");
        assert_eq!(settings.audit_sink_kind().unwrap(), AuditSinkKind::None);

        let policy = settings.alert_config();
        assert!(policy.enabled);
        assert_eq!(policy.working_hours_start, 7);
        assert_eq!(policy.working_hours_end, 18);
        assert_eq!(policy.rate_limit_window_ms, 30_000);
        assert_eq!(policy.rate_limit_max, 5);
        assert_eq!(policy.retry_delay_ms, 3000);
        assert_eq!(policy.topic, "IT");
        assert_eq!(policy.default_alert_body, "System Alert");
        assert_eq!(policy.auth_header, "Basic dGVzdA==");
    }

    #[test]
    fn test_environment_overrides() {
        let mut vars = required();
        vars.extend([
            ("PORT", "9000"),
            ("WORKING_HOURS_START", "0"),
            ("WORKING_HOURS_END", "23"),
            ("RATE_LIMIT_MAX", "8"),
            ("RATE_LIMIT_WINDOW", "60000"),
            ("ALERTS_ENABLED", "false"),
            ("AUDIT_SINK", "memory"),
            ("LOG_FORMAT", "json"),
        ]);
        let settings = Settings::from_builder(Config::builder().add_source(env(&vars))).unwrap();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.audit_sink_kind().unwrap(), AuditSinkKind::Memory);
        assert_eq!(settings.logging().unwrap().format, LogFormat::Json);

        let policy = settings.alert_config();
        assert!(!policy.enabled);
        assert_eq!(policy.working_hours_start, 0);
        assert_eq!(policy.working_hours_end, 23);
        assert_eq!(policy.rate_limit_max, 8);
        assert_eq!(policy.rate_limit_window_ms, 60_000);
    }

    #[test]
    fn test_legacy_key_names() {
        let vars = [
            ("TASTY_API_URL", "https://push.example.com/SendAlert"),
            ("TASTY_API_AUTH", "legacy-token"),
        ];
        let settings = Settings::from_builder(Config::builder().add_source(env(&vars))).unwrap();
        assert_eq!(settings.push_api_auth, "legacy-token");
    }

    #[test]
    fn test_missing_credential_is_an_error() {
        let vars = [("PUSH_API_URL", "https://push.example.com/SendAlert")];
        let result = Settings::from_builder(Config::builder().add_source(env(&vars)));
        assert!(matches!(
            result,
            Err(SettingsError::Policy(alerting::ConfigError::Missing(_)))
        ));
    }

    #[test]
    fn test_unknown_audit_sink_is_an_error() {
        let mut vars = required();
        vars.push(("AUDIT_SINK", "mssql"));
        let result = Settings::from_builder(Config::builder().add_source(env(&vars)));
        assert!(matches!(
            result,
            Err(SettingsError::UnknownValue {
                field: "audit_sink",
                ..
            })
        ));
    }

    #[test]
    fn test_file_source() {
        let toml = r#"
push_api_url = "https://push.example.com/SendAlert"
push_api_auth = "from-file"
alert_topic = "OPS"
audit_sink = "sqlite"
database_url = "sqlite::memory:"
"#;
        let settings = Settings::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
        .unwrap();
        assert_eq!(settings.alert_config().topic, "OPS");
        assert_eq!(settings.audit_sink_kind().unwrap(), AuditSinkKind::Sqlite);
        assert_eq!(settings.database_url, "sqlite::memory:");
    }
}
