//! Alert body classification
//!
//! Maps a message to the human-readable label sent as the push title.

use serde::Serialize;

/// Label for every critical alert
pub const CRITICAL_LABEL: &str = "Critical Alert";

/// Keywords that select a label when found in the lower-cased message
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KeywordGroup {
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

/// Keyword groups in priority order; the first group with a hit wins.
pub const KEYWORD_GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        label: "Device Alert",
        keywords: &["device", "battery", "round"],
    },
    KeywordGroup {
        label: "Sync Alert",
        keywords: &["sync", "synchroniz"],
    },
    KeywordGroup {
        label: "Health Check",
        keywords: &["health", "check", "monitor"],
    },
    KeywordGroup {
        label: "Security Alert",
        keywords: &["security", "breach", "unauthorized"],
    },
    KeywordGroup {
        label: "Warning",
        keywords: &["warning", "warn"],
    },
    KeywordGroup {
        label: "Information",
        keywords: &["info", "information", "completed", "successful"],
    },
    KeywordGroup {
        label: "Error Alert",
        keywords: &["error", "fail", "problem"],
    },
    KeywordGroup {
        label: "Backup Alert",
        keywords: &["backup", "restore"],
    },
    KeywordGroup {
        label: "Network Alert",
        keywords: &["network", "connection"],
    },
    KeywordGroup {
        label: "Database Alert",
        keywords: &["database", "sql"],
    },
];

/// Assigns a label to each alert
#[derive(Debug, Clone)]
pub struct Classifier {
    default_label: String,
}

impl Classifier {
    pub fn new(default_label: impl Into<String>) -> Self {
        Self {
            default_label: default_label.into(),
        }
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    /// Pick the label for an alert.
    ///
    /// Critical wins over everything, then an explicit type, then the first
    /// keyword group that matches, then the configured default.
    pub fn classify(&self, message: &str, is_critical: bool, explicit_type: Option<&str>) -> String {
        if is_critical {
            return CRITICAL_LABEL.to_string();
        }

        if let Some(alert_type) = explicit_type.map(str::trim).filter(|t| !t.is_empty()) {
            return format!("{} Alert", titlecase(alert_type));
        }

        let lower = message.to_lowercase();
        KEYWORD_GROUPS
            .iter()
            .find(|group| group.keywords.iter().any(|kw| lower.contains(kw)))
            .map(|group| group.label.to_string())
            .unwrap_or_else(|| self.default_label.clone())
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("System Alert")
    }
}

/// First character uppercased, the rest lowercased
fn titlecase(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
