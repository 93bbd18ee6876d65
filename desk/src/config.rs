//! Configuration management for the help desk.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::ticket::SlaPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Longest reporting window accepted, in days (one century)
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Longest stale or SLA window accepted, in hours (one century)
pub const MAX_WINDOW_HOURS: i64 = MAX_WINDOW_DAYS * 24;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL used to build ticket links in notifications
    pub site_url: String,
    /// Sender address for notifications
    pub from_email: String,
    /// Master switch for notifications
    pub notifications_enabled: bool,
    /// Assign new tickets to an agent as soon as they are created
    pub auto_assign: bool,
    /// Default reporting window in days
    pub metrics_window_days: i64,
    /// Maximum attachment size in megabytes
    pub max_attachment_mb: u64,
    /// Open or in-review tickets older than this count as stale
    pub stale_review_hours: i64,
    /// SLA windows per priority
    pub sla: SlaPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Missing or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| lookup(key).and_then(|s| parse_bool(&s)).unwrap_or(default);
        let defaults = SlaPolicy::default();
        let sla_hours = |key: &str, default: u32| {
            parse_or(&lookup, key, default).min(u32::try_from(MAX_WINDOW_HOURS).unwrap_or(u32::MAX))
        };

        Self {
            site_url: lookup("HELPDESK_SITE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            from_email: lookup("HELPDESK_FROM_EMAIL")
                .unwrap_or_else(|| "soporte@localhost".to_string()),
            notifications_enabled: flag("HELPDESK_NOTIFICATIONS_ENABLED", true),
            auto_assign: flag("HELPDESK_AUTO_ASSIGN", true),
            metrics_window_days: parse_or(&lookup, "HELPDESK_METRICS_WINDOW_DAYS", 30_i64)
                .clamp(1, MAX_WINDOW_DAYS),
            max_attachment_mb: parse_or(&lookup, "HELPDESK_MAX_ATTACHMENT_MB", 25),
            stale_review_hours: parse_or(&lookup, "HELPDESK_STALE_REVIEW_HOURS", 24_i64)
                .clamp(0, MAX_WINDOW_HOURS),
            sla: SlaPolicy {
                critical_hours: sla_hours("HELPDESK_SLA_CRITICAL_HOURS", defaults.critical_hours),
                high_hours: sla_hours("HELPDESK_SLA_HIGH_HOURS", defaults.high_hours),
                medium_hours: sla_hours("HELPDESK_SLA_MEDIUM_HOURS", defaults.medium_hours),
                low_hours: sla_hours("HELPDESK_SLA_LOW_HOURS", defaults.low_hours),
            },
        }
    }

    /// Maximum attachment size in bytes
    #[must_use]
    pub const fn max_attachment_bytes(&self) -> u64 {
        self.max_attachment_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.metrics_window_days, 30);
        assert_eq!(config.max_attachment_bytes(), 25 * 1024 * 1024);
        assert_eq!(config.sla, SlaPolicy::default());
        assert!(config.notifications_enabled);
        assert!(config.auto_assign);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("HELPDESK_SITE_URL", "https://soporte.example.com/"),
            ("HELPDESK_AUTO_ASSIGN", "off"),
            ("HELPDESK_SLA_CRITICAL_HOURS", "2"),
            ("HELPDESK_METRICS_WINDOW_DAYS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.site_url, "https://soporte.example.com");
        assert!(!config.auto_assign);
        assert_eq!(config.sla.critical_hours, 2);
        assert_eq!(config.sla.high_hours, 4);
        assert_eq!(config.metrics_window_days, 30);
    }

    #[test]
    fn test_windows_are_clamped() {
        let vars: HashMap<&str, &str> = [
            ("HELPDESK_METRICS_WINDOW_DAYS", "9223372036854775807"),
            ("HELPDESK_STALE_REVIEW_HOURS", "-5"),
            ("HELPDESK_SLA_LOW_HOURS", "4294967295"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.metrics_window_days, MAX_WINDOW_DAYS);
        assert_eq!(config.stale_review_hours, 0);
        assert_eq!(i64::from(config.sla.low_hours), MAX_WINDOW_HOURS);

        // the clamped values are usable as durations
        let now = chrono::Utc::now();
        let _ = now - chrono::Duration::days(config.metrics_window_days);
        let _ = chrono::Duration::hours(config.stale_review_hours);
    }
}
