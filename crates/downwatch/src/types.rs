//! Core types shared by the poller, recovery watchers and notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timestamp layout embedded in notification text
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A monitored `hostname:port` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub hostname: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

/// Which hourly counter reset to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourlyResetPolicy {
    /// Zero every counter
    #[default]
    All,
    /// Leave endpoints with an active recovery watcher alone
    SkipWatched,
    /// Never reset
    Disabled,
}

/// Runtime monitoring parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Consecutive failures tolerated before an outage is declared
    pub failure_threshold: u32,

    /// Sleep between polling cycles
    pub check_interval: Duration,

    /// Sleep between recovery probes
    pub recovery_interval: Duration,

    /// Per-probe connection timeout
    pub connection_timeout: Duration,

    /// Hourly counter reset scope
    pub hourly_reset: HourlyResetPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            check_interval: Duration::from_secs(30),
            recovery_interval: Duration::from_secs(5),
            connection_timeout: Duration::from_millis(200),
            hourly_reset: HourlyResetPolicy::All,
        }
    }
}

/// Direction of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Outage,
    Recovered,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Outage => "outage",
            NotificationKind::Recovered => "recovered",
        }
    }
}

/// Outbound message about a monitored endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    pub endpoint: Endpoint,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn outage(timestamp: DateTime<Utc>, endpoint: Endpoint) -> Self {
        Self {
            timestamp,
            endpoint,
            kind: NotificationKind::Outage,
        }
    }

    pub fn recovered(timestamp: DateTime<Utc>, endpoint: Endpoint) -> Self {
        Self {
            timestamp,
            endpoint,
            kind: NotificationKind::Recovered,
        }
    }

    /// Text delivered to the webhook
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.timestamp.format(TIMESTAMP_FORMAT);
        match self.kind {
            NotificationKind::Outage => write!(
                f,
                "{} -- Outage detected at {} (port: {})",
                ts, self.endpoint.hostname, self.endpoint.port
            ),
            NotificationKind::Recovered => write!(
                f,
                "{} -- Service is back UP for: {} (port: {})",
                ts, self.endpoint.hostname, self.endpoint.port
            ),
        }
    }
}
