//! Probe result types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Liveness of an endpoint as seen by one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Connection established within the timeout
    Up,
    /// Connection failed or timed out
    Down,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Up => "up",
            ProbeStatus::Down => "down",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "UP"),
            ProbeStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// Why a probe reported `Down`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownReason {
    /// The attempt did not finish within the timeout
    Timeout,
    /// Resolution or connection failed
    Failed(String),
}

impl DownReason {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            DownReason::Timeout => "timeout",
            DownReason::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for DownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownReason::Timeout => write!(f, "timed out"),
            DownReason::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Up or down
    pub status: ProbeStatus,

    /// Wall time spent on the attempt
    pub duration: Duration,

    /// Set when `status` is `Down`
    pub reason: Option<DownReason>,
}

impl ProbeResult {
    /// Create an up result
    pub fn up(duration: Duration) -> Self {
        Self {
            status: ProbeStatus::Up,
            duration,
            reason: None,
        }
    }

    /// Create a down result for an attempt that ran out of time
    pub fn timeout(duration: Duration) -> Self {
        Self {
            status: ProbeStatus::Down,
            duration,
            reason: Some(DownReason::Timeout),
        }
    }

    /// Create a down result for a failed attempt
    pub fn failed(duration: Duration, message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Down,
            duration,
            reason: Some(DownReason::Failed(message.into())),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }

    /// Metrics label: `up`, `timeout` or `failed`
    pub fn label(&self) -> &'static str {
        match &self.reason {
            None => "up",
            Some(reason) => reason.label(),
        }
    }
}
