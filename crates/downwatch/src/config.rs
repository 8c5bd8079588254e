//! Configuration loading and validation for the monitor

use crate::types::{Endpoint, HourlyResetPolicy, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "DOWNWATCH_CONFIG";

/// Environment variable overriding `notifier.webhook_url`
pub const WEBHOOK_URL_ENV: &str = "DOWNWATCH_WEBHOOK_URL";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found in search paths")]
    FileNotFound,

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub endpoints: Vec<EndpointSettings>,

    #[serde(default)]
    pub monitor: MonitorSettings,

    #[serde(default)]
    pub notifier: NotifierSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.endpoints.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("endpoints", ValidationError::new("endpoints_empty"));
            return Err(errors);
        }
        for endpoint in &self.endpoints {
            endpoint.validate()?;
        }
        validate_unique_endpoints(&self.endpoints)?;
        self.monitor.validate()?;
        self.notifier.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

/// One monitored endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EndpointSettings {
    #[validate(custom = "validate_hostname")]
    pub hostname: String,

    #[validate(range(min = 1))]
    pub port: u16,
}

/// Polling and escalation settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MonitorSettings {
    #[validate(range(max = 1000))]
    pub failure_threshold: u32,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_check_interval")]
    pub check_interval: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_recovery_interval")]
    pub recovery_interval: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_connection_timeout")]
    pub connection_timeout: Duration,

    /// Bound for hostname resolution, outside the connection timeout
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_resolve_timeout")]
    pub resolve_timeout: Duration,

    pub hourly_reset: HourlyResetPolicy,
}

/// Webhook settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotifierSettings {
    /// Empty means log-only delivery
    #[validate(custom = "validate_webhook_url")]
    pub webhook_url: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_request_timeout")]
    pub request_timeout: Duration,
}

/// Metrics endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,

    #[validate(length(min = 1))]
    pub listen_addr: String,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations

impl Default for MonitorSettings {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            check_interval: defaults.check_interval,
            recovery_interval: defaults.recovery_interval,
            connection_timeout: defaults.connection_timeout,
            resolve_timeout: probe::DEFAULT_RESOLVE_TIMEOUT,
            hourly_reset: defaults.hourly_reset,
        }
    }
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9464".to_string(),
        }
    }
}

// Custom validators

fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    let trimmed = hostname.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("hostname_empty"));
    }
    if trimmed.len() != hostname.len() || hostname.contains(char::is_whitespace) {
        return Err(ValidationError::new("hostname_whitespace"));
    }
    Ok(())
}

fn validate_unique_endpoints(endpoints: &[EndpointSettings]) -> Result<(), ValidationErrors> {
    let mut seen = std::collections::HashSet::new();
    for endpoint in endpoints {
        if !seen.insert((endpoint.hostname.as_str(), endpoint.port)) {
            let mut errors = ValidationErrors::new();
            errors.add("endpoints", ValidationError::new("endpoint_duplicate"));
            return Err(errors);
        }
    }
    Ok(())
}

fn validate_duration_range(
    value: &Duration,
    min: Duration,
    max: Duration,
    code: &'static str,
) -> Result<(), ValidationError> {
    if *value < min || *value > max {
        return Err(ValidationError::new(code));
    }
    Ok(())
}

fn validate_check_interval(interval: &Duration) -> Result<(), ValidationError> {
    validate_duration_range(
        interval,
        Duration::from_secs(1),
        Duration::from_secs(3600),
        "check_interval_out_of_range",
    )
}

fn validate_recovery_interval(interval: &Duration) -> Result<(), ValidationError> {
    validate_duration_range(
        interval,
        Duration::from_millis(100),
        Duration::from_secs(3600),
        "recovery_interval_out_of_range",
    )
}

fn validate_connection_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    validate_duration_range(
        timeout,
        Duration::from_millis(10),
        Duration::from_secs(60),
        "connection_timeout_out_of_range",
    )
}

fn validate_resolve_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    validate_duration_range(
        timeout,
        Duration::from_millis(10),
        Duration::from_secs(60),
        "resolve_timeout_out_of_range",
    )
}

fn validate_request_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    validate_duration_range(
        timeout,
        Duration::from_millis(100),
        Duration::from_secs(120),
        "request_timeout_out_of_range",
    )
}

fn validate_webhook_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Ok(());
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ValidationError::new("webhook_url_scheme"))?;
    if rest.is_empty() || rest.starts_with('/') || url.contains(char::is_whitespace) {
        return Err(ValidationError::new("webhook_url_invalid"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from `$DOWNWATCH_CONFIG` or the default search paths
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::find_config_file().ok_or(ConfigError::FileNotFound)?,
        };
        tracing::info!("Loading configuration from: {}", path.display());
        Self::load_from_file(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents, std::env::var(WEBHOOK_URL_ENV).ok())
    }

    /// Parse and validate YAML, applying an optional webhook override
    pub fn from_yaml(contents: &str, webhook_override: Option<String>) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(contents)?;
        if let Some(url) = webhook_override.filter(|u| !u.trim().is_empty()) {
            config.notifier.webhook_url = url.trim().to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/downwatch/downwatch.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./downwatch.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/downwatch/downwatch.yaml"))
    }

    /// Endpoints in configured order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints
            .iter()
            .map(|e| Endpoint::new(e.hostname.clone(), e.port))
            .collect()
    }

    /// Convert to the runtime monitor parameters
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            failure_threshold: self.monitor.failure_threshold,
            check_interval: self.monitor.check_interval,
            recovery_interval: self.monitor.recovery_interval,
            connection_timeout: self.monitor.connection_timeout,
            hourly_reset: self.monitor.hourly_reset,
        }
    }
}
