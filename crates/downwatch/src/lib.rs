//! Downwatch - TCP service availability monitor
//!
//! Periodically probes a fixed list of `hostname:port` endpoints, counts
//! consecutive failures and posts a webhook notification when an endpoint
//! crosses the outage threshold. A recovery watcher then re-probes that
//! endpoint on a short interval until it answers again and announces the
//! recovery.
//!
//! # Components
//!
//! - **Poller**: Runs the check cycle and the hourly counter reset
//! - **EndpointStore**: Per-endpoint failure counters and watcher flags
//! - **RecoveryWatcher**: One task per endpoint in outage
//! - **Notify**: Webhook (or log-only) notification delivery
//! - **MetricsServer**: Optional Prometheus endpoint

pub mod clock;
pub mod config;
pub mod context;
pub mod http_server;
pub mod metrics;
pub mod notifier;
pub mod poller;
pub mod reset;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
#[cfg(feature = "test-util")]
pub use clock::ManualClock;
pub use config::{Config, ConfigError};
pub use context::MonitorContext;
pub use http_server::MetricsServer;
pub use metrics::MetricsRegistry;
pub use notifier::{LogNotifier, Notify, WebhookNotifier};
pub use poller::{CycleReport, Poller};
pub use server::MonitorServer;
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use state::{EndpointState, EndpointStore, FailureOutcome, WatcherGuard};
pub use types::{Endpoint, HourlyResetPolicy, MonitorConfig, Notification, NotificationKind};
pub use watcher::{RecoveryWatcher, WatchOutcome};
