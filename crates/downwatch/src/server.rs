//! Wires configuration into a running monitor.

use crate::clock::SystemClock;
use crate::config::Config;
use crate::context::MonitorContext;
use crate::http_server::MetricsServer;
use crate::metrics::MetricsRegistry;
use crate::notifier::{LogNotifier, Notify, WebhookNotifier};
use crate::poller::Poller;
use crate::shutdown::Shutdown;
use crate::state::EndpointStore;
use probe::TcpProber;
use std::sync::Arc;
use tracing::{info, warn};

/// Monitor process: poller, recovery watchers and optional metrics endpoint
pub struct MonitorServer {
    config: Config,
}

impl MonitorServer {
    /// Create a new monitor server
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn build_notifier(
        &self,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> common::Result<Arc<dyn Notify>> {
        let settings = &self.config.notifier;
        if settings.webhook_url.is_empty() {
            warn!("No webhook URL configured; notifications will only be logged");
            return Ok(Arc::new(LogNotifier));
        }

        let notifier =
            WebhookNotifier::new(settings.webhook_url.clone(), settings.request_timeout, metrics)?;
        Ok(Arc::new(notifier))
    }

    /// Run until `shutdown` fires
    pub async fn run(self, shutdown: Shutdown) -> common::Result<()> {
        let monitor_config = self.config.to_monitor_config();
        let endpoints = self.config.endpoints();

        info!(
            endpoints = endpoints.len(),
            threshold = monitor_config.failure_threshold,
            check_interval_ms = monitor_config.check_interval.as_millis() as u64,
            recovery_interval_ms = monitor_config.recovery_interval.as_millis() as u64,
            hourly_reset = ?monitor_config.hourly_reset,
            "Starting downwatch"
        );

        let metrics = if self.config.metrics.enabled {
            info!("Metrics enabled on {}", self.config.metrics.listen_addr);
            Some(Arc::new(MetricsRegistry::new()))
        } else {
            info!("Metrics disabled");
            None
        };

        let notifier = self.build_notifier(metrics.clone())?;
        let store = Arc::new(EndpointStore::new(
            &endpoints,
            monitor_config.failure_threshold,
        ));

        let ctx = MonitorContext {
            config: monitor_config,
            store,
            prober: Arc::new(
                TcpProber::new().with_resolve_timeout(self.config.monitor.resolve_timeout),
            ),
            notifier,
            clock: Arc::new(SystemClock),
            metrics: metrics.clone(),
            shutdown: shutdown.clone(),
        };

        // A metrics endpoint failure is logged but does not stop monitoring.
        let metrics_handle = metrics.map(|registry| {
            let server = MetricsServer::new(registry, self.config.metrics.listen_addr.clone());
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = server.run(shutdown).await {
                    warn!(error = %e, "Metrics server error");
                }
            })
        });

        let poller = Poller::new(endpoints, ctx);
        if let Err(e) = tokio::spawn(poller.run()).await {
            warn!(error = %e, "Polling loop ended abnormally");
        }

        if let Some(handle) = metrics_handle {
            let _ = handle.await;
        }

        info!("Downwatch stopped");
        Ok(())
    }
}
