//! Recovery watcher: re-probes one down endpoint until it answers again.

use crate::context::MonitorContext;
use crate::state::WatcherGuard;
use crate::types::{Endpoint, Notification};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How a watcher ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Endpoint answered; a recovered notification was sent
    Recovered,
    /// Shutdown was requested first
    Cancelled,
}

/// Watches a single endpoint after an outage
///
/// Owns the endpoint's watcher slot for its whole lifetime. The slot is
/// released when the watcher is dropped, including on panic or abort.
pub struct RecoveryWatcher {
    guard: WatcherGuard,
    ctx: MonitorContext,
}

impl RecoveryWatcher {
    pub fn new(guard: WatcherGuard, ctx: MonitorContext) -> Self {
        Self { guard, ctx }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.guard.endpoint()
    }

    /// Run on the tokio runtime
    pub fn spawn(self) -> JoinHandle<WatchOutcome> {
        tokio::spawn(self.run())
    }

    /// Watch until the endpoint is up or shutdown is requested
    pub async fn run(self) -> WatchOutcome {
        let ctx = self.ctx.clone();
        ctx.update_watcher_gauge();

        let outcome = self.watch().await;

        // `self` (and its guard) is gone by now.
        ctx.update_watcher_gauge();
        outcome
    }

    async fn watch(mut self) -> WatchOutcome {
        let endpoint = self.guard.endpoint().clone();
        let store = self.guard.store().clone();
        let interval = self.ctx.config.recovery_interval;
        let timeout = self.ctx.config.connection_timeout;

        info!(
            endpoint = %endpoint,
            interval_ms = interval.as_millis() as u64,
            "Recovery watcher started"
        );

        let mut attempts: u64 = 0;
        loop {
            // Counts the poller made in the meantime are stale while we watch.
            store.reset(&endpoint);

            if self.ctx.shutdown.sleep(interval).await {
                info!(endpoint = %endpoint, attempts, "Recovery watcher cancelled");
                return WatchOutcome::Cancelled;
            }

            attempts += 1;
            let result = self
                .ctx
                .prober
                .probe(&endpoint.hostname, endpoint.port, timeout)
                .await;

            if let Some(ref m) = self.ctx.metrics {
                m.record_probe(&endpoint, "watcher", &result);
            }

            if result.is_up() {
                let notification = Notification::recovered(self.ctx.clock.now(), endpoint.clone());
                self.ctx.notifier.notify(&notification).await;

                if let Some(ref m) = self.ctx.metrics {
                    m.record_recovery(&endpoint);
                }
                info!(endpoint = %endpoint, attempts, "Service is back UP");
                return WatchOutcome::Recovered;
            }

            debug!(endpoint = %endpoint, attempts, "Endpoint still down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::metrics::MetricsRegistry;
    use crate::notifier::MockNotify;
    use crate::shutdown;
    use crate::state::{EndpointStore, FailureOutcome};
    use crate::testing::ScriptedProber;
    use crate::types::{MonitorConfig, NotificationKind};
    use chrono::TimeZone;
    use probe::ProbeStatus::{Down, Up};
    use std::sync::Arc;
    use std::time::Duration;

    fn claim(store: &Arc<EndpointStore>, endpoint: &Endpoint) -> WatcherGuard {
        loop {
            if let FailureOutcome::Outage(guard) = store.record_failure(endpoint) {
                return guard;
            }
        }
    }

    fn context(
        store: Arc<EndpointStore>,
        prober: Arc<ScriptedProber>,
        notifier: MockNotify,
        shutdown: shutdown::Shutdown,
    ) -> MonitorContext {
        MonitorContext {
            config: MonitorConfig::default(),
            store,
            prober,
            notifier: Arc::new(notifier),
            clock: Arc::new(ManualClock::new(
                chrono::Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(),
            )),
            metrics: Some(Arc::new(MetricsRegistry::new())),
            shutdown,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_recovers_after_down_down_up() {
        let endpoint = Endpoint::new("entiat.ddns.net", 22);
        let store = Arc::new(EndpointStore::new([&endpoint], 3));
        let prober = Arc::new(ScriptedProber::new(vec![Down, Down, Up], Up));

        let mut notifier = MockNotify::new();
        notifier
            .expect_notify()
            .withf(|n: &Notification| {
                n.kind == NotificationKind::Recovered
                    && n.message().contains("entiat.ddns.net")
                    && n.message().contains("back UP")
            })
            .times(1)
            .return_const(());

        let (_trigger, shutdown) = shutdown::channel();
        let ctx = context(store.clone(), prober.clone(), notifier, shutdown);
        let metrics = ctx.metrics.clone().unwrap();

        let watcher = RecoveryWatcher::new(claim(&store, &endpoint), ctx);
        assert!(store.watcher_active(&endpoint));

        let outcome = watcher.spawn().await.unwrap();

        assert_eq!(outcome, WatchOutcome::Recovered);
        assert_eq!(prober.calls(), 3);
        assert!(!store.watcher_active(&endpoint));
        assert_eq!(metrics.recoveries(&endpoint), 1);
        assert_eq!(metrics.watchers_active(), 0);

        // No further probes once recovered.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(prober.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_resets_counter_each_iteration() {
        let endpoint = Endpoint::new("division.ddns.net", 710);
        let store = Arc::new(EndpointStore::new([&endpoint], 3));
        let prober = Arc::new(ScriptedProber::new(vec![], Down));

        let mut notifier = MockNotify::new();
        notifier.expect_notify().times(0);

        let (trigger, shutdown) = shutdown::channel();
        let ctx = context(store.clone(), prober.clone(), notifier, shutdown);
        let handle = RecoveryWatcher::new(claim(&store, &endpoint), ctx).spawn();

        // Poller-side increments racing the watcher
        tokio::time::sleep(Duration::from_millis(5500)).await;
        store.record_failure(&endpoint);
        store.record_failure(&endpoint);
        assert_eq!(store.failures(&endpoint), Some(2));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.failures(&endpoint), Some(0));
        assert!(prober.calls() >= 2);

        trigger.trigger();
        assert_eq!(handle.await.unwrap(), WatchOutcome::Cancelled);
        assert!(!store.watcher_active(&endpoint));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_watcher_releases_slot() {
        let endpoint = Endpoint::new("columbia.ddns.net", 710);
        let store = Arc::new(EndpointStore::new([&endpoint], 3));
        let prober = Arc::new(ScriptedProber::new(vec![], Down));

        let (_trigger, shutdown) = shutdown::channel();
        let ctx = context(store.clone(), prober, MockNotify::new(), shutdown);
        let handle = RecoveryWatcher::new(claim(&store, &endpoint), ctx).spawn();

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(store.watcher_active(&endpoint));

        handle.abort();
        let _ = handle.await;
        assert!(!store.watcher_active(&endpoint));
    }
}
