//! Main polling loop.
//!
//! Each cycle probes every endpoint in configured order, updates the
//! failure counters, escalates outages to a recovery watcher, applies the
//! hourly reset and then sleeps for the check interval.

use crate::context::MonitorContext;
use crate::reset::HourlyReset;
use crate::state::FailureOutcome;
use crate::types::{Endpoint, Notification};
use crate::watcher::{RecoveryWatcher, WatchOutcome};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What happened during one polling cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Timestamp captured at the start of the cycle
    pub timestamp: DateTime<Utc>,
    /// Endpoints that probed down
    pub down: Vec<Endpoint>,
    /// Endpoints that crossed the threshold and got a watcher
    pub outages: Vec<Endpoint>,
    /// Endpoints that crossed the threshold while already watched
    pub suppressed: Vec<Endpoint>,
    /// Counters zeroed by the hourly reset, if it fired
    pub hourly_reset: Option<usize>,
}

impl CycleReport {
    fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            down: Vec::new(),
            outages: Vec::new(),
            suppressed: Vec::new(),
            hourly_reset: None,
        }
    }
}

/// Polling loop over the configured endpoints
pub struct Poller {
    endpoints: Vec<Endpoint>,
    ctx: MonitorContext,
    hourly: HourlyReset,
    watchers: Vec<JoinHandle<WatchOutcome>>,
}

impl Poller {
    pub fn new(endpoints: Vec<Endpoint>, ctx: MonitorContext) -> Self {
        let hourly = HourlyReset::new(ctx.config.hourly_reset);
        Self {
            endpoints,
            ctx,
            hourly,
            watchers: Vec::new(),
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Run until shutdown, then wait for the watchers to stop
    pub async fn run(mut self) {
        info!(
            endpoints = self.endpoints.len(),
            interval_ms = self.ctx.config.check_interval.as_millis() as u64,
            threshold = self.ctx.config.failure_threshold,
            "Polling loop started"
        );

        let mut shutdown = self.ctx.shutdown.clone();
        while !shutdown.is_shutdown() {
            self.run_cycle().await;

            if shutdown.sleep(self.ctx.config.check_interval).await {
                break;
            }
        }

        info!(watchers = self.watchers.len(), "Polling loop stopping");
        for handle in self.watchers.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Recovery watcher ended abnormally");
            }
        }
        info!("Polling loop stopped");
    }

    /// Probe every endpoint once
    pub async fn run_cycle(&mut self) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::new(self.ctx.clock.now());

        let mut spawned = Vec::new();
        for endpoint in &self.endpoints {
            if let Some(handle) = self.check_endpoint(endpoint, &mut report).await {
                spawned.push(handle);
            }
        }

        self.watchers.retain(|h| !h.is_finished());
        self.watchers.extend(spawned);

        report.hourly_reset = self.hourly.apply(report.timestamp, &self.ctx.store);
        if report.hourly_reset.is_some() {
            if let Some(ref m) = self.ctx.metrics {
                m.record_hourly_reset();
                for endpoint in &self.endpoints {
                    let failures = self.ctx.store.failures(endpoint).unwrap_or(0);
                    m.set_consecutive_failures(endpoint, failures);
                }
            }
        }

        if let Some(ref m) = self.ctx.metrics {
            m.set_watchers_active(self.ctx.store.active_watchers());
            m.record_cycle_duration(start.elapsed());
        }

        debug!(
            down = report.down.len(),
            outages = report.outages.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Polling cycle complete"
        );
        report
    }

    async fn check_endpoint(
        &self,
        endpoint: &Endpoint,
        report: &mut CycleReport,
    ) -> Option<JoinHandle<WatchOutcome>> {
        let ctx = &self.ctx;
        let result = ctx
            .prober
            .probe(&endpoint.hostname, endpoint.port, ctx.config.connection_timeout)
            .await;

        if let Some(ref m) = ctx.metrics {
            m.record_probe(endpoint, "poller", &result);
        }

        if result.is_up() {
            ctx.store.record_success(endpoint);
            if let Some(ref m) = ctx.metrics {
                m.set_consecutive_failures(endpoint, 0);
            }
            return None;
        }

        report.down.push(endpoint.clone());

        match ctx.store.record_failure(endpoint) {
            FailureOutcome::Counting(failures) => {
                debug!(endpoint = %endpoint, failures, "Endpoint down");
                if let Some(ref m) = ctx.metrics {
                    m.set_consecutive_failures(endpoint, failures);
                }
                None
            }
            FailureOutcome::Outage(guard) => {
                warn!(
                    endpoint = %endpoint,
                    threshold = ctx.config.failure_threshold,
                    "Outage detected"
                );
                if let Some(ref m) = ctx.metrics {
                    m.record_outage(endpoint);
                    m.set_consecutive_failures(endpoint, 0);
                }

                let notification = Notification::outage(report.timestamp, endpoint.clone());
                ctx.notifier.notify(&notification).await;
                report.outages.push(endpoint.clone());

                Some(RecoveryWatcher::new(guard, ctx.clone()).spawn())
            }
            FailureOutcome::Suppressed => {
                info!(
                    endpoint = %endpoint,
                    "Failure threshold crossed while a recovery watcher is running"
                );
                if let Some(ref m) = ctx.metrics {
                    m.record_suppressed_outage(endpoint);
                    m.set_consecutive_failures(endpoint, 0);
                }
                report.suppressed.push(endpoint.clone());
                None
            }
        }
    }
}
