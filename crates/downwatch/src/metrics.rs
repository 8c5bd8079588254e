//! Prometheus metrics for the monitor.

use crate::types::{Endpoint, NotificationKind};
use probe::ProbeResult;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for per-endpoint metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EndpointLabels {
    /// `host:port`
    pub endpoint: String,
}

/// Labels for probe results
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProbeLabels {
    /// `host:port`
    pub endpoint: String,
    /// Which task probed (poller, watcher)
    pub source: String,
    /// Result (up, timeout, failed)
    pub result: String,
}

/// Labels for notification delivery
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct NotificationLabels {
    /// outage, recovered
    pub kind: String,
    /// sent, failed
    pub result: String,
}

fn probe_duration_histogram() -> Histogram {
    // 1ms .. ~8s
    Histogram::new(exponential_buckets(0.001, 2.0, 14))
}

/// Metrics registry with all monitor metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    probes_total: Family<ProbeLabels, Counter>,
    probe_duration_seconds: Family<EndpointLabels, Histogram>,
    consecutive_failures: Family<EndpointLabels, Gauge>,
    outages_total: Family<EndpointLabels, Counter>,
    outages_suppressed_total: Family<EndpointLabels, Counter>,
    recoveries_total: Family<EndpointLabels, Counter>,
    watchers_active: Gauge,
    notifications_total: Family<NotificationLabels, Counter>,
    hourly_resets_total: Counter,
    cycle_duration_seconds: Histogram,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probes_total = Family::<ProbeLabels, Counter>::default();
        registry.register(
            "downwatch_probes",
            "Total probes performed",
            probes_total.clone(),
        );

        let probe_duration_seconds =
            Family::<EndpointLabels, Histogram>::new_with_constructor(probe_duration_histogram as fn() -> Histogram);
        registry.register(
            "downwatch_probe_duration_seconds",
            "Probe duration in seconds",
            probe_duration_seconds.clone(),
        );

        let consecutive_failures = Family::<EndpointLabels, Gauge>::default();
        registry.register(
            "downwatch_consecutive_failures",
            "Current consecutive failure count",
            consecutive_failures.clone(),
        );

        let outages_total = Family::<EndpointLabels, Counter>::default();
        registry.register(
            "downwatch_outages",
            "Outage events that notified and started a recovery watcher",
            outages_total.clone(),
        );

        let outages_suppressed_total = Family::<EndpointLabels, Counter>::default();
        registry.register(
            "downwatch_outages_suppressed",
            "Threshold crossings ignored because a watcher was already running",
            outages_suppressed_total.clone(),
        );

        let recoveries_total = Family::<EndpointLabels, Counter>::default();
        registry.register(
            "downwatch_recoveries",
            "Endpoints seen back up by a recovery watcher",
            recoveries_total.clone(),
        );

        let watchers_active = Gauge::default();
        registry.register(
            "downwatch_watchers_active",
            "Number of running recovery watchers",
            watchers_active.clone(),
        );

        let notifications_total = Family::<NotificationLabels, Counter>::default();
        registry.register(
            "downwatch_notifications",
            "Webhook notifications by kind and delivery result",
            notifications_total.clone(),
        );

        let hourly_resets_total = Counter::default();
        registry.register(
            "downwatch_hourly_resets",
            "Hourly counter resets applied",
            hourly_resets_total.clone(),
        );

        let cycle_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.0, 14));
        registry.register(
            "downwatch_cycle_duration_seconds",
            "Polling cycle duration (excluding the sleep)",
            cycle_duration_seconds.clone(),
        );

        Self {
            registry,
            probes_total,
            probe_duration_seconds,
            consecutive_failures,
            outages_total,
            outages_suppressed_total,
            recoveries_total,
            watchers_active,
            notifications_total,
            hourly_resets_total,
            cycle_duration_seconds,
        }
    }

    fn endpoint_labels(endpoint: &Endpoint) -> EndpointLabels {
        EndpointLabels {
            endpoint: endpoint.to_string(),
        }
    }

    /// Record a probe result
    pub fn record_probe(&self, endpoint: &Endpoint, source: &str, result: &ProbeResult) {
        self.probes_total
            .get_or_create(&ProbeLabels {
                endpoint: endpoint.to_string(),
                source: source.to_string(),
                result: result.label().to_string(),
            })
            .inc();

        self.probe_duration_seconds
            .get_or_create(&Self::endpoint_labels(endpoint))
            .observe(result.duration.as_secs_f64());
    }

    pub fn set_consecutive_failures(&self, endpoint: &Endpoint, failures: u32) {
        self.consecutive_failures
            .get_or_create(&Self::endpoint_labels(endpoint))
            .set(failures as i64);
    }

    pub fn record_outage(&self, endpoint: &Endpoint) {
        self.outages_total
            .get_or_create(&Self::endpoint_labels(endpoint))
            .inc();
    }

    pub fn record_suppressed_outage(&self, endpoint: &Endpoint) {
        self.outages_suppressed_total
            .get_or_create(&Self::endpoint_labels(endpoint))
            .inc();
    }

    pub fn record_recovery(&self, endpoint: &Endpoint) {
        self.recoveries_total
            .get_or_create(&Self::endpoint_labels(endpoint))
            .inc();
    }

    pub fn set_watchers_active(&self, count: usize) {
        self.watchers_active.set(count as i64);
    }

    pub fn record_notification(&self, kind: NotificationKind, result: &str) {
        self.notifications_total
            .get_or_create(&NotificationLabels {
                kind: kind.as_str().to_string(),
                result: result.to_string(),
            })
            .inc();
    }

    pub fn record_hourly_reset(&self) {
        self.hourly_resets_total.inc();
    }

    pub fn record_cycle_duration(&self, duration: Duration) {
        self.cycle_duration_seconds.observe(duration.as_secs_f64());
    }

    // Read accessors, mainly for tests and the status log line.

    pub fn probes(&self, endpoint: &Endpoint, source: &str, result: &str) -> u64 {
        self.probes_total
            .get_or_create(&ProbeLabels {
                endpoint: endpoint.to_string(),
                source: source.to_string(),
                result: result.to_string(),
            })
            .get()
    }

    pub fn outages(&self, endpoint: &Endpoint) -> u64 {
        self.outages_total
            .get_or_create(&Self::endpoint_labels(endpoint))
            .get()
    }

    pub fn suppressed_outages(&self, endpoint: &Endpoint) -> u64 {
        self.outages_suppressed_total
            .get_or_create(&Self::endpoint_labels(endpoint))
            .get()
    }

    pub fn recoveries(&self, endpoint: &Endpoint) -> u64 {
        self.recoveries_total
            .get_or_create(&Self::endpoint_labels(endpoint))
            .get()
    }

    pub fn notifications(&self, kind: NotificationKind, result: &str) -> u64 {
        self.notifications_total
            .get_or_create(&NotificationLabels {
                kind: kind.as_str().to_string(),
                result: result.to_string(),
            })
            .get()
    }

    pub fn watchers_active(&self) -> i64 {
        self.watchers_active.get()
    }

    pub fn hourly_resets(&self) -> u64 {
        self.hourly_resets_total.get()
    }
}
