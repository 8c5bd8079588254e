//! Shared handles passed to the poller and every recovery watcher.

use crate::clock::Clock;
use crate::metrics::MetricsRegistry;
use crate::notifier::Notify;
use crate::shutdown::Shutdown;
use crate::state::EndpointStore;
use crate::types::MonitorConfig;
use probe::Prober;
use std::sync::Arc;

/// Everything a monitoring task needs; cheap to clone
#[derive(Clone)]
pub struct MonitorContext {
    pub config: MonitorConfig,
    pub store: Arc<EndpointStore>,
    pub prober: Arc<dyn Prober>,
    pub notifier: Arc<dyn Notify>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Option<Arc<MetricsRegistry>>,
    pub shutdown: Shutdown,
}

impl MonitorContext {
    pub(crate) fn update_watcher_gauge(&self) {
        if let Some(ref m) = self.metrics {
            m.set_watchers_active(self.store.active_watchers());
        }
    }
}
