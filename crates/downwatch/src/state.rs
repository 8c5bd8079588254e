//! Per-endpoint failure counters shared by the poller and recovery watchers.
//!
//! Every read-modify-write of one endpoint happens under that entry's
//! `DashMap` shard lock, so concurrent writers never lose updates. The
//! outage transition resets the counter and claims the endpoint's watcher
//! slot in the same critical section; the slot is released when the
//! returned [`WatcherGuard`] is dropped.

use crate::types::{Endpoint, HourlyResetPolicy};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// State of a single endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointState {
    pub consecutive_failures: u32,
    pub watcher_active: bool,
}

/// Result of recording a failed probe
#[derive(Debug)]
pub enum FailureOutcome {
    /// Still at or below the threshold
    Counting(u32),
    /// Threshold crossed and no watcher was running; the caller owns the slot
    Outage(WatcherGuard),
    /// Threshold crossed while a watcher is already running
    Suppressed,
}

/// Shared endpoint state store
#[derive(Debug)]
pub struct EndpointStore {
    entries: DashMap<Endpoint, EndpointState>,
    failure_threshold: u32,
}

impl EndpointStore {
    /// Create a store with a zeroed record for each endpoint
    pub fn new<'a>(endpoints: impl IntoIterator<Item = &'a Endpoint>, failure_threshold: u32) -> Self {
        let entries = DashMap::new();
        for endpoint in endpoints {
            entries.insert(endpoint.clone(), EndpointState::default());
        }
        Self {
            entries,
            failure_threshold,
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Count a failed probe.
    ///
    /// When the count exceeds the threshold it is reset to zero. If no
    /// watcher is active the slot is claimed and returned as a guard.
    pub fn record_failure(self: &Arc<Self>, endpoint: &Endpoint) -> FailureOutcome {
        let claimed = {
            let mut entry = self.entries.entry(endpoint.clone()).or_default();
            entry.consecutive_failures += 1;

            if entry.consecutive_failures <= self.failure_threshold {
                return FailureOutcome::Counting(entry.consecutive_failures);
            }

            entry.consecutive_failures = 0;
            if entry.watcher_active {
                false
            } else {
                entry.watcher_active = true;
                true
            }
        };

        if claimed {
            FailureOutcome::Outage(WatcherGuard {
                store: Arc::clone(self),
                endpoint: endpoint.clone(),
            })
        } else {
            FailureOutcome::Suppressed
        }
    }

    /// Count a successful probe
    pub fn record_success(&self, endpoint: &Endpoint) {
        self.reset(endpoint);
    }

    /// Zero one endpoint's counter
    pub fn reset(&self, endpoint: &Endpoint) {
        if let Some(mut entry) = self.entries.get_mut(endpoint) {
            entry.consecutive_failures = 0;
        }
    }

    /// Zero counters according to `policy`, returning how many were touched
    pub fn reset_all(&self, policy: HourlyResetPolicy) -> usize {
        let mut touched = 0;
        for mut entry in self.entries.iter_mut() {
            let skip = match policy {
                HourlyResetPolicy::All => false,
                HourlyResetPolicy::SkipWatched => entry.watcher_active,
                HourlyResetPolicy::Disabled => true,
            };
            if !skip {
                entry.consecutive_failures = 0;
                touched += 1;
            }
        }
        touched
    }

    /// Current failure count, if the endpoint is known
    pub fn failures(&self, endpoint: &Endpoint) -> Option<u32> {
        self.entries.get(endpoint).map(|e| e.consecutive_failures)
    }

    pub fn watcher_active(&self, endpoint: &Endpoint) -> bool {
        self.entries
            .get(endpoint)
            .map(|e| e.watcher_active)
            .unwrap_or(false)
    }

    /// Number of endpoints with a running watcher
    pub fn active_watchers(&self) -> usize {
        self.entries.iter().filter(|e| e.watcher_active).count()
    }

    pub fn snapshot(&self, endpoint: &Endpoint) -> Option<EndpointState> {
        self.entries.get(endpoint).map(|e| *e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn release(&self, endpoint: &Endpoint) {
        if let Some(mut entry) = self.entries.get_mut(endpoint) {
            entry.watcher_active = false;
        }
    }
}

/// Ownership of an endpoint's watcher slot
///
/// Dropping the guard marks the endpoint as having no active watcher,
/// whichever way the owning task ends.
#[derive(Debug)]
pub struct WatcherGuard {
    store: Arc<EndpointStore>,
    endpoint: Endpoint,
}

impl WatcherGuard {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn store(&self) -> &Arc<EndpointStore> {
        &self.store
    }
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        debug!(endpoint = %self.endpoint, "Releasing recovery watcher slot");
        self.store.release(&self.endpoint);
    }
}
