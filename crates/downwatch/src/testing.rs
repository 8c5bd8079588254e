//! Test doubles for the probe and notification seams.

use crate::notifier::Notify;
use crate::types::{Endpoint, Notification, NotificationKind};
use async_trait::async_trait;
use probe::{ProbeResult, ProbeStatus, Prober};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Plays back a fixed sequence of statuses, then repeats `fallback`
pub struct ScriptedProber {
    script: Mutex<VecDeque<ProbeStatus>>,
    fallback: ProbeStatus,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(script: Vec<ProbeStatus>, fallback: ProbeStatus) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn result_for(status: ProbeStatus) -> ProbeResult {
    match status {
        ProbeStatus::Up => ProbeResult::up(Duration::from_millis(1)),
        ProbeStatus::Down => ProbeResult::timeout(Duration::from_millis(200)),
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _hostname: &str, _port: u16, _timeout: Duration) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        result_for(status)
    }
}

/// Fixed status per hostname; unknown hosts are up
#[derive(Default)]
pub struct HostTableProber {
    statuses: Mutex<HashMap<String, ProbeStatus>>,
}

impl HostTableProber {
    pub fn set(&self, hostname: &str, status: ProbeStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(hostname.to_string(), status);
    }
}

#[async_trait]
impl Prober for HostTableProber {
    async fn probe(&self, hostname: &str, _port: u16, _timeout: Duration) -> ProbeResult {
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(hostname)
            .copied()
            .unwrap_or(ProbeStatus::Up);
        result_for(status)
    }
}

/// Keeps every notification it is handed
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &Endpoint, kind: NotificationKind) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| &n.endpoint == endpoint && n.kind == kind)
            .count()
    }
}

#[async_trait]
impl Notify for RecordingNotifier {
    async fn notify(&self, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.clone());
    }
}
