//! Top-of-the-hour counter reset, evaluated at the end of each polling cycle.

use crate::state::EndpointStore;
use crate::types::HourlyResetPolicy;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use tracing::info;

/// Remembers which hour was last reset so minute 0 fires at most once
#[derive(Debug, Clone)]
pub struct HourlyReset {
    policy: HourlyResetPolicy,
    last_reset: Option<(NaiveDate, u32)>,
}

impl HourlyReset {
    pub fn new(policy: HourlyResetPolicy) -> Self {
        Self {
            policy,
            last_reset: None,
        }
    }

    pub fn policy(&self) -> HourlyResetPolicy {
        self.policy
    }

    /// Reset counters if `now` is in minute 0 of an hour not yet reset.
    ///
    /// Returns the number of counters zeroed, or `None` if nothing fired.
    pub fn apply(&mut self, now: DateTime<Utc>, store: &EndpointStore) -> Option<usize> {
        if self.policy == HourlyResetPolicy::Disabled || now.minute() != 0 {
            return None;
        }

        let hour = (now.date_naive(), now.hour());
        if self.last_reset == Some(hour) {
            return None;
        }
        self.last_reset = Some(hour);

        let touched = store.reset_all(self.policy);
        info!(
            counters = touched,
            policy = ?self.policy,
            "Hourly failure counter reset"
        );
        Some(touched)
    }
}
