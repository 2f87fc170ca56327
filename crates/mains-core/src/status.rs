//! Status reporter
//!
//! Logs the observed power state on its own interval, independent of the
//! decision outcome, and persists a heartbeat marker so an external health
//! check can tell the daemon is alive.

use mains_host_api::PowerSample;
use mains_store::{MarkerKind, MarkerStore};
use mains_util::Timestamp;
use std::time::Duration;
use tracing::{info, warn};

pub struct StatusReporter {
    interval: Duration,
}

impl StatusReporter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Log the latest observation and refresh the heartbeat marker. A
    /// failed heartbeat write is logged and otherwise ignored; status has
    /// no decision impact.
    pub fn report(&self, store: &dyn MarkerStore, sample: &PowerSample, now: Timestamp) {
        info!(
            percent = sample.percent,
            source = %sample.source,
            "Power status"
        );

        if let Err(e) = store.set(MarkerKind::LastStatus, now) {
            warn!(error = %e, "Failed to write status heartbeat");
        }
    }
}
