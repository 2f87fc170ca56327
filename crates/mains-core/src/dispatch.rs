//! Shutdown dispatcher
//!
//! Per-target idempotence lives here: every configured target receives the
//! shutdown command once per episode, independent of ordering or earlier
//! failures. Issued state is tracked per target — a single shared flag would
//! silently skip every target after the first success.

use mains_host_api::{ExecError, RemoteExecutor};
use mains_store::{MarkerKind, MarkerStore};
use mains_util::{TargetId, Timestamp};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::DispatchRequest;

/// Result of one dispatch pass
#[derive(Debug, Default)]
pub struct DispatchSummary {
    /// Targets whose shutdown call succeeded this pass
    pub issued: Vec<TargetId>,

    /// Targets whose shutdown call failed; left unissued so a later
    /// episode-terminating tick retries them
    pub failed: Vec<(TargetId, ExecError)>,
}

/// Dispatches shutdown requests to the remote executor
pub struct ShutdownDispatcher {
    executor: Arc<dyn RemoteExecutor>,
    store: Arc<dyn MarkerStore>,
}

impl ShutdownDispatcher {
    pub fn new(executor: Arc<dyn RemoteExecutor>, store: Arc<dyn MarkerStore>) -> Self {
        Self { executor, store }
    }

    /// Invoke the remote shutdown for every requested target not already
    /// issued. Successes are persisted immediately, target by target, so a
    /// crash mid-pass never re-notifies a finished target.
    pub async fn dispatch(&self, request: &DispatchRequest, now: Timestamp) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for target in &request.targets {
            // Recheck the store; the request was computed from a snapshot
            if self.store.target_issued(target).is_some() {
                continue;
            }

            match self.executor.shutdown(target).await {
                Ok(()) => {
                    info!(target = %target, reason = %request.reason, "Shutdown issued");

                    if let Err(e) = self.store.set_target_issued(target, now) {
                        error!(target = %target, error = %e, "Failed to persist issued marker");
                    }
                    // First success of the episode also sets the sentinel
                    if self.store.get(MarkerKind::ShutdownIssued).is_none()
                        && let Err(e) = self.store.set(MarkerKind::ShutdownIssued, now)
                    {
                        error!(error = %e, "Failed to persist shutdown sentinel");
                    }

                    summary.issued.push(target.clone());
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "Remote shutdown failed, leaving unissued");
                    summary.failed.push((target.clone(), e));
                }
            }
        }

        summary
    }
}
