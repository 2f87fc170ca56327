//! Marker store trait definitions

use mains_util::{TargetId, Timestamp};
use std::collections::BTreeSet;

use crate::StoreResult;

/// The durable decision markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// Moment the current battery episode was first observed.
    BatteryOnset,

    /// Episode-level sentinel: at least one target has been shut down.
    ShutdownIssued,

    /// Moment AC power was first observed again while an episode was pending.
    AcRestoreOnset,

    /// Status heartbeat. Write-only, no decision impact.
    LastStatus,
}

/// Durable key→timestamp storage surviving process restarts.
///
/// A single daemon instance is the only writer; an external operator may read
/// concurrently, and last-write-wins is acceptable.
pub trait MarkerStore: Send + Sync {
    /// Read a marker. Missing or corrupt content is absence, never an error.
    fn get(&self, kind: MarkerKind) -> Option<Timestamp>;

    /// Write a marker, overwriting any previous value.
    fn set(&self, kind: MarkerKind, ts: Timestamp) -> StoreResult<()>;

    /// Delete a marker. Deleting an absent marker is not an error.
    fn clear(&self, kind: MarkerKind) -> StoreResult<()>;

    // Per-target issued markers

    /// When the shutdown command last succeeded against this target, if ever
    /// in the current episode.
    fn target_issued(&self, target: &TargetId) -> Option<Timestamp>;

    /// Record a successful shutdown of this target.
    fn set_target_issued(&self, target: &TargetId, ts: Timestamp) -> StoreResult<()>;

    /// All targets issued in the current episode.
    fn issued_targets(&self) -> BTreeSet<TargetId>;

    // Reset boundaries

    /// Full episode reset: the three decision markers and the per-target
    /// issued set are cleared together, never partially.
    fn clear_episode(&self) -> StoreResult<()>;

    /// Clear everything, status heartbeat included. Terminate-cleanup path.
    fn clear_all(&self) -> StoreResult<()>;
}

/// Snapshot of the decision markers, read back at the start of every tick and
/// handed to the engine. The engine never touches the store directly.
#[derive(Debug, Clone, Default)]
pub struct MarkerView {
    pub battery_onset: Option<Timestamp>,
    pub shutdown_issued: Option<Timestamp>,
    pub ac_restore_onset: Option<Timestamp>,
    pub issued_targets: BTreeSet<TargetId>,
}

impl MarkerView {
    pub fn read(store: &dyn MarkerStore) -> Self {
        Self {
            battery_onset: store.get(MarkerKind::BatteryOnset),
            shutdown_issued: store.get(MarkerKind::ShutdownIssued),
            ac_restore_onset: store.get(MarkerKind::AcRestoreOnset),
            issued_targets: store.issued_targets(),
        }
    }

    /// A battery episode is pending once either the onset or the issued
    /// sentinel exists; it ends only via a full reset.
    pub fn episode_pending(&self) -> bool {
        self.battery_onset.is_some() || self.shutdown_issued.is_some()
    }
}
