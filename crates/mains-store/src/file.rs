//! File-backed marker store
//!
//! Each marker is a single ASCII integer (epoch seconds) at a configured
//! path; absence of the file means the marker is absent. Per-target issued
//! markers live beside the episode sentinel as `<shutdown_flag>.<target>`.

use mains_util::{TargetId, Timestamp};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{MarkerKind, MarkerStore, StoreResult};

/// Configured marker file locations.
#[derive(Debug, Clone)]
pub struct MarkerFiles {
    pub battery_onset: PathBuf,
    pub shutdown_issued: PathBuf,
    pub ac_restore_onset: PathBuf,
    pub last_status: PathBuf,
}

/// File-backed store
pub struct FileMarkerStore {
    files: MarkerFiles,
    targets: Vec<TargetId>,
}

impl FileMarkerStore {
    /// Create a store over the given paths. `targets` is the configured
    /// target list; it bounds the per-target marker files this store manages.
    pub fn new(files: MarkerFiles, targets: Vec<TargetId>) -> Self {
        Self { files, targets }
    }

    fn path(&self, kind: MarkerKind) -> &Path {
        match kind {
            MarkerKind::BatteryOnset => &self.files.battery_onset,
            MarkerKind::ShutdownIssued => &self.files.shutdown_issued,
            MarkerKind::AcRestoreOnset => &self.files.ac_restore_onset,
            MarkerKind::LastStatus => &self.files.last_status,
        }
    }

    fn target_path(&self, target: &TargetId) -> PathBuf {
        let mut os = self.files.shutdown_issued.as_os_str().to_os_string();
        os.push(".");
        os.push(target.as_file_stem());
        PathBuf::from(os)
    }

    fn read_marker(path: &Path) -> Option<Timestamp> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read marker, treating as absent");
                return None;
            }
        };

        match content.trim().parse::<i64>() {
            Ok(secs) => Some(Timestamp::from_secs(secs)),
            Err(_) => {
                warn!(path = %path.display(), "Corrupt marker content, treating as absent");
                None
            }
        }
    }

    fn write_marker(path: &Path, ts: Timestamp) -> StoreResult<()> {
        fs::write(path, format!("{}\n", ts.as_secs()))?;
        Ok(())
    }

    fn remove_marker(path: &Path) -> StoreResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl MarkerStore for FileMarkerStore {
    fn get(&self, kind: MarkerKind) -> Option<Timestamp> {
        Self::read_marker(self.path(kind))
    }

    fn set(&self, kind: MarkerKind, ts: Timestamp) -> StoreResult<()> {
        Self::write_marker(self.path(kind), ts)
    }

    fn clear(&self, kind: MarkerKind) -> StoreResult<()> {
        Self::remove_marker(self.path(kind))
    }

    fn target_issued(&self, target: &TargetId) -> Option<Timestamp> {
        Self::read_marker(&self.target_path(target))
    }

    fn set_target_issued(&self, target: &TargetId, ts: Timestamp) -> StoreResult<()> {
        Self::write_marker(&self.target_path(target), ts)
    }

    fn issued_targets(&self) -> BTreeSet<TargetId> {
        self.targets
            .iter()
            .filter(|t| self.target_issued(t).is_some())
            .cloned()
            .collect()
    }

    fn clear_episode(&self) -> StoreResult<()> {
        self.clear(MarkerKind::BatteryOnset)?;
        self.clear(MarkerKind::ShutdownIssued)?;
        self.clear(MarkerKind::AcRestoreOnset)?;
        for target in &self.targets {
            Self::remove_marker(&self.target_path(target))?;
        }
        debug!("Episode markers cleared");
        Ok(())
    }

    fn clear_all(&self) -> StoreResult<()> {
        self.clear_episode()?;
        self.clear(MarkerKind::LastStatus)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_store(dir: &TempDir) -> FileMarkerStore {
        let files = MarkerFiles {
            battery_onset: dir.path().join("battery_onset"),
            shutdown_issued: dir.path().join("shutdown_issued"),
            ac_restore_onset: dir.path().join("ac_restore"),
            last_status: dir.path().join("last_status"),
        };
        let targets = vec![
            TargetId::new("root", "nas"),
            TargetId::new("root", "backup"),
        ];
        FileMarkerStore::new(files, targets)
    }

    #[test]
    fn set_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        let ts = Timestamp::from_secs(1_700_000_000);
        store.set(MarkerKind::BatteryOnset, ts).unwrap();
        assert_eq!(store.get(MarkerKind::BatteryOnset), Some(ts));
    }

    #[test]
    fn missing_marker_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        assert_eq!(store.get(MarkerKind::ShutdownIssued), None);
    }

    #[test]
    fn corrupt_marker_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        fs::write(dir.path().join("battery_onset"), "not a number\n").unwrap();
        assert_eq!(store.get(MarkerKind::BatteryOnset), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store.clear(MarkerKind::AcRestoreOnset).unwrap();
        store
            .set(MarkerKind::AcRestoreOnset, Timestamp::from_secs(5))
            .unwrap();
        store.clear(MarkerKind::AcRestoreOnset).unwrap();
        store.clear(MarkerKind::AcRestoreOnset).unwrap();
        assert_eq!(store.get(MarkerKind::AcRestoreOnset), None);
    }

    #[test]
    fn per_target_markers_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        let nas = TargetId::new("root", "nas");
        let backup = TargetId::new("root", "backup");

        store
            .set_target_issued(&nas, Timestamp::from_secs(100))
            .unwrap();

        assert!(store.target_issued(&nas).is_some());
        assert!(store.target_issued(&backup).is_none());
        assert_eq!(store.issued_targets().len(), 1);
    }

    #[test]
    fn clear_episode_clears_markers_and_targets_together() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        let ts = Timestamp::from_secs(42);

        store.set(MarkerKind::BatteryOnset, ts).unwrap();
        store.set(MarkerKind::ShutdownIssued, ts).unwrap();
        store.set(MarkerKind::AcRestoreOnset, ts).unwrap();
        store.set(MarkerKind::LastStatus, ts).unwrap();
        store
            .set_target_issued(&TargetId::new("root", "nas"), ts)
            .unwrap();

        store.clear_episode().unwrap();

        assert_eq!(store.get(MarkerKind::BatteryOnset), None);
        assert_eq!(store.get(MarkerKind::ShutdownIssued), None);
        assert_eq!(store.get(MarkerKind::AcRestoreOnset), None);
        assert!(store.issued_targets().is_empty());

        // The status heartbeat survives an episode reset
        assert_eq!(store.get(MarkerKind::LastStatus), Some(ts));
    }

    #[test]
    fn clear_all_clears_status_too() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        let ts = Timestamp::from_secs(42);

        store.set(MarkerKind::LastStatus, ts).unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.get(MarkerKind::LastStatus), None);
    }

    #[test]
    fn view_reads_all_decision_markers() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);

        store
            .set(MarkerKind::BatteryOnset, Timestamp::from_secs(10))
            .unwrap();
        store
            .set_target_issued(&TargetId::new("root", "nas"), Timestamp::from_secs(20))
            .unwrap();

        let view = crate::MarkerView::read(&store);
        assert_eq!(view.battery_onset, Some(Timestamp::from_secs(10)));
        assert_eq!(view.shutdown_issued, None);
        assert!(view.episode_pending());
        assert_eq!(view.issued_targets.len(), 1);
    }
}
