//! Validated configuration structures

use crate::schema::{RawConfig, RawTarget};
use mains_util::{default_state_dir, TargetId};
use std::path::PathBuf;
use std::time::Duration;

/// Default battery grace period, minutes
pub const DEFAULT_GRACE_MINUTES: u64 = 25;

/// Default poll interval, seconds
pub const DEFAULT_SLEEP_INTERVAL: u64 = 60;

/// Default status heartbeat interval, seconds
pub const DEFAULT_STATUS_INTERVAL: u64 = 3600;

/// Default critical charge threshold, percent
pub const DEFAULT_MIN_BATTERY: u8 = 10;

/// Default AC stability debounce, seconds
pub const DEFAULT_AC_STABLE_TIME: u64 = 300;

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone)]
pub struct Config {
    /// Battery-onset marker path
    pub battery_file: PathBuf,

    /// Shutdown-issued marker path
    pub shutdown_flag: PathBuf,

    /// Status heartbeat marker path
    pub status_file: PathBuf,

    /// AC-restore-onset marker path
    pub ac_restore_file: PathBuf,

    /// Episode journal path
    pub journal_file: PathBuf,

    /// Battery grace period
    pub grace: Duration,

    /// Poll interval
    pub poll_interval: Duration,

    /// Status heartbeat interval
    pub status_interval: Duration,

    /// Critical charge threshold, percent
    pub low_battery: u8,

    /// AC stability debounce. Zero cancels immediately on AC restoration.
    pub ac_stable: Duration,

    /// Ordered shutdown target list
    pub targets: Vec<Target>,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let state_dir = default_state_dir();
        let general = raw.general;

        Self {
            battery_file: general
                .battery_file
                .unwrap_or_else(|| state_dir.join("battery_onset")),
            shutdown_flag: general
                .shutdown_flag
                .unwrap_or_else(|| state_dir.join("shutdown_issued")),
            status_file: general
                .status_file
                .unwrap_or_else(|| state_dir.join("last_status")),
            ac_restore_file: general
                .ac_restore_file
                .unwrap_or_else(|| state_dir.join("ac_restore")),
            journal_file: general
                .journal_file
                .unwrap_or_else(|| state_dir.join("journal.jsonl")),
            grace: Duration::from_secs(general.minutes.unwrap_or(DEFAULT_GRACE_MINUTES) * 60),
            poll_interval: Duration::from_secs(
                general.sleep_interval.unwrap_or(DEFAULT_SLEEP_INTERVAL),
            ),
            status_interval: Duration::from_secs(
                general.status_interval.unwrap_or(DEFAULT_STATUS_INTERVAL),
            ),
            low_battery: general.min_battery.unwrap_or(DEFAULT_MIN_BATTERY),
            ac_stable: Duration::from_secs(
                general.ac_stable_time.unwrap_or(DEFAULT_AC_STABLE_TIME),
            ),
            targets: raw.targets.into_iter().map(Target::from_raw).collect(),
        }
    }

    /// The configured targets as ordered IDs
    pub fn target_ids(&self) -> Vec<TargetId> {
        self.targets.iter().map(Target::id).collect()
    }
}

/// A validated shutdown target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub user: String,
    pub host: String,
}

impl Target {
    fn from_raw(raw: RawTarget) -> Self {
        Self {
            user: raw.user,
            host: raw.host,
        }
    }

    pub fn id(&self) -> TargetId {
        TargetId::new(&self.user, &self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawGeneral;

    #[test]
    fn defaults_applied() {
        let raw = RawConfig {
            general: RawGeneral::default(),
            targets: vec![RawTarget {
                user: "root".into(),
                host: "nas".into(),
            }],
        };

        let config = Config::from_raw(raw);
        assert_eq!(config.grace, Duration::from_secs(1500));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.status_interval, Duration::from_secs(3600));
        assert_eq!(config.low_battery, 10);
        assert_eq!(config.ac_stable, Duration::from_secs(300));
        assert!(config
            .battery_file
            .to_string_lossy()
            .ends_with("battery_onset"));
    }

    #[test]
    fn target_ids_preserve_order() {
        let raw = RawConfig {
            general: RawGeneral::default(),
            targets: vec![
                RawTarget {
                    user: "root".into(),
                    host: "nas".into(),
                },
                RawTarget {
                    user: "admin".into(),
                    host: "switch".into(),
                },
            ],
        };

        let ids = Config::from_raw(raw).target_ids();
        assert_eq!(ids[0].as_str(), "root@nas");
        assert_eq!(ids[1].as_str(), "admin@switch");
    }
}
