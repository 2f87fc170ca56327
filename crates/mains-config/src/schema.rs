//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// Daemon-wide settings
    #[serde(default)]
    pub general: RawGeneral,

    /// Hosts to shut down when a battery episode terminates
    #[serde(default)]
    pub targets: Vec<RawTarget>,
}

/// The `[general]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawGeneral {
    /// Battery-onset marker path
    pub battery_file: Option<PathBuf>,

    /// Shutdown-issued marker path; per-target markers live beside it
    pub shutdown_flag: Option<PathBuf>,

    /// Status heartbeat marker path
    pub status_file: Option<PathBuf>,

    /// AC-restore-onset marker path
    pub ac_restore_file: Option<PathBuf>,

    /// Episode journal path
    pub journal_file: Option<PathBuf>,

    /// Battery grace period, in minutes
    pub minutes: Option<u64>,

    /// Poll interval, in seconds
    pub sleep_interval: Option<u64>,

    /// Status heartbeat interval, in seconds
    pub status_interval: Option<u64>,

    /// Critical charge threshold, percent
    pub min_battery: Option<u8>,

    /// AC stability debounce, in seconds. 0 cancels immediately on AC
    /// restoration, with no debounce.
    pub ac_stable_time: Option<u64>,
}

/// A `[[targets]]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTarget {
    /// Login user on the target host
    pub user: String,

    /// Target hostname or address
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_targets_array() {
        let toml_str = r#"
            [[targets]]
            user = "root"
            host = "nas"

            [[targets]]
            user = "root"
            host = "backup"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].host, "nas");
    }

    #[test]
    fn general_section_is_optional() {
        let toml_str = r#"
            [[targets]]
            user = "root"
            host = "nas"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert!(config.general.minutes.is_none());
        assert!(config.general.battery_file.is_none());
    }
}
