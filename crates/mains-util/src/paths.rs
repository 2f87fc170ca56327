//! Default paths for mainsd components
//!
//! The daemon normally runs as a system service:
//! - Config: `/etc/mainsd/config.toml`
//! - Marker state: `/var/lib/mainsd`
//!
//! When running unprivileged (development), XDG equivalents are used:
//! - Config: `$XDG_CONFIG_HOME/mainsd/config.toml` or `~/.config/mainsd/config.toml`
//! - Marker state: `$XDG_STATE_HOME/mainsd` or `~/.local/state/mainsd`

use std::path::PathBuf;

/// Environment variable for overriding the marker state directory
pub const MAINSD_STATE_DIR_ENV: &str = "MAINSD_STATE_DIR";

/// Application subdirectory name
const APP_DIR: &str = "mainsd";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `/etc/mainsd/config.toml` (if it exists — the system-service case)
/// 2. `$XDG_CONFIG_HOME/mainsd/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/mainsd/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    let system = PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME);
    if system.exists() {
        return system;
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    system
}

/// Get the default marker state directory.
///
/// Order of precedence:
/// 1. `$MAINSD_STATE_DIR` environment variable (if set)
/// 2. `/var/lib/mainsd` (if writable or creatable — the system-service case)
/// 3. `$XDG_STATE_HOME/mainsd` or `~/.local/state/mainsd` (fallback)
pub fn default_state_dir() -> PathBuf {
    if let Ok(path) = std::env::var(MAINSD_STATE_DIR_ENV) {
        return PathBuf::from(path);
    }

    state_dir_without_env()
}

/// Get the state directory without checking MAINSD_STATE_DIR env var.
/// Used for default values in configs where the env var is checked separately.
pub fn state_dir_without_env() -> PathBuf {
    let system = PathBuf::from("/var/lib").join(APP_DIR);
    if system.exists() {
        return system;
    }

    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(state_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join(APP_DIR);
    }

    system
}
