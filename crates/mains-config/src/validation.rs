//! Configuration validation

use crate::schema::RawConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("No shutdown targets configured")]
    NoTargets,

    #[error("Target #{index}: {message}")]
    TargetError { index: usize, message: String },

    #[error("Duplicate target: {0}")]
    DuplicateTarget(String),

    #[error("General config error: {0}")]
    GeneralError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.targets.is_empty() {
        errors.push(ValidationError::NoTargets);
    }

    let mut seen = HashSet::new();
    for (index, target) in config.targets.iter().enumerate() {
        if target.user.is_empty() {
            errors.push(ValidationError::TargetError {
                index,
                message: "user cannot be empty".into(),
            });
        }
        if target.host.is_empty() {
            errors.push(ValidationError::TargetError {
                index,
                message: "host cannot be empty".into(),
            });
        }
        if target.host.contains(char::is_whitespace) || target.host.contains('@') {
            errors.push(ValidationError::TargetError {
                index,
                message: format!("invalid host '{}'", target.host),
            });
        }

        let key = format!("{}@{}", target.user, target.host);
        if !seen.insert(key.clone()) {
            errors.push(ValidationError::DuplicateTarget(key));
        }
    }

    if let Some(pct) = config.general.min_battery
        && pct > 100
    {
        errors.push(ValidationError::GeneralError(format!(
            "min_battery must be 0-100, got {}",
            pct
        )));
    }

    if config.general.sleep_interval == Some(0) {
        errors.push(ValidationError::GeneralError(
            "sleep_interval must be at least 1 second".into(),
        ));
    }

    if config.general.status_interval == Some(0) {
        errors.push(ValidationError::GeneralError(
            "status_interval must be at least 1 second".into(),
        ));
    }

    errors
}
