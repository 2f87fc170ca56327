//! Error types for mainsd

use thiserror::Error;

/// Core error type for mainsd operations
#[derive(Debug, Error)]
pub enum MainsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required tool missing: {0}")]
    DependencyMissing(String),

    #[error("No authenticated remote session: {0}")]
    SessionMissing(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Sample error: {0}")]
    Sample(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MainsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::DependencyMissing(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::SessionMissing(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn sample(msg: impl Into<String>) -> Self {
        Self::Sample(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MainsError>;
