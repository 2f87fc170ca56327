//! Collaborator traits

use async_trait::async_trait;
use mains_util::TargetId;
use thiserror::Error;

use crate::PowerSample;

/// Errors from reading the local power state
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Power utility unavailable: {0}")]
    Unavailable(String),

    #[error("Unparsable power reading: {0}")]
    Unparsable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the remote shutdown call
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to invoke remote tool: {0}")]
    Spawn(String),

    #[error("Remote shutdown timed out after {0}s")]
    Timeout(u64),

    #[error("Remote shutdown exited with status {0}")]
    RemoteFailed(i32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Yields the current power source and charge percentage.
///
/// Implementations never retry internally; a failed read is reported as a
/// `SampleError` and the scheduler decides how to back off.
#[async_trait]
pub trait PowerSampler: Send + Sync {
    async fn sample(&self) -> Result<PowerSample, SampleError>;
}

/// Performs the actual remote shutdown of a single target host.
///
/// Implementations must be non-interactive and bound the call with a
/// timeout. Idempotence across ticks is the dispatcher's job, not the
/// executor's.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn shutdown(&self, target: &TargetId) -> Result<(), ExecError>;
}
