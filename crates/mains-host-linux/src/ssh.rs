//! SSH-based remote executor
//!
//! Runs a privileged power-off on each target over `ssh` in batch
//! (non-interactive) mode. Authentication comes from the ambient agent
//! session; its absence is a fatal startup error, never a per-tick one.

use async_trait::async_trait;
use mains_host_api::{ExecError, RemoteExecutor};
use mains_util::{MainsError, TargetId};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::tool::find_in_path;

/// Name of the remote-execution tool on PATH
pub const SSH_BINARY: &str = "ssh";

/// Overall bound on one remote shutdown call
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection-establishment bound, passed to ssh itself
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// The privileged power-off command run on the target
const POWEROFF_COMMAND: &str = "poweroff";

/// Remote executor backed by the ssh client
pub struct SshExecutor {
    binary: PathBuf,
    timeout: Duration,
}

impl SshExecutor {
    /// Locate the ssh client on PATH. Absence is a fatal startup error.
    pub fn locate() -> Result<Self, MainsError> {
        let binary = find_in_path(SSH_BINARY)
            .ok_or_else(|| MainsError::dependency("ssh client not found on PATH"))?;
        debug!(binary = %binary.display(), "ssh client located");
        Ok(Self {
            binary,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        })
    }

    /// Use an explicit binary path (tests)
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Verify an authenticated agent session is available.
    ///
    /// Batch mode cannot prompt for credentials, so without an agent every
    /// dispatch would fail at the worst possible moment. Checked once at
    /// startup.
    pub async fn check_session(&self) -> Result<(), MainsError> {
        if std::env::var_os("SSH_AUTH_SOCK").is_none() {
            return Err(MainsError::session("SSH_AUTH_SOCK is not set"));
        }

        let output = Command::new("ssh-add")
            .arg("-l")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MainsError::session(format!("ssh-add -l: {}", e)))?;

        if !output.status.success() {
            return Err(MainsError::session(
                "ssh-agent holds no identities (ssh-add -l failed)",
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn shutdown(&self, target: &TargetId) -> Result<(), ExecError> {
        let mut child = Command::new(&self.binary)
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", CONNECT_TIMEOUT_SECS))
            .arg(target.as_str())
            .arg(POWEROFF_COMMAND)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{}: {}", self.binary.display(), e)))?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                info!(target = %target, "Remote shutdown command succeeded");
                Ok(())
            }
            Ok(Ok(status)) => Err(ExecError::RemoteFailed(status.code().unwrap_or(-1))),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                // Reap the stuck client so it cannot outlive the tick
                let _ = child.kill().await;
                Err(ExecError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
