//! Mock collaborators for testing

use async_trait::async_trait;
use mains_util::TargetId;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::{ExecError, PowerSample, PowerSampler, RemoteExecutor, SampleError};

/// Mock sampler fed from a queue of scripted results
pub struct MockSampler {
    queue: Mutex<VecDeque<Result<PowerSample, SampleError>>>,
}

impl MockSampler {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, sample: PowerSample) {
        self.queue.lock().unwrap().push_back(Ok(sample));
    }

    pub fn push_error(&self, err: SampleError) {
        self.queue.lock().unwrap().push_back(Err(err));
    }
}

impl Default for MockSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PowerSampler for MockSampler {
    async fn sample(&self) -> Result<PowerSample, SampleError> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SampleError::Unavailable("mock queue empty".into())))
    }
}

/// Mock executor recording every invocation
pub struct MockExecutor {
    calls: Mutex<Vec<TargetId>>,

    /// Targets configured to fail their shutdown call
    pub fail_targets: Mutex<HashSet<TargetId>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_targets: Mutex::new(HashSet::new()),
        }
    }

    /// All invocations in order
    pub fn calls(&self) -> Vec<TargetId> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times this target was invoked
    pub fn call_count(&self, target: &TargetId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| *t == target)
            .count()
    }

    /// Configure a target to fail its shutdown call
    pub fn set_failing(&self, target: TargetId, failing: bool) {
        let mut fail = self.fail_targets.lock().unwrap();
        if failing {
            fail.insert(target);
        } else {
            fail.remove(&target);
        }
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn shutdown(&self, target: &TargetId) -> Result<(), ExecError> {
        self.calls.lock().unwrap().push(target.clone());

        if self.fail_targets.lock().unwrap().contains(target) {
            Err(ExecError::RemoteFailed(255))
        } else {
            Ok(())
        }
    }
}
