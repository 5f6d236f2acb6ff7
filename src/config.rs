use std::{num::NonZeroUsize, thread, time::Duration};

use serde::{Deserialize, Serialize};

/// How a failed unit of work affects the run.
/// Applied the same way to the tokenize and score phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// record the failure in the document's own slot and keep going
    #[default]
    Isolate,
    /// abort the run on the first failure and cancel the rest
    FailFast,
}

/// Pipeline run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// worker threads, `None` = available parallelism
    pub threads: Option<usize>,
    /// upper bound for one fan-out phase to settle
    pub phase_timeout: Duration,
    pub failure_policy: FailurePolicy,
    /// log progress every N collected results (0 = never)
    pub progress_interval: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: None,
            phase_timeout: Duration::from_secs(5 * 60),
            failure_policy: FailurePolicy::Isolate,
            progress_interval: 100,
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Resolve the worker thread count.
    /// Never returns 0.
    pub fn worker_threads(&self) -> usize {
        match self.threads {
            Some(n) if n > 0 => n,
            _ => thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}
