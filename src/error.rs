use std::{fmt, io, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fan-out phase a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// block -> document tokenization
    Tokenize,
    /// document -> score map
    Score,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Tokenize => write!(f, "tokenize"),
            Stage::Score => write!(f, "score"),
        }
    }
}

/// Error raised by a single unit of work
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task was cancelled before it ran")]
    Cancelled,
}

impl TaskError {
    pub fn failed(reason: impl Into<String>) -> Self {
        TaskError::Failed(reason.into())
    }
}

/// Errors of the worker pool itself (not of the tasks it runs)
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
    #[error("{pending} task(s) still pending after {timeout:?}")]
    Timeout { pending: usize, timeout: Duration },
    #[error("await interrupted by cancellation request")]
    Interrupted,
    #[error("task {index} failed, batch aborted: {reason}")]
    Aborted { index: usize, reason: TaskError },
}

/// Failure value surfaced by a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read input at line {line}: {source}")]
    SourceRead {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("{stage} task for document {index} failed: {reason}")]
    TaskFailed {
        stage: Stage,
        index: usize,
        reason: TaskError,
    },
    #[error("{stage} task for document {index} was cancelled")]
    TaskCancelled { stage: Stage, index: usize },
    #[error("{stage} phase timed out after {timeout:?} with {pending} task(s) pending")]
    Timeout {
        stage: Stage,
        pending: usize,
        timeout: Duration,
    },
    #[error("{stage} phase interrupted")]
    Interrupted { stage: Stage },
    #[error(transparent)]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    /// Map an await-all failure onto the phase it happened in
    pub fn from_pool(stage: Stage, err: PoolError) -> Self {
        match err {
            PoolError::Build(e) => PipelineError::PoolBuild(e),
            PoolError::Timeout { pending, timeout } => PipelineError::Timeout { stage, pending, timeout },
            PoolError::Interrupted => PipelineError::Interrupted { stage },
            PoolError::Aborted { index, reason } => PipelineError::from_task(stage, index, reason),
        }
    }

    /// Map a failed task outcome onto the phase it happened in
    pub fn from_task(stage: Stage, index: usize, reason: TaskError) -> Self {
        match reason {
            TaskError::Cancelled => PipelineError::TaskCancelled { stage, index },
            reason => PipelineError::TaskFailed { stage, index, reason },
        }
    }

    /// Stage the error belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::TaskFailed { stage, .. }
            | PipelineError::TaskCancelled { stage, .. }
            | PipelineError::Timeout { stage, .. }
            | PipelineError::Interrupted { stage } => Some(*stage),
            PipelineError::SourceRead { .. } => Some(Stage::Tokenize),
            PipelineError::PoolBuild(_) => None,
        }
    }

    /// Document index implicated by a task failure
    pub fn index(&self) -> Option<usize> {
        match self {
            PipelineError::TaskFailed { index, .. } | PipelineError::TaskCancelled { index, .. } => Some(*index),
            _ => None,
        }
    }
}
