//! Worker pool used by both fan-out phases.
//!
//! A thin layer over a dedicated `rayon::ThreadPool`:
//! - `submit` queues one unit of work into a `TaskBatch`
//! - `await_all` joins a batch with a deadline, in completion order
//! - `shutdown` / `shutdown_now` end the pool's life
//!
//! Every task outcome is a value (`TaskOutcome`). Errors returned by a task and
//! panics inside it are both caught at the task boundary.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::error::{PoolError, TaskError};

/// how often a blocked await re-checks the interrupt flag
const POLL_SLICE: Duration = Duration::from_millis(20);

/// Caller-side interruption request.
/// Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption of whatever is awaiting on this handle
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clear a previous request so the handle can be reused
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Result of one unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Done(T),
    Failed(TaskError),
}

/// A group of tasks awaited together.
///
/// Every task of the batch reports on one shared channel as
/// `(slot, outcome)`, where `slot` is its submission position.
#[derive(Debug)]
pub struct TaskBatch<T> {
    tx: Sender<(usize, TaskOutcome<T>)>,
    rx: Receiver<(usize, TaskOutcome<T>)>,
    /// correlation index of every slot
    indices: Vec<usize>,
}

impl<T> TaskBatch<T> {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            indices: Vec::new(),
        }
    }

    /// number of submitted tasks
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl<T> Default for TaskBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded pool scoped to a single run
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    /// set on forced shutdown, checked by every task before it starts
    cancelled: Arc<AtomicBool>,
    interrupt: CancelHandle,
    threads: usize,
}

impl WorkerPool {
    /// Build a pool with `threads` workers.
    ///
    /// # Arguments
    /// * `threads` - number of worker threads
    /// * `interrupt` - caller handle that aborts a running `await_all`
    pub fn new(threads: usize, interrupt: CancelHandle) -> Result<Self, PoolError> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tfidf-worker-{i}"))
            .build()?;
        debug!(threads, "worker pool started");
        Ok(Self {
            pool,
            cancelled: Arc::new(AtomicBool::new(false)),
            interrupt,
            threads,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether the caller asked to interrupt the run
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    /// Queue one unit of work into `batch`.
    ///
    /// `index` is the correlation key handed back with the outcome.
    /// If the pool is force-shut before the task starts, its body never runs
    /// and it settles as `TaskError::Cancelled`.
    pub fn submit<T, F>(&self, batch: &mut TaskBatch<T>, index: usize, task: F)
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, TaskError> + Send + 'static,
    {
        let slot = batch.indices.len();
        batch.indices.push(index);
        let tx = batch.tx.clone();
        let cancelled = Arc::clone(&self.cancelled);
        self.pool.spawn(move || {
            let outcome = if cancelled.load(Ordering::Acquire) {
                TaskOutcome::Failed(TaskError::Cancelled)
            } else {
                match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(Ok(value)) => TaskOutcome::Done(value),
                    Ok(Err(err)) => TaskOutcome::Failed(err),
                    Err(payload) => TaskOutcome::Failed(TaskError::Panicked(panic_message(payload.as_ref()))),
                }
            };
            // the receiver is gone once the awaiting side gave up
            let _ = tx.send((slot, outcome));
        });
    }

    /// Join a batch.
    ///
    /// Outcomes are collected as tasks complete and returned in submission
    /// order, each paired with its index.
    ///
    /// # Errors
    /// * `PoolError::Timeout` - the batch did not settle within `timeout`
    /// * `PoolError::Interrupted` - the interrupt handle was triggered
    /// * `PoolError::Aborted` - with `fail_fast`, the first failed outcome
    ///   to arrive
    ///
    /// All of them force-shut the pool before returning.
    pub fn await_all<T>(
        &self,
        batch: TaskBatch<T>,
        options: AwaitOptions,
    ) -> Result<Vec<(usize, TaskOutcome<T>)>, PoolError> {
        let TaskBatch { tx, rx, indices } = batch;
        // only task clones keep the channel open from here on
        drop(tx);

        let deadline = Instant::now() + options.timeout;
        let total = indices.len();
        let mut slots: Vec<Option<TaskOutcome<T>>> = (0..total).map(|_| None).collect();
        let mut settled = 0;

        while settled < total {
            if self.interrupt.is_cancelled() {
                self.shutdown_now();
                return Err(PoolError::Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                self.shutdown_now();
                return Err(PoolError::Timeout {
                    pending: total - settled,
                    timeout: options.timeout,
                });
            }
            let (slot, outcome) = match rx.recv_timeout(POLL_SLICE.min(deadline - now)) {
                Ok(received) => received,
                Err(RecvTimeoutError::Timeout) => continue,
                // every task is gone; unreported slots settle as cancelled below
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let outcome = match outcome {
                TaskOutcome::Failed(reason) if options.fail_fast => {
                    let index = indices[slot];
                    warn!(index, %reason, "task failed, cancelling remaining tasks");
                    self.shutdown_now();
                    return Err(PoolError::Aborted { index, reason });
                }
                outcome => outcome,
            };
            slots[slot] = Some(outcome);
            settled += 1;

            if options.progress_interval > 0 && settled % options.progress_interval == 0 {
                debug!(collected = settled, total, "collecting task results");
            }
        }

        Ok(indices
            .into_iter()
            .zip(slots)
            .map(|(index, slot)| (index, slot.unwrap_or(TaskOutcome::Failed(TaskError::Cancelled))))
            .collect())
    }

    /// Force-cancel everything that has not started yet.
    /// Running tasks finish but nobody reads their results.
    pub fn shutdown_now(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            warn!("worker pool force shutdown");
        }
    }

    /// Graceful end of life once every batch has been awaited
    pub fn shutdown(self) {
        debug!(threads = self.threads, "worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // queued leftovers of an aborted run must not do any more work
        self.cancelled.store(true, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
