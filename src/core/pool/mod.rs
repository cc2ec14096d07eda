//! # Pool Module
//!
//! Bounded pools of workers that fingerprint files in parallel.
//!
//! ## Implementations
//! - [`ProcessPoolLauncher`] - child OS processes running `fp-audit worker`.
//!   Termination kills them, so even a decode stuck deep inside a codec
//!   stops immediately.
//! - [`ThreadPoolLauncher`] - a rayon pool inside the current process.
//!   Termination drops queued work but cannot interrupt a running task.
//!
//! A pool is created fresh for every fingerprinting stage and is either
//! shut down gracefully once all outcomes are in, or terminated on
//! cancellation. The [`PoolSlot`] holds the pool that is currently running
//! so a stop request from another thread can reach it.

mod process;
pub mod protocol;
mod thread;

pub use process::ProcessPoolLauncher;
pub use thread::ThreadPoolLauncher;

use crate::core::fingerprint::FingerprintConfig;
use crate::error::PoolError;
use crossbeam_channel::RecvTimeoutError;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Fingerprint the file at `path`; `id` is its position in the input list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintTask {
    pub id: usize,
    pub path: PathBuf,
}

/// What a worker reports for one task. Exactly one of `fingerprint` and
/// `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub id: usize,
    pub path: PathBuf,
    pub fingerprint: Option<String>,
    pub error: Option<String>,
}

impl TaskOutcome {
    /// Run the task, capturing both errors and panics in the outcome
    pub fn run(task: &FingerprintTask, config: &FingerprintConfig) -> Self {
        let result = panic::catch_unwind(AssertUnwindSafe(|| config.fingerprint_file(&task.path)));
        match result {
            Ok(Ok(fingerprint)) => Self {
                id: task.id,
                path: task.path.clone(),
                fingerprint: Some(fingerprint),
                error: None,
            },
            Ok(Err(e)) => Self::failed(task, e.to_string()),
            Err(_) => Self::failed(task, "fingerprinting panicked".to_string()),
        }
    }

    /// An outcome for a task that could not be run
    pub fn failed(task: &FingerprintTask, message: impl Into<String>) -> Self {
        Self {
            id: task.id,
            path: task.path.clone(),
            fingerprint: None,
            error: Some(message.into()),
        }
    }
}

/// A running pool of fingerprint workers
pub trait WorkerPool: Send + Sync {
    /// Queue a task. Fails once the pool has been shut down or terminated.
    fn submit(&self, task: FingerprintTask) -> Result<(), PoolError>;

    /// Wait up to `timeout` for the next finished task, in completion order
    fn recv_timeout(&self, timeout: Duration) -> Result<TaskOutcome, RecvTimeoutError>;

    /// Drop queued tasks and stop workers immediately. Idempotent; failures
    /// to stop a worker that already exited are ignored.
    fn terminate(&self);

    /// Release workers after all submitted tasks have been collected
    fn shutdown(&self);

    /// Number of workers still alive
    fn live_workers(&self) -> usize;
}

/// Creates a fresh [`WorkerPool`] for one fingerprinting stage
pub trait PoolLauncher: Send + Sync {
    fn launch(
        &self,
        workers: usize,
        config: FingerprintConfig,
    ) -> Result<Arc<dyn WorkerPool>, PoolError>;
}

/// The pool currently running, reachable from outside the worker thread
#[derive(Default)]
pub struct PoolSlot {
    current: Mutex<Option<Arc<dyn WorkerPool>>>,
}

impl PoolSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn WorkerPool>>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn bind(&self, pool: Arc<dyn WorkerPool>) {
        *self.lock() = Some(pool);
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn is_bound(&self) -> bool {
        self.lock().is_some()
    }

    /// Terminate the bound pool, if any. Returns whether one was bound.
    pub fn terminate_active(&self) -> bool {
        // Terminate outside the lock.
        let pool = self.lock().clone();
        match pool {
            Some(pool) => {
                pool.terminate();
                true
            }
            None => false,
        }
    }
}

/// Clamp a requested worker count to `[1, min(requested, logical CPUs)]`
pub fn clamp_workers(requested: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.min(cpus).max(1)
}
