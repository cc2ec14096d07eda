//! In-process pool on a dedicated rayon thread pool.

use super::{FingerprintTask, PoolLauncher, TaskOutcome, WorkerPool};
use crate::core::fingerprint::FingerprintConfig;
use crate::error::PoolError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Launches [`ThreadWorkerPool`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPoolLauncher;

impl PoolLauncher for ThreadPoolLauncher {
    fn launch(
        &self,
        workers: usize,
        config: FingerprintConfig,
    ) -> Result<Arc<dyn WorkerPool>, PoolError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fingerprint-{}", i))
            .build()
            .map_err(|e| PoolError::Build(e.to_string()))?;

        debug!(workers, mode = %config.mode, "Thread pool started");

        let (results_tx, results_rx) = unbounded();
        Ok(Arc::new(ThreadWorkerPool {
            pool: Mutex::new(Some(pool)),
            config,
            results_tx,
            results_rx,
            stopped: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicUsize::new(0)),
        }))
    }
}

/// Runs tasks on rayon threads. After `terminate`, queued tasks are
/// skipped but a task already hashing runs to completion.
pub struct ThreadWorkerPool {
    pool: Mutex<Option<rayon::ThreadPool>>,
    config: FingerprintConfig,
    results_tx: Sender<TaskOutcome>,
    results_rx: Receiver<TaskOutcome>,
    stopped: Arc<AtomicBool>,
    running: Arc<AtomicUsize>,
}

impl ThreadWorkerPool {
    fn release(&self) {
        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner()).take();
        // Dropping the rayon pool lets its threads exit once idle.
        drop(pool);
    }
}

impl WorkerPool for ThreadWorkerPool {
    fn submit(&self, task: FingerprintTask) -> Result<(), PoolError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let guard = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        let pool = guard.as_ref().ok_or(PoolError::Closed)?;

        let config = self.config;
        let results = self.results_tx.clone();
        let stopped = Arc::clone(&self.stopped);
        let running = Arc::clone(&self.running);

        pool.spawn(move || {
            if stopped.load(Ordering::SeqCst) {
                return;
            }
            running.fetch_add(1, Ordering::SeqCst);
            let outcome = TaskOutcome::run(&task, &config);
            running.fetch_sub(1, Ordering::SeqCst);
            if !stopped.load(Ordering::SeqCst) {
                let _ = results.send(outcome);
            }
        });
        Ok(())
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<TaskOutcome, RecvTimeoutError> {
        self.results_rx.recv_timeout(timeout)
    }

    fn terminate(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Thread pool terminated");
        }
        self.release();
    }

    fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.release();
    }

    fn live_workers(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn pool_returns_one_outcome_per_task() {
        let dir = TempDir::new().unwrap();
        let pool = ThreadPoolLauncher
            .launch(2, FingerprintConfig::default())
            .unwrap();

        for id in 0..5 {
            let path = dir.path().join(format!("{}.png", id));
            fs::write(&path, format!("content {}", id)).unwrap();
            pool.submit(FingerprintTask { id, path }).unwrap();
        }

        let mut ids: Vec<usize> = (0..5)
            .map(|_| pool.recv_timeout(Duration::from_secs(10)).unwrap().id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);

        pool.shutdown();
        assert_eq!(pool.live_workers(), 0);
    }

    #[test]
    fn terminated_pool_rejects_tasks() {
        let pool = ThreadPoolLauncher
            .launch(1, FingerprintConfig::default())
            .unwrap();
        pool.terminate();
        pool.terminate();

        let result = pool.submit(FingerprintTask {
            id: 0,
            path: PathBuf::from("/tmp/x.png"),
        });
        assert!(matches!(result, Err(PoolError::Closed)));
    }
}
