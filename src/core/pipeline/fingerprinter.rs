//! Parallel fingerprint computation over a worker pool.

use super::CancellationToken;
use crate::core::entry::FileEntry;
use crate::core::fingerprint::FingerprintConfig;
use crate::core::pool::{clamp_workers, FingerprintTask, PoolLauncher, PoolSlot, WorkerPool};
use crate::error::PoolError;
use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How often the cancellation flag is checked while waiting on workers
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Name passed to progress callbacks
pub const STAGE_NAME: &str = "fingerprint";

/// Entries produced by one fingerprinting pass
#[derive(Debug)]
pub struct FingerprintRun {
    /// One entry per input path, in input order
    pub entries: Vec<FileEntry>,
    /// Whether the pass stopped early on request
    pub cancelled: bool,
}

/// Fingerprints a list of files on a fresh pool per call
pub struct ParallelFingerprinter<'a> {
    launcher: &'a dyn PoolLauncher,
    slot: &'a PoolSlot,
    cancel: &'a CancellationToken,
}

impl<'a> ParallelFingerprinter<'a> {
    pub fn new(
        launcher: &'a dyn PoolLauncher,
        slot: &'a PoolSlot,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            launcher,
            slot,
            cancel,
        }
    }

    /// Fingerprint every path with up to `workers` workers.
    ///
    /// `progress` is called with `(STAGE_NAME, done, total)` after each
    /// task, in completion order. On cancellation the pool is terminated
    /// and entries that never completed keep no fingerprint and no error.
    pub fn compute_entries<F>(
        &self,
        paths: &[PathBuf],
        config: FingerprintConfig,
        workers: usize,
        mut progress: F,
    ) -> Result<FingerprintRun, PoolError>
    where
        F: FnMut(&str, usize, usize),
    {
        let mut entries: Vec<FileEntry> = paths.iter().map(|p| FileEntry::new(p)).collect();
        let total = entries.len();

        if total == 0 {
            return Ok(FingerprintRun {
                entries,
                cancelled: false,
            });
        }
        if self.cancel.is_cancelled() {
            return Ok(FingerprintRun {
                entries,
                cancelled: true,
            });
        }

        let workers = clamp_workers(workers);
        info!(files = total, workers, mode = %config.mode, "Fingerprinting");

        let pool = self.launcher.launch(workers, config)?;
        self.slot.bind(Arc::clone(&pool));

        let collected = self.collect(pool.as_ref(), paths, &mut entries, &mut progress);

        self.slot.clear();
        if matches!(collected, Ok(false)) {
            pool.shutdown();
        } else {
            pool.terminate();
        }

        let cancelled = collected?;
        debug!(cancelled, "Fingerprinting pass finished");
        Ok(FingerprintRun { entries, cancelled })
    }

    /// Submit every task and fill entries as outcomes arrive. Returns
    /// whether the pass was cancelled.
    fn collect<F>(
        &self,
        pool: &dyn WorkerPool,
        paths: &[PathBuf],
        entries: &mut [FileEntry],
        progress: &mut F,
    ) -> Result<bool, PoolError>
    where
        F: FnMut(&str, usize, usize),
    {
        let total = entries.len();

        for (id, path) in paths.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }
            let submitted = pool.submit(FingerprintTask {
                id,
                path: path.clone(),
            });
            if let Err(e) = submitted {
                // A stop request may have closed the pool under us.
                return if self.cancel.is_cancelled() {
                    Ok(true)
                } else {
                    Err(e)
                };
            }
        }

        let mut done = 0;
        while done < total {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }

            let outcome = match pool.recv_timeout(POLL_INTERVAL) {
                Ok(outcome) => outcome,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return if self.cancel.is_cancelled() {
                        Ok(true)
                    } else {
                        Err(PoolError::Closed)
                    };
                }
            };

            let Some(entry) = entries.get_mut(outcome.id) else {
                continue;
            };
            if entry.is_resolved() {
                continue;
            }
            entry.fingerprint = outcome.fingerprint;
            entry.error = outcome.error;
            done += 1;
            progress(STAGE_NAME, done, total);
        }

        Ok(false)
    }
}
