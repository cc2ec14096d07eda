//! Background orchestration of one comparison run.

use super::fingerprinter::ParallelFingerprinter;
use super::CancellationToken;
use crate::core::comparator::compare_entries;
use crate::core::fingerprint::{FingerprintConfig, FingerprintMode, MAX_HASH_SIZE};
use crate::core::pool::{PoolLauncher, PoolSlot, ProcessPoolLauncher};
use crate::core::report::CompareReport;
use crate::core::scanner::scan_images;
use crate::error::{AuditError, DirectorySide, PoolError};
use crate::events::{
    Event, EventChannel, EventReceiver, EventSender, FingerprintProgress, FingerprintStage,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a run currently is. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    Scanning,
    FingerprintingSource,
    FingerprintingResult,
    Comparing,
    Done,
    Cancelled,
    Error,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerState::Done | WorkerState::Cancelled | WorkerState::Error
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Idle => "Idle",
            WorkerState::Scanning => "Scanning",
            WorkerState::FingerprintingSource => "Fingerprinting source",
            WorkerState::FingerprintingResult => "Fingerprinting result",
            WorkerState::Comparing => "Comparing",
            WorkerState::Done => "Done",
            WorkerState::Cancelled => "Cancelled",
            WorkerState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// What one run compares and how
#[derive(Debug, Clone)]
pub struct CompareConfig {
    pub source_dir: PathBuf,
    pub result_dir: PathBuf,
    pub fingerprint: FingerprintConfig,
    /// Requested worker count, clamped to the CPU count per stage
    pub workers: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            result_dir: PathBuf::new(),
            fingerprint: FingerprintConfig::default(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Builder for [`CompareWorker`]
pub struct CompareWorkerBuilder {
    config: CompareConfig,
    launcher: Option<Arc<dyn PoolLauncher>>,
}

impl CompareWorkerBuilder {
    pub fn new() -> Self {
        Self {
            config: CompareConfig::default(),
            launcher: None,
        }
    }

    pub fn source_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_dir = path.into();
        self
    }

    pub fn result_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.result_dir = path.into();
        self
    }

    pub fn mode(mut self, mode: FingerprintMode) -> Self {
        self.config.fingerprint.mode = mode;
        self
    }

    /// dHash grid size for perceptual mode
    pub fn hash_size(mut self, size: u32) -> Self {
        self.config.fingerprint.hash_size = size;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Pool implementation to fingerprint with. Defaults to worker
    /// processes of the current executable.
    pub fn launcher(mut self, launcher: Arc<dyn PoolLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn build(self) -> Result<CompareWorker, AuditError> {
        let hash_size = self.config.fingerprint.hash_size;
        if !(1..=MAX_HASH_SIZE).contains(&hash_size) {
            return Err(AuditError::Config(format!(
                "hash size must be between 1 and {}, got {}",
                MAX_HASH_SIZE, hash_size
            )));
        }
        let launcher: Arc<dyn PoolLauncher> = match self.launcher {
            Some(launcher) => launcher,
            None => Arc::new(ProcessPoolLauncher::current_exe()?),
        };
        Ok(CompareWorker {
            config: self.config,
            launcher,
            cancel: CancellationToken::new(),
            slot: Arc::new(PoolSlot::new()),
            state: Arc::new(Mutex::new(WorkerState::Idle)),
        })
    }
}

impl Default for CompareWorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests a stop from any thread. Cheap to clone.
#[derive(Clone)]
pub struct Stopper {
    cancel: CancellationToken,
    slot: Arc<PoolSlot>,
}

impl Stopper {
    /// Set the cancellation flag and kill the pool that is running, if any.
    /// Safe to call repeatedly and after the run finished.
    pub fn request_stop(&self) {
        self.cancel.cancel();
        if self.slot.terminate_active() {
            debug!("Stop request terminated the active pool");
        }
    }
}

/// Sequences scan, source fingerprints, result fingerprints and comparison
pub struct CompareWorker {
    config: CompareConfig,
    launcher: Arc<dyn PoolLauncher>,
    cancel: CancellationToken,
    slot: Arc<PoolSlot>,
    state: Arc<Mutex<WorkerState>>,
}

fn lock_state(state: &Mutex<WorkerState>) -> MutexGuard<'_, WorkerState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "comparison worker panicked".to_string()
    }
}

impl CompareWorker {
    pub fn builder() -> CompareWorkerBuilder {
        CompareWorkerBuilder::new()
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *lock_state(&self.state)
    }

    pub fn stopper(&self) -> Stopper {
        Stopper {
            cancel: self.cancel.clone(),
            slot: Arc::clone(&self.slot),
        }
    }

    /// Move to `next` unless a terminal state was already reached
    fn transition(&self, next: WorkerState) -> bool {
        let mut state = lock_state(&self.state);
        if state.is_terminal() {
            return false;
        }
        debug!(from = %*state, to = %next, "Worker state change");
        *state = next;
        true
    }

    /// Run on a background thread. Events arrive on the returned receiver;
    /// the last one is always `Done`, `Cancelled` or `Error`.
    pub fn spawn(self) -> Result<(CompareHandle, EventReceiver), AuditError> {
        let (sender, receiver) = EventChannel::new();
        let stopper = self.stopper();
        let state = Arc::clone(&self.state);

        let thread = thread::Builder::new()
            .name("compare-worker".to_string())
            .spawn(move || self.run(&sender))
            .map_err(|e| AuditError::Pool(PoolError::Build(e.to_string())))?;

        Ok((
            CompareHandle {
                stopper,
                state,
                thread,
            },
            receiver,
        ))
    }

    /// Run on the calling thread, emitting exactly one terminal event
    pub fn run(&self, events: &EventSender) {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(events, started)));

        let terminal = match outcome {
            Ok(Ok(Some(report))) => {
                self.transition(WorkerState::Done);
                Event::Done(Box::new(report))
            }
            Ok(Ok(None)) => {
                self.transition(WorkerState::Cancelled);
                info!("Comparison cancelled");
                Event::Cancelled
            }
            Ok(Err(e)) => {
                self.transition(WorkerState::Error);
                warn!(error = %e, "Comparison failed");
                Event::Error {
                    message: e.to_string(),
                }
            }
            Err(payload) => {
                self.slot.terminate_active();
                self.slot.clear();
                self.transition(WorkerState::Error);
                Event::Error {
                    message: panic_message(payload.as_ref()),
                }
            }
        };
        events.send(terminal);
    }

    /// `Ok(None)` means the run was cancelled
    fn execute(
        &self,
        events: &EventSender,
        started: Instant,
    ) -> Result<Option<CompareReport>, AuditError> {
        let started_at = Utc::now();
        let config = &self.config;

        self.transition(WorkerState::Scanning);
        validate_dir(&config.source_dir, DirectorySide::Source)?;
        validate_dir(&config.result_dir, DirectorySide::Result)?;

        events.send(Event::Stage {
            text: "Scanning source and result files".to_string(),
        });
        let source_paths = scan_images(&config.source_dir)?;
        let result_paths = scan_images(&config.result_dir)?;
        info!(
            source = source_paths.len(),
            result = result_paths.len(),
            "Scan complete"
        );
        events.send(Event::ScanDone {
            source_total: source_paths.len(),
            result_total: result_paths.len(),
        });

        let fingerprinter =
            ParallelFingerprinter::new(self.launcher.as_ref(), &self.slot, &self.cancel);

        let mut passes = Vec::with_capacity(2);
        for (stage, state, paths) in [
            (
                FingerprintStage::Source,
                WorkerState::FingerprintingSource,
                &source_paths,
            ),
            (
                FingerprintStage::Result,
                WorkerState::FingerprintingResult,
                &result_paths,
            ),
        ] {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            self.transition(state);
            events.send(Event::Stage {
                text: format!("Computing {}", stage),
            });

            let run = fingerprinter.compute_entries(
                paths,
                config.fingerprint,
                config.workers,
                |_, done, total| {
                    events.send(Event::Progress(FingerprintProgress { stage, done, total }));
                },
            )?;
            if run.cancelled || self.cancel.is_cancelled() {
                return Ok(None);
            }
            passes.push(run.entries);
        }

        let result_entries = passes.pop().unwrap_or_default();
        let source_entries = passes.pop().unwrap_or_default();

        self.transition(WorkerState::Comparing);
        events.send(Event::Stage {
            text: "Comparing".to_string(),
        });
        let (records, index) = compare_entries(&source_entries, &result_entries);

        let report = CompareReport::new(
            records,
            &index,
            source_entries,
            result_entries,
            config.fingerprint.mode,
            started_at,
            started.elapsed().as_secs_f64(),
        );
        info!(
            records = report.records.len(),
            issues = report.counts.issues(),
            elapsed = report.elapsed_secs,
            "Comparison complete"
        );
        Ok(Some(report))
    }
}

fn validate_dir(path: &Path, side: DirectorySide) -> Result<(), AuditError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(AuditError::InvalidDirectory {
            side,
            path: path.to_path_buf(),
        })
    }
}

/// Caller-side handle of a spawned run
pub struct CompareHandle {
    stopper: Stopper,
    state: Arc<Mutex<WorkerState>>,
    thread: JoinHandle<()>,
}

impl CompareHandle {
    pub fn request_stop(&self) {
        self.stopper.request_stop();
    }

    pub fn stopper(&self) -> Stopper {
        self.stopper.clone()
    }

    pub fn state(&self) -> WorkerState {
        *lock_state(&self.state)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker thread to exit
    pub fn join(self) {
        let _ = self.thread.join();
    }
}
