//! # Pipeline Module
//!
//! Orchestrates one comparison run.
//!
//! ## Stages
//! 1. **Scan** - list image files on both sides
//! 2. **Fingerprint source** - on a fresh worker pool
//! 3. **Fingerprint result** - on another fresh worker pool
//! 4. **Compare** - classify each result file
//!
//! ## Concurrency
//! The worker runs on its own thread and is the only producer of events.
//! Fingerprinting fans out to a pool; everything else is synchronous.
//! A stop request sets the shared [`CancellationToken`] and kills the
//! active pool through the [`PoolSlot`](crate::core::pool::PoolSlot).

mod cancel;
mod fingerprinter;
mod worker;

pub use cancel::CancellationToken;
pub use fingerprinter::{FingerprintRun, ParallelFingerprinter, POLL_INTERVAL, STAGE_NAME};
pub use worker::{
    CompareConfig, CompareHandle, CompareWorker, CompareWorkerBuilder, Stopper, WorkerState,
};
