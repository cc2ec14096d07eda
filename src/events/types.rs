//! Event type definitions for progress reporting.

use crate::core::report::CompareReport;
use serde::{Deserialize, Serialize};

/// All events emitted by a comparison run.
///
/// `Stage`, `ScanDone` and `Progress` are advisory. `Done`, `Cancelled` and
/// `Error` are terminal and exactly one of them ends every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Human-readable description of what the worker is doing now
    Stage { text: String },
    /// Both directories were scanned
    ScanDone {
        source_total: usize,
        result_total: usize,
    },
    /// A fingerprint task finished
    Progress(FingerprintProgress),
    /// Comparison finished
    Done(Box<CompareReport>),
    /// The run was stopped on request
    Cancelled,
    /// The run failed
    Error { message: String },
}

impl Event {
    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Done(_) | Event::Cancelled | Event::Error { .. })
    }
}

/// Which file set is being fingerprinted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintStage {
    Source,
    Result,
}

impl std::fmt::Display for FingerprintStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintStage::Source => write!(f, "source fingerprints"),
            FingerprintStage::Result => write!(f, "result fingerprints"),
        }
    }
}

/// Progress information during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    /// Which side is being fingerprinted
    pub stage: FingerprintStage,
    /// Number of files finished so far
    pub done: usize,
    /// Number of files in this stage
    pub total: usize,
}
