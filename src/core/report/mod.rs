//! # Report Module
//!
//! The payload of a finished comparison and the views callers build from
//! it: every record, issues only, records filtered by status, and the
//! groups of source files that share a fingerprint.

use crate::core::comparator::{CompareRecord, CompareStatus, FingerprintIndex, StatusCounts};
use crate::core::entry::FileEntry;
use crate::core::fingerprint::FingerprintMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything a caller needs to present a finished comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    /// One record per result file, in scan order
    pub records: Vec<CompareRecord>,
    /// Fingerprinted source files, in scan order
    pub source_entries: Vec<FileEntry>,
    /// Fingerprinted result files, in scan order
    pub result_entries: Vec<FileEntry>,
    /// Fingerprints shared by two or more source files
    pub source_duplicates: BTreeMap<String, Vec<FileEntry>>,
    pub counts: StatusCounts,
    pub elapsed_secs: f64,
    pub mode: FingerprintMode,
    pub started_at: DateTime<Utc>,
}

impl CompareReport {
    /// Assemble a report from the comparator output
    pub fn new(
        records: Vec<CompareRecord>,
        index: &FingerprintIndex,
        source_entries: Vec<FileEntry>,
        result_entries: Vec<FileEntry>,
        mode: FingerprintMode,
        started_at: DateTime<Utc>,
        elapsed_secs: f64,
    ) -> Self {
        let counts = StatusCounts::from_statuses(records.iter().map(|r| r.status));
        Self {
            records,
            source_entries,
            result_entries,
            source_duplicates: index.duplicate_groups(),
            counts,
            elapsed_secs,
            mode,
            started_at,
        }
    }

    /// Records that are not a match
    pub fn issues(&self) -> impl Iterator<Item = &CompareRecord> {
        self.records.iter().filter(|r| r.status.is_issue())
    }

    /// Records whose status is in `statuses`
    pub fn with_status<'a>(
        &'a self,
        statuses: &'a [CompareStatus],
    ) -> impl Iterator<Item = &'a CompareRecord> {
        self.records
            .iter()
            .filter(move |r| statuses.contains(&r.status))
    }

    /// Whether every result file traced back to a source with its name intact
    pub fn is_clean(&self) -> bool {
        self.counts.issues() == 0
    }

    /// Source files that no result file traced back to
    pub fn unreferenced_sources(&self) -> Vec<&FileEntry> {
        let referenced: std::collections::HashSet<_> = self
            .records
            .iter()
            .flat_map(|r| r.source_candidates.iter())
            .collect();
        self.source_entries
            .iter()
            .filter(|e| !referenced.contains(&e.path))
            .collect()
    }
}
