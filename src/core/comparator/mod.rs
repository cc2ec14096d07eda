//! # Comparator Module
//!
//! Classifies every result file against the source set by fingerprint.
//!
//! ## How It Works
//! 1. Index source entries by fingerprint
//! 2. For each result entry, in scan order, the first matching rule wins:
//!
//! | Rule | Condition                                   | Status                  |
//! |------|---------------------------------------------|-------------------------|
//! | 1    | error captured, or no fingerprint           | `READ_ERROR`            |
//! | 2    | fingerprint not in the index                | `FINGERPRINT_NOT_FOUND` |
//! | 3    | fingerprint shared by two or more sources   | `SOURCE_DUPLICATE`      |
//! | 4    | one source, same name ignoring case         | `MATCH`                 |
//! | 5    | one source, same normalized name            | `MATCH`                 |
//! | 6    | one source, different name                  | `NAME_MISMATCH`         |
//!
//! Content is the ground truth and the name is what is being audited, so a
//! fingerprint match always wins over any name heuristic. Ambiguous content
//! is reported as such and never resolved by picking the closest name.

mod index;
mod status;

pub use index::FingerprintIndex;
pub use status::{CompareStatus, StatusCounts};

use crate::core::entry::FileEntry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Names listed in a `SOURCE_DUPLICATE` explanation before summarising
const LISTED_DUPLICATES: usize = 3;

/// The verdict for one result file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRecord {
    pub status: CompareStatus,
    pub result_path: PathBuf,
    pub result_name: String,
    pub result_fingerprint: Option<String>,
    /// Empty, one, or every source sharing the fingerprint, depending on status
    pub source_candidates: Vec<PathBuf>,
    /// Human-readable explanation
    pub details: String,
}

impl CompareRecord {
    fn new(
        status: CompareStatus,
        result: &FileEntry,
        source_candidates: Vec<PathBuf>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            status,
            result_path: result.path.clone(),
            result_name: result.filename.clone(),
            result_fingerprint: result.fingerprint.clone(),
            source_candidates,
            details: details.into(),
        }
    }
}

/// Classify every result entry against the source entries.
///
/// Returns one record per result entry, in the same order, and the source
/// index so duplicate groups can be reported separately.
pub fn compare_entries(
    source_entries: &[FileEntry],
    result_entries: &[FileEntry],
) -> (Vec<CompareRecord>, FingerprintIndex) {
    let index = FingerprintIndex::build(source_entries);
    let records = result_entries
        .iter()
        .map(|result| classify(result, &index))
        .collect();
    (records, index)
}

/// Apply the classification rules to a single result entry
pub fn classify(result: &FileEntry, index: &FingerprintIndex) -> CompareRecord {
    if let Some(ref error) = result.error {
        return CompareRecord::new(
            CompareStatus::ReadError,
            result,
            Vec::new(),
            format!("failed to read result file: {}", error),
        );
    }

    let fingerprint = match result.fingerprint.as_deref() {
        Some(fp) if !fp.is_empty() => fp,
        _ => {
            return CompareRecord::new(
                CompareStatus::ReadError,
                result,
                Vec::new(),
                "no fingerprint was produced for the result file",
            )
        }
    };

    let candidates = index.get(fingerprint);
    match candidates {
        [] => CompareRecord::new(
            CompareStatus::FingerprintNotFound,
            result,
            Vec::new(),
            "no source file has the same fingerprint",
        ),
        [source] => name_verdict(result, source),
        _ => CompareRecord::new(
            CompareStatus::SourceDuplicate,
            result,
            candidates.iter().map(|c| c.path.clone()).collect(),
            duplicate_details(candidates),
        ),
    }
}

fn name_verdict(result: &FileEntry, source: &FileEntry) -> CompareRecord {
    let (status, details) = if source.filename.to_lowercase() == result.filename.to_lowercase() {
        (CompareStatus::Match, "name exact match".to_string())
    } else if source.normalized_name == result.normalized_name {
        (
            CompareStatus::Match,
            "normalized name match (separators/case ignored)".to_string(),
        )
    } else {
        (
            CompareStatus::NameMismatch,
            format!("source name: {}", source.filename),
        )
    };
    CompareRecord::new(status, result, vec![source.path.clone()], details)
}

fn duplicate_details(candidates: &[FileEntry]) -> String {
    let names: Vec<&str> = candidates
        .iter()
        .take(LISTED_DUPLICATES)
        .map(|c| c.filename.as_str())
        .collect();
    let mut details = format!(
        "{} source files share this fingerprint: {}",
        candidates.len(),
        names.join(", ")
    );
    if candidates.len() > LISTED_DUPLICATES {
        details.push_str(&format!(" and {} more", candidates.len() - LISTED_DUPLICATES));
    }
    details
}
