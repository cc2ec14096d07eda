//! Verdicts and per-verdict counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The verdict for one result file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompareStatus {
    /// Content traced to exactly one source with an equivalent name
    Match,
    /// Content traced to exactly one source with a different name
    NameMismatch,
    /// No source has this content
    FingerprintNotFound,
    /// Several sources share this content, the origin is ambiguous
    SourceDuplicate,
    /// The result file could not be fingerprinted
    ReadError,
}

impl CompareStatus {
    /// Every status, in report order
    pub const ALL: [CompareStatus; 5] = [
        CompareStatus::Match,
        CompareStatus::NameMismatch,
        CompareStatus::FingerprintNotFound,
        CompareStatus::SourceDuplicate,
        CompareStatus::ReadError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareStatus::Match => "MATCH",
            CompareStatus::NameMismatch => "NAME_MISMATCH",
            CompareStatus::FingerprintNotFound => "FINGERPRINT_NOT_FOUND",
            CompareStatus::SourceDuplicate => "SOURCE_DUPLICATE",
            CompareStatus::ReadError => "READ_ERROR",
        }
    }

    /// Anything other than a match needs a human to look at it
    pub fn is_issue(&self) -> bool {
        !matches!(self, CompareStatus::Match)
    }
}

impl std::fmt::Display for CompareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompareStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        CompareStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("unknown status: {}", s))
    }
}

/// Number of records per status. Always holds all five statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts(BTreeMap<CompareStatus, usize>);

impl StatusCounts {
    pub fn new() -> Self {
        Self(CompareStatus::ALL.into_iter().map(|s| (s, 0)).collect())
    }

    pub fn from_statuses<I: IntoIterator<Item = CompareStatus>>(statuses: I) -> Self {
        let mut counts = Self::new();
        for status in statuses {
            *counts.0.entry(status).or_insert(0) += 1;
        }
        counts
    }

    pub fn get(&self, status: CompareStatus) -> usize {
        self.0.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Records that are not a match
    pub fn issues(&self) -> usize {
        self.0
            .iter()
            .filter(|(status, _)| status.is_issue())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CompareStatus, usize)> + '_ {
        self.0.iter().map(|(s, c)| (*s, *c))
    }
}

impl Default for StatusCounts {
    fn default() -> Self {
        Self::new()
    }
}
