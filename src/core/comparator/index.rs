//! Digest to source entries lookup.

use crate::core::entry::FileEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Source entries grouped by fingerprint, in scan order within a group.
/// Entries without a fingerprint are never indexed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintIndex {
    groups: HashMap<String, Vec<FileEntry>>,
}

impl FingerprintIndex {
    pub fn build(entries: &[FileEntry]) -> Self {
        let mut groups: HashMap<String, Vec<FileEntry>> = HashMap::new();
        for entry in entries {
            if let Some(fingerprint) = entry.fingerprint.as_deref().filter(|f| !f.is_empty()) {
                groups
                    .entry(fingerprint.to_string())
                    .or_default()
                    .push(entry.clone());
            }
        }
        Self { groups }
    }

    /// Sources sharing `fingerprint`; empty if none
    pub fn get(&self, fingerprint: &str) -> &[FileEntry] {
        self.groups
            .get(fingerprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct fingerprints
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups of two or more sources with the same fingerprint, ordered by
    /// fingerprint
    pub fn duplicate_groups(&self) -> BTreeMap<String, Vec<FileEntry>> {
        self.groups
            .iter()
            .filter(|(_, entries)| entries.len() > 1)
            .map(|(fingerprint, entries)| (fingerprint.clone(), entries.clone()))
            .collect()
    }
}
