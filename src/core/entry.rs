//! Per-file record carried from the scanner through fingerprinting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A scanned file and, once fingerprinting has run, its digest or the
/// reason it has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path of the file
    pub path: PathBuf,
    /// File name including extension
    pub filename: String,
    /// Lowercased stem with every non-alphanumeric character removed
    pub normalized_name: String,
    /// Content digest, if fingerprinting succeeded
    pub fingerprint: Option<String>,
    /// Captured failure, if fingerprinting failed
    pub error: Option<String>,
}

impl FileEntry {
    /// Create an entry with no fingerprint yet
    pub fn new(path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let normalized_name = normalize_name(&filename);
        Self {
            path: path.to_path_buf(),
            filename,
            normalized_name,
            fingerprint: None,
            error: None,
        }
    }

    /// Whether the fingerprinting stage reported back for this entry
    pub fn is_resolved(&self) -> bool {
        self.fingerprint.is_some() || self.error.is_some()
    }
}

/// Lowercase the stem of `name` and keep only alphanumeric characters.
///
/// `"IMG_0001 (copy).JPG"` becomes `"img0001copy"`.
pub fn normalize_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    stem.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators_and_case() {
        assert_eq!(normalize_name("IMG_0001 (copy).JPG"), "img0001copy");
        assert_eq!(normalize_name("my-photo.final.png"), "myphotofinal");
    }

    #[test]
    fn normalize_keeps_non_ascii_letters() {
        assert_eq!(normalize_name("사진_01.png"), "사진01");
    }

    #[test]
    fn normalize_without_extension() {
        assert_eq!(normalize_name("README"), "readme");
    }

    #[test]
    fn new_entry_is_unresolved() {
        let entry = FileEntry::new(Path::new("/out/Cat-01.PNG"));
        assert_eq!(entry.filename, "Cat-01.PNG");
        assert_eq!(entry.normalized_name, "cat01");
        assert!(!entry.is_resolved());
    }
}
