//! Directory walking implementation using walkdir.

use super::filter::ImageFilter;
use crate::error::ScanError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recursively enumerates image files under a directory
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    filter: ImageFilter,
}

impl FileScanner {
    /// List every accepted file under `root`, as absolute paths sorted
    /// lexicographically.
    ///
    /// Subdirectories that cannot be read are skipped with a warning.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::InvalidDirectory {
                path: root.to_path_buf(),
            });
        }

        let root = std::path::absolute(root).map_err(|source| ScanError::Resolve {
            path: root.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry_result in WalkDir::new(&root) {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        path = ?e.path().unwrap_or(&root),
                        error = %e,
                        "Skipping unreadable entry"
                    );
                    continue;
                }
            };

            let path = entry.path();
            if path.is_file() && self.filter.accepts(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        debug!(root = ?root, files = files.len(), "Scan complete");
        Ok(files)
    }
}
