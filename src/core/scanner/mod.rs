//! # Scanner Module
//!
//! Finds candidate image files in a directory tree.
//!
//! ## Supported Extensions
//! jpg, jpeg, png, webp, bmp, gif, tif, tiff, avif (case-insensitive).
//! Hidden files are not treated specially.
//!
//! Output is sorted so the order of every later stage is reproducible
//! regardless of filesystem traversal order.
//!
//! ## Example
//! ```rust,ignore
//! use fingerprint_audit::core::scanner::scan_images;
//!
//! let files = scan_images(Path::new("/renamed/output"))?;
//! ```

mod filter;
mod walker;

pub use filter::{ImageFilter, IMAGE_EXTENSIONS};
pub use walker::FileScanner;

use crate::error::ScanError;
use std::path::{Path, PathBuf};

/// Scan `root` with the default extension allow-list
pub fn scan_images(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    FileScanner::default().scan(root)
}
