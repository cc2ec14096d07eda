//! Extension allow-list for the scanner.

use std::collections::HashSet;
use std::path::Path;

/// Image extensions considered by default, lowercase and without the dot.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff", "avif",
];

/// Decides whether a path is a candidate image by its extension
#[derive(Debug, Clone)]
pub struct ImageFilter {
    extensions: HashSet<String>,
}

impl ImageFilter {
    /// Create a filter accepting [`IMAGE_EXTENSIONS`]
    pub fn new() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Check the extension case-insensitively
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_case_insensitive() {
        let filter = ImageFilter::new();
        assert!(filter.accepts(Path::new("/photos/image.jpg")));
        assert!(filter.accepts(Path::new("/photos/image.JPEG")));
        assert!(filter.accepts(Path::new("/photos/scan.TiF")));
    }

    #[test]
    fn filter_accepts_avif() {
        assert!(ImageFilter::new().accepts(Path::new("/out/frame.avif")));
    }

    #[test]
    fn filter_excludes_non_images() {
        let filter = ImageFilter::new();
        assert!(!filter.accepts(Path::new("/photos/document.pdf")));
        assert!(!filter.accepts(Path::new("/photos/photo.heic")));
        assert!(!filter.accepts(Path::new("/photos/no_extension")));
    }

    #[test]
    fn hidden_files_are_not_special() {
        assert!(ImageFilter::new().accepts(Path::new("/photos/.hidden.png")));
    }

}
