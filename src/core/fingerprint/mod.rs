//! # Fingerprint Module
//!
//! Turns a file into a digest string used as a content-addressed key.
//!
//! ## Modes
//! - **Exact** - BLAKE3 over the raw bytes. Byte-identity only.
//! - **Perceptual** - dHash over the decoded pixels. Tolerates resizing and
//!   recompression, may collide for different images.
//!
//! Both are stateless and return errors as values; the pool layer turns
//! them into captured per-file errors.
//!
//! ## Example
//! ```rust,ignore
//! use fingerprint_audit::core::fingerprint::{FingerprintConfig, FingerprintMode};
//!
//! let config = FingerprintConfig::new(FingerprintMode::Perceptual);
//! let digest = config.fingerprint_file(&path)?;
//! ```

mod decode;
mod difference;
mod exact;
mod resize;

pub use decode::decode_image;
pub use difference::{difference_hash, difference_hash_image, DEFAULT_HASH_SIZE, MAX_HASH_SIZE};
pub use exact::{exact_hash, CHUNK_SIZE};

use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Which fingerprint algorithm a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Byte-exact content digest
    #[default]
    Exact,
    /// Difference hash of the decoded image
    Perceptual,
}

impl FingerprintMode {
    /// Get a human-readable description of the mode
    pub fn description(&self) -> &'static str {
        match self {
            FingerprintMode::Exact => "Exact hash (BLAKE3) - identical bytes only",
            FingerprintMode::Perceptual => {
                "Difference Hash (dHash) - tolerant to resizing and recompression"
            }
        }
    }
}

impl std::fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintMode::Exact => write!(f, "exact"),
            FingerprintMode::Perceptual => write!(f, "perceptual"),
        }
    }
}

impl FromStr for FingerprintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(FingerprintMode::Exact),
            "perceptual" | "dhash" => Ok(FingerprintMode::Perceptual),
            other => Err(format!("unknown fingerprint mode: {}", other)),
        }
    }
}

/// Mode plus the parameters the perceptual hash needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintConfig {
    pub mode: FingerprintMode,
    /// dHash grid size; ignored in exact mode
    pub hash_size: u32,
}

impl FingerprintConfig {
    pub fn new(mode: FingerprintMode) -> Self {
        Self {
            mode,
            hash_size: DEFAULT_HASH_SIZE,
        }
    }

    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    /// Fingerprint one file according to this configuration
    pub fn fingerprint_file(&self, path: &Path) -> Result<String, FingerprintError> {
        match self.mode {
            FingerprintMode::Exact => exact_hash(path),
            FingerprintMode::Perceptual => {
                ensure_not_empty(path)?;
                difference_hash(path, self.hash_size)
            }
        }
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::new(FingerprintMode::default())
    }
}

fn ensure_not_empty(path: &Path) -> Result<(), FingerprintError> {
    let metadata = std::fs::metadata(path).map_err(|source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() == 0 {
        return Err(FingerprintError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
