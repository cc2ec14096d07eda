//! # Core Module
//!
//! The presentation-agnostic audit engine.
//!
//! ## Modules
//! - `scanner` - Lists image files in a directory tree
//! - `entry` - Per-file record filled by fingerprinting
//! - `fingerprint` - Exact and perceptual fingerprints
//! - `pool` - Thread and process worker pools
//! - `comparator` - Classifies result files against source fingerprints
//! - `report` - The payload of a finished comparison
//! - `pipeline` - Orchestrates the full workflow

pub mod comparator;
pub mod entry;
pub mod fingerprint;
pub mod pipeline;
pub mod pool;
pub mod report;
pub mod scanner;

// Re-export commonly used types
pub use comparator::{CompareRecord, CompareStatus, StatusCounts};
pub use entry::FileEntry;
pub use fingerprint::{FingerprintConfig, FingerprintMode};
pub use report::CompareReport;
