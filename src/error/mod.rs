//! # Error Module
//!
//! Error types for the fingerprint audit engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, which side of the comparison, what went wrong
//! - **Per-file failures are data** - a file that cannot be fingerprinted is
//!   recorded on its entry, only directory and pool failures abort a run

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Which directory of a comparison an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectorySide {
    Source,
    Result,
}

impl std::fmt::Display for DirectorySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectorySide::Source => write!(f, "Source"),
            DirectorySide::Result => write!(f, "Result"),
        }
    }
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("{side} directory is not valid: {path}")]
    InvalidDirectory { side: DirectorySide, path: PathBuf },

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),
}

/// Errors that occur while enumerating image files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Not an existing directory: {path}")]
    InvalidDirectory { path: PathBuf },

    #[error("Failed to resolve directory {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while fingerprinting a single file
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is empty: {path}")]
    EmptyFile { path: PathBuf },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to resize image: {0}")]
    Resize(String),
}

/// Errors raised by worker pools
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to start worker process {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build thread pool: {0}")]
    Build(String),

    #[error("Worker pool is no longer accepting tasks")]
    Closed,

    #[error("Failed to locate the worker executable: {0}")]
    Executable(#[source] std::io::Error),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, AuditError>;
