//! Exact content hash.
//!
//! Streams the file through BLAKE3 in fixed 1 MiB chunks so memory use is
//! flat regardless of file size. Any single-byte difference changes the
//! digest.

use crate::error::FingerprintError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read size for streaming hashes
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Hash the whole file and return the 256-bit digest as lowercase hex
pub fn exact_hash(path: &Path) -> Result<String, FingerprintError> {
    let io_error = |source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(e)),
        };
        hasher.update(&buffer[..read]);
        total += read as u64;
    }

    if total == 0 {
        return Err(FingerprintError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    Ok(hasher.finalize().to_hex().to_string())
}
