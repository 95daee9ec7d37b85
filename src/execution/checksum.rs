//! SHA-256 checksums for copy verification and content fingerprints

use crate::models::Fingerprint;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Buffer size for reading files (8KB)
const BUFFER_SIZE: usize = 8192;

/// Compute the hex SHA-256 of a file's contents
pub fn compute_file_checksum(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// True when both files have identical contents
pub fn same_contents(a: &Path, b: &Path) -> std::io::Result<bool> {
    let len_a = std::fs::metadata(a)?.len();
    let len_b = std::fs::metadata(b)?.len();
    if len_a != len_b {
        return Ok(false);
    }
    Ok(compute_file_checksum(a)? == compute_file_checksum(b)?)
}

/// Size and SHA-256 of a file
pub fn fingerprint(path: &Path) -> std::io::Result<Fingerprint> {
    Ok(Fingerprint {
        size: std::fs::metadata(path)?.len(),
        sha256: compute_file_checksum(path)?,
    })
}

/// True when `path` is a file whose contents match `expected`
///
/// The size is compared first so unrelated files are rarely hashed.
pub fn matches_fingerprint(path: &Path, expected: &Fingerprint) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() == expected.size => {}
        _ => return false,
    }
    compute_file_checksum(path).is_ok_and(|sum| sum == expected.sha256)
}
