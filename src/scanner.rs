//! Candidate enumeration
//!
//! Lists the files in a directory that match a glob pattern (`*.pdf` by
//! default). The result is sorted so enumeration order, and therefore
//! review and report order, is stable between runs.

use crate::execution::checksum::fingerprint;
use crate::models::Candidate;
use glob::Pattern;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("directory path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Enumerate candidates under `dir` matching `pattern`
///
/// The pattern is relative to `dir` and may contain `**` to recurse.
/// Directories and unreadable entries are ignored.
pub fn scan_candidates(dir: &Path, pattern: &str) -> Result<Vec<Candidate>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let dir_str = dir
        .to_str()
        .ok_or_else(|| ScanError::NonUtf8Path(dir.to_path_buf()))?;
    let full_pattern = format!(
        "{}/{}",
        Pattern::escape(dir_str.trim_end_matches('/')),
        pattern
    );

    let entries = glob::glob(&full_pattern).map_err(|e| ScanError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable entry");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();

    paths.sort();
    paths.dedup();

    tracing::debug!(dir = %dir.display(), pattern, found = paths.len(), "Scanned for candidates");

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| enroll(index, path))
        .collect())
}

/// Build a candidate and fingerprint it while it is still in place
///
/// Without a fingerprint the executor cannot recognise the file after an
/// unrecorded move, so a failure here is logged and otherwise ignored.
fn enroll(index: usize, path: PathBuf) -> Candidate {
    let candidate = Candidate::new(index, path);
    match fingerprint(&candidate.path) {
        Ok(fp) => candidate.with_fingerprint(fp),
        Err(e) => {
            tracing::warn!(file = %candidate.original_name, error = %e, "Could not fingerprint candidate");
            candidate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.pdf"), "x").unwrap();
        fs::write(dir.path().join("a.pdf"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let candidates = scan_candidates(dir.path(), "*.pdf").unwrap();
        let names: Vec<_> = candidates.iter().map(|c| c.original_name.as_str()).collect();

        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert_eq!(candidates[0].index, 0);
        assert_eq!(candidates[1].index, 1);
    }

    #[test]
    fn test_scan_fingerprints_candidates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), "hello").unwrap();

        let candidates = scan_candidates(dir.path(), "*.pdf").unwrap();
        let fp = candidates[0].fingerprint.as_ref().unwrap();

        assert_eq!(fp.size, 5);
        assert_eq!(
            fp.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_scan_recursive_pattern() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.pdf"), "x").unwrap();
        fs::write(dir.path().join("sub").join("deep.pdf"), "x").unwrap();

        let flat = scan_candidates(dir.path(), "*.pdf").unwrap();
        assert_eq!(flat.len(), 1);

        let deep = scan_candidates(dir.path(), "**/*.pdf").unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_scan_rejects_missing_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            scan_candidates(&missing, "*.pdf"),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_scan_rejects_bad_pattern() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            scan_candidates(dir.path(), "[*.pdf"),
            Err(ScanError::InvalidPattern { .. })
        ));
    }
}
