//! Rename Executor
//!
//! `apply` resolves the destination, claims it in the run's namespace and
//! moves the file. Same-filesystem moves use an atomic rename; across
//! filesystems the file is copied to a hidden sibling, verified, renamed
//! into place and only then removed from its old location.

use super::checksum::{matches_fingerprint, same_contents};
use super::sanitize::normalize_target;
use super::{RenameError, MAX_DISAMBIGUATION};
use crate::models::{Candidate, Outcome};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// `EXDEV` on unix, `ERROR_NOT_SAME_DEVICE` on windows
#[cfg(unix)]
const CROSS_DEVICE_OS_ERROR: i32 = 18;
#[cfg(windows)]
const CROSS_DEVICE_OS_ERROR: i32 = 17;
#[cfg(not(any(unix, windows)))]
const CROSS_DEVICE_OS_ERROR: i32 = -1;

/// Destination namespace and ledger for one run
#[derive(Debug, Default)]
struct Namespace {
    /// Paths handed out by this run, real or simulated
    claimed: HashSet<PathBuf>,
    /// Originals moved away during a dry run
    vacated: HashSet<PathBuf>,
    /// (original path, normalized name) -> final path
    ledger: HashMap<(PathBuf, String), PathBuf>,
}

impl Namespace {
    fn is_occupied(&self, path: &Path, dry_run: bool) -> bool {
        if self.claimed.contains(path) {
            return true;
        }
        if dry_run && self.vacated.contains(path) {
            return false;
        }
        // symlink_metadata so dangling links still count
        fs::symlink_metadata(path).is_ok()
    }

    fn source_present(&self, source: &Path, dry_run: bool) -> bool {
        if dry_run && self.vacated.contains(source) {
            return false;
        }
        source.exists()
    }

    /// First free path among `base`, `stem-2.ext`, `stem-3.ext`, ...
    ///
    /// The candidate's own path counts as free.
    fn resolve(&self, base: &Path, own: &Path, dry_run: bool) -> Result<PathBuf, RenameError> {
        for n in 1..=MAX_DISAMBIGUATION {
            let path = if n == 1 {
                base.to_path_buf()
            } else {
                disambiguate(base, n)
            };
            if path == own || !self.is_occupied(&path, dry_run) {
                return Ok(path);
            }
        }

        Err(RenameError::DisambiguationExhausted {
            target: base
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            attempts: MAX_DISAMBIGUATION,
        })
    }

    /// Where an earlier, unrecorded apply left the candidate, if anywhere
    ///
    /// Walks `base`, `base-2`, ... up to the first free name and only
    /// accepts a file whose contents match the enumeration fingerprint.
    fn find_moved(&self, candidate: &Candidate, base: &Path) -> Option<PathBuf> {
        let expected = candidate.fingerprint.as_ref()?;

        for n in 1..=MAX_DISAMBIGUATION {
            let path = if n == 1 {
                base.to_path_buf()
            } else {
                disambiguate(base, n)
            };
            if fs::symlink_metadata(&path).is_err() {
                return None;
            }
            if !self.claimed.contains(&path) && matches_fingerprint(&path, expected) {
                return Some(path);
            }
        }

        None
    }

    fn record(&mut self, key: (PathBuf, String), source: &Path, final_path: &Path) {
        self.claimed.insert(final_path.to_path_buf());
        self.vacated.insert(source.to_path_buf());
        self.ledger.insert(key, final_path.to_path_buf());
    }
}

/// `dir/stem.ext` -> `dir/stem-n.ext`
fn disambiguate(base: &Path, n: u32) -> PathBuf {
    let parent = base.parent().unwrap_or(Path::new("."));
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    parent.join(format!("{}-{}{}", stem, n, ext))
}

/// Applies accepted names; one instance per run
#[derive(Debug, Clone, Default)]
pub struct RenameExecutor {
    namespace: Arc<Mutex<Namespace>>,
}

impl RenameExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename `candidate` to `target_filename`, in place or into `output_dir`
    ///
    /// Never fails as a call: every error becomes a `failed` outcome.
    pub async fn apply(
        &self,
        candidate: &Candidate,
        target_filename: &str,
        output_dir: Option<&Path>,
        dry_run: bool,
    ) -> Outcome {
        let this = self.clone();
        let owned = candidate.clone();
        let target = target_filename.to_string();
        let output_dir = output_dir.map(Path::to_path_buf);

        tokio::task::spawn_blocking(move || {
            this.apply_blocking(&owned, &target, output_dir.as_deref(), dry_run)
        })
        .await
        .unwrap_or_else(|e| {
            Outcome::failed(
                candidate,
                RenameError::Io(format!("Task failed: {}", e)).into(),
                dry_run,
            )
        })
    }

    /// Synchronous body of `apply`
    pub fn apply_blocking(
        &self,
        candidate: &Candidate,
        target_filename: &str,
        output_dir: Option<&Path>,
        dry_run: bool,
    ) -> Outcome {
        let file_name = match normalize_target(target_filename, candidate.extension()) {
            Ok(name) => name,
            Err(e) => return Outcome::failed(candidate, e.into(), dry_run),
        };

        // The lock covers resolve, claim and move
        let mut ns = self
            .namespace
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let key = (candidate.path.clone(), file_name.clone());
        if let Some(done) = ns.ledger.get(&key) {
            tracing::debug!(
                file = %candidate.original_name,
                final_path = %done.display(),
                "[RenameExecutor] Already applied in this run"
            );
            return Outcome::renamed(candidate, done.clone(), dry_run);
        }

        let dest_dir = output_dir.unwrap_or_else(|| candidate.parent_dir());
        let base = dest_dir.join(&file_name);

        if base == candidate.path {
            tracing::info!(file = %candidate.original_name, "[RenameExecutor] Already named, skipping");
            return Outcome::skipped(candidate, None, dry_run);
        }

        if !ns.source_present(&candidate.path, dry_run) {
            if !dry_run {
                if let Some(found) = ns.find_moved(candidate, &base) {
                    tracing::info!(
                        file = %candidate.original_name,
                        final_path = %found.display(),
                        "[RenameExecutor] Source gone but its contents are at the target, treating as applied"
                    );
                    ns.record(key, &candidate.path, &found);
                    return Outcome::renamed(candidate, found, dry_run);
                }
            }
            return Outcome::failed(
                candidate,
                RenameError::SourceMissing(candidate.path.clone()).into(),
                dry_run,
            );
        }

        let final_path = match ns.resolve(&base, &candidate.path, dry_run) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(file = %candidate.original_name, error = %e, "[RenameExecutor] Disambiguation exhausted");
                return Outcome::failed(candidate, e.into(), dry_run);
            }
        };

        if final_path == candidate.path {
            tracing::info!(file = %candidate.original_name, "[RenameExecutor] Already named, skipping");
            return Outcome::skipped(candidate, None, dry_run);
        }

        if !dry_run {
            if let Err(e) = move_file(&candidate.path, &final_path) {
                tracing::warn!(
                    file = %candidate.original_name,
                    target = %final_path.display(),
                    error = %e,
                    "[RenameExecutor] Move failed"
                );
                return Outcome::failed(candidate, e.into(), dry_run);
            }
        }

        tracing::info!(
            from = %candidate.original_name,
            to = %final_path.display(),
            dry_run,
            "[RenameExecutor] Renamed"
        );

        ns.record(key, &candidate.path, &final_path);
        Outcome::renamed(candidate, final_path, dry_run)
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(CROSS_DEVICE_OS_ERROR)
}

/// Move `source` to `destination`, which must not exist
fn move_file(source: &Path, destination: &Path) -> Result<(), RenameError> {
    if let Some(parent) = destination.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| RenameError::from_io("Failed to create destination directory", e))?;
        }
    }

    // Re-check right before the rename; fs::rename replaces silently
    if fs::symlink_metadata(destination).is_ok() {
        return Err(RenameError::Io(format!(
            "destination appeared during rename: {}",
            destination.display()
        )));
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(
                source = %source.display(),
                "[RenameExecutor] Cross-device move, copying"
            );
            copy_verify_replace(source, destination)
        }
        Err(e) => Err(RenameError::from_io("Failed to rename", e)),
    }
}

/// Copy-then-verify-then-delete move for different filesystems
///
/// On any failure the original is left in place and no partial file
/// remains at or next to the destination.
pub(crate) fn copy_verify_replace(source: &Path, destination: &Path) -> Result<(), RenameError> {
    let parent = destination.parent().unwrap_or(Path::new("."));
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let partial = parent.join(format!(".{}.partial-{}", name, uuid::Uuid::new_v4().simple()));

    if let Err(e) = copy_into_place(source, &partial, destination) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    if let Err(e) = fs::remove_file(source) {
        // Roll back so the file exists exactly once
        let _ = fs::remove_file(destination);
        return Err(RenameError::from_io("Failed to remove original after copy", e));
    }

    Ok(())
}

fn copy_into_place(source: &Path, partial: &Path, destination: &Path) -> Result<(), RenameError> {
    fs::copy(source, partial).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => RenameError::from_io("Failed to copy", e),
        _ => RenameError::CrossDevice(e.to_string()),
    })?;

    let verified = same_contents(source, partial)
        .map_err(|e| RenameError::CrossDevice(format!("Failed to verify copy: {}", e)))?;
    if !verified {
        return Err(RenameError::VerificationFailed(source.to_path_buf()));
    }

    if fs::symlink_metadata(destination).is_ok() {
        return Err(RenameError::CrossDevice(format!(
            "destination appeared during copy: {}",
            destination.display()
        )));
    }

    fs::rename(partial, destination).map_err(|e| RenameError::from_io("Failed to rename copy", e))
}
