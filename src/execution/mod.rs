//! Rename Executor Module
//!
//! Applies accepted names to files. Collision resolution and the move
//! itself happen under one lock so two candidates can never claim the same
//! destination, and a per-run ledger makes repeated applies no-ops.

pub mod checksum;
pub mod executor;
pub mod sanitize;

use crate::models::{ErrorStage, OutcomeError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use executor::RenameExecutor;
pub use sanitize::normalize_target;

/// Most numeric disambiguators tried before giving up (`-2` .. `-1000`)
pub const MAX_DISAMBIGUATION: u32 = 1000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenameError {
    #[error("source file no longer exists: {0}")]
    SourceMissing(PathBuf),
    #[error("invalid target filename: {0:?}")]
    InvalidName(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("cross-device move failed: {0}")]
    CrossDevice(String),
    #[error("copy of {0} did not match the original")]
    VerificationFailed(PathBuf),
    #[error("no free name for {target} after {attempts} attempts")]
    DisambiguationExhausted { target: String, attempts: u32 },
}

impl RenameError {
    pub(crate) fn from_io(context: &str, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(format!("{}: {}", context, e)),
            _ => Self::Io(format!("{}: {}", context, e)),
        }
    }
}

impl From<RenameError> for OutcomeError {
    fn from(e: RenameError) -> Self {
        OutcomeError::new(ErrorStage::Rename, e.to_string(), false)
    }
}
