//! Extraction stage
//!
//! Turns a candidate file into text plus metadata. The orchestrator only
//! sees the `ExtractionService` trait; `PdfExtractor` is the pure Rust
//! implementation used by the CLI.

pub mod document_parser;
pub mod hints;

use crate::models::ExtractedContent;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use document_parser::PdfExtractor;

/// Why a file produced no usable content
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("failed to read file: {0}")]
    Unreadable(String),
    #[error("unsupported content: {0}")]
    Unsupported(String),
    /// Too little text; usually a scanned or image-only PDF
    #[error("no extractable text ({chars} chars) - likely scanned/image-based")]
    NoText { chars: usize },
    #[error("PDF parser panicked - likely contains malformed fonts")]
    Panicked,
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("extraction interrupted")]
    Interrupted,
}

/// Produces text and metadata for a file
///
/// Must be safe to call concurrently up to the configured extraction budget.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractionError>;
}
