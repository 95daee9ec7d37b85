//! PDF Parser
//!
//! Pure Rust text extraction via pdf-extract - no Tesseract, pdfium or any
//! other system library needed. Scanned/image-only PDFs come back as
//! `ExtractionError::NoText`; there is no OCR fallback.

use super::hints::collect_metadata;
use super::{ExtractionError, ExtractionService};
use crate::config::ExtractConfig;
use crate::models::ExtractedContent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// How far into the file the `%PDF-` marker may appear
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF extractor backed by the pdf-extract crate
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    config: ExtractConfig,
}

impl PdfExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        tracing::debug!(
            max_chars = config.max_chars,
            min_chars = config.min_chars,
            "[PdfExtractor] Initialized with pure Rust extraction"
        );
        Self { config }
    }
}

#[async_trait]
impl ExtractionService for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractionError> {
        // pdf-extract is CPU bound and blocking
        let path: PathBuf = path.to_path_buf();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || parse_pdf(&path, &config))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    ExtractionError::Panicked
                } else {
                    ExtractionError::Unreadable(format!("Task failed: {}", e))
                }
            })?
    }
}

/// Extract text and metadata from a PDF file
/// Wrapped in catch_unwind to handle panics from malformed PDFs
pub fn parse_pdf(path: &Path, config: &ExtractConfig) -> Result<ExtractedContent, ExtractionError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "[PdfExtractor] Read file");

    if !has_pdf_header(&bytes) {
        return Err(ExtractionError::Unsupported(
            "missing %PDF header".to_string(),
        ));
    }

    // The pdf_extract crate (and its cff-parser dependency) can panic on certain fonts/glyphs
    let text = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(&bytes)
    })) {
        Ok(Ok(t)) => t,
        Ok(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "[PdfExtractor] PDF extraction failed");
            return Err(ExtractionError::Unsupported(e.to_string()));
        }
        Err(_panic) => {
            tracing::error!(path = %path.display(), "[PdfExtractor] PDF extraction panicked");
            return Err(ExtractionError::Panicked);
        }
    };

    let raw_len = text.len();
    let text = clean_text(&text);

    if text.chars().count() < config.min_chars {
        tracing::warn!(
            path = %path.display(),
            chars = text.len(),
            "[PdfExtractor] Text too short - likely scanned/image"
        );
        return Err(ExtractionError::NoText {
            chars: text.chars().count(),
        });
    }

    let metadata = collect_metadata(&text, &bytes, config.header_chars);
    let text = truncate_text(&text, config.max_chars);

    tracing::info!(
        file = %path.file_name().unwrap_or_default().to_string_lossy(),
        raw_chars = raw_len,
        chars = text.len(),
        years = ?metadata.year_hints,
        "[PdfExtractor] Extracted"
    );

    Ok(ExtractedContent { text, metadata })
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Trim every line and collapse runs of blank lines into one
///
/// The single blank line kept between paragraphs is what `truncate_text`
/// looks for first.
pub fn clean_text(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() && matches!(lines.last(), None | Some(&"")) {
            continue;
        }
        lines.push(line);
    }
    if lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

/// Truncate text to `max_chars` characters, preferring a paragraph, sentence
/// or word boundary
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let truncated = &text[..cut];

    // Only accept a boundary in the last two thirds, otherwise too much is lost
    let floor = truncated.len() / 3;

    if let Some(pos) = truncated.rfind("\n\n").filter(|&p| p > floor) {
        return truncated[..pos].to_string();
    }
    if let Some(pos) = truncated.rfind(". ").filter(|&p| p > floor) {
        return truncated[..=pos].to_string();
    }
    if let Some(pos) = truncated.rfind(char::is_whitespace).filter(|&p| p > floor) {
        return truncated[..pos].to_string();
    }

    truncated.to_string()
}
