//! Shared types for a rename run
//!
//! ```text
//! Candidate ─► ExtractedContent ─► Suggestion ─► Decision ─► Outcome
//! ```
//!
//! A `Candidate` is immutable once enumerated. Every candidate ends in
//! exactly one `Outcome`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One input file enrolled in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Position in enumeration order (also the review/report order)
    pub index: usize,
    /// Full path to the file
    pub path: PathBuf,
    /// Filename at enumeration time
    pub original_name: String,
    /// Size and content hash taken at enumeration time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

/// Identity of a file's contents, independent of its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub size: u64,
    /// Hex SHA-256
    pub sha256: String,
}

impl Candidate {
    pub fn new(index: usize, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            index,
            path,
            original_name,
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Extension of the original file, without the dot
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
    }

    /// Directory the file currently lives in
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Document metadata from extraction
///
/// Info-dictionary fields are often missing or wrong, so the prompt marks
/// them as unreliable. The hint fields are scraped from the text itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub word_count: Option<u32>,
    /// Distinct plausible publication years, in order of first appearance
    #[serde(default)]
    pub year_hints: Vec<u16>,
    /// E-mail addresses, usually printed next to the authors
    #[serde(default)]
    pub email_hints: Vec<String>,
    /// Start of the first page (title/author area)
    pub header_text: Option<String>,
}

/// Text and metadata produced by the extraction stage
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Confidence reported by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Lenient parse; anything unrecognised counts as low
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" | "med" => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed target filename
///
/// Retries produce a new value; an existing suggestion is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Proposed filename, as returned by the model (not yet sanitized)
    pub filename: String,
    pub confidence: Confidence,
    pub reasoning: String,
}

/// Review actions accepted from a reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Accept,
    Edit,
    Retry,
    Skip,
}

/// Resolved review result for one candidate
///
/// `Retry` never appears here: a retry opens a new review pass and only the
/// final pass yields a `Decision`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub candidate: Candidate,
    pub action: DecisionAction,
    /// Target filename for accept/edit
    pub resolved_filename: Option<String>,
    /// Upstream failure behind an automatic skip
    pub error: Option<OutcomeError>,
    /// Number of retry passes before this decision
    pub retries: u32,
    /// Suggestion on screen when the decision was made
    pub suggestion: Option<Suggestion>,
}

/// Stage an outcome error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    Extraction,
    Suggestion,
    Rename,
    Interrupted,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Extraction => "extraction",
            Self::Suggestion => "suggestion",
            Self::Rename => "rename",
            Self::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Serializable error attached to an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeError {
    pub stage: ErrorStage,
    pub message: String,
    /// Whether retrying could plausibly succeed
    pub transient: bool,
}

impl OutcomeError {
    pub fn new(stage: ErrorStage, message: impl Into<String>, transient: bool) -> Self {
        Self {
            stage,
            message: message.into(),
            transient,
        }
    }

    pub fn interrupted() -> Self {
        Self::new(ErrorStage::Interrupted, "interrupted", false)
    }
}

impl fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

/// Terminal state of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeState {
    Renamed,
    Skipped,
    Failed,
}

impl fmt::Display for OutcomeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Renamed => "renamed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Terminal, reportable result of processing one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub candidate: Candidate,
    pub state: OutcomeState,
    pub original_name: String,
    /// Final filename (would-be name in dry-run)
    pub final_name: Option<String>,
    /// Final full path (would-be path in dry-run)
    pub final_path: Option<PathBuf>,
    pub error: Option<OutcomeError>,
    /// Outcome of a dry run; nothing on disk was touched
    pub dry_run: bool,
    /// Model confidence, when the name came from an accepted suggestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Outcome {
    fn new(candidate: &Candidate, state: OutcomeState, dry_run: bool) -> Self {
        Self {
            candidate: candidate.clone(),
            state,
            original_name: candidate.original_name.clone(),
            final_name: None,
            final_path: None,
            error: None,
            dry_run,
            confidence: None,
            reasoning: None,
        }
    }

    pub fn renamed(candidate: &Candidate, final_path: PathBuf, dry_run: bool) -> Self {
        let final_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        Self {
            final_name,
            final_path: Some(final_path),
            ..Self::new(candidate, OutcomeState::Renamed, dry_run)
        }
    }

    pub fn skipped(candidate: &Candidate, error: Option<OutcomeError>, dry_run: bool) -> Self {
        Self {
            error,
            ..Self::new(candidate, OutcomeState::Skipped, dry_run)
        }
    }

    pub fn failed(candidate: &Candidate, error: OutcomeError, dry_run: bool) -> Self {
        Self {
            error: Some(error),
            ..Self::new(candidate, OutcomeState::Failed, dry_run)
        }
    }

    pub fn interrupted(candidate: &Candidate, dry_run: bool) -> Self {
        Self::failed(candidate, OutcomeError::interrupted(), dry_run)
    }

    /// Attach the confidence and reasoning behind the name
    pub fn with_suggestion(mut self, suggestion: &Suggestion) -> Self {
        self.confidence = Some(suggestion.confidence);
        self.reasoning = Some(suggestion.reasoning.trim().to_string()).filter(|r| !r.is_empty());
        self
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(
            self.error,
            Some(OutcomeError {
                stage: ErrorStage::Interrupted,
                ..
            })
        )
    }
}
