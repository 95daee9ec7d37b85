//! Run configuration
//!
//! Everything run-wide is folded into immutable values built once by the
//! driver and threaded through `run_batch`. Nothing here is global, so two
//! runs in the same process never see each other's settings.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default cap on concurrent PDF extractions
pub const DEFAULT_EXTRACTION_BUDGET: usize = 10;

/// Default cap on concurrent model calls (the rate-limited resource)
pub const DEFAULT_SUGGESTION_BUDGET: usize = 3;

/// Extra admission slack on top of both budgets
const LOOKAHEAD_SLACK: usize = 8;

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    ZeroBudget(&'static str),
    #[error("output path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to create output directory {path}: {message}")]
    CreateOutputDir { path: PathBuf, message: String },
}

/// Settings for one batch run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Max extraction calls in flight
    pub extraction_budget: usize,
    /// Max suggestion calls in flight
    pub suggestion_budget: usize,
    /// Ask the user about every file
    pub interactive: bool,
    /// Resolve everything but leave the filesystem alone
    pub dry_run: bool,
    /// Move renamed files here instead of renaming in place
    pub output_dir: Option<PathBuf>,
    pub extraction_timeout: Duration,
    pub suggestion_timeout: Duration,
    /// Max candidates admitted ahead of the review cursor (None = derived)
    pub lookahead: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            extraction_budget: DEFAULT_EXTRACTION_BUDGET,
            suggestion_budget: DEFAULT_SUGGESTION_BUDGET,
            interactive: false,
            dry_run: true,
            output_dir: None,
            extraction_timeout: Duration::from_secs(60),
            suggestion_timeout: Duration::from_secs(120),
            lookahead: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction_budget == 0 {
            return Err(ConfigError::ZeroBudget("extraction budget"));
        }
        if self.suggestion_budget == 0 {
            return Err(ConfigError::ZeroBudget("suggestion budget"));
        }
        if self.lookahead == Some(0) {
            return Err(ConfigError::ZeroBudget("lookahead"));
        }
        Ok(())
    }

    /// Admission window size
    pub fn effective_lookahead(&self) -> usize {
        self.lookahead
            .unwrap_or(self.extraction_budget + self.suggestion_budget + LOOKAHEAD_SLACK)
            .max(1)
    }

    /// Create the output directory if one is configured
    ///
    /// Skipped in dry-run so a preview never touches the filesystem.
    pub fn prepare_output_dir(&self) -> Result<(), ConfigError> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };

        if dir.exists() {
            if !dir.is_dir() {
                return Err(ConfigError::NotADirectory(dir.clone()));
            }
            return Ok(());
        }

        if self.dry_run {
            return Ok(());
        }

        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateOutputDir {
            path: dir.clone(),
            message: e.to_string(),
        })
    }
}

/// Settings for the OpenAI-compatible model endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    /// Base URL up to and including `/v1`
    pub base_url: String,
    /// Optional for local servers such as Ollama or LM Studio
    pub api_key: Option<String>,
    /// Re-ask once with a focused prompt when confidence comes back low
    pub second_pass: bool,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            second_pass: true,
            temperature: 0.2,
        }
    }
}

/// Settings for PDF text extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Characters of text handed to the model
    pub max_chars: usize,
    /// Below this the PDF is treated as scanned/image-only
    pub min_chars: usize,
    /// Size of the title/author header hint
    pub header_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_chars: 5000,
            min_chars: 50,
            header_chars: 500,
        }
    }
}
