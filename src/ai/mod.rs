//! Suggestion stage
//!
//! Asks a language model for a descriptive filename. The orchestrator only
//! sees the `SuggestionService` trait; `LlmSuggester` talks to any
//! OpenAI-compatible chat completions endpoint (OpenAI, Ollama, LM Studio).

pub mod client;
pub mod prompts;
pub mod utils;

use crate::models::{ExtractedContent, Suggestion};
use async_trait::async_trait;
use thiserror::Error;

pub use client::LlmSuggester;

/// Why no suggestion was produced
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SuggestionError {
    #[error("model call timed out")]
    Timeout,
    #[error("rate limited by model endpoint: {0}")]
    RateLimited(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("model endpoint error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
    #[error("no content to analyze")]
    EmptyContent,
    #[error("model returned an unusable filename: {0:?}")]
    InvalidFilename(String),
    #[error("suggestion service panicked")]
    Panicked,
    #[error("suggestion interrupted")]
    Interrupted,
}

impl SuggestionError {
    /// Transient errors may succeed on a retry; permanent ones will not
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Malformed(_)
            | Self::EmptyContent
            | Self::InvalidFilename(_)
            | Self::Panicked
            | Self::Interrupted => false,
        }
    }
}

/// Proposes a filename for extracted content
///
/// Must be safe to call concurrently up to the configured suggestion
/// budget. Implementations do not retry on their own; retries are decided
/// by the reviewer.
#[async_trait]
pub trait SuggestionService: Send + Sync {
    async fn suggest(
        &self,
        original_name: &str,
        content: &ExtractedContent,
    ) -> Result<Suggestion, SuggestionError>;
}
