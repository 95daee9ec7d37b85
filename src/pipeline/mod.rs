//! Pipeline Orchestrator
//!
//! Drives candidates through extraction and suggestion under two
//! independent budgets and hands results back strictly in enumeration
//! order:
//!
//! ```text
//!            admission window (lookahead)
//! candidates ─────────┬──────────────────────────────► feeder
//!                     ▼
//!   [extraction budget] ──► [suggestion budget] ──► mpsc ──► ReleaseBuffer ──► reviewer
//!                                   ▲                                             │
//!                                   └────────── resuggest (priority lane) ◄───────┘
//! ```

pub mod abort;
pub mod gate;
pub mod orchestrator;
pub mod release;

use crate::ai::SuggestionError;
use crate::extract::ExtractionError;
use crate::models::{ErrorStage, OutcomeError};
use thiserror::Error;

pub use abort::AbortSignal;
pub use orchestrator::{Completed, Pipeline, PipelineStream};
pub use release::ReleaseBuffer;

/// Why a candidate has no suggestion
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageFailure {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("suggestion failed: {0}")]
    Suggestion(#[from] SuggestionError),
}

impl StageFailure {
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Extraction(ExtractionError::Interrupted)
                | Self::Suggestion(SuggestionError::Interrupted)
        )
    }

    /// Whether asking again could help
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Extraction(e) => matches!(e, ExtractionError::Timeout(_)),
            Self::Suggestion(e) => e.is_transient(),
        }
    }
}

impl From<&StageFailure> for OutcomeError {
    fn from(failure: &StageFailure) -> Self {
        if failure.is_interrupted() {
            return OutcomeError::interrupted();
        }
        let (stage, message) = match failure {
            StageFailure::Extraction(e) => (ErrorStage::Extraction, e.to_string()),
            StageFailure::Suggestion(e) => (ErrorStage::Suggestion, e.to_string()),
        };
        OutcomeError::new(stage, message, failure.is_transient())
    }
}
