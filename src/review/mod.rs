//! Review Stage
//!
//! Per-candidate state machine:
//!
//! ```text
//! Pending ─► Presented ─┬─► Accepted
//!               ▲       ├─► Skipped
//!               │       └─► Retrying ─┐
//!               └─────────────────────┘
//! ```
//!
//! `AutoReviewer` accepts every valid suggestion and skips every failure.
//! `InteractiveReviewer` asks a human through a `Prompter`. Only one
//! candidate is ever presented at a time; the pipeline keeps working on
//! later candidates meanwhile.

pub mod interactive;
pub mod prompt;

use crate::ai::SuggestionError;
use crate::execution::normalize_target;
use crate::models::{Candidate, Decision, DecisionAction, OutcomeError, Suggestion};
use crate::pipeline::{Completed, Pipeline, StageFailure};
use async_trait::async_trait;

pub use interactive::InteractiveReviewer;
pub use prompt::{Prompter, TerminalPrompter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Pending,
    Presented,
    Retrying,
    Accepted,
    Skipped,
}

impl ReviewState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Skipped)
    }

    pub fn can_move_to(&self, next: ReviewState) -> bool {
        use ReviewState::*;
        matches!(
            (self, next),
            (Pending, Presented)
                | (Presented, Accepted)
                | (Presented, Skipped)
                | (Presented, Retrying)
                | (Retrying, Presented)
        )
    }
}

/// Review state of the candidate currently in front of a reviewer
#[derive(Debug)]
pub(crate) struct ReviewCursor<'a> {
    candidate: &'a Candidate,
    state: ReviewState,
    retries: u32,
}

impl<'a> ReviewCursor<'a> {
    pub(crate) fn new(candidate: &'a Candidate) -> Self {
        Self {
            candidate,
            state: ReviewState::Pending,
            retries: 0,
        }
    }

    pub(crate) fn advance(&mut self, next: ReviewState) {
        debug_assert!(
            self.state.can_move_to(next),
            "invalid review transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(
            file = %self.candidate.original_name,
            from = ?self.state,
            to = ?next,
            "[Review] Transition"
        );
        if next == ReviewState::Retrying {
            self.retries += 1;
        }
        self.state = next;
    }

    pub(crate) fn accept(
        mut self,
        action: DecisionAction,
        filename: String,
        suggestion: Option<Suggestion>,
    ) -> Decision {
        self.advance(ReviewState::Accepted);
        Decision {
            candidate: self.candidate.clone(),
            action,
            resolved_filename: Some(filename),
            error: None,
            retries: self.retries,
            suggestion,
        }
    }

    pub(crate) fn skip(mut self, error: Option<OutcomeError>) -> Decision {
        if self.state == ReviewState::Pending {
            self.advance(ReviewState::Presented);
        }
        self.advance(ReviewState::Skipped);
        Decision {
            candidate: self.candidate.clone(),
            action: DecisionAction::Skip,
            resolved_filename: None,
            error,
            retries: self.retries,
            suggestion: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn retries(&self) -> u32 {
        self.retries
    }
}

/// Turns a completion into a decision
#[async_trait]
pub trait Reviewer: Send {
    async fn review(&mut self, completed: Completed, pipeline: &Pipeline) -> Decision;
}

/// Non-interactive mode: accept every usable suggestion
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoReviewer;

#[async_trait]
impl Reviewer for AutoReviewer {
    async fn review(&mut self, completed: Completed, _pipeline: &Pipeline) -> Decision {
        let mut cursor = ReviewCursor::new(&completed.candidate);
        cursor.advance(ReviewState::Presented);

        let result = completed.result.and_then(|s| {
            let filename = validated_filename(&completed.candidate, &s)?;
            Ok((filename, s))
        });

        match result {
            Ok((filename, s)) => cursor.accept(DecisionAction::Accept, filename, Some(s)),
            Err(failure) => {
                tracing::info!(
                    file = %completed.candidate.original_name,
                    reason = %failure,
                    "[Review] Skipping"
                );
                cursor.skip(Some(OutcomeError::from(&failure)))
            }
        }
    }
}

/// Apply the filename rules to a model suggestion
///
/// An unusable name is a permanent suggestion failure.
pub fn validated_filename(candidate: &Candidate, suggestion: &Suggestion) -> Result<String, StageFailure> {
    normalize_target(&suggestion.filename, candidate.extension())
        .map_err(|_| StageFailure::Suggestion(SuggestionError::InvalidFilename(suggestion.filename.clone())))
}
