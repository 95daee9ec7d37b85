//! Interactive accept / edit / retry / skip protocol

use super::prompt::Prompter;
use super::{validated_filename, ReviewCursor, ReviewState, Reviewer};
use crate::execution::normalize_target;
use crate::models::{Candidate, Decision, DecisionAction, OutcomeError, Suggestion};
use crate::pipeline::{AbortSignal, Completed, Pipeline, StageFailure};
use async_trait::async_trait;

/// One answer from the reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Accept,
    Edit,
    Retry,
    Skip,
}

/// Parse an answer; empty input picks `default`
pub fn parse_choice(input: &str, default: Choice) -> Option<Choice> {
    match input.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" | "a" | "accept" => Some(Choice::Accept),
        "e" | "edit" => Some(Choice::Edit),
        "r" | "retry" => Some(Choice::Retry),
        "n" | "no" | "s" | "skip" => Some(Choice::Skip),
        _ => None,
    }
}

enum Answer {
    Line(String),
    Closed,
    Interrupted,
}

/// Asks a human about every candidate
pub struct InteractiveReviewer<'p> {
    prompter: &'p mut dyn Prompter,
    abort: AbortSignal,
}

impl<'p> InteractiveReviewer<'p> {
    pub fn new(prompter: &'p mut dyn Prompter, abort: AbortSignal) -> Self {
        Self { prompter, abort }
    }

    async fn ask(&mut self, question: &str) -> Answer {
        tokio::select! {
            biased;
            _ = self.abort.aborted() => Answer::Interrupted,
            line = self.prompter.ask(question) => match line {
                Some(line) => Answer::Line(line),
                None => Answer::Closed,
            },
        }
    }

    async fn present(
        &mut self,
        candidate: &Candidate,
        prefix: &str,
        current: Option<&Suggestion>,
        error: Option<&StageFailure>,
    ) {
        let mut text = format!("\n{}{}", prefix, candidate.original_name);

        if let Some(suggestion) = current {
            let shown = validated_filename(candidate, suggestion)
                .unwrap_or_else(|_| suggestion.filename.clone());
            text.push_str(&format!(
                "\n  Suggested:  {}\n  Confidence: {}",
                shown, suggestion.confidence
            ));
            if !suggestion.reasoning.is_empty() {
                text.push_str(&format!("\n  Reasoning:  {}", suggestion.reasoning));
            }
        }
        if let Some(error) = error {
            text.push_str(&format!("\n  Error:      {}", error));
        }

        self.prompter.say(&text).await;
    }

    /// Ask for a replacement name until a usable one is given
    ///
    /// `Ok(None)` means the human gave up (input closed).
    async fn edit(
        &mut self,
        candidate: &Candidate,
        current: Option<&Suggestion>,
    ) -> Result<Option<String>, Interrupted> {
        let default = current
            .and_then(|s| validated_filename(candidate, s).ok())
            .unwrap_or_default();

        loop {
            let question = if default.is_empty() {
                "New filename:".to_string()
            } else {
                format!("New filename [{}]:", default)
            };

            let line = match self.ask(&question).await {
                Answer::Line(line) => line,
                Answer::Closed => return Ok(None),
                Answer::Interrupted => return Err(Interrupted),
            };

            let requested = if line.is_empty() { default.clone() } else { line };
            if requested.is_empty() {
                self.prompter.say("  Filename cannot be empty.").await;
                continue;
            }

            match normalize_target(&requested, candidate.extension()) {
                Ok(name) => return Ok(Some(name)),
                Err(e) => self.prompter.say(&format!("  {}", e)).await,
            }
        }
    }
}

struct Interrupted;

#[async_trait]
impl Reviewer for InteractiveReviewer<'_> {
    async fn review(&mut self, completed: Completed, pipeline: &Pipeline) -> Decision {
        let Completed {
            candidate,
            content,
            result,
        } = completed;
        let position = format!("[{}] ", candidate.index + 1);
        let mut cursor = ReviewCursor::new(&candidate);
        cursor.advance(ReviewState::Presented);

        let (mut current, mut error) = match result.and_then(|s| {
            validated_filename(&candidate, &s)?;
            Ok(s)
        }) {
            Ok(s) => (Some(s), None),
            Err(e) => (None, Some(e)),
        };

        // Only transient suggestion failures are worth showing a human
        if let Some(failure) = &error {
            if failure.is_interrupted() || !failure.is_transient() || content.is_none() {
                self.present(&candidate, &position, None, Some(failure)).await;
                self.prompter.say("  Skipping.").await;
                return cursor.skip(Some(OutcomeError::from(failure)));
            }
        }

        loop {
            if self.abort.is_aborted() {
                return cursor.skip(Some(OutcomeError::interrupted()));
            }

            self.present(&candidate, &position, current.as_ref(), error.as_ref())
                .await;

            let (question, default) = if current.is_some() {
                ("Accept? [Y]es / [e]dit / [r]etry / [s]kip:", Choice::Accept)
            } else {
                ("[r]etry / [e]dit / [S]kip:", Choice::Skip)
            };

            let line = match self.ask(question).await {
                Answer::Line(line) => line,
                Answer::Closed => {
                    tracing::warn!(file = %candidate.original_name, "[Review] Input closed, skipping");
                    return cursor.skip(None);
                }
                Answer::Interrupted => return cursor.skip(Some(OutcomeError::interrupted())),
            };

            let choice = match parse_choice(&line, default) {
                Some(Choice::Accept) if current.is_none() => None,
                other => other,
            };

            match choice {
                Some(Choice::Accept) => {
                    let name = current
                        .as_ref()
                        .and_then(|s| validated_filename(&candidate, s).ok());
                    if let Some(name) = name {
                        return cursor.accept(DecisionAction::Accept, name, current);
                    }
                }
                Some(Choice::Edit) => match self.edit(&candidate, current.as_ref()).await {
                    Ok(Some(name)) => return cursor.accept(DecisionAction::Edit, name, None),
                    Ok(None) => return cursor.skip(None),
                    Err(Interrupted) => return cursor.skip(Some(OutcomeError::interrupted())),
                },
                Some(Choice::Retry) => {
                    let Some(content) = content.as_deref() else {
                        continue;
                    };
                    cursor.advance(ReviewState::Retrying);
                    self.prompter.say("  Asking again...").await;

                    let retried = pipeline.resuggest(&candidate, content).await.and_then(|s| {
                        validated_filename(&candidate, &s)?;
                        Ok(s)
                    });
                    cursor.advance(ReviewState::Presented);

                    match retried {
                        Ok(s) => {
                            current = Some(s);
                            error = None;
                        }
                        Err(e) if e.is_interrupted() => {
                            return cursor.skip(Some(OutcomeError::interrupted()));
                        }
                        // Keep the last good suggestion on screen
                        Err(e) => error = Some(e),
                    }
                }
                Some(Choice::Skip) => {
                    let reason = if current.is_none() {
                        error.as_ref().map(OutcomeError::from)
                    } else {
                        None
                    };
                    return cursor.skip(reason);
                }
                None => {
                    let hint = if current.is_some() {
                        "  Please answer y, e, r or s."
                    } else {
                        "  Please answer r, e or s."
                    };
                    self.prompter.say(hint).await;
                }
            }
        }
    }
}
