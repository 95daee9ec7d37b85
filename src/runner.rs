//! Batch driver
//!
//! `run_batch` is the one entry point the CLI needs: candidates in,
//! ordered outcomes out (through the reporter), summary returned.

use crate::ai::SuggestionService;
use crate::config::{ConfigError, RunConfig};
use crate::execution::RenameExecutor;
use crate::extract::ExtractionService;
use crate::models::{Candidate, Decision, DecisionAction, ErrorStage, Outcome};
use crate::pipeline::{AbortSignal, Pipeline};
use crate::report::{Reporter, RunSummary};
use crate::review::{AutoReviewer, InteractiveReviewer, Prompter, Reviewer};
use std::sync::Arc;

/// External collaborators for a run
#[derive(Clone)]
pub struct Services {
    pub extractor: Arc<dyn ExtractionService>,
    pub suggester: Arc<dyn SuggestionService>,
}

/// Process `candidates` and report one outcome per candidate, in order
///
/// `prompter` is only used when `config.interactive` is set. After `abort`
/// fires, every candidate without a terminal state is reported as
/// interrupted.
pub async fn run_batch(
    config: Arc<RunConfig>,
    candidates: Vec<Candidate>,
    services: Services,
    prompter: &mut dyn Prompter,
    reporter: &mut dyn Reporter,
    abort: AbortSignal,
) -> Result<RunSummary, ConfigError> {
    config.validate()?;
    config.prepare_output_dir()?;

    let pipeline = Pipeline::new(
        Arc::clone(&config),
        services.extractor,
        services.suggester,
        abort.clone(),
    );
    let executor = RenameExecutor::new();
    let mut summary = RunSummary::new(config.dry_run);

    let mut reviewer: Box<dyn Reviewer + '_> = if config.interactive {
        Box::new(InteractiveReviewer::new(prompter, abort.clone()))
    } else {
        Box::new(AutoReviewer)
    };

    let mut stream = pipeline.start(candidates.clone());
    let mut emitted = 0;

    while let Some(completed) = stream.next().await {
        let outcome = if abort.is_aborted() {
            Outcome::interrupted(&completed.candidate, config.dry_run)
        } else {
            let decision = reviewer.review(completed, &pipeline).await;
            apply_decision(&executor, &config, decision).await
        };

        reporter.record(&outcome);
        summary.add(&outcome);
        emitted += 1;
    }
    drop(stream);

    // The stream only ends early if its workers died
    for candidate in candidates.iter().skip(emitted) {
        let outcome = Outcome::interrupted(candidate, config.dry_run);
        reporter.record(&outcome);
        summary.add(&outcome);
    }

    tracing::info!(
        total = summary.total,
        renamed = summary.renamed,
        skipped = summary.skipped,
        failed = summary.failed,
        dry_run = summary.dry_run,
        "[Runner] Run complete"
    );

    reporter.finish(&summary);
    Ok(summary)
}

async fn apply_decision(
    executor: &RenameExecutor,
    config: &RunConfig,
    decision: Decision,
) -> Outcome {
    let candidate = &decision.candidate;
    tracing::debug!(
        file = %candidate.original_name,
        action = ?decision.action,
        retries = decision.retries,
        "[Runner] Decision"
    );

    let interrupted = decision
        .error
        .as_ref()
        .is_some_and(|e| e.stage == ErrorStage::Interrupted);
    if interrupted {
        return Outcome::interrupted(candidate, config.dry_run);
    }

    let outcome = match (decision.action, decision.resolved_filename.as_deref()) {
        (DecisionAction::Accept | DecisionAction::Edit, Some(name)) => {
            executor
                .apply(candidate, name, config.output_dir.as_deref(), config.dry_run)
                .await
        }
        _ => Outcome::skipped(candidate, decision.error.clone(), config.dry_run),
    };

    match (&decision.suggestion, decision.action) {
        (Some(suggestion), DecisionAction::Accept) => outcome.with_suggestion(suggestion),
        _ => outcome,
    }
}
