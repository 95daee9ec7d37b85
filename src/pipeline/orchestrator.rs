use super::abort::AbortSignal;
use super::gate::SuggestionGate;
use super::release::ReleaseBuffer;
use super::StageFailure;
use crate::ai::{SuggestionError, SuggestionService};
use crate::config::RunConfig;
use crate::extract::{ExtractionError, ExtractionService};
use crate::models::{Candidate, ExtractedContent, Suggestion};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// A candidate that finished extraction and suggestion (or failed on the way)
#[derive(Debug, Clone)]
pub struct Completed {
    pub candidate: Candidate,
    /// Kept so a retry can skip extraction
    pub content: Option<Arc<ExtractedContent>>,
    pub result: Result<Suggestion, StageFailure>,
}

impl Completed {
    fn failed(candidate: Candidate, failure: StageFailure) -> Self {
        Self {
            candidate,
            content: None,
            result: Err(failure),
        }
    }
}

/// A completion on its way to the release buffer
struct Ready {
    slot: usize,
    completed: Completed,
    /// Admission slot, freed when the item leaves the buffer
    _admission: Option<OwnedSemaphorePermit>,
}

struct Inner {
    config: Arc<RunConfig>,
    extractor: Arc<dyn ExtractionService>,
    suggester: Arc<dyn SuggestionService>,
    /// Shared with detached extraction tasks, see `Inner::extract`
    extraction_permits: Arc<Semaphore>,
    suggestion_gate: SuggestionGate,
    abort: AbortSignal,
}

/// Orchestrator for one run
///
/// Cheap to clone; clones share budgets and the abort signal.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    pub fn new(
        config: Arc<RunConfig>,
        extractor: Arc<dyn ExtractionService>,
        suggester: Arc<dyn SuggestionService>,
        abort: AbortSignal,
    ) -> Self {
        let inner = Inner {
            extraction_permits: Arc::new(Semaphore::new(config.extraction_budget.max(1))),
            suggestion_gate: SuggestionGate::new(config.suggestion_budget.max(1)),
            config,
            extractor,
            suggester,
            abort,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Start processing `candidates`; results come back in the given order
    pub fn start(&self, candidates: Vec<Candidate>) -> PipelineStream {
        let total = candidates.len();
        let lookahead = self.inner.config.effective_lookahead();
        let (tx, rx) = mpsc::unbounded_channel();

        tracing::info!(
            candidates = total,
            extraction_budget = self.inner.config.extraction_budget,
            suggestion_budget = self.inner.config.suggestion_budget,
            lookahead,
            "[Pipeline] Starting"
        );

        let feeder = tokio::spawn(admit(
            Arc::clone(&self.inner),
            candidates,
            Arc::new(Semaphore::new(lookahead)),
            tx,
        ));

        PipelineStream {
            rx,
            buffer: ReleaseBuffer::new(),
            total,
            feeder,
        }
    }

    /// Ask for a fresh suggestion using already-extracted content
    ///
    /// Goes through the suggestion budget ahead of queued background work.
    /// Extraction is never repeated.
    pub async fn resuggest(
        &self,
        candidate: &Candidate,
        content: &ExtractedContent,
    ) -> Result<Suggestion, StageFailure> {
        tracing::debug!(file = %candidate.original_name, "[Pipeline] Retry requested");
        self.inner
            .suggest(candidate, content, true)
            .await
            .map_err(StageFailure::Suggestion)
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.inner.abort
    }
}

/// Admit candidates in order, at most `window` ahead of the release cursor
async fn admit(
    inner: Arc<Inner>,
    candidates: Vec<Candidate>,
    window: Arc<Semaphore>,
    tx: mpsc::UnboundedSender<Ready>,
) {
    let mut workers = JoinSet::new();
    let mut pending = candidates.into_iter().enumerate();

    while let Some((slot, candidate)) = pending.next() {
        let admission = tokio::select! {
            biased;
            _ = inner.abort.aborted() => None,
            permit = Arc::clone(&window).acquire_owned() => permit.ok(),
        };

        let Some(admission) = admission else {
            // Interrupted: everything not yet admitted completes as such
            let interrupted = std::iter::once((slot, candidate)).chain(pending.by_ref());
            for (slot, candidate) in interrupted {
                let completed =
                    Completed::failed(candidate, StageFailure::Extraction(ExtractionError::Interrupted));
                let _ = tx.send(Ready {
                    slot,
                    completed,
                    _admission: None,
                });
            }
            break;
        };

        let inner = Arc::clone(&inner);
        let tx = tx.clone();
        workers.spawn(async move {
            let completed = inner.process(candidate).await;
            let _ = tx.send(Ready {
                slot,
                completed,
                _admission: Some(admission),
            });
        });
    }

    // Dropping the set would cancel workers still running
    while workers.join_next().await.is_some() {}
}

impl Inner {
    async fn process(&self, candidate: Candidate) -> Completed {
        let content = match self.extract(&candidate).await {
            Ok(content) => Arc::new(content),
            Err(e) => {
                tracing::warn!(file = %candidate.original_name, error = %e, "[Pipeline] Extraction failed");
                return Completed::failed(candidate, e.into());
            }
        };

        let result = self
            .suggest(&candidate, &content, false)
            .await
            .map_err(StageFailure::Suggestion);

        match &result {
            Ok(s) => tracing::debug!(
                file = %candidate.original_name,
                suggestion = %s.filename,
                confidence = %s.confidence,
                "[Pipeline] Suggested"
            ),
            Err(e) => tracing::warn!(file = %candidate.original_name, error = %e, "[Pipeline] Suggestion failed"),
        }

        Completed {
            candidate,
            content: Some(content),
            result,
        }
    }

    /// Extract under the budget
    ///
    /// The call runs in its own task that owns the permit. A timeout or an
    /// abort stops waiting for it but the permit is only returned once the
    /// underlying work (often a blocking parse) has really finished.
    async fn extract(&self, candidate: &Candidate) -> Result<ExtractedContent, ExtractionError> {
        let permit = tokio::select! {
            biased;
            _ = self.abort.aborted() => return Err(ExtractionError::Interrupted),
            permit = Arc::clone(&self.extraction_permits).acquire_owned() => {
                permit.map_err(|_| ExtractionError::Interrupted)?
            }
        };

        let extractor = Arc::clone(&self.extractor);
        let path = candidate.path.clone();
        let mut work = tokio::spawn(async move {
            let _permit = permit;
            extractor.extract(&path).await
        });

        let limit = self.config.extraction_timeout;
        let result = tokio::select! {
            biased;
            _ = self.abort.aborted() => Err(ExtractionError::Interrupted),
            joined = tokio::time::timeout(limit, &mut work) => match joined {
                Ok(Ok(extracted)) => extracted,
                Ok(Err(e)) if e.is_panic() => Err(ExtractionError::Panicked),
                Ok(Err(e)) => Err(ExtractionError::Unreadable(format!("Task failed: {}", e))),
                Err(_elapsed) => Err(ExtractionError::Timeout(limit)),
            },
        };

        if result.is_err() && !work.is_finished() {
            tracing::debug!(
                file = %candidate.original_name,
                "[Pipeline] Extraction detached, budget slot held until it ends"
            );
        }
        result
    }

    async fn suggest(
        &self,
        candidate: &Candidate,
        content: &ExtractedContent,
        priority: bool,
    ) -> Result<Suggestion, SuggestionError> {
        let _permit = tokio::select! {
            biased;
            _ = self.abort.aborted() => return Err(SuggestionError::Interrupted),
            permit = self.suggestion_gate.acquire(priority) => {
                permit.ok_or(SuggestionError::Interrupted)?
            }
        };

        let call = AssertUnwindSafe(tokio::time::timeout(
            self.config.suggestion_timeout,
            self.suggester.suggest(&candidate.original_name, content),
        ))
        .catch_unwind();

        tokio::select! {
            biased;
            _ = self.abort.aborted() => Err(SuggestionError::Interrupted),
            result = call => match result {
                Ok(Ok(suggested)) => suggested,
                Ok(Err(_elapsed)) => Err(SuggestionError::Timeout),
                Err(_panic) => Err(SuggestionError::Panicked),
            },
        }
    }
}

/// Ordered view over a running pipeline
///
/// Dropping the stream cancels all outstanding work.
pub struct PipelineStream {
    rx: mpsc::UnboundedReceiver<Ready>,
    buffer: ReleaseBuffer<Ready>,
    total: usize,
    feeder: JoinHandle<()>,
}

impl PipelineStream {
    /// Next completion in enumeration order; `None` once all are released
    pub async fn next(&mut self) -> Option<Completed> {
        loop {
            if let Some(ready) = self.buffer.pop_ready() {
                return Some(ready.completed);
            }
            if self.buffer.cursor() >= self.total {
                return None;
            }

            match self.rx.recv().await {
                Some(ready) => {
                    self.buffer.insert(ready.slot, ready);
                }
                None => {
                    tracing::error!(
                        released = self.buffer.cursor(),
                        total = self.total,
                        "[Pipeline] Workers stopped before every candidate completed"
                    );
                    return None;
                }
            }
        }
    }

    /// Number of candidates already handed out
    pub fn released(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl Drop for PipelineStream {
    fn drop(&mut self) {
        self.feeder.abort();
    }
}
