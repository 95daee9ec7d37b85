use async_trait::async_trait;
use pdf_renamer::ai::{SuggestionError, SuggestionService};
use pdf_renamer::extract::{ExtractionError, ExtractionService};
use pdf_renamer::models::{
    Confidence, DocumentMetadata, ErrorStage, ExtractedContent, Outcome, OutcomeState, Suggestion,
};
use pdf_renamer::report::{CollectingReporter, Reporter, RunSummary};
use pdf_renamer::review::Prompter;
use pdf_renamer::scanner::scan_candidates;
use pdf_renamer::{run_batch, AbortSignal, RunConfig, Services};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// Tracks concurrent calls and per-file call counts
#[derive(Default)]
struct Tally {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
}

impl Tally {
    fn enter(&self, name: &str) -> usize {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn calls_for(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn max(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Extracts every file except the names listed in `broken`
#[derive(Default)]
struct FakeExtractor {
    tally: Tally,
    broken: Vec<&'static str>,
}

#[async_trait]
impl ExtractionService for FakeExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractionError> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.tally.enter(&name);
        tokio::time::sleep(Duration::from_millis(15)).await;
        self.tally.leave();

        if self.broken.contains(&name.as_str()) {
            return Err(ExtractionError::NoText { chars: 0 });
        }
        Ok(ExtractedContent {
            text: format!("Contents of {}", name),
            metadata: DocumentMetadata::default(),
        })
    }
}

/// Suggests scripted names per file; unscripted files get `<stem>-Renamed`
#[derive(Default)]
struct FakeSuggester {
    tally: Tally,
    scripted: Mutex<HashMap<&'static str, VecDeque<&'static str>>>,
}

impl FakeSuggester {
    fn script(self, file: &'static str, names: &[&'static str]) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .insert(file, names.iter().copied().collect());
        self
    }
}

#[async_trait]
impl SuggestionService for FakeSuggester {
    async fn suggest(
        &self,
        original_name: &str,
        _content: &ExtractedContent,
    ) -> Result<Suggestion, SuggestionError> {
        self.tally.enter(original_name);
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.tally.leave();

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(original_name)
            .and_then(|names| names.pop_front());
        let filename = match scripted {
            Some(name) => name.to_string(),
            None => format!("{}-Renamed", original_name.trim_end_matches(".pdf")),
        };
        Ok(Suggestion {
            filename,
            confidence: Confidence::High,
            reasoning: String::new(),
        })
    }
}

struct ScriptedPrompter {
    answers: VecDeque<&'static str>,
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn say(&mut self, _text: &str) {}

    async fn ask(&mut self, _question: &str) -> Option<String> {
        self.answers.pop_front().map(str::to_string)
    }
}

/// Holds the first question until the suggester has seen `later`
///
/// Answers every question with accept.
struct WaitingPrompter {
    suggester: Arc<FakeSuggester>,
    later: Vec<&'static str>,
    asked: usize,
    saw_progress: bool,
}

#[async_trait]
impl Prompter for WaitingPrompter {
    async fn say(&mut self, _text: &str) {}

    async fn ask(&mut self, _question: &str) -> Option<String> {
        self.asked += 1;
        if self.asked == 1 {
            let suggester = Arc::clone(&self.suggester);
            let later = self.later.clone();
            self.saw_progress = tokio::time::timeout(Duration::from_secs(5), async move {
                while !later.iter().all(|name| suggester.tally.calls_for(name) > 0) {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .is_ok();
        }
        Some("y".to_string())
    }
}

fn no_prompts() -> ScriptedPrompter {
    ScriptedPrompter {
        answers: VecDeque::new(),
    }
}

/// Aborts the run right after the first outcome is reported
struct AbortAfterFirst {
    abort: AbortSignal,
    inner: CollectingReporter,
}

impl Reporter for AbortAfterFirst {
    fn record(&mut self, outcome: &Outcome) {
        self.inner.record(outcome);
        self.abort.abort();
    }

    fn finish(&mut self, summary: &RunSummary) {
        self.inner.finish(summary);
    }
}

fn pdf_dir(names: &[&str]) -> TempDir {
    let dir = tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), format!("%PDF-1.4 {}", name)).unwrap();
    }
    dir
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn live_config() -> RunConfig {
    RunConfig {
        dry_run: false,
        ..Default::default()
    }
}

async fn run(
    dir: &Path,
    config: RunConfig,
    extractor: Arc<FakeExtractor>,
    suggester: Arc<FakeSuggester>,
    prompter: &mut ScriptedPrompter,
) -> (RunSummary, Vec<Outcome>) {
    let candidates = scan_candidates(dir, "*.pdf").unwrap();
    let services = Services {
        extractor,
        suggester,
    };
    let mut reporter = CollectingReporter::new();
    let summary = run_batch(
        Arc::new(config),
        candidates,
        services,
        prompter,
        &mut reporter,
        AbortSignal::new(),
    )
    .await
    .unwrap();
    (summary, reporter.outcomes)
}

#[tokio::test]
async fn renames_every_file_in_order() {
    let dir = pdf_dir(&["A.pdf", "B.pdf"]);
    let suggester = FakeSuggester::default()
        .script("A.pdf", &["Smith-Networks-2020"])
        .script("B.pdf", &["Jones-Compilers-2019"]);

    let (summary, outcomes) = run(
        dir.path(),
        live_config(),
        Arc::new(FakeExtractor::default()),
        Arc::new(suggester),
        &mut no_prompts(),
    )
    .await;

    assert_eq!(summary.renamed, 2);
    let names: Vec<_> = outcomes.iter().map(|o| o.original_name.as_str()).collect();
    assert_eq!(names, ["A.pdf", "B.pdf"]);
    assert_eq!(
        listing(dir.path()),
        ["Jones-Compilers-2019.pdf", "Smith-Networks-2020.pdf"]
    );
}

#[tokio::test]
async fn duplicate_suggestions_are_disambiguated() {
    let dir = pdf_dir(&["A.pdf", "B.pdf"]);
    let suggester = FakeSuggester::default()
        .script("A.pdf", &["Smith-2020"])
        .script("B.pdf", &["Smith-2020"]);

    let (_, outcomes) = run(
        dir.path(),
        live_config(),
        Arc::new(FakeExtractor::default()),
        Arc::new(suggester),
        &mut no_prompts(),
    )
    .await;

    assert_eq!(outcomes[0].final_name.as_deref(), Some("Smith-2020.pdf"));
    assert_eq!(outcomes[1].final_name.as_deref(), Some("Smith-2020-2.pdf"));
    assert_eq!(listing(dir.path()), ["Smith-2020-2.pdf", "Smith-2020.pdf"]);
}

#[tokio::test]
async fn extraction_failure_skips_suggestion() {
    let dir = pdf_dir(&["A.pdf", "B.pdf", "C.pdf"]);
    let extractor = Arc::new(FakeExtractor {
        broken: vec!["B.pdf"],
        ..Default::default()
    });
    let suggester = Arc::new(FakeSuggester::default());

    let (summary, outcomes) = run(
        dir.path(),
        live_config(),
        extractor,
        Arc::clone(&suggester),
        &mut no_prompts(),
    )
    .await;

    assert_eq!(suggester.tally.calls_for("B.pdf"), 0);
    assert_eq!(outcomes[1].state, OutcomeState::Skipped);
    assert_eq!(
        outcomes[1].error.as_ref().map(|e| e.stage),
        Some(ErrorStage::Extraction)
    );
    assert_eq!(summary.renamed, 2);
    assert!(dir.path().join("B.pdf").exists());
}

#[tokio::test]
async fn retry_then_accept_uses_the_new_suggestion() {
    let dir = pdf_dir(&["A.pdf"]);
    let extractor = Arc::new(FakeExtractor::default());
    let suggester = Arc::new(FakeSuggester::default().script("A.pdf", &["Draft", "Smith-2020"]));
    let mut prompter = ScriptedPrompter {
        answers: VecDeque::from(["r", "y"]),
    };
    let config = RunConfig {
        interactive: true,
        ..live_config()
    };

    let (summary, outcomes) = run(
        dir.path(),
        config,
        Arc::clone(&extractor),
        Arc::clone(&suggester),
        &mut prompter,
    )
    .await;

    assert_eq!(suggester.tally.calls_for("A.pdf"), 2);
    assert_eq!(extractor.tally.calls_for("A.pdf"), 1);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].confidence, Some(Confidence::High));
    assert_eq!(summary.renamed, 1);
    assert_eq!(listing(dir.path()), ["Smith-2020.pdf"]);
}

#[tokio::test]
async fn repeated_retries_extract_once() {
    let dir = pdf_dir(&["A.pdf"]);
    let extractor = Arc::new(FakeExtractor::default());
    let suggester = Arc::new(FakeSuggester::default());
    let mut prompter = ScriptedPrompter {
        answers: VecDeque::from(["r", "r", "r", "s"]),
    };
    let config = RunConfig {
        interactive: true,
        ..live_config()
    };

    let (summary, outcomes) = run(
        dir.path(),
        config,
        Arc::clone(&extractor),
        Arc::clone(&suggester),
        &mut prompter,
    )
    .await;

    assert_eq!(suggester.tally.calls_for("A.pdf"), 4);
    assert_eq!(extractor.tally.calls_for("A.pdf"), 1);
    assert_eq!(outcomes[0].state, OutcomeState::Skipped);
    assert_eq!(summary.skipped, 1);
    assert_eq!(listing(dir.path()), ["A.pdf"]);
}

#[tokio::test]
async fn later_candidates_progress_while_first_is_presented() {
    let dir = pdf_dir(&["A.pdf", "B.pdf", "C.pdf", "D.pdf"]);
    let suggester = Arc::new(FakeSuggester::default());
    let mut prompter = WaitingPrompter {
        suggester: Arc::clone(&suggester),
        later: vec!["B.pdf", "C.pdf", "D.pdf"],
        asked: 0,
        saw_progress: false,
    };
    let config = RunConfig {
        interactive: true,
        ..live_config()
    };
    let candidates = scan_candidates(dir.path(), "*.pdf").unwrap();
    let services = Services {
        extractor: Arc::new(FakeExtractor::default()),
        suggester: Arc::clone(&suggester) as Arc<dyn SuggestionService>,
    };
    let mut reporter = CollectingReporter::new();

    let summary = run_batch(
        Arc::new(config),
        candidates,
        services,
        &mut prompter,
        &mut reporter,
        AbortSignal::new(),
    )
    .await
    .unwrap();

    assert!(prompter.saw_progress, "later candidates stalled during review");
    assert_eq!(prompter.asked, 4);
    assert_eq!(summary.renamed, 4);
}

#[tokio::test]
async fn budgets_cap_concurrency() {
    let names: Vec<String> = (0..16).map(|i| format!("doc{:02}.pdf", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let dir = pdf_dir(&refs);
    let extractor = Arc::new(FakeExtractor::default());
    let suggester = Arc::new(FakeSuggester::default());
    let config = RunConfig {
        extraction_budget: 3,
        suggestion_budget: 2,
        ..Default::default()
    };

    let (summary, outcomes) = run(
        dir.path(),
        config,
        Arc::clone(&extractor),
        Arc::clone(&suggester),
        &mut no_prompts(),
    )
    .await;

    assert!(extractor.tally.max() <= 3, "extractions: {}", extractor.tally.max());
    assert!(suggester.tally.max() <= 2, "suggestions: {}", suggester.tally.max());
    assert_eq!(suggester.tally.total_calls(), 16);
    assert_eq!(summary.total, 16);

    let order: Vec<_> = outcomes.iter().map(|o| o.original_name.clone()).collect();
    assert_eq!(order, names);
}

#[tokio::test]
async fn dry_run_leaves_directory_untouched() {
    let dir = pdf_dir(&["A.pdf", "B.pdf"]);
    let before = listing(dir.path());

    let (summary, outcomes) = run(
        dir.path(),
        RunConfig::default(),
        Arc::new(FakeExtractor::default()),
        Arc::new(FakeSuggester::default()),
        &mut no_prompts(),
    )
    .await;

    assert_eq!(listing(dir.path()), before);
    assert_eq!(summary.renamed, 2);
    assert!(outcomes.iter().all(|o| o.dry_run));
    assert_eq!(outcomes[0].final_name.as_deref(), Some("A-Renamed.pdf"));
    assert_eq!(outcomes[0].confidence, Some(Confidence::High));
}

#[tokio::test]
async fn dry_run_flag_covers_skipped_outcomes() {
    let dir = pdf_dir(&["A.pdf", "B.pdf"]);
    let extractor = Arc::new(FakeExtractor {
        broken: vec!["A.pdf"],
        ..Default::default()
    });

    let (_, outcomes) = run(
        dir.path(),
        RunConfig::default(),
        extractor,
        Arc::new(FakeSuggester::default()),
        &mut no_prompts(),
    )
    .await;

    assert_eq!(outcomes[0].state, OutcomeState::Skipped);
    assert!(outcomes[0].dry_run);
    assert!(outcomes[1].dry_run);
}

#[tokio::test]
async fn abort_reports_remaining_candidates_as_interrupted() {
    let dir = pdf_dir(&["A.pdf", "B.pdf", "C.pdf", "D.pdf"]);
    let abort = AbortSignal::new();
    let mut reporter = AbortAfterFirst {
        abort: abort.clone(),
        inner: CollectingReporter::new(),
    };
    let services = Services {
        extractor: Arc::new(FakeExtractor::default()),
        suggester: Arc::new(FakeSuggester::default()),
    };

    let summary = run_batch(
        Arc::new(live_config()),
        scan_candidates(dir.path(), "*.pdf").unwrap(),
        services,
        &mut no_prompts(),
        &mut reporter,
        abort,
    )
    .await
    .unwrap();

    let outcomes = reporter.inner.outcomes;
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[0].state, OutcomeState::Renamed);
    assert!(outcomes[1..].iter().all(Outcome::is_interrupted));
    assert_eq!(summary.interrupted, 3);
    assert_eq!(
        listing(dir.path()),
        ["A-Renamed.pdf", "B.pdf", "C.pdf", "D.pdf"]
    );
}

#[tokio::test]
async fn output_dir_collects_renamed_files() {
    let dir = pdf_dir(&["A.pdf"]);
    let out = dir.path().join("sorted");
    let config = RunConfig {
        output_dir: Some(out.clone()),
        ..live_config()
    };

    let (summary, _) = run(
        dir.path(),
        config,
        Arc::new(FakeExtractor::default()),
        Arc::new(FakeSuggester::default()),
        &mut no_prompts(),
    )
    .await;

    assert_eq!(summary.renamed, 1);
    assert_eq!(listing(&out), ["A-Renamed.pdf"]);
    assert!(!dir.path().join("A.pdf").exists());
}
