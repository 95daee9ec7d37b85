//! Run Reporter
//!
//! Receives exactly one outcome per candidate, in enumeration order.

use crate::models::{Outcome, OutcomeState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub trait Reporter: Send {
    fn record(&mut self, outcome: &Outcome);

    /// Called once after the last outcome
    fn finish(&mut self, _summary: &RunSummary) {}
}

/// Counts per terminal state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failed outcomes caused by an interrupt (included in `failed`)
    pub interrupted: usize,
    pub dry_run: bool,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn add(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome.state {
            OutcomeState::Renamed => self.renamed += 1,
            OutcomeState::Skipped => self.skipped += 1,
            OutcomeState::Failed => {
                self.failed += 1;
                if outcome.is_interrupted() {
                    self.interrupted += 1;
                }
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Human-readable progress lines
pub struct ConsoleReporter<W: Write + Send> {
    out: W,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            tracing::warn!(error = %e, "[Reporter] Failed to write");
        }
    }
}

pub fn format_outcome(outcome: &Outcome) -> String {
    match outcome.state {
        OutcomeState::Renamed => {
            let tag = if outcome.dry_run { "would rename" } else { "renamed" };
            let mut line = format!(
                "[{}] {} -> {}",
                tag,
                outcome.original_name,
                outcome.final_name.as_deref().unwrap_or("?")
            );
            if let Some(confidence) = outcome.confidence {
                line.push_str(&format!(" ({} confidence)", confidence));
            }
            if let Some(reasoning) = &outcome.reasoning {
                line.push_str(&format!("\n    {}", reasoning));
            }
            line
        }
        OutcomeState::Skipped => match &outcome.error {
            Some(e) => format!("[skipped] {} ({})", outcome.original_name, e),
            None => format!("[skipped] {}", outcome.original_name),
        },
        OutcomeState::Failed if outcome.is_interrupted() => {
            format!("[interrupted] {}", outcome.original_name)
        }
        OutcomeState::Failed => format!(
            "[failed] {}: {}",
            outcome.original_name,
            outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default()
        ),
    }
}

pub fn format_summary(summary: &RunSummary) -> String {
    let mut text = format!(
        "Done: {} renamed, {} skipped, {} failed",
        summary.renamed, summary.skipped, summary.failed
    );
    if summary.interrupted > 0 {
        text.push_str(&format!(" ({} interrupted)", summary.interrupted));
    }
    if summary.dry_run {
        text.push_str("\nDry run: no files were changed. Re-run with --no-dry-run to apply.");
    }
    text
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn record(&mut self, outcome: &Outcome) {
        let text = format_outcome(outcome);
        self.line(&text);
    }

    fn finish(&mut self, summary: &RunSummary) {
        let text = format_summary(summary);
        self.line("");
        self.line(&text);
        let _ = self.out.flush();
    }
}

/// Keeps every outcome in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub outcomes: Vec<Outcome>,
    pub summary: Option<RunSummary>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for CollectingReporter {
    fn record(&mut self, outcome: &Outcome) {
        self.outcomes.push(outcome.clone());
    }

    fn finish(&mut self, summary: &RunSummary) {
        self.summary = Some(summary.clone());
    }
}

/// Forwards to several reporters in turn
pub struct Tee<'a> {
    reporters: Vec<&'a mut dyn Reporter>,
}

impl<'a> Tee<'a> {
    pub fn new(reporters: Vec<&'a mut dyn Reporter>) -> Self {
        Self { reporters }
    }
}

impl Reporter for Tee<'_> {
    fn record(&mut self, outcome: &Outcome) {
        for reporter in self.reporters.iter_mut() {
            reporter.record(outcome);
        }
    }

    fn finish(&mut self, summary: &RunSummary) {
        for reporter in self.reporters.iter_mut() {
            reporter.finish(summary);
        }
    }
}

/// Machine-readable record of a run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport<'a> {
    pub run_id: uuid::Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: &'a RunSummary,
    pub outcomes: &'a [Outcome],
}

impl<'a> RunReport<'a> {
    pub fn new(summary: &'a RunSummary, outcomes: &'a [Outcome]) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            generated_at: Utc::now(),
            summary,
            outcomes,
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        std::fs::write(path, json)
            .map_err(|e| format!("Failed to write report {}: {}", path.display(), e))?;
        tracing::info!(path = %path.display(), outcomes = self.outcomes.len(), "[Reporter] Wrote run report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Confidence, ErrorStage, OutcomeError, Suggestion};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn outcomes() -> Vec<Outcome> {
        let a = Candidate::new(0, "/d/A.pdf");
        let b = Candidate::new(1, "/d/B.pdf");
        let c = Candidate::new(2, "/d/C.pdf");
        let suggestion = Suggestion {
            filename: "Smith-2020".into(),
            confidence: Confidence::High,
            reasoning: "Author and year on the title page".into(),
        };
        vec![
            Outcome::renamed(&a, PathBuf::from("/d/Smith-2020.pdf"), true)
                .with_suggestion(&suggestion),
            Outcome::skipped(
                &b,
                Some(OutcomeError::new(ErrorStage::Extraction, "no text", false)),
                true,
            ),
            Outcome::interrupted(&c, true),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new(true);
        for o in &outcomes() {
            summary.add(o);
        }
        assert_eq!(summary.total, 3);
        assert_eq!(summary.renamed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.interrupted, 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_console_reporter_lines() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        let mut summary = RunSummary::new(true);
        for o in &outcomes() {
            reporter.record(o);
            summary.add(o);
        }
        reporter.finish(&summary);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.contains("[would rename] A.pdf -> Smith-2020.pdf (high confidence)"));
        assert!(text.contains("\n    Author and year on the title page\n"));
        assert!(text.contains("[skipped] B.pdf (extraction: no text)"));
        assert!(text.contains("[interrupted] C.pdf"));
        assert!(text.contains("Done: 1 renamed, 1 skipped, 1 failed (1 interrupted)"));
        assert!(text.contains("Dry run"));
    }

    #[test]
    fn test_tee_forwards() {
        let mut first = CollectingReporter::new();
        let mut second = CollectingReporter::new();
        {
            let mut tee = Tee::new(vec![&mut first as &mut dyn Reporter, &mut second]);
            for o in &outcomes() {
                tee.record(o);
            }
            tee.finish(&RunSummary::new(false));
        }
        assert_eq!(first.outcomes.len(), 3);
        assert_eq!(second.outcomes.len(), 3);
        assert!(second.summary.is_some());
    }

    #[test]
    fn test_run_report_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let outcomes = outcomes();
        let mut summary = RunSummary::new(true);
        outcomes.iter().for_each(|o| summary.add(o));

        RunReport::new(&summary, &outcomes).write_to(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["renamed"], 1);
        assert_eq!(value["outcomes"][0]["state"], "renamed");
        assert_eq!(value["outcomes"][0]["finalName"], "Smith-2020.pdf");
        assert_eq!(value["outcomes"][0]["confidence"], "high");
        assert_eq!(
            value["outcomes"][0]["reasoning"],
            "Author and year on the title page"
        );
        assert_eq!(value["outcomes"][1]["dryRun"], true);
        assert!(value["outcomes"][1].get("confidence").is_none());
        assert_eq!(value["outcomes"][1]["error"]["stage"], "extraction");
        assert!(value["generatedAt"].is_string());
    }
}
