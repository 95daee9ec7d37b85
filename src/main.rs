use clap::Parser;
use pdf_renamer::ai::LlmSuggester;
use pdf_renamer::config::{
    DEFAULT_BASE_URL, DEFAULT_EXTRACTION_BUDGET, DEFAULT_MODEL, DEFAULT_SUGGESTION_BUDGET,
};
use pdf_renamer::extract::PdfExtractor;
use pdf_renamer::report::{CollectingReporter, ConsoleReporter, Reporter, RunReport, Tee};
use pdf_renamer::review::TerminalPrompter;
use pdf_renamer::scanner::scan_candidates;
use pdf_renamer::{run_batch, AbortSignal, ExtractConfig, LlmConfig, RunConfig, Services};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Exit status after an interrupt (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-renamer",
    version,
    about = "Rename PDF files from their content using a language model"
)]
struct Cli {
    /// Directory containing the PDF files
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Glob pattern, relative to the directory
    #[arg(long, default_value = "*.pdf")]
    pattern: String,

    /// Only show what would be renamed (default)
    #[arg(long, overrides_with = "no_dry_run")]
    dry_run: bool,

    /// Actually rename the files
    #[arg(long, overrides_with = "dry_run")]
    no_dry_run: bool,

    /// Review every suggestion before it is applied
    #[arg(short, long)]
    interactive: bool,

    /// Move renamed files into this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum concurrent PDF extractions
    #[arg(long, default_value_t = DEFAULT_EXTRACTION_BUDGET)]
    max_concurrent_pdf: usize,

    /// Maximum concurrent model calls
    #[arg(long, default_value_t = DEFAULT_SUGGESTION_BUDGET)]
    max_concurrent_api: usize,

    /// Model name
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible base URL (OpenAI, Ollama, LM Studio, ...)
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    /// API key; optional for local servers
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-file extraction timeout in seconds
    #[arg(long, default_value_t = 60)]
    extract_timeout: u64,

    /// Per-call suggestion timeout in seconds
    #[arg(long, default_value_t = 120)]
    suggest_timeout: u64,

    /// Characters of extracted text sent to the model
    #[arg(long, default_value_t = 5000)]
    max_chars: usize,

    /// Write a JSON report of every outcome to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level for this tool (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    // Before parsing so .env values feed the env fallbacks
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    pdf_renamer::init_tracing(cli.log_level.as_deref());

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };

    // A pending stdin read would otherwise hold the runtime open
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, String> {
    let candidates = scan_candidates(&cli.directory, &cli.pattern).map_err(|e| e.to_string())?;

    if candidates.is_empty() {
        println!(
            "No files matching '{}' found in {}",
            cli.pattern,
            cli.directory.display()
        );
        return Ok(0);
    }

    let config = RunConfig {
        extraction_budget: cli.max_concurrent_pdf,
        suggestion_budget: cli.max_concurrent_api,
        interactive: cli.interactive,
        dry_run: !cli.no_dry_run,
        output_dir: cli.output_dir.clone(),
        extraction_timeout: Duration::from_secs(cli.extract_timeout),
        suggestion_timeout: Duration::from_secs(cli.suggest_timeout),
        lookahead: None,
    };
    config.validate().map_err(|e| e.to_string())?;

    println!(
        "Found {} file(s). Up to {} extractions and {} model calls at once.",
        candidates.len(),
        config.extraction_budget,
        config.suggestion_budget
    );
    if config.dry_run {
        println!("Dry run: no files will be renamed.");
    }

    let extractor = PdfExtractor::new(ExtractConfig {
        max_chars: cli.max_chars,
        ..Default::default()
    });
    let suggester = LlmSuggester::new(LlmConfig {
        model: cli.model.clone(),
        base_url: cli.url.clone(),
        api_key: cli.api_key.clone().filter(|k| !k.trim().is_empty()),
        ..Default::default()
    })
    .map_err(|e| e.to_string())?;

    let services = Services {
        extractor: Arc::new(extractor),
        suggester: Arc::new(suggester),
    };

    let abort = AbortSignal::new();
    spawn_interrupt_handler(abort.clone());

    let mut console = ConsoleReporter::stdout();
    let mut collected = CollectingReporter::new();
    let mut prompter = TerminalPrompter::new();

    let summary = {
        let mut reporters = Tee::new(vec![&mut console as &mut dyn Reporter, &mut collected]);
        run_batch(
            Arc::new(config),
            candidates,
            services,
            &mut prompter,
            &mut reporters,
            abort,
        )
        .await
        .map_err(|e| e.to_string())?
    };

    if let Some(path) = &cli.report {
        RunReport::new(&summary, &collected.outcomes).write_to(path)?;
    }

    Ok(if summary.interrupted > 0 {
        EXIT_INTERRUPTED
    } else if summary.has_failures() {
        1
    } else {
        0
    })
}

/// First Ctrl-C drains the run; a second one exits immediately
fn spawn_interrupt_handler(abort: AbortSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, finishing up (Ctrl-C again to quit now)");
        abort.abort();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(EXIT_INTERRUPTED);
        }
    });
}
