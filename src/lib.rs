pub mod ai;
pub mod config;
pub mod execution;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod review;
pub mod runner;
pub mod scanner;

pub use config::{ExtractConfig, LlmConfig, RunConfig};
pub use pipeline::AbortSignal;
pub use runner::{run_batch, Services};

use tracing_subscriber::EnvFilter;

/// Default filter: warn for dependencies, info for this crate
const DEFAULT_FILTER: &str = "warn,pdf_renamer=info";

/// Initialize tracing on stderr
///
/// `RUST_LOG` wins when set, then `log_level` (applied to this crate),
/// then the default. Stdout stays free for review prompts and results.
pub fn init_tracing(log_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match log_level {
        Some(level) => EnvFilter::new(format!("warn,pdf_renamer={}", level)),
        None => EnvFilter::new(DEFAULT_FILTER),
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
