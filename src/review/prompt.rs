//! Terminal I/O for interactive review

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

/// Where the interactive reviewer talks to a human
#[async_trait]
pub trait Prompter: Send {
    /// Print a block of text
    async fn say(&mut self, text: &str);

    /// Print `question` and read one trimmed line; `None` when input is closed
    async fn ask(&mut self, question: &str) -> Option<String>;
}

/// Prompter over the process stdin/stdout
pub struct TerminalPrompter {
    lines: Lines<BufReader<Stdin>>,
    out: Stdout,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            out: tokio::io::stdout(),
        }
    }

    async fn write(&mut self, text: &str) {
        let result = async {
            self.out.write_all(text.as_bytes()).await?;
            self.out.flush().await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "[Prompter] Failed to write to stdout");
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn say(&mut self, text: &str) {
        self.write(&format!("{}\n", text)).await;
    }

    async fn ask(&mut self, question: &str) -> Option<String> {
        self.write(&format!("{} ", question)).await;
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "[Prompter] Failed to read from stdin");
                None
            }
        }
    }
}
