//! Terminal output and input helpers.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use toolrelay_agent::TurnSink;
use toolrelay_core::{ApprovalHandler, ParsedToolCall, ToolCallOutcome};

/// Truncates a string to a maximum length, adding "..." if needed.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Shared line reader over stdin, used by chat input and approval prompts
/// so neither steals the other's lines.
#[derive(Clone)]
pub struct InputLines {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
}

impl InputLines {
    pub fn stdin() -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
        }
    }

    /// Print `prompt` to stderr and read one line. `None` at end of input.
    pub async fn prompt(&self, prompt: &str) -> std::io::Result<Option<String>> {
        eprint!("{prompt}");
        std::io::stderr().flush()?;
        self.lines.lock().await.next_line().await
    }
}

/// Asks on the terminal before a sensitive tool runs.
pub struct TerminalApproval {
    input: InputLines,
}

impl TerminalApproval {
    pub const fn new(input: InputLines) -> Self {
        Self { input }
    }
}

#[async_trait]
impl ApprovalHandler for TerminalApproval {
    async fn request_approval(&self, tool: &str, arguments: &Map<String, Value>) -> bool {
        let args = Value::Object(arguments.clone());
        eprintln!();
        let prompt = format!("Allow {tool} with {args}? [y/N] ");
        match self.input.prompt(&prompt).await {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read approval answer");
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Streams assistant text to stdout and tool activity to stderr.
#[derive(Debug, Default)]
pub struct TerminalSink {
    wrote_text: bool,
}

impl TerminalSink {
    pub const fn new() -> Self {
        Self { wrote_text: false }
    }

    /// Whether any assistant text was printed.
    pub const fn wrote_text(&self) -> bool {
        self.wrote_text
    }
}

impl TurnSink for TerminalSink {
    fn on_text(&mut self, text: &str) {
        self.wrote_text = true;
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn on_tool_call(&mut self, call: &ParsedToolCall) {
        if self.wrote_text {
            println!();
        }
        eprintln!("[tool] calling {}", call.name);
    }

    fn on_tool_result(&mut self, outcome: &ToolCallOutcome) {
        eprintln!("{}", describe_outcome(outcome));
    }
}

/// One-line summary of a tool exchange.
pub fn describe_outcome(outcome: &ToolCallOutcome) -> String {
    if outcome.result.success {
        format!("[tool] {} succeeded", outcome.call.name)
    } else {
        format!(
            "[tool] {} failed: {}",
            outcome.call.name,
            outcome.result.error.as_deref().unwrap_or("unknown error")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolrelay_core::ToolResult;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_describe_outcome() {
        let ok = ToolCallOutcome {
            call: ParsedToolCall::new("local::current_time"),
            result: ToolResult::success(serde_json::json!({})),
        };
        assert_eq!(describe_outcome(&ok), "[tool] local::current_time succeeded");

        let failed = ToolCallOutcome {
            call: ParsedToolCall::new("slack::post"),
            result: ToolResult::error("No enabled server matches the namespace of 'slack::post'"),
        };
        assert!(describe_outcome(&failed).ends_with("namespace of 'slack::post'"));
    }
}
