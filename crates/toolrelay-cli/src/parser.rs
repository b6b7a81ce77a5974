//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Relay tool calls between a local model and tool-server processes.
#[derive(Parser)]
#[command(name = "toolrelay")]
#[command(about = "Run tool servers and chat with a model that can call them")]
#[command(version)]
pub struct Cli {
    /// JSON file listing tool-server definitions
    #[arg(long, global = true, env = "TOOLRELAY_SERVERS")]
    pub servers: Option<PathBuf>,

    /// Base URL of the Ollama server
    #[arg(long = "provider-url", global = true, env = "TOOLRELAY_PROVIDER_URL")]
    pub provider_url: Option<String>,

    /// Model to chat with
    #[arg(long, global = true, env = "TOOLRELAY_MODEL")]
    pub model: Option<String>,

    /// Seconds to wait for a tool-server response
    #[arg(long = "tool-timeout", global = true, env = "TOOLRELAY_TOOL_TIMEOUT")]
    pub tool_timeout: Option<u64>,

    /// Replace the opening paragraph of the system prompt
    #[arg(long = "system-prompt", global = true, env = "TOOLRELAY_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "toolrelay",
            "--verbose",
            "--servers",
            "/tmp/servers.json",
            "servers",
            "--model",
            "qwen2.5",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.servers, Some(PathBuf::from("/tmp/servers.json")));
        assert_eq!(cli.model.as_deref(), Some("qwen2.5"));
        assert!(matches!(cli.command, Some(Commands::Servers)));
    }
}
