//! Available subcommands.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// List configured tool servers
    Servers,

    /// Check that a server starts and stays up
    Test {
        /// Server id
        server_id: String,
    },

    /// Start a server and invoke one of its tools
    Call {
        /// Server id
        server_id: String,
        /// Tool name, without namespace
        tool: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// List tools the model can call
    Tools,

    /// Ask one question with tools enabled
    Ask {
        /// The message to send
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Interactive chat with tools enabled
    Chat,
}

#[cfg(test)]
mod tests {
    use crate::parser::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn test_call_args() {
        let cli = Cli::parse_from([
            "toolrelay",
            "call",
            "github",
            "search_issues",
            "--args",
            r#"{"query":"bug"}"#,
        ]);
        match cli.command {
            Some(Commands::Call {
                server_id,
                tool,
                args,
            }) => {
                assert_eq!(server_id, "github");
                assert_eq!(tool, "search_issues");
                assert_eq!(args, r#"{"query":"bug"}"#);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::parse_from(["toolrelay", "ask", "what", "time", "is", "it"]);
        assert!(matches!(cli.command, Some(Commands::Ask { message }) if message.len() == 4));
    }
}
