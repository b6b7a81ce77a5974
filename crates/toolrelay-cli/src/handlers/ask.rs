//! `ask`: one tool-enabled turn streamed to the terminal.

use anyhow::{Context, Result};

use super::cancel_on_ctrl_c;
use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::TerminalSink;

pub async fn execute(ctx: &CliContext, message: &str) -> Result<()> {
    let controller = ctx.controller()?;
    ctx.start_auto_servers().await;

    let (cancel, ctrl_c) = cancel_on_ctrl_c();
    let mut sink = TerminalSink::new();
    let outcome = controller
        .stream_with_tools(message, &[], &mut sink, &cancel)
        .await;
    ctrl_c.abort();
    ctx.shutdown().await;

    match outcome {
        Ok(_) => {
            println!();
            Ok(())
        }
        Err(toolrelay_agent::TurnError::Cancelled) => {
            eprintln!("\ncancelled");
            Ok(())
        }
        Err(toolrelay_agent::TurnError::Provider(e)) => {
            Err(CliError::from(e)).context("model request failed")
        }
    }
}
