//! `call`: start one server and invoke a tool on it directly.

use anyhow::{Result, bail};
use serde_json::{Map, Value};
use toolrelay_core::{ToolResult, ToolServerPort};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Parse `--args` into a JSON object.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, CliError> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CliError::Arguments(format!(
            "--args must be a JSON object, got {other}"
        ))),
        Err(e) => Err(CliError::Arguments(format!("--args is not valid JSON: {e}"))),
    }
}

/// Start the server if needed and invoke `tool`.
pub async fn invoke(
    ctx: &CliContext,
    server_id: &str,
    tool: &str,
    arguments: Map<String, Value>,
) -> Result<ToolResult, CliError> {
    let definition = ctx.definition(server_id).await?;
    ctx.supervisor.start(definition).await?;
    ctx.supervisor
        .call_tool(server_id, tool, arguments)
        .await
        .map_err(|e| CliError::Process(e.to_string()))
}

pub async fn execute(ctx: &CliContext, server_id: &str, tool: &str, raw_args: &str) -> Result<()> {
    let arguments = parse_arguments(raw_args)?;
    let result = invoke(ctx, server_id, tool, arguments).await;
    ctx.shutdown().await;

    let result = result?;
    println!("{}", result.to_model_string());
    if !result.success {
        bail!("tool '{tool}' reported an error");
    }
    Ok(())
}
