//! `tools`: list what the model can call.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::presentation::truncate_string;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    ctx.start_auto_servers().await;
    let tools = ctx.dispatcher.available_tools().await;
    ctx.shutdown().await;

    println!("{} tool(s) available:\n", tools.len());
    for tool in tools {
        let description = tool.descriptor.description.as_deref().unwrap_or("");
        println!(
            "  {:<40} {}",
            tool.qualified_name,
            truncate_string(description, 60)
        );
    }
    Ok(())
}
