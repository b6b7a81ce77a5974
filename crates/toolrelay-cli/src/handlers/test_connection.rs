//! `test`: start a server, check it stays up, stop it.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, server_id: &str) -> Result<()> {
    let definition = ctx.definition(server_id).await?;
    println!("Testing '{}' ({})...", definition.name, definition.command);

    ctx.supervisor
        .test_connection(&definition)
        .await
        .map_err(CliError::from)?;

    println!("Server '{server_id}' started and stayed up.");
    Ok(())
}
