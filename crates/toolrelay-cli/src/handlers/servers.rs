//! `servers`: list configured tool servers.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, truncate_string};

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let entries = ctx.registry.read().await.entries();

    if entries.is_empty() {
        match &ctx.servers_file {
            Some(path) => println!("No servers defined in {}.", path.display()),
            None => println!(
                "No servers configured. Pass --servers <file> or create {}.",
                crate::config::DEFAULT_SERVERS_FILE
            ),
        }
        return Ok(());
    }

    let running = ctx.supervisor.running().await;

    println!(
        "{:<16} {:<20} {:<8} {:<6} {:<10} {:<8} Command",
        "ID", "Name", "Enabled", "Auto", "Status", "PID"
    );
    print_separator(98);

    for entry in entries {
        let def = &entry.definition;
        let status = ctx.supervisor.status(&def.id).await;
        let command = std::iter::once(def.command.as_str())
            .chain(def.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let pid = running
            .iter()
            .find(|info| info.id == def.id)
            .and_then(|info| info.pid)
            .map_or_else(|| "-".to_string(), |pid| pid.to_string());
        println!(
            "{:<16} {:<20} {:<8} {:<6} {:<10} {:<8} {}",
            truncate_string(&def.id, 15),
            truncate_string(&def.name, 19),
            if entry.enabled { "yes" } else { "no" },
            if def.auto_start { "yes" } else { "no" },
            truncate_string(&status.to_string(), 10),
            pid,
            truncate_string(&command, 40),
        );
    }
    Ok(())
}
