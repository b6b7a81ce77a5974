//! CLI entry point - the composition root.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use toolrelay_cli::config::settings_from_cli;
use toolrelay_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig {
        settings: settings_from_cli(&cli)?,
        servers_file: cli.servers.clone(),
    };
    let ctx = bootstrap(config)?;

    match command {
        Commands::Servers => handlers::servers::execute(&ctx).await,
        Commands::Test { server_id } => handlers::test_connection::execute(&ctx, server_id).await,
        Commands::Call {
            server_id,
            tool,
            args,
        } => handlers::call::execute(&ctx, server_id, tool, args).await,
        Commands::Tools => handlers::tools::execute(&ctx).await,
        Commands::Ask { message } => handlers::ask::execute(&ctx, &message.join(" ")).await,
        Commands::Chat => handlers::chat::execute(&ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(CliError::exit_code_for(&e))
        }
    }
}
