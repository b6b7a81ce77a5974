//! CLI bootstrap - the composition root.
//!
//! The only place where the supervisor, dispatcher and provider are wired
//! together. Handlers receive the composed `CliContext`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use toolrelay_agent::{ToolDispatcher, TurnController};
use toolrelay_core::{
    AppEvent, AppEventEmitter, ChatOptions, ServerDefinition, ServerRegistry, Settings,
    ToolServerPort,
};
use toolrelay_mcp::{ServerSupervisor, SupervisorConfig};
use toolrelay_provider::{OllamaConfig, OllamaProvider};

use crate::builtins;
use crate::config::load_registry;
use crate::error::CliError;
use crate::presentation::{InputLines, TerminalApproval};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: Settings,
    /// Explicit servers file; the default file is tried when `None`.
    pub servers_file: Option<PathBuf>,
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub settings: Settings,
    pub registry: Arc<RwLock<ServerRegistry>>,
    pub supervisor: Arc<ServerSupervisor>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub input: InputLines,
    /// Where the registry was loaded from, if anywhere.
    pub servers_file: Option<PathBuf>,
}

/// Logs lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct LoggingEmitter;

impl AppEventEmitter for LoggingEmitter {
    fn emit(&self, event: AppEvent) {
        match &event {
            AppEvent::ServerError { error } => {
                tracing::warn!(event = event.event_name(), server_id = ?error.server_id, message = %error.message, "server error");
            }
            _ => tracing::info!(event = event.event_name(), ?event, "event"),
        }
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}

/// Bootstrap the CLI application.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let (registry, servers_file) = load_registry(config.servers_file.as_deref())?;
    tracing::debug!(servers = registry.len(), file = ?servers_file, "registry loaded");

    let emitter: Arc<dyn AppEventEmitter> = Arc::new(LoggingEmitter);
    let supervisor = Arc::new(ServerSupervisor::with_emitter(
        SupervisorConfig::from_settings(&config.settings),
        Arc::clone(&emitter),
    ));
    let registry = Arc::new(RwLock::new(registry));
    let input = InputLines::stdin();

    let servers: Arc<dyn ToolServerPort> = supervisor.clone();
    let dispatcher = ToolDispatcher::new(Arc::clone(&registry), servers)
        .with_local_tools(builtins::registry())
        .with_approvals(
            Arc::new(TerminalApproval::new(input.clone())),
            config.settings.approval_timeout(),
        )
        .with_emitter(emitter);

    Ok(CliContext {
        settings: config.settings,
        registry,
        supervisor,
        dispatcher: Arc::new(dispatcher),
        input,
        servers_file,
    })
}

impl CliContext {
    /// Look up a configured server.
    pub async fn definition(&self, server_id: &str) -> Result<ServerDefinition, CliError> {
        self.registry
            .read()
            .await
            .get(server_id)
            .cloned()
            .ok_or_else(|| CliError::Arguments(format!("unknown server '{server_id}'")))
    }

    /// Start every enabled server marked `auto_start`. Failures are logged
    /// and the server stays unavailable to the model.
    pub async fn start_auto_servers(&self) {
        let servers = self.registry.read().await.enabled_servers();
        for server in servers.into_iter().filter(|s| s.auto_start) {
            let id = server.id.clone();
            if let Err(e) = self.supervisor.start(server).await {
                tracing::warn!(server_id = %id, error = %e, "auto-start failed");
                eprintln!("warning: server '{id}' failed to start: {e}");
            }
        }
    }

    /// Controller for tool-enabled turns against the configured provider.
    pub fn controller(&self) -> Result<TurnController, CliError> {
        let provider = OllamaProvider::new(OllamaConfig::from_settings(&self.settings))?;
        Ok(TurnController::new(Arc::new(provider), Arc::clone(&self.dispatcher))
            .with_options(ChatOptions {
                model: Some(self.settings.effective_model().to_string()),
                temperature: None,
            })
            .with_preamble(self.settings.system_prompt.clone()))
    }

    pub async fn shutdown(&self) {
        self.supervisor.stop_all().await;
    }
}
