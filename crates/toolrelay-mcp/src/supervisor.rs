//! Tool-server process lifecycle management.
//!
//! One process per started server. The handle table is keyed by server id,
//! so at most one handle exists per id. Callers share the supervisor via
//! `Arc`; requests clone the connection out of the table and never hold the
//! table lock while waiting on a pipe.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::process::Child;
use tokio::sync::RwLock;
use toolrelay_core::{
    AppEvent, AppEventEmitter, ErrorInfo, NoopEmitter, RunningServerInfo, ServerDefinition,
    ServerStatus, Settings, ToolDescriptor, ToolResult, ToolServerError, ToolServerPort,
};

use crate::connection::ServerConnection;
use crate::error::{CallError, ProcessError};
use crate::shutdown::{DEFAULT_TERMINATE_GRACE, terminate};
use crate::spawn::spawn_server;
use crate::stderr::StderrLog;

/// How long `test_connection` waits for stderr to drain after an early exit.
const STDERR_SETTLE: Duration = Duration::from_millis(500);

/// Timing knobs for the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Deadline for each `tools/call` / `tools/list`.
    pub call_timeout: Duration,
    /// How long a probed process must stay alive.
    pub connection_grace: Duration,
    /// SIGTERM → SIGKILL escalation delay.
    pub terminate_grace: Duration,
}

impl SupervisorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            call_timeout: settings.tool_call_timeout(),
            connection_grace: settings.connection_grace(),
            terminate_grace: DEFAULT_TERMINATE_GRACE,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::with_defaults())
    }
}

/// A started server.
struct RunningServer {
    definition: ServerDefinition,
    child: Child,
    connection: Arc<ServerConnection>,
    started_at: DateTime<Utc>,
}

impl RunningServer {
    fn info(&self) -> RunningServerInfo {
        RunningServerInfo {
            id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            pid: self.child.id(),
            started_at: self.started_at,
        }
    }
}

/// Supervisor for tool-server processes.
pub struct ServerSupervisor {
    servers: Arc<RwLock<HashMap<String, RunningServer>>>,
    /// Last failure per server id; cleared on successful start or stop.
    failures: Arc<RwLock<HashMap<String, String>>>,
    /// Stderr of current and past processes, kept after exit for diagnostics.
    logs: Arc<RwLock<HashMap<String, StderrLog>>>,
    emitter: Arc<dyn AppEventEmitter>,
    config: SupervisorConfig,
}

impl ServerSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_emitter(config, Arc::new(NoopEmitter::new()))
    }

    pub fn with_emitter(config: SupervisorConfig, emitter: Arc<dyn AppEventEmitter>) -> Self {
        Self {
            servers: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            logs: Arc::new(RwLock::new(HashMap::new())),
            emitter,
            config,
        }
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Start a server. Already running → returns the existing handle's info.
    ///
    /// On failure the server is recorded as `ServerStatus::Error`.
    pub async fn start(
        &self,
        definition: ServerDefinition,
    ) -> Result<RunningServerInfo, ProcessError> {
        let server_id = definition.id.clone();

        let spawned = {
            let mut servers = self.servers.write().await;
            if let Some(existing) = servers.get_mut(&server_id) {
                if matches!(existing.child.try_wait(), Ok(None)) {
                    tracing::debug!(server_id = %server_id, "start requested for running server");
                    return Ok(existing.info());
                }
                servers.remove(&server_id);
            }

            match spawn_server(&definition) {
                Ok(spawned) => {
                    let connection = Arc::new(ServerConnection::new(
                        server_id.clone(),
                        spawned.stdout,
                        spawned.stdin,
                    ));
                    let running = RunningServer {
                        definition,
                        child: spawned.child,
                        connection,
                        started_at: Utc::now(),
                    };
                    let info = running.info();
                    servers.insert(server_id.clone(), running);
                    Ok((info, spawned.stderr))
                }
                Err(e) => Err(e),
            }
        };

        match spawned {
            Ok((info, stderr)) => {
                self.logs.write().await.insert(server_id.clone(), stderr);
                self.failures.write().await.remove(&server_id);
                tracing::info!(server_id = %server_id, pid = ?info.pid, "tool server started");
                self.emitter
                    .emit(AppEvent::server_started(&info.id, &info.name));
                Ok(info)
            }
            Err(e) => {
                let info = match &e {
                    ProcessError::InvalidDefinition { .. } | ProcessError::NotResolved(_) => {
                        ErrorInfo::configuration(&server_id, e.to_string())
                    }
                    _ => ErrorInfo::process(&server_id, e.to_string()),
                };
                self.record_failure(info).await;
                Err(e)
            }
        }
    }

    async fn record_failure(&self, info: ErrorInfo) {
        let Some(server_id) = info.server_id.clone() else {
            return;
        };
        tracing::warn!(server_id = %server_id, error = %info.message, "tool server failed");
        let message = info.message.clone();
        self.emitter.emit(AppEvent::server_error(info));
        self.failures.write().await.insert(server_id, message);
    }

    /// Stop a server: close its pipes, terminate and reap the process.
    ///
    /// Not running → `Ok(())`. Pending requests fail with `NoResponse`.
    pub async fn stop(&self, server_id: &str) -> Result<(), ProcessError> {
        let removed = self.servers.write().await.remove(server_id);
        self.failures.write().await.remove(server_id);

        let Some(mut running) = removed else {
            tracing::debug!(server_id = %server_id, "stop requested for stopped server");
            return Ok(());
        };

        running.connection.close().await;
        let status = terminate(&mut running.child, self.config.terminate_grace)
            .await
            .map_err(ProcessError::Terminate)?;

        tracing::info!(server_id = %server_id, %status, "tool server stopped");
        self.emitter.emit(AppEvent::server_stopped(
            server_id,
            &running.definition.name,
        ));
        Ok(())
    }

    /// Replace a server's definition.
    ///
    /// A running server is restarted from the new definition and its info
    /// returned. A stopped server stays stopped (`Ok(None)`).
    pub async fn update(
        &self,
        definition: ServerDefinition,
    ) -> Result<Option<RunningServerInfo>, ProcessError> {
        if !self.is_running(&definition.id).await {
            return Ok(None);
        }
        self.stop(&definition.id).await?;
        self.start(definition).await.map(Some)
    }

    /// Spawn `definition` transiently and check it survives the grace period.
    ///
    /// A liveness heuristic, not a protocol handshake. The probe process is
    /// always terminated; an early exit reports the captured stderr.
    pub async fn test_connection(&self, definition: &ServerDefinition) -> Result<(), ProcessError> {
        let mut spawned = spawn_server(definition)?;

        tokio::time::sleep(self.config.connection_grace).await;

        let outcome = match spawned.child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => {
                let _ = tokio::time::timeout(STDERR_SETTLE, spawned.stderr_task).await;
                Err(ProcessError::ExitedEarly {
                    status: status.to_string(),
                    stderr: spawned.stderr.text(),
                })
            }
            Err(e) => Err(ProcessError::Wait(e)),
        };

        if let Err(e) = terminate(&mut spawned.child, self.config.terminate_grace).await {
            tracing::warn!(server_id = %definition.id, error = %e, "failed to terminate probe process");
        }

        match &outcome {
            Ok(()) => tracing::info!(server_id = %definition.id, "connection test passed"),
            Err(e) => tracing::info!(server_id = %definition.id, error = %e, "connection test failed"),
        }
        outcome
    }

    /// Current status. Reaps a process that exited on its own and records it
    /// as `ServerStatus::Error`.
    pub async fn status(&self, server_id: &str) -> ServerStatus {
        if self.is_running(server_id).await {
            return ServerStatus::Running;
        }
        self.failures
            .read()
            .await
            .get(server_id)
            .map_or(ServerStatus::Stopped, |msg| ServerStatus::Error(msg.clone()))
    }

    /// Whether a live process is attached for `server_id`.
    pub async fn is_running(&self, server_id: &str) -> bool {
        let exited = {
            let mut servers = self.servers.write().await;
            let Some(running) = servers.get_mut(server_id) else {
                return false;
            };
            match running.child.try_wait() {
                Ok(None) => return true,
                Ok(Some(status)) => {
                    servers.remove(server_id);
                    status.to_string()
                }
                Err(e) => {
                    tracing::warn!(server_id = %server_id, error = %e, "failed to query process");
                    return true;
                }
            }
        };

        self.record_failure(ErrorInfo::process(
            server_id,
            format!("process exited unexpectedly ({exited})"),
        ))
        .await;
        false
    }

    /// Ids of servers with a handle, sorted.
    pub async fn running_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.servers.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Info for every server with a handle.
    pub async fn running(&self) -> Vec<RunningServerInfo> {
        let servers = self.servers.read().await;
        let mut infos: Vec<_> = servers.values().map(RunningServer::info).collect();
        drop(servers);
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Connection of a running server.
    pub async fn connection(&self, server_id: &str) -> Option<Arc<ServerConnection>> {
        self.servers
            .read()
            .await
            .get(server_id)
            .map(|s| Arc::clone(&s.connection))
    }

    /// Raw correlated request to a running server.
    pub async fn call(
        &self,
        server_id: &str,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, CallError> {
        let connection = self
            .connection(server_id)
            .await
            .ok_or(CallError::NotConnected)?;
        connection.call(method, params, timeout).await
    }

    /// Last captured stderr lines of a server, oldest first.
    pub async fn stderr_tail(&self, server_id: &str, max_lines: usize) -> Vec<String> {
        let logs = self.logs.read().await;
        let Some(log) = logs.get(server_id) else {
            return Vec::new();
        };
        let lines = log.lines();
        let skip = lines.len().saturating_sub(max_lines);
        lines.into_iter().skip(skip).collect()
    }

    /// Stop every running server.
    pub async fn stop_all(&self) {
        for id in self.running_ids().await {
            if let Err(e) = self.stop(&id).await {
                tracing::warn!(server_id = %id, error = %e, "failed to stop server");
            }
        }
    }
}

impl Default for ServerSupervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}

#[async_trait]
impl ToolServerPort for ServerSupervisor {
    async fn call_tool(
        &self,
        server_id: &str,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, ToolServerError> {
        let connection = self
            .connection(server_id)
            .await
            .ok_or_else(|| ToolServerError::NotRunning(server_id.to_string()))?;

        tracing::debug!(server_id = %server_id, tool, "calling tool");
        connection
            .call_tool(tool, arguments, self.config.call_timeout)
            .await
            .map_err(|e| e.into_tool_server_error(server_id))
    }

    async fn list_tools(&self, server_id: &str) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        let connection = self
            .connection(server_id)
            .await
            .ok_or_else(|| ToolServerError::NotRunning(server_id.to_string()))?;

        connection
            .list_tools(self.config.call_timeout)
            .await
            .map_err(|e| e.into_tool_server_error(server_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolrelay_core::ErrorCategory;

    #[tokio::test]
    async fn test_unknown_server_is_stopped() {
        let supervisor = ServerSupervisor::default();
        assert_eq!(supervisor.status("nope").await, ServerStatus::Stopped);
        assert!(!supervisor.is_running("nope").await);
    }

    #[tokio::test]
    async fn test_stop_unknown_server_is_ok() {
        let supervisor = ServerSupervisor::default();
        assert!(supervisor.stop("nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_call_tool_on_stopped_server() {
        let supervisor = ServerSupervisor::default();
        let err = supervisor
            .call_tool("nope", "x", Map::new())
            .await
            .unwrap_err();
        assert_eq!(err, ToolServerError::NotRunning("nope".into()));
    }

    #[tokio::test]
    async fn test_failed_start_records_error() {
        let supervisor = ServerSupervisor::default();
        let def = ServerDefinition::new("ghost", "Ghost", "toolrelay-no-such-binary");

        assert!(supervisor.start(def).await.is_err());
        assert!(matches!(
            supervisor.status("ghost").await,
            ServerStatus::Error(msg) if msg.contains("toolrelay-no-such-binary")
        ));
    }

    #[derive(Clone, Default)]
    struct RecordingEmitter(Arc<std::sync::Mutex<Vec<AppEvent>>>);

    impl AppEventEmitter for RecordingEmitter {
        fn emit(&self, event: AppEvent) {
            self.0.lock().unwrap().push(event);
        }

        fn clone_box(&self) -> Box<dyn AppEventEmitter> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn test_unresolved_command_is_a_configuration_error() {
        let emitter = RecordingEmitter::default();
        let supervisor =
            ServerSupervisor::with_emitter(SupervisorConfig::default(), Arc::new(emitter.clone()));
        let def = ServerDefinition::new("ghost", "Ghost", "toolrelay-no-such-binary");

        assert!(supervisor.start(def).await.is_err());

        let events = emitter.0.lock().unwrap();
        assert!(matches!(
            events.as_slice(),
            [AppEvent::ServerError { error }]
                if error.category == ErrorCategory::Configuration
                    && error.server_id.as_deref() == Some("ghost")
        ));
    }

    #[tokio::test]
    async fn test_update_of_stopped_server_stays_stopped() {
        let supervisor = ServerSupervisor::default();
        let def = ServerDefinition::new("idle", "Idle", "sh");
        assert!(supervisor.update(def).await.unwrap().is_none());
        assert!(supervisor.running_ids().await.is_empty());
    }
}
