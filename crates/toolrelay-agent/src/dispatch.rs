//! Routing of decoded tool calls to local built-ins or server processes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use toolrelay_core::{
    AppEvent, AppEventEmitter, ApprovalHandler, DenyAll, ErrorInfo, LOCAL_NAMESPACE,
    LocalToolError, NAMESPACE_DELIMITER, NoopEmitter, ParsedToolCall, ServerDefinition,
    ServerRegistry, ToolCallOutcome, ToolDescriptor, ToolResult, ToolServerError, ToolServerPort,
    split_namespace,
};

use crate::approvals::confirm;
use crate::local_tools::LocalToolRegistry;

/// Where a tool call goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local { tool: String },
    Server { server_id: String, tool: String },
}

/// Why a call could not be routed or completed. Rendered into the tool
/// result so the model can react.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Tool name '{0}' must have the form 'namespace::tool'")]
    MissingNamespace(String),

    #[error("No enabled server matches the namespace of '{0}'")]
    UnknownNamespace(String),

    #[error("More than one enabled server matches the namespace of '{0}'")]
    AmbiguousNamespace(String),

    #[error("Unknown local tool: {0}")]
    UnknownLocalTool(String),

    #[error("Server '{0}' is not running")]
    NotRunning(String),

    #[error("User denied '{0}'")]
    Denied(String),

    #[error("Tool '{tool}' failed: {source}")]
    Call {
        tool: String,
        #[source]
        source: ToolServerError,
    },

    #[error("Local tool '{tool}' failed: {source}")]
    Local {
        tool: String,
        #[source]
        source: LocalToolError,
    },
}

/// Resolve `tool_name` against the reserved local namespace and the
/// enabled servers. Namespaces match server id or display name,
/// ASCII case-insensitively; an id match wins over display names.
pub fn resolve(tool_name: &str, enabled: &[ServerDefinition]) -> Result<Target, DispatchError> {
    let Some((namespace, tool)) = split_namespace(tool_name) else {
        return Err(DispatchError::MissingNamespace(tool_name.to_string()));
    };
    let (namespace, tool) = (namespace.trim(), tool.trim());
    if namespace.is_empty() || tool.is_empty() {
        return Err(DispatchError::MissingNamespace(tool_name.to_string()));
    }

    if namespace.eq_ignore_ascii_case(LOCAL_NAMESPACE) {
        return Ok(Target::Local {
            tool: tool.to_string(),
        });
    }

    let by_id: Vec<&ServerDefinition> = enabled
        .iter()
        .filter(|server| server.id.eq_ignore_ascii_case(namespace))
        .collect();
    let candidates = if by_id.is_empty() {
        enabled
            .iter()
            .filter(|server| server.matches_namespace(namespace))
            .collect()
    } else {
        by_id
    };

    match candidates.as_slice() {
        [server] => Ok(Target::Server {
            server_id: server.id.clone(),
            tool: tool.to_string(),
        }),
        [] => Err(DispatchError::UnknownNamespace(tool_name.to_string())),
        _ => Err(DispatchError::AmbiguousNamespace(tool_name.to_string())),
    }
}

/// A tool offered to the model, with its full namespaced name.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableTool {
    pub qualified_name: String,
    pub descriptor: ToolDescriptor,
}

/// Invokes tool calls on behalf of the conversation controller.
pub struct ToolDispatcher {
    registry: Arc<RwLock<ServerRegistry>>,
    servers: Arc<dyn ToolServerPort>,
    local: LocalToolRegistry,
    approvals: Arc<dyn ApprovalHandler>,
    approval_timeout: Duration,
    emitter: Arc<dyn AppEventEmitter>,
}

impl ToolDispatcher {
    /// Sensitive local tools are denied until an approval handler is set.
    pub fn new(registry: Arc<RwLock<ServerRegistry>>, servers: Arc<dyn ToolServerPort>) -> Self {
        Self {
            registry,
            servers,
            local: LocalToolRegistry::new(),
            approvals: Arc::new(DenyAll),
            approval_timeout: Duration::from_secs(
                toolrelay_core::settings::DEFAULT_APPROVAL_TIMEOUT_SECS,
            ),
            emitter: Arc::new(NoopEmitter::new()),
        }
    }

    #[must_use]
    pub fn with_local_tools(mut self, local: LocalToolRegistry) -> Self {
        self.local = local;
        self
    }

    #[must_use]
    pub fn with_approvals(mut self, approvals: Arc<dyn ApprovalHandler>, timeout: Duration) -> Self {
        self.approvals = approvals;
        self.approval_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn AppEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub const fn local_tools(&self) -> &LocalToolRegistry {
        &self.local
    }

    /// Resolve against the currently enabled servers.
    pub async fn resolve(&self, tool_name: &str) -> Result<Target, DispatchError> {
        let enabled = self.registry.read().await.enabled_servers();
        resolve(tool_name, &enabled)
    }

    /// Resolve and invoke. Every failure becomes an error result.
    pub async fn dispatch(&self, call: ParsedToolCall) -> ToolCallOutcome {
        let result = match self.try_dispatch(&call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::info!(tool = %call.name, error = %e, "tool call failed");
                ToolResult::error(e.to_string())
            }
        };
        self.emitter
            .emit(AppEvent::tool_called(&call.name, result.success));
        ToolCallOutcome { call, result }
    }

    /// Resolve and invoke, keeping the routing error.
    pub async fn try_dispatch(&self, call: &ParsedToolCall) -> Result<ToolResult, DispatchError> {
        match self.resolve(&call.name).await? {
            Target::Local { tool } => self.invoke_local(&tool, call.arguments.clone()).await,
            Target::Server { server_id, tool } => {
                tracing::debug!(server_id = %server_id, tool = %tool, "dispatching to server");
                self.servers
                    .call_tool(&server_id, &tool, call.arguments.clone())
                    .await
                    .map_err(|source| match source {
                        ToolServerError::NotRunning(_) => DispatchError::NotRunning(server_id),
                        source => {
                            self.emitter.emit(AppEvent::server_error(ErrorInfo::for_call(
                                server_id, &source,
                            )));
                            DispatchError::Call {
                                tool: call.name.clone(),
                                source,
                            }
                        }
                    })
            }
        }
    }

    async fn invoke_local(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, DispatchError> {
        let handler = self
            .local
            .get(tool)
            .ok_or_else(|| DispatchError::UnknownLocalTool(tool.to_string()))?;

        let qualified = format!("{LOCAL_NAMESPACE}{NAMESPACE_DELIMITER}{tool}");
        if handler.requires_approval()
            && !confirm(
                self.approvals.as_ref(),
                &qualified,
                &arguments,
                self.approval_timeout,
            )
            .await
        {
            return Err(DispatchError::Denied(qualified));
        }

        handler
            .invoke(arguments)
            .await
            .map(ToolResult::success)
            .map_err(|source| DispatchError::Local {
                tool: qualified,
                source,
            })
    }

    /// Tools to advertise: local built-ins, then the tools of each enabled
    /// server that answers `tools/list`. Servers that fail are skipped.
    pub async fn available_tools(&self) -> Vec<AvailableTool> {
        let mut tools: Vec<AvailableTool> = self
            .local
            .descriptors()
            .into_iter()
            .map(|descriptor| AvailableTool {
                qualified_name: format!("{LOCAL_NAMESPACE}{NAMESPACE_DELIMITER}{}", descriptor.name),
                descriptor,
            })
            .collect();

        let enabled = self.registry.read().await.enabled_servers();
        for server in enabled {
            match self.servers.list_tools(&server.id).await {
                Ok(listed) => tools.extend(listed.into_iter().map(|descriptor| AvailableTool {
                    qualified_name: format!("{}{NAMESPACE_DELIMITER}{}", server.id, descriptor.name),
                    descriptor,
                })),
                Err(e) => {
                    tracing::debug!(server_id = %server.id, error = %e, "skipping server tools");
                }
            }
        }
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use toolrelay_core::{AutoApprove, ErrorCategory, LocalTool};

    #[derive(Clone, Default)]
    struct RecordingEmitter(Arc<Mutex<Vec<AppEvent>>>);

    impl AppEventEmitter for RecordingEmitter {
        fn emit(&self, event: AppEvent) {
            self.0.lock().unwrap().push(event);
        }

        fn clone_box(&self) -> Box<dyn AppEventEmitter> {
            Box::new(self.clone())
        }
    }

    /// Port that records calls and answers from a fixed table.
    #[derive(Default)]
    struct MockServers {
        running: Vec<&'static str>,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ToolServerPort for MockServers {
        async fn call_tool(
            &self,
            server_id: &str,
            tool: &str,
            _arguments: Map<String, Value>,
        ) -> Result<ToolResult, ToolServerError> {
            if !self.running.contains(&server_id) {
                return Err(ToolServerError::NotRunning(server_id.to_string()));
            }
            if tool == "hang" {
                return Err(ToolServerError::Timeout("30s".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push((server_id.to_string(), tool.to_string()));
            Ok(ToolResult::success(json!({"server": server_id, "tool": tool})))
        }

        async fn list_tools(&self, server_id: &str) -> Result<Vec<ToolDescriptor>, ToolServerError> {
            if self.running.contains(&server_id) {
                Ok(vec![ToolDescriptor::new("search_issues").with_description("Search issues")])
            } else {
                Err(ToolServerError::NotRunning(server_id.to_string()))
            }
        }
    }

    struct Click {
        sensitive: bool,
    }

    #[async_trait]
    impl LocalTool for Click {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("click").with_description("Click an element")
        }

        fn requires_approval(&self) -> bool {
            self.sensitive
        }

        async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, LocalToolError> {
            match arguments.get("selector") {
                Some(selector) => Ok(json!({ "clicked": selector })),
                None => Err(LocalToolError::new("selector is required")),
            }
        }
    }

    fn github() -> ServerDefinition {
        ServerDefinition::new("github", "GitHub", "npx")
    }

    fn registry_with(servers: Vec<(ServerDefinition, bool)>) -> Arc<RwLock<ServerRegistry>> {
        let mut registry = ServerRegistry::new();
        for (def, enabled) in servers {
            registry.add(def, enabled).unwrap();
        }
        Arc::new(RwLock::new(registry))
    }

    #[test]
    fn test_resolve_server_case_insensitive() {
        let target = resolve("GitHub::search_issues", &[github()]).unwrap();
        assert_eq!(
            target,
            Target::Server {
                server_id: "github".into(),
                tool: "search_issues".into()
            }
        );
    }

    #[test]
    fn test_resolve_unknown_namespace() {
        let err = resolve("slack::post", &[github()]).unwrap_err();
        assert_eq!(err, DispatchError::UnknownNamespace("slack::post".into()));
        assert!(err.to_string().contains("slack::post"));
    }

    #[test]
    fn test_resolve_local_and_display_name() {
        assert_eq!(
            resolve("LOCAL::screenshot", &[]).unwrap(),
            Target::Local {
                tool: "screenshot".into()
            }
        );

        let files = ServerDefinition::new("fs-1", "Files", "mcp-fs");
        assert_eq!(
            resolve("files::read", &[files]).unwrap(),
            Target::Server {
                server_id: "fs-1".into(),
                tool: "read".into()
            }
        );
    }

    #[test]
    fn test_resolve_prefers_id_over_display_name() {
        let servers = [
            ServerDefinition::new("fs-2", "Files", "mcp-fs"),
            ServerDefinition::new("files", "Docs", "mcp-docs"),
        ];
        assert_eq!(
            resolve("files::read", &servers).unwrap(),
            Target::Server {
                server_id: "files".into(),
                tool: "read".into()
            }
        );
    }

    #[test]
    fn test_resolve_ambiguous_display_name() {
        let servers = [
            ServerDefinition::new("fs-1", "Files", "mcp-fs"),
            ServerDefinition::new("fs-2", "FILES", "mcp-fs"),
        ];
        assert_eq!(
            resolve("files::read", &servers).unwrap_err(),
            DispatchError::AmbiguousNamespace("files::read".into())
        );
    }

    #[test]
    fn test_resolve_malformed_names() {
        for name in ["search_issues", "::search", "github::", ""] {
            assert!(
                matches!(resolve(name, &[github()]), Err(DispatchError::MissingNamespace(_))),
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn test_disabled_server_is_not_a_target() {
        let dispatcher = ToolDispatcher::new(
            registry_with(vec![(github(), false)]),
            Arc::new(MockServers::default()),
        );
        let err = dispatcher.resolve("github::search_issues").await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownNamespace(_)));
    }

    #[tokio::test]
    async fn test_dispatch_to_server() {
        let servers = Arc::new(MockServers {
            running: vec!["github"],
            ..Default::default()
        });
        let dispatcher = ToolDispatcher::new(
            registry_with(vec![(github(), true)]),
            Arc::clone(&servers) as Arc<dyn ToolServerPort>,
        );

        let outcome = dispatcher
            .dispatch(ParsedToolCall::new("GitHub::search_issues").with_argument("q", "bug"))
            .await;
        assert!(outcome.result.success);
        assert_eq!(
            servers.calls.lock().unwrap().as_slice(),
            &[("github".to_string(), "search_issues".to_string())]
        );
    }

    #[tokio::test]
    async fn test_dispatch_errors_become_results() {
        let dispatcher = ToolDispatcher::new(
            registry_with(vec![(github(), true)]),
            Arc::new(MockServers::default()),
        );

        let outcome = dispatcher.dispatch(ParsedToolCall::new("github::search")).await;
        assert!(!outcome.result.success);
        assert_eq!(outcome.result.error.as_deref(), Some("Server 'github' is not running"));

        let outcome = dispatcher.dispatch(ParsedToolCall::new("local::nope")).await;
        assert_eq!(outcome.result.error.as_deref(), Some("Unknown local tool: nope"));
    }

    #[tokio::test]
    async fn test_failed_server_call_emits_error_event() {
        let emitter = RecordingEmitter::default();
        let dispatcher = ToolDispatcher::new(
            registry_with(vec![(github(), true)]),
            Arc::new(MockServers {
                running: vec!["github"],
                ..Default::default()
            }),
        )
        .with_emitter(Arc::new(emitter.clone()));

        let outcome = dispatcher.dispatch(ParsedToolCall::new("github::hang")).await;
        assert!(!outcome.result.success);

        let events = emitter.0.lock().unwrap();
        assert!(matches!(
            events.as_slice(),
            [
                AppEvent::ServerError { error },
                AppEvent::ToolCalled { .. },
            ] if error.category == ErrorCategory::Protocol
                && error.server_id.as_deref() == Some("github")
        ));
    }

    #[tokio::test]
    async fn test_local_tool_invocation_and_failure() {
        let dispatcher = ToolDispatcher::new(registry_with(vec![]), Arc::new(MockServers::default()))
            .with_local_tools(LocalToolRegistry::new().with_tool(Arc::new(Click { sensitive: false })));

        let ok = dispatcher
            .try_dispatch(&ParsedToolCall::new("local::click").with_argument("selector", "#go"))
            .await
            .unwrap();
        assert_eq!(ok.data, Some(json!({"clicked": "#go"})));

        let err = dispatcher
            .try_dispatch(&ParsedToolCall::new("local::click"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Local { .. }));
    }

    #[tokio::test]
    async fn test_sensitive_tool_requires_approval() {
        let local = LocalToolRegistry::new().with_tool(Arc::new(Click { sensitive: true }));
        let call = ParsedToolCall::new("local::click").with_argument("selector", "#buy");

        let denied = ToolDispatcher::new(registry_with(vec![]), Arc::new(MockServers::default()))
            .with_local_tools(local.clone());
        assert_eq!(
            denied.try_dispatch(&call).await.unwrap_err(),
            DispatchError::Denied("local::click".into())
        );

        let approved = ToolDispatcher::new(registry_with(vec![]), Arc::new(MockServers::default()))
            .with_local_tools(local)
            .with_approvals(Arc::new(AutoApprove), Duration::from_secs(1));
        assert!(approved.try_dispatch(&call).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_available_tools_lists_local_and_running_servers() {
        let slack = ServerDefinition::new("slack", "Slack", "npx");
        let dispatcher = ToolDispatcher::new(
            registry_with(vec![(github(), true), (slack, true)]),
            Arc::new(MockServers {
                running: vec!["github"],
                ..Default::default()
            }),
        )
        .with_local_tools(LocalToolRegistry::new().with_tool(Arc::new(Click { sensitive: false })));

        let names: Vec<_> = dispatcher
            .available_tools()
            .await
            .into_iter()
            .map(|t| t.qualified_name)
            .collect();
        assert_eq!(names, vec!["local::click", "github::search_issues"]);
    }
}
