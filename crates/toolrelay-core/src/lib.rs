//! Core domain types and ports for the toolrelay pipeline.
//!
//! This crate has no process, network or UI dependencies. Adapters live in
//! `toolrelay-mcp` (server supervision) and `toolrelay-provider` (model
//! streaming); orchestration lives in `toolrelay-agent`.

pub mod domain;
pub mod events;
pub mod ports;
pub mod registry;
pub mod settings;

pub use domain::{
    ChatMessage, EnvEntry, LOCAL_NAMESPACE, MessageRole, NAMESPACE_DELIMITER, ParsedToolCall,
    RunningServerInfo, ServerDefinition, ServerStatus, ToolCallOutcome, ToolDescriptor,
    ToolResult, split_namespace,
};
pub use events::AppEvent;
pub use ports::{
    AppEventEmitter, ApprovalHandler, AutoApprove, ChatOptions, ChatProvider, DenyAll,
    ErrorCategory, ErrorInfo, LocalTool, LocalToolError, NoopEmitter, ProviderError, TextStream,
    ToolServerError, ToolServerPort,
};
pub use registry::{RegistryEntry, RegistryError, ServerRegistry};
pub use settings::{Settings, SettingsError, SettingsUpdate, validate_settings};
