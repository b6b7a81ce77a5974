//! Port definitions (trait abstractions) for external systems.
//!
//! Ports keep the agent pipeline independent of process management, HTTP
//! clients and UI. Adapters in other crates implement them.

mod approval;
mod errors;
mod event_emitter;
mod local_tool;
mod provider;
mod tool_server;

pub use approval::{ApprovalHandler, AutoApprove, DenyAll};
pub use errors::{ErrorCategory, ErrorInfo, ProviderError, ToolServerError};
pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use local_tool::{LocalTool, LocalToolError};
pub use provider::{ChatOptions, ChatProvider, TextStream};
pub use tool_server::ToolServerPort;
