//! Core domain types.
//!
//! # Structure
//!
//! - `server` - Tool-server definitions, status and tool descriptors
//! - `tool` - Tool calls decoded from model output and their results
//! - `chat` - Chat messages exchanged with the provider

pub mod chat;
pub mod server;
pub mod tool;

pub use chat::{ChatMessage, MessageRole};
pub use server::{EnvEntry, RunningServerInfo, ServerDefinition, ServerStatus, ToolDescriptor};
pub use tool::{
    LOCAL_NAMESPACE, NAMESPACE_DELIMITER, ParsedToolCall, ToolCallOutcome, ToolResult,
    split_namespace,
};
