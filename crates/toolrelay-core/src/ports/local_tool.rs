//! Local built-in tool port.
//!
//! Built-ins (browser control, screenshots, ...) live outside the pipeline;
//! they plug in by implementing `LocalTool`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::ToolDescriptor;

/// Failure reported by a local tool handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LocalToolError(pub String);

impl LocalToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A built-in tool addressed as `local::<name>`.
#[async_trait]
pub trait LocalTool: Send + Sync {
    /// Name, description and schema. `name` is the part after `local::`.
    fn descriptor(&self) -> ToolDescriptor;

    /// Whether each invocation must be confirmed by the user.
    fn requires_approval(&self) -> bool {
        false
    }

    /// Run the tool.
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, LocalToolError>;
}
