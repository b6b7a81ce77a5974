//! Tool-server invocation port.
//!
//! The agent layer dispatches server-bound calls through this trait; the
//! process supervisor implements it.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::ToolServerError;
use crate::domain::{ToolDescriptor, ToolResult};

/// Port for invoking tools hosted by running external servers.
#[async_trait]
pub trait ToolServerPort: Send + Sync {
    /// Call `tool` on the running server `server_id` via `tools/call`.
    async fn call_tool(
        &self,
        server_id: &str,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolResult, ToolServerError>;

    /// List the tools a running server advertises.
    async fn list_tools(&self, server_id: &str) -> Result<Vec<ToolDescriptor>, ToolServerError>;
}
