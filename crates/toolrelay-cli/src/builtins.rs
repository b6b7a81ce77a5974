//! Built-in `local::` tools offered by the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use toolrelay_agent::LocalToolRegistry;
use toolrelay_core::{LocalTool, LocalToolError, ToolDescriptor};

/// Largest file `read_file_base64` will return.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Registry with every built-in tool.
pub fn registry() -> LocalToolRegistry {
    LocalToolRegistry::new()
        .with_tool(Arc::new(CurrentTime))
        .with_tool(Arc::new(ReadFileBase64))
}

/// Current local and UTC time.
pub struct CurrentTime;

#[async_trait]
impl LocalTool for CurrentTime {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("current_time")
            .with_description("Current date and time, local and UTC")
            .with_input_schema(json!({"type": "object", "properties": {}}))
    }

    async fn invoke(&self, _arguments: Map<String, Value>) -> Result<Value, LocalToolError> {
        let local = chrono::Local::now();
        Ok(json!({
            "local": local.to_rfc3339(),
            "utc": local.with_timezone(&chrono::Utc).to_rfc3339(),
            "unix": local.timestamp(),
        }))
    }
}

/// Reads a file and returns it base64-encoded. Needs user approval.
pub struct ReadFileBase64;

#[async_trait]
impl LocalTool for ReadFileBase64 {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("read_file_base64")
            .with_description("Read a local file and return its bytes as base64")
            .with_input_schema(json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }))
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, LocalToolError> {
        let path = arguments
            .get("path")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .ok_or_else(|| LocalToolError::new("'path' must be a string"))?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| LocalToolError::new(format!("{}: {e}", path.display())))?;
        if !metadata.is_file() {
            return Err(LocalToolError::new(format!("{} is not a file", path.display())));
        }
        if metadata.len() > MAX_FILE_BYTES {
            return Err(LocalToolError::new(format!(
                "{} is {} bytes, limit is {MAX_FILE_BYTES}",
                path.display(),
                metadata.len()
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| LocalToolError::new(format!("{}: {e}", path.display())))?;
        Ok(json!({
            "path": path.display().to_string(),
            "size": bytes.len(),
            "data": STANDARD.encode(&bytes),
        }))
    }
}
