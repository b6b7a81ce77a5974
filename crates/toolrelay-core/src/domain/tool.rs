//! Tool-call domain types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Namespace delimiter in tool names (`server::tool`).
pub const NAMESPACE_DELIMITER: &str = "::";

/// Reserved namespace routing to local built-in tools.
pub const LOCAL_NAMESPACE: &str = "local";

/// A tool call decoded from model output.
///
/// Wire form inside the sentinel block:
/// `{"name": "server::tool", "arguments": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedToolCall {
    /// Namespaced tool name.
    pub name: String,

    /// Argument map. Missing `arguments` decodes as empty.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ParsedToolCall {
    /// Create a call with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument.
    #[must_use]
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Decode a call from a JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload.trim())
    }
}

/// Split a tool name at the first delimiter into `(namespace, tool)`.
pub fn split_namespace(name: &str) -> Option<(&str, &str)> {
    name.split_once(NAMESPACE_DELIMITER)
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the call succeeded.
    pub success: bool,

    /// Result data (if success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a success result.
    #[must_use]
    pub const fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Render the result as the content of a tool-role message.
    ///
    /// String payloads are passed through verbatim, structured payloads are
    /// pretty-printed, failures become `{"error": "..."}`.
    pub fn to_model_string(&self) -> String {
        if !self.success {
            let message = self.error.as_deref().unwrap_or("Unknown error");
            return pretty(&json!({ "error": message }));
        }

        match &self.data {
            Some(Value::String(s)) => s.clone(),
            Some(value) => pretty(value),
            None => "null".to_string(),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// A completed tool exchange: what was called and what came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    /// The call as emitted by the model.
    pub call: ParsedToolCall,
    /// Invocation result (errors included).
    pub result: ToolResult,
}

impl ToolCallOutcome {
    /// Content for the tool-role message.
    pub fn content(&self) -> String {
        self.result.to_model_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_with_arguments() {
        let call = ParsedToolCall::from_json(
            r#"{"name":"github::search_issues","arguments":{"query":"bug","limit":5}}"#,
        )
        .unwrap();
        assert_eq!(call.name, "github::search_issues");
        assert_eq!(call.arguments["limit"], 5);
    }

    #[test]
    fn test_parse_call_without_arguments() {
        let call = ParsedToolCall::from_json(r#"  {"name":"local::screenshot"}  "#).unwrap();
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_parse_call_rejects_non_object_arguments() {
        assert!(ParsedToolCall::from_json(r#"{"name":"x::y","arguments":[1]}"#).is_err());
    }

    #[test]
    fn test_split_namespace_uses_first_delimiter() {
        assert_eq!(split_namespace("a::b::c"), Some(("a", "b::c")));
        assert_eq!(split_namespace("plain"), None);
    }

    #[test]
    fn test_model_string_for_string_payload() {
        let result = ToolResult::success(Value::String("aGVsbG8=".into()));
        assert_eq!(result.to_model_string(), "aGVsbG8=");
    }

    #[test]
    fn test_model_string_pretty_prints_objects() {
        let result = ToolResult::success(json!({"temp": 72}));
        assert_eq!(result.to_model_string(), "{\n  \"temp\": 72\n}");
    }

    #[test]
    fn test_model_string_for_error() {
        let result = ToolResult::error("Connection failed");
        let parsed: Value = serde_json::from_str(&result.to_model_string()).unwrap();
        assert_eq!(parsed, json!({"error": "Connection failed"}));
    }
}
