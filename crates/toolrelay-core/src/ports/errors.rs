//! Port-level error types.
//!
//! These errors cross crate boundaries, so they carry rendered messages
//! rather than OS process or HTTP client error values.

use thiserror::Error;

/// Errors from invoking a tool on an external server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolServerError {
    /// No running process for this server id.
    #[error("Tool server not running: {0}")]
    NotRunning(String),

    /// The server exited or closed its output before answering.
    #[error("No response from tool server: {0}")]
    NoResponse(String),

    /// The caller's deadline passed before a response arrived.
    #[error("Timed out waiting for tool server: {0}")]
    Timeout(String),

    /// A response arrived but could not be interpreted.
    #[error("Invalid response from tool server: {0}")]
    InvalidResponse(String),

    /// The server answered with a JSON-RPC error object.
    #[error("Tool server returned error: {0}")]
    Server(String),

    /// Process-level failure (spawn, pipe I/O).
    #[error("Tool server process error: {0}")]
    Process(String),
}

/// Errors from the model provider stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport failure (connection refused, reset, TLS).
    #[error("Provider request failed: {0}")]
    Http(String),

    /// Non-success HTTP status.
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A stream line could not be decoded.
    #[error("Failed to decode provider stream: {0}")]
    Decode(String),

    /// The provider reported an error inside the stream.
    #[error("Provider error: {0}")]
    Upstream(String),
}

/// User-safe error information for events.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// Server the error relates to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    /// User-friendly error message.
    pub message: String,

    /// Error category for UI handling.
    pub category: ErrorCategory,
}

/// Categories of pipeline errors for UI handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Server process lifecycle error.
    Process,
    /// Protocol communication error.
    Protocol,
    /// Tool dispatch or invocation error.
    Tool,
    /// Configuration error.
    Configuration,
}

impl ErrorInfo {
    fn new(server_id: Option<String>, message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            server_id,
            message: message.into(),
            category,
        }
    }

    /// Create error info for a process error.
    pub fn process(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Some(server_id.into()), message, ErrorCategory::Process)
    }

    /// Create error info for a configuration error.
    pub fn configuration(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Some(server_id.into()), message, ErrorCategory::Configuration)
    }

    /// Create error info for a failed tool invocation, categorized by cause.
    pub fn for_call(server_id: impl Into<String>, error: &ToolServerError) -> Self {
        Self::new(Some(server_id.into()), error.to_string(), error.into())
    }
}

impl From<&ToolServerError> for ErrorCategory {
    fn from(error: &ToolServerError) -> Self {
        match error {
            ToolServerError::NotRunning(_)
            | ToolServerError::NoResponse(_)
            | ToolServerError::Process(_) => Self::Process,
            ToolServerError::Timeout(_) | ToolServerError::InvalidResponse(_) => Self::Protocol,
            ToolServerError::Server(_) => Self::Tool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            ErrorCategory::from(&ToolServerError::NoResponse("x".into())),
            ErrorCategory::Process
        );
        assert_eq!(
            ErrorCategory::from(&ToolServerError::Timeout("x".into())),
            ErrorCategory::Protocol
        );
        assert_eq!(
            ErrorCategory::from(&ToolServerError::Server("x".into())),
            ErrorCategory::Tool
        );
    }

    #[test]
    fn test_error_info_for_call() {
        let info = ErrorInfo::for_call("fs", &ToolServerError::Timeout("30s".into()));
        assert_eq!(info.server_id.as_deref(), Some("fs"));
        assert_eq!(info.category, ErrorCategory::Protocol);
        assert!(info.message.contains("30s"));
    }

    #[test]
    fn test_error_info_serialization() {
        let info = ErrorInfo::process("github", "spawn failed");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["serverId"], "github");
        assert_eq!(json["category"], "process");
    }
}
