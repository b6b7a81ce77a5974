//! Error types for process supervision and request correlation.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use toolrelay_core::ToolServerError;

use crate::resolver::ResolveError;

/// Failures to launch, probe or terminate a server process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Invalid definition for '{server_id}': {reason}")]
    InvalidDefinition { server_id: String, reason: String },

    #[error(transparent)]
    NotResolved(#[from] ResolveError),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Child process {0} pipe unavailable")]
    PipeUnavailable(&'static str),

    #[error("Process exited during startup ({status}){}", format_stderr(.stderr))]
    ExitedEarly { status: String, stderr: String },

    #[error("Failed to query process state: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Failed to terminate process: {0}")]
    Terminate(#[source] std::io::Error),
}

fn format_stderr(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!(": {}", stderr.trim())
    }
}

/// Failures of a single correlated request.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Pipe I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Server returned error: {error}")]
    Server { error: Value },

    #[error("Server closed its output before responding")]
    NoResponse,

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Connection is closed")]
    NotConnected,
}

impl CallError {
    /// Convert into the port-level error for `server_id`.
    pub fn into_tool_server_error(self, server_id: &str) -> ToolServerError {
        let detail = format!("{server_id}: {self}");
        match self {
            Self::NoResponse => ToolServerError::NoResponse(detail),
            Self::NotConnected => ToolServerError::NotRunning(server_id.to_string()),
            Self::Timeout(_) => ToolServerError::Timeout(detail),
            Self::Server { error } => ToolServerError::Server(server_error_message(&error)),
            Self::InvalidResponse(_) | Self::Json(_) => ToolServerError::InvalidResponse(detail),
            Self::Io(_) => ToolServerError::Process(detail),
        }
    }
}

/// Best human-readable text from a JSON-RPC error payload.
fn server_error_message(error: &Value) -> String {
    match error.get("message").and_then(Value::as_str) {
        Some(message) => match error.get("code").and_then(Value::as_i64) {
            Some(code) => format!("{message} (code {code})"),
            None => message.to_string(),
        },
        None => match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_error_message_formats() {
        let err = CallError::Server {
            error: json!({"code": -32601, "message": "Method not found"}),
        };
        assert_eq!(
            err.into_tool_server_error("fs"),
            ToolServerError::Server("Method not found (code -32601)".into())
        );

        let err = CallError::Server {
            error: json!("boom"),
        };
        assert_eq!(
            err.into_tool_server_error("fs"),
            ToolServerError::Server("boom".into())
        );
    }

    #[test]
    fn test_no_response_and_timeout_stay_distinct() {
        let no_response = CallError::NoResponse.into_tool_server_error("a");
        let timeout = CallError::Timeout(Duration::from_secs(1)).into_tool_server_error("a");
        assert!(matches!(no_response, ToolServerError::NoResponse(_)));
        assert!(matches!(timeout, ToolServerError::Timeout(_)));
    }

    #[test]
    fn test_exited_early_includes_stderr() {
        let err = ProcessError::ExitedEarly {
            status: "exit status: 1".into(),
            stderr: "missing API key\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "Process exited during startup (exit status: 1): missing API key"
        );
    }
}
