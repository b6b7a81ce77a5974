//! Canonical event union for tool-server and tool-call activity.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "server_started", "serverId": "github", "serverName": "GitHub" }
//! ```

mod server;

use serde::{Deserialize, Serialize};

use crate::ports::ErrorInfo;

/// Events emitted by the supervisor and the tool dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A server process was spawned and its pipes attached.
    ServerStarted {
        #[serde(rename = "serverId")]
        server_id: String,
        #[serde(rename = "serverName")]
        server_name: String,
    },

    /// A server process was stopped on request.
    ServerStopped {
        #[serde(rename = "serverId")]
        server_id: String,
        #[serde(rename = "serverName")]
        server_name: String,
    },

    /// A server failed to start or exited unexpectedly.
    ServerError { error: ErrorInfo },

    /// A tool call was dispatched and produced a result.
    ToolCalled {
        /// Namespaced tool name as emitted by the model.
        tool: String,
        success: bool,
    },
}

impl AppEvent {
    /// Event name for transports that key on a string.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::ServerStarted { .. } => "server:started",
            Self::ServerStopped { .. } => "server:stopped",
            Self::ServerError { .. } => "server:error",
            Self::ToolCalled { .. } => "tool:called",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_type_tag() {
        let event = AppEvent::server_started("github", "GitHub");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "server_started");
        assert_eq!(json["serverId"], "github");
        assert_eq!(json["serverName"], "GitHub");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(
            AppEvent::server_stopped("a", "A").event_name(),
            "server:stopped"
        );
        assert_eq!(
            AppEvent::tool_called("local::screenshot", true).event_name(),
            "tool:called"
        );
    }

    #[test]
    fn test_error_event_round_trip() {
        let event = AppEvent::server_error(ErrorInfo::process("fs", "exited"));
        let json = serde_json::to_string(&event).unwrap();
        let back: AppEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
