//! Constructors for server lifecycle and tool events.

use super::AppEvent;
use crate::ports::ErrorInfo;

impl AppEvent {
    pub fn server_started(server_id: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self::ServerStarted {
            server_id: server_id.into(),
            server_name: server_name.into(),
        }
    }

    pub fn server_stopped(server_id: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self::ServerStopped {
            server_id: server_id.into(),
            server_name: server_name.into(),
        }
    }

    pub const fn server_error(error: ErrorInfo) -> Self {
        Self::ServerError { error }
    }

    pub fn tool_called(tool: impl Into<String>, success: bool) -> Self {
        Self::ToolCalled {
            tool: tool.into(),
            success,
        }
    }
}
