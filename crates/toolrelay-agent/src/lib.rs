//! Tool-enabled conversation turns for toolrelay.
//!
//! Depends only on the ports in `toolrelay-core`: a [`ChatProvider`] for
//! completions and a [`ToolServerPort`] for server-backed tools.
//!
//! [`ChatProvider`]: toolrelay_core::ChatProvider
//! [`ToolServerPort`]: toolrelay_core::ToolServerPort

pub mod approvals;
pub mod controller;
pub mod dispatch;
pub mod local_tools;
pub mod prompt;
pub mod scanner;

pub use approvals::{ApprovalBroker, ApprovalRequest, confirm};
pub use controller::{TurnController, TurnError, TurnEvent, TurnOutcome, TurnSink};
pub use dispatch::{AvailableTool, DispatchError, Target, ToolDispatcher, resolve};
pub use local_tools::LocalToolRegistry;
pub use prompt::SystemPromptBuilder;
pub use scanner::{ScanEvent, ScanState, TOOL_CALL_END, TOOL_CALL_START, ToolCallScanner};
