//! Tool-server process supervision for toolrelay.
//!
//! - `resolver` finds the executable for a server command
//! - `spawn` launches a process with piped stdio
//! - `connection` correlates JSON-RPC requests and responses over the pipes
//! - `supervisor` owns running processes and implements `ToolServerPort`

pub mod connection;
mod error;
pub mod resolver;
mod shutdown;
pub mod spawn;
mod stderr;
mod supervisor;

pub use connection::ServerConnection;
pub use error::{CallError, ProcessError};
pub use shutdown::{DEFAULT_TERMINATE_GRACE, terminate};
pub use stderr::{MAX_STDERR_LINES, StderrLog};
pub use supervisor::{ServerSupervisor, SupervisorConfig};
