//! Command handlers.
//!
//! Each handler takes the composed `CliContext`, does its work through the
//! supervisor, dispatcher or controller, and formats output for the
//! terminal.

pub mod ask;
pub mod call;
pub mod chat;
pub mod servers;
pub mod test_connection;
pub mod tools;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A token cancelled by the next Ctrl-C. Abort the handle when done.
pub(crate) fn cancel_on_ctrl_c() -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    (token, handle)
}
