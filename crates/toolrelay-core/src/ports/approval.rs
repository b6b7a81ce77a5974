//! User confirmation port for sensitive local actions.

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Asks the user whether a sensitive tool call may proceed.
///
/// Implementations may wait indefinitely; the dispatcher bounds the wait
/// and treats expiry as a denial.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    async fn request_approval(&self, tool: &str, arguments: &Map<String, Value>) -> bool;
}

/// Approves every request. For headless contexts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalHandler for AutoApprove {
    async fn request_approval(&self, _tool: &str, _arguments: &Map<String, Value>) -> bool {
        true
    }
}

/// Denies every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl ApprovalHandler for DenyAll {
    async fn request_approval(&self, _tool: &str, _arguments: &Map<String, Value>) -> bool {
        false
    }
}
