//! User confirmation for sensitive local tools.
//!
//! `ApprovalBroker` parks each request on a oneshot until the front end
//! answers via `resolve`. `confirm` bounds any handler with a timeout and
//! treats expiry as a denial.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use toolrelay_core::ApprovalHandler;

/// Ask `handler` and wait at most `timeout`. Expiry denies.
pub async fn confirm(
    handler: &dyn ApprovalHandler,
    tool: &str,
    arguments: &Map<String, Value>,
    timeout: Duration,
) -> bool {
    if let Ok(approved) =
        tokio::time::timeout(timeout, handler.request_approval(tool, arguments)).await
    {
        tracing::debug!(tool, approved, "approval answered");
        approved
    } else {
        tracing::info!(tool, ?timeout, "approval timed out, denying");
        false
    }
}

/// A confirmation request awaiting an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub id: u64,
    pub tool: String,
    pub arguments: Map<String, Value>,
}

/// Pending confirmations keyed by request id. The map lock is never held
/// across an await.
#[derive(Debug)]
pub struct ApprovalBroker {
    pending: Mutex<HashMap<u64, oneshot::Sender<bool>>>,
    next_id: AtomicU64,
    requests: mpsc::UnboundedSender<ApprovalRequest>,
}

impl ApprovalBroker {
    /// Create a broker and the stream of requests the front end must answer.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<ApprovalRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        let broker = Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            requests,
        });
        (broker, rx)
    }

    /// Answer a request. Returns `false` if it is unknown or already expired.
    pub fn resolve(&self, request_id: u64, approved: bool) -> bool {
        let sender = self.lock_pending().remove(&request_id);
        sender.is_some_and(|tx| tx.send(approved).is_ok())
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<bool>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ApprovalHandler for ApprovalBroker {
    async fn request_approval(&self, tool: &str, arguments: &Map<String, Value>) -> bool {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(id, tx);

        let request = ApprovalRequest {
            id,
            tool: tool.to_string(),
            arguments: arguments.clone(),
        };
        if self.requests.send(request).is_err() {
            tracing::warn!(tool, "no approval listener, denying");
            self.lock_pending().remove(&id);
            return false;
        }

        // Releases the slot if the caller's timeout drops this future.
        let _guard = PendingGuard { broker: self, id };
        rx.await.unwrap_or(false)
    }
}

/// Removes an unanswered request when the waiting future is dropped.
struct PendingGuard<'a> {
    broker: &'a ApprovalBroker,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.broker.lock_pending().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolrelay_core::{AutoApprove, DenyAll};

    /// Never answers.
    struct Silent;

    #[async_trait]
    impl ApprovalHandler for Silent {
        async fn request_approval(&self, _tool: &str, _arguments: &Map<String, Value>) -> bool {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_confirm_passes_answers_through() {
        let args = Map::new();
        assert!(confirm(&AutoApprove, "local::click", &args, Duration::from_secs(1)).await);
        assert!(!confirm(&DenyAll, "local::click", &args, Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_denies_after_timeout() {
        let approved = confirm(&Silent, "local::click", &Map::new(), Duration::from_secs(30)).await;
        assert!(!approved);
    }

    #[tokio::test]
    async fn test_broker_round_trip() {
        let (broker, mut requests) = ApprovalBroker::channel();

        let answer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move {
                let request = requests.recv().await.unwrap();
                assert_eq!(request.tool, "local::type_text");
                broker.resolve(request.id, true)
            })
        };

        let mut args = Map::new();
        args.insert("text".into(), Value::String("hello".into()));
        assert!(broker.request_approval("local::type_text", &args).await);
        assert!(answer.await.unwrap());
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broker_expired_request_is_released() {
        let (broker, mut requests) = ApprovalBroker::channel();

        let approved = confirm(
            broker.as_ref(),
            "local::click",
            &Map::new(),
            Duration::from_secs(30),
        )
        .await;
        assert!(!approved);

        let request = requests.recv().await.unwrap();
        assert!(!broker.resolve(request.id, true));
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_broker_concurrent_expiries_are_all_released() {
        let (broker, mut requests) = ApprovalBroker::channel();

        let waits: Vec<_> = (0..32)
            .map(|_| {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move {
                    confirm(
                        broker.as_ref(),
                        "local::click",
                        &Map::new(),
                        Duration::from_millis(20),
                    )
                    .await
                })
            })
            .collect();

        // Answer a few while the rest expire, so removals race each other.
        let answerer = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move {
                while let Some(request) = requests.recv().await {
                    if request.id % 4 == 0 {
                        broker.resolve(request.id, true);
                    }
                }
            })
        };

        for wait in waits {
            wait.await.unwrap();
        }
        assert_eq!(broker.pending_count(), 0);
        answerer.abort();
    }

    #[tokio::test]
    async fn test_broker_without_listener_denies() {
        let (broker, requests) = ApprovalBroker::channel();
        drop(requests);
        assert!(!broker.request_approval("local::click", &Map::new()).await);
        assert_eq!(broker.pending_count(), 0);
    }
}
