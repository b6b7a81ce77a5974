//! JSON-RPC 2.0 request/response correlation over a server's stdio pipes.
//!
//! Requests are written one per line to the server's stdin. A reader task
//! consumes stdout line by line and completes the pending request whose id
//! matches. Lines that are not JSON objects or carry unknown ids are
//! skipped, so concurrent and out-of-order responses demultiplex correctly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use toolrelay_core::{ToolDescriptor, ToolResult};

use crate::error::CallError;

type Reply = Result<Value, CallError>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// JSON-RPC 2.0 request. `id` is serialized last.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ToolList {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

/// Waiters keyed by request id. `open` turns false exactly once, when the
/// output pipe ends or the connection is closed.
struct PendingTable {
    open: bool,
    waiters: HashMap<u64, oneshot::Sender<Reply>>,
}

impl PendingTable {
    /// Mark closed and fail every waiter with `NoResponse`.
    fn close(&mut self) {
        self.open = false;
        for (_, tx) in self.waiters.drain() {
            let _ = tx.send(Err(CallError::NoResponse));
        }
    }
}

/// A live request channel to one server process.
pub struct ServerConnection {
    server_id: String,
    writer: Mutex<Option<Writer>>,
    pending: Arc<StdMutex<PendingTable>>,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl ServerConnection {
    /// Attach to a server's stdin (`writer`) and stdout (`reader`).
    ///
    /// Spawns the reader task; must be called inside a tokio runtime.
    pub fn new<R, W>(server_id: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server_id = server_id.into();
        let pending = Arc::new(StdMutex::new(PendingTable {
            open: true,
            waiters: HashMap::new(),
        }));

        let reader = tokio::spawn(read_responses(
            server_id.clone(),
            reader,
            Arc::clone(&pending),
        ));

        Self {
            server_id,
            writer: Mutex::new(Some(Box::new(writer))),
            pending,
            next_id: AtomicU64::new(1),
            reader,
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Whether the output pipe is still being read.
    pub fn is_open(&self) -> bool {
        self.lock_pending().open
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().waiters.len()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, PendingTable> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a request and wait for the response with the same id.
    ///
    /// Fails with `NoResponse` if the pipe closes first and with `Timeout`
    /// once `timeout` elapses; in both cases the pending slot is released.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, CallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.lock_pending();
            if !pending.open {
                return Err(CallError::NotConnected);
            }
            pending.waiters.insert(id, tx);
        }

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: Some(id),
        };

        if let Err(e) = self.write_line(&request).await {
            self.lock_pending().waiters.remove(&id);
            return Err(e);
        }

        tracing::debug!(server_id = %self.server_id, id, method, "request sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(CallError::NoResponse),
            Err(_) => {
                self.lock_pending().waiters.remove(&id);
                tracing::warn!(server_id = %self.server_id, id, method, ?timeout, "request timed out");
                Err(CallError::Timeout(timeout))
            }
        }
    }

    /// Send a notification (no id, no response).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), CallError> {
        if !self.is_open() {
            return Err(CallError::NotConnected);
        }
        self.write_line(&JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: None,
        })
        .await
    }

    async fn write_line(&self, request: &JsonRpcRequest<'_>) -> Result<(), CallError> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(CallError::NotConnected)?;

        let written = async {
            writer.write_all(&line).await?;
            writer.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(()),
            // The process exited before reading its input.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Err(CallError::NoResponse),
            Err(e) => Err(CallError::Io(e)),
        }
    }

    /// Invoke a tool via `tools/call`.
    ///
    /// A result flagged `isError` becomes a failed `ToolResult` carrying the
    /// first text item. Otherwise the `content` array is the result data.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        timeout: Duration,
    ) -> Result<ToolResult, CallError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.call("tools/call", Some(params), timeout).await?;
        Ok(tool_result_from_value(result))
    }

    /// List tools via `tools/list`.
    pub async fn list_tools(&self, timeout: Duration) -> Result<Vec<ToolDescriptor>, CallError> {
        let result = self.call("tools/list", None, timeout).await?;
        let list: ToolList = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    /// Close the input pipe and fail all pending requests with `NoResponse`.
    ///
    /// Idempotent. Later calls fail with `NotConnected`.
    pub async fn close(&self) {
        self.lock_pending().close();
        self.reader.abort();
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .close();
    }
}

/// Map a `tools/call` result payload to a `ToolResult`.
fn tool_result_from_value(result: Value) -> ToolResult {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_error {
        let message = result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|items| {
                items
                    .iter()
                    .find_map(|item| item.get("text").and_then(Value::as_str))
            })
            .unwrap_or("Unknown error");
        return ToolResult::error(message);
    }

    match result {
        Value::Object(mut obj) if obj.contains_key("content") => {
            ToolResult::success(obj.remove("content").unwrap_or(Value::Null))
        }
        other => ToolResult::success(other),
    }
}

/// Reader task: route each response line to its waiter until EOF.
async fn read_responses<R>(
    server_id: String,
    reader: R,
    pending: Arc<StdMutex<PendingTable>>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                tracing::debug!(server_id = %server_id, "server output closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(server_id = %server_id, error = %e, "failed reading server output");
                break;
            }
        }

        let trimmed = buf.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }

        // Undecodable bytes are noise like any other non-JSON line.
        let Ok(Value::Object(mut message)) = serde_json::from_slice::<Value>(trimmed) else {
            tracing::debug!(
                server_id = %server_id,
                line = %String::from_utf8_lossy(trimmed),
                "skipping non-JSON-RPC output"
            );
            continue;
        };

        // Messages without a numeric id are notifications or noise.
        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            tracing::debug!(server_id = %server_id, "skipping message without id");
            continue;
        };

        let waiter = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiters
            .remove(&id);

        let Some(tx) = waiter else {
            tracing::debug!(server_id = %server_id, id, "skipping response for unknown id");
            continue;
        };

        let reply = match (message.remove("result"), message.remove("error")) {
            (_, Some(error)) if !error.is_null() => Err(CallError::Server { error }),
            (Some(result), _) => Ok(result),
            _ => Err(CallError::InvalidResponse(format!(
                "response {id} has neither result nor error"
            ))),
        };
        let _ = tx.send(reply);
    }

    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .close();
}
