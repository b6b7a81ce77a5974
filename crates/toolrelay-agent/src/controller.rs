//! One user turn with at most one tool round-trip.
//!
//! The first completion is scanned for a tool-call block while its text is
//! forwarded live. On detection the upstream stream is dropped, the call is
//! dispatched, and a second completion carrying the tool result is streamed
//! without scanning.

use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use toolrelay_core::{
    ChatMessage, ChatOptions, ChatProvider, ParsedToolCall, ProviderError, TextStream,
    ToolCallOutcome,
};

use crate::dispatch::ToolDispatcher;
use crate::prompt::SystemPromptBuilder;
use crate::scanner::{ScanEvent, ToolCallScanner};

/// Receives the visible output of a turn as it happens.
pub trait TurnSink: Send {
    fn on_text(&mut self, text: &str);

    fn on_tool_call(&mut self, _call: &ParsedToolCall) {}

    fn on_tool_result(&mut self, outcome: &ToolCallOutcome);
}

/// Turn output as an owned value, for channel and buffering sinks.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Text(String),
    ToolCall(ParsedToolCall),
    ToolResult(ToolCallOutcome),
}

impl TurnSink for Vec<TurnEvent> {
    fn on_text(&mut self, text: &str) {
        self.push(TurnEvent::Text(text.to_string()));
    }

    fn on_tool_call(&mut self, call: &ParsedToolCall) {
        self.push(TurnEvent::ToolCall(call.clone()));
    }

    fn on_tool_result(&mut self, outcome: &ToolCallOutcome) {
        self.push(TurnEvent::ToolResult(outcome.clone()));
    }
}

/// Forwards events to an async consumer. A closed receiver drops them.
impl TurnSink for mpsc::UnboundedSender<TurnEvent> {
    fn on_text(&mut self, text: &str) {
        let _ = self.send(TurnEvent::Text(text.to_string()));
    }

    fn on_tool_call(&mut self, call: &ParsedToolCall) {
        let _ = self.send(TurnEvent::ToolCall(call.clone()));
    }

    fn on_tool_result(&mut self, outcome: &ToolCallOutcome) {
        let _ = self.send(TurnEvent::ToolResult(outcome.clone()));
    }
}

/// What a completed turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Final assistant reply: the whole reply without a tool call, otherwise
    /// the text streamed after the tool result.
    pub text: String,
    /// Text shown before a tool-call block.
    pub pre_call_text: String,
    /// The tool exchange, if the model asked for one.
    pub tool: Option<ToolCallOutcome>,
    /// Messages to append to the conversation history.
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("turn cancelled")]
    Cancelled,
}

/// Runs tool-enabled turns against a provider.
pub struct TurnController {
    provider: Arc<dyn ChatProvider>,
    dispatcher: Arc<ToolDispatcher>,
    options: ChatOptions,
    preamble: Option<String>,
}

impl TurnController {
    pub fn new(provider: Arc<dyn ChatProvider>, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            provider,
            dispatcher,
            options: ChatOptions::default(),
            preamble: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the opening paragraph of the system prompt.
    #[must_use]
    pub fn with_preamble(mut self, preamble: Option<String>) -> Self {
        self.preamble = preamble;
        self
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Run one turn for `user_text` on top of `history`.
    ///
    /// Dispatch failures are reported to the model as tool results; only
    /// provider failures and cancellation abort the turn.
    pub async fn stream_with_tools(
        &self,
        user_text: &str,
        history: &[ChatMessage],
        sink: &mut dyn TurnSink,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let tools = self.dispatcher.available_tools().await;
        tracing::debug!(tools = tools.len(), "starting turn");
        let system = SystemPromptBuilder::new()
            .with_preamble(self.preamble.clone())
            .with_tools(tools)
            .build();

        let user = ChatMessage::user(user_text);
        let mut request = Vec::with_capacity(history.len() + 2);
        request.push(ChatMessage::system(system));
        request.extend_from_slice(history);
        request.push(user.clone());

        let stream = self.open(&request, cancel).await?;
        let mut scanner = ToolCallScanner::new();
        let Some(call) = scan_for_call(stream, &mut scanner, sink, cancel).await? else {
            let text = scanner.pre_call_text().to_string();
            return Ok(TurnOutcome {
                messages: vec![user, ChatMessage::assistant(text.clone())],
                pre_call_text: text.clone(),
                text,
                tool: None,
            });
        };

        sink.on_tool_call(&call);
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TurnError::Cancelled),
            outcome = self.dispatcher.dispatch(call) => outcome,
        };
        sink.on_tool_result(&outcome);

        let pre_call_text = scanner.pre_call_text().to_string();
        let assistant = ChatMessage::assistant(pre_call_text.clone());
        let tool = ChatMessage::tool(outcome.content());

        // No tools listed: the follow-up is not scanned.
        let followup_system = SystemPromptBuilder::new()
            .with_preamble(self.preamble.clone())
            .build();
        let mut followup = Vec::with_capacity(history.len() + 4);
        followup.push(ChatMessage::system(followup_system));
        followup.extend_from_slice(history);
        followup.extend([user.clone(), assistant.clone(), tool.clone()]);

        let stream = self.open(&followup, cancel).await?;
        let text = forward_all(stream, sink, cancel).await?;

        Ok(TurnOutcome {
            messages: vec![user, assistant, tool, ChatMessage::assistant(text.clone())],
            text,
            pre_call_text,
            tool: Some(outcome),
        })
    }

    async fn open(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<TextStream, TurnError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TurnError::Cancelled),
            stream = self.provider.stream(messages, &self.options) => Ok(stream?),
        }
    }
}

/// Feed the stream through the scanner until a call is detected or the
/// stream ends. The stream is dropped on return.
async fn scan_for_call(
    mut stream: TextStream,
    scanner: &mut ToolCallScanner,
    sink: &mut dyn TurnSink,
    cancel: &CancellationToken,
) -> Result<Option<ParsedToolCall>, TurnError> {
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TurnError::Cancelled),
            chunk = stream.next() => chunk,
        };

        let Some(chunk) = chunk else {
            // End of stream flushes held-back text; it never yields a call.
            for event in scanner.finish() {
                if let ScanEvent::Text(text) = event {
                    sink.on_text(&text);
                }
            }
            return Ok(None);
        };

        for event in scanner.feed(&chunk?) {
            match event {
                ScanEvent::Text(text) => sink.on_text(&text),
                ScanEvent::ToolCall(call) => {
                    tracing::debug!(tool = %call.name, "cancelling completion after tool call");
                    return Ok(Some(call));
                }
            }
        }
    }
}

/// Forward every chunk unscanned and return the concatenated text.
async fn forward_all(
    mut stream: TextStream,
    sink: &mut dyn TurnSink,
    cancel: &CancellationToken,
) -> Result<String, TurnError> {
    let mut text = String::new();
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TurnError::Cancelled),
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else {
            return Ok(text);
        };
        let chunk = chunk?;
        if !chunk.is_empty() {
            sink.on_text(&chunk);
            text.push_str(&chunk);
        }
    }
}
