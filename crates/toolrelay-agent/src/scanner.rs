//! Incremental detection of a tool-call block in streamed model text.
//!
//! A model requests a tool by emitting
//!
//! ````text
//! ```toolcall
//! {"name": "server::tool", "arguments": {...}}
//! ```
//! ````
//!
//! anywhere in its response. The scanner forwards ordinary text as soon as it
//! can, holds back only what could still turn out to be the start of that
//! fence, and never forwards the block itself. Fences split across chunk
//! boundaries are detected. Whitespace directly before a partial fence is
//! held back with it, so text preceding a block does not end with the
//! whitespace leading into it.

use toolrelay_core::ParsedToolCall;

/// Opening fence of a tool-call block.
pub const TOOL_CALL_START: &str = "```toolcall";

/// Closing fence of a tool-call block.
pub const TOOL_CALL_END: &str = "```";

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Forwarding text; nothing held back.
    Scanning,
    /// Holding back a suffix that is a strict prefix of the opening fence.
    MatchingStart,
    /// Inside a block; accumulating until the closing fence.
    InBlock,
    /// A call was decoded. Later text passes through unscanned.
    Detected,
}

/// Output of the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Text to show to the user.
    Text(String),
    /// A decoded tool call. Emitted at most once per scanner.
    ToolCall(ParsedToolCall),
}

/// Per-turn scan state. Pure: no I/O, no clocks.
#[derive(Debug)]
pub struct ToolCallScanner {
    state: ScanState,
    /// Held-back text while scanning, block content while in a block.
    pending: String,
    /// Text forwarded before a call was detected.
    pre_call_text: String,
}

impl Default for ToolCallScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallScanner {
    pub const fn new() -> Self {
        Self {
            state: ScanState::Scanning,
            pending: String::new(),
            pre_call_text: String::new(),
        }
    }

    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// Whether a call has been detected.
    pub const fn is_detected(&self) -> bool {
        matches!(self.state, ScanState::Detected)
    }

    /// Text forwarded before the tool-call block, without trailing
    /// whitespace.
    pub fn pre_call_text(&self) -> &str {
        self.pre_call_text.trim_end()
    }

    /// Consume one chunk of model output.
    pub fn feed(&mut self, chunk: &str) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        if self.state == ScanState::Detected {
            push_text(&mut events, chunk.to_string());
            return events;
        }

        self.pending.push_str(chunk);
        self.advance(&mut events);
        events
    }

    /// Signal end of stream.
    ///
    /// Held-back text is flushed. An unterminated block is dropped unseen.
    pub fn finish(&mut self) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        match self.state {
            ScanState::Scanning | ScanState::MatchingStart => {
                let rest = std::mem::take(&mut self.pending);
                self.forward(&mut events, rest);
                self.state = ScanState::Scanning;
            }
            ScanState::InBlock => {
                tracing::warn!(
                    dropped_bytes = self.pending.len(),
                    "stream ended inside an unterminated tool-call block"
                );
                self.pending.clear();
                self.state = ScanState::Scanning;
            }
            ScanState::Detected => {}
        }
        events
    }

    fn advance(&mut self, events: &mut Vec<ScanEvent>) {
        loop {
            match self.state {
                ScanState::Scanning | ScanState::MatchingStart => {
                    if let Some(pos) = self.pending.find(TOOL_CALL_START) {
                        // Whitespace leading up to the fence belongs to the block.
                        let before = self.pending[..pos].trim_end().to_string();
                        self.forward(events, before);
                        self.pending.drain(..pos + TOOL_CALL_START.len());
                        self.state = ScanState::InBlock;
                        continue;
                    }

                    let (hold, partial) = held_back_len(&self.pending);
                    let emit_len = self.pending.len() - hold;
                    let text: String = self.pending.drain(..emit_len).collect();
                    self.forward(events, text);
                    self.state = if partial {
                        ScanState::MatchingStart
                    } else {
                        ScanState::Scanning
                    };
                    return;
                }
                ScanState::InBlock => {
                    let Some(newline) = self.pending.find('\n') else {
                        return;
                    };
                    let body_start = newline + 1;
                    let Some(end) = self.pending[body_start..].find(TOOL_CALL_END) else {
                        return;
                    };
                    let body_end = body_start + end;

                    let payload = self.pending[body_start..body_end].to_string();
                    let rest = self.pending[body_end + TOOL_CALL_END.len()..].to_string();
                    self.pending.clear();

                    match ParsedToolCall::from_json(&payload) {
                        Ok(call) => {
                            tracing::debug!(tool = %call.name, "tool call detected");
                            self.state = ScanState::Detected;
                            events.push(ScanEvent::ToolCall(call));
                            push_text(events, rest);
                            return;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "discarding undecodable tool-call block");
                            self.state = ScanState::Scanning;
                            self.pending = rest;
                        }
                    }
                }
                ScanState::Detected => return,
            }
        }
    }

    fn forward(&mut self, events: &mut Vec<ScanEvent>, text: String) {
        if text.is_empty() {
            return;
        }
        self.pre_call_text.push_str(&text);
        events.push(ScanEvent::Text(text));
    }
}

fn push_text(events: &mut Vec<ScanEvent>, text: String) {
    if !text.is_empty() {
        events.push(ScanEvent::Text(text));
    }
}

/// Bytes to hold back at the end of `buf`: the longest suffix that is a
/// strict prefix of the opening fence, plus the whitespace before it.
/// The flag tells whether anything is held.
fn held_back_len(buf: &str) -> (usize, bool) {
    let prefix = (1..TOOL_CALL_START.len())
        .rev()
        .find(|&k| buf.ends_with(&TOOL_CALL_START[..k]))
        .unwrap_or(0);
    if prefix == 0 {
        return (0, false);
    }

    let head = &buf[..buf.len() - prefix];
    let whitespace = head.len() - head.trim_end().len();
    (prefix + whitespace, true)
}
