//! System prompt describing the tool-call block format and available tools.

use std::fmt::Write as _;

use crate::dispatch::AvailableTool;
use crate::scanner::{TOOL_CALL_END, TOOL_CALL_START};

const DEFAULT_PREAMBLE: &str = "You are a helpful assistant with access to tools.";

/// Builds the system message for a tool-enabled turn.
#[derive(Debug, Clone, Default)]
pub struct SystemPromptBuilder {
    preamble: Option<String>,
    tools: Vec<AvailableTool>,
}

impl SystemPromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the opening paragraph. Blank overrides are ignored.
    #[must_use]
    pub fn with_preamble(mut self, preamble: Option<String>) -> Self {
        self.preamble = preamble.filter(|p| !p.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<AvailableTool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn build(&self) -> String {
        let mut prompt = self
            .preamble
            .as_deref()
            .unwrap_or(DEFAULT_PREAMBLE)
            .trim()
            .to_string();

        if self.tools.is_empty() {
            return prompt;
        }

        let _ = write!(
            prompt,
            "\n\nTo use a tool, reply with exactly one block of this form and then stop:\n\n\
             {TOOL_CALL_START}\n\
             {{\"name\": \"namespace::tool\", \"arguments\": {{}}}}\n\
             {TOOL_CALL_END}\n\n\
             Use at most one tool per reply. The result will be sent back to you.\n\n\
             Available tools:"
        );

        for tool in &self.tools {
            let _ = write!(prompt, "\n- {}", tool.qualified_name);
            if let Some(description) = &tool.descriptor.description {
                let _ = write!(prompt, ": {description}");
            }
            if let Some(schema) = &tool.descriptor.input_schema {
                let _ = write!(prompt, "\n  arguments schema: {schema}");
            }
        }
        prompt
    }
}
