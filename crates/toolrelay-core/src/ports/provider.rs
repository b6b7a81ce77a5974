//! Model provider port.
//!
//! A provider turns a message list into a stream of text fragments. Dropping
//! the returned stream cancels the underlying request.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use super::ProviderError;
use crate::domain::ChatMessage;

/// Stream of assistant text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Per-request generation options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Model name; providers fall back to their configured default.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

/// Port for streaming chat completions.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a streaming completion for `messages`.
    async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<TextStream, ProviderError>;
}
