//! Ollama `/api/chat` streaming provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use toolrelay_core::settings::{DEFAULT_MODEL, DEFAULT_PROVIDER_URL};
use toolrelay_core::{ChatMessage, ChatOptions, ChatProvider, ProviderError, Settings, TextStream};

use crate::ndjson::content_stream;

/// Connection parameters for an Ollama server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model used when a request does not name one.
    pub model: String,
    pub connect_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl OllamaConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.effective_provider_url().to_string(),
            model: settings.effective_model().to_string(),
            ..Self::default()
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

#[derive(Serialize)]
struct RequestOptions {
    temperature: f32,
}

/// Streams completions from Ollama. Dropping the returned stream closes the
/// HTTP response, which aborts generation server-side.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ProviderError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<TextStream, ProviderError> {
        let model = options.model.as_deref().unwrap_or(&self.config.model);
        let request = ChatRequest {
            model,
            messages,
            stream: true,
            options: options
                .temperature
                .map(|temperature| RequestOptions { temperature }),
        };

        let url = self.config.chat_url();
        tracing::debug!(url = %url, model, messages = messages.len(), "requesting chat stream");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat request rejected");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(content_stream(response.bytes_stream())))
    }
}
