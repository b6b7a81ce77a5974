//! Settings domain types and validation.
//!
//! Pure data: loading from flags, environment or files is the caller's job.

use serde::{Deserialize, Serialize};

/// Default bound on a single tool-server request, in seconds.
pub const DEFAULT_TOOL_CALL_TIMEOUT_SECS: u64 = 30;

/// Default liveness grace period for connection tests, in milliseconds.
pub const DEFAULT_CONNECTION_GRACE_MS: u64 = 500;

/// Default wait for user confirmation before auto-denying, in seconds.
pub const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 30;

/// Default model provider endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "http://localhost:11434";

/// Default model name.
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Pipeline settings.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Deadline for one `tools/call` round trip.
    pub tool_call_timeout_secs: Option<u64>,

    /// How long a transient server must survive to pass a connection test.
    pub connection_grace_ms: Option<u64>,

    /// How long a sensitive local tool waits for confirmation.
    pub approval_timeout_secs: Option<u64>,

    /// Base URL of the model provider.
    pub provider_url: Option<String>,

    /// Model name sent to the provider.
    pub model: Option<String>,

    /// Replaces the built-in preamble of the system prompt.
    pub system_prompt: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            tool_call_timeout_secs: Some(DEFAULT_TOOL_CALL_TIMEOUT_SECS),
            connection_grace_ms: Some(DEFAULT_CONNECTION_GRACE_MS),
            approval_timeout_secs: Some(DEFAULT_APPROVAL_TIMEOUT_SECS),
            provider_url: Some(DEFAULT_PROVIDER_URL.to_string()),
            model: Some(DEFAULT_MODEL.to_string()),
            system_prompt: None,
        }
    }

    #[must_use]
    pub fn tool_call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.tool_call_timeout_secs
                .unwrap_or(DEFAULT_TOOL_CALL_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn connection_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(
            self.connection_grace_ms
                .unwrap_or(DEFAULT_CONNECTION_GRACE_MS),
        )
    }

    #[must_use]
    pub fn approval_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.approval_timeout_secs
                .unwrap_or(DEFAULT_APPROVAL_TIMEOUT_SECS),
        )
    }

    /// Provider URL with default fallback and without a trailing slash.
    #[must_use]
    pub fn effective_provider_url(&self) -> &str {
        self.provider_url
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER_URL)
            .trim_end_matches('/')
    }

    #[must_use]
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(secs) = other.tool_call_timeout_secs {
            self.tool_call_timeout_secs = secs;
        }
        if let Some(ms) = other.connection_grace_ms {
            self.connection_grace_ms = ms;
        }
        if let Some(secs) = other.approval_timeout_secs {
            self.approval_timeout_secs = secs;
        }
        if let Some(ref url) = other.provider_url {
            self.provider_url.clone_from(url);
        }
        if let Some(ref model) = other.model {
            self.model.clone_from(model);
        }
        if let Some(ref prompt) = other.system_prompt {
            self.system_prompt.clone_from(prompt);
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub tool_call_timeout_secs: Option<Option<u64>>,
    pub connection_grace_ms: Option<Option<u64>>,
    pub approval_timeout_secs: Option<Option<u64>>,
    pub provider_url: Option<Option<String>>,
    pub model: Option<Option<String>>,
    pub system_prompt: Option<Option<String>>,
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Tool call timeout must be between 1 and 3600 seconds, got {0}")]
    InvalidToolCallTimeout(u64),

    #[error("Connection grace period must be between 50 and 60000 ms, got {0}")]
    InvalidConnectionGrace(u64),

    #[error("Approval timeout must be between 1 and 600 seconds, got {0}")]
    InvalidApprovalTimeout(u64),

    #[error("Provider URL must start with http:// or https://, got '{0}'")]
    InvalidProviderUrl(String),

    #[error("Model name cannot be empty")]
    EmptyModel,
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(secs) = settings.tool_call_timeout_secs {
        if !(1..=3600).contains(&secs) {
            return Err(SettingsError::InvalidToolCallTimeout(secs));
        }
    }

    if let Some(ms) = settings.connection_grace_ms {
        if !(50..=60_000).contains(&ms) {
            return Err(SettingsError::InvalidConnectionGrace(ms));
        }
    }

    if let Some(secs) = settings.approval_timeout_secs {
        if !(1..=600).contains(&secs) {
            return Err(SettingsError::InvalidApprovalTimeout(secs));
        }
    }

    if let Some(ref url) = settings.provider_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidProviderUrl(url.clone()));
        }
    }

    if settings.model.as_ref().is_some_and(|m| m.trim().is_empty()) {
        return Err(SettingsError::EmptyModel);
    }

    Ok(())
}
