//! Chat provider adapters.
//!
//! Implements [`toolrelay_core::ChatProvider`] for Ollama's streaming
//! `/api/chat` endpoint.

mod ndjson;
mod ollama;

pub use ndjson::{ChatChunk, parse_line};
pub use ollama::{OllamaConfig, OllamaProvider};
