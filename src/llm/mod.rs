// ABOUTME: LLM module - backend abstraction and provider adapters.
// ABOUTME: Defines the request type, the LlmBackend trait, and connect().

mod client;
mod gemini;
mod ollama;
mod openai;
pub mod stream_accumulator;
mod types;

pub use client::*;
pub use gemini::*;
pub use ollama::*;
pub use openai::*;
pub use types::*;

use crate::config::{BackendConfig, BackendKind};

/// Build the adapter for a resolved configuration.
///
/// Called once per handler; every request then goes to the same adapter.
pub fn connect(config: &BackendConfig) -> Box<dyn LlmBackend> {
    match config.kind {
        BackendKind::Ollama => {
            let host = config
                .host
                .as_deref()
                .unwrap_or(crate::config::OLLAMA_DEFAULT_HOST);
            Box::new(OllamaClient::with_host(host, &config.model))
        }
        BackendKind::OpenAi => {
            let mut client = OpenAIClient::with_optional_key(config.api_key.clone())
                .with_default_model(&config.model);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Box::new(client)
        }
        BackendKind::Gemini => {
            let mut client = GeminiClient::with_optional_key(config.api_key.clone())
                .with_default_model(&config.model);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Box::new(client)
        }
    }
}

#[cfg(test)]
mod types_test;
