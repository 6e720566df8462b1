// ABOUTME: Defines the LlmBackend trait - the abstraction layer that lets
// ABOUTME: the handler talk to Ollama, OpenAI or Gemini through one send().

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tracing::debug;

use super::Request;
use super::stream_accumulator::collect_text;
use crate::config::BackendKind;
use crate::error::LlmError;

/// Text fragments in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Trait for backend adapters.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Which provider this adapter talks to.
    fn kind(&self) -> BackendKind;

    /// The model used when the request does not name one.
    fn model(&self) -> &str;

    /// Generate a complete answer in one response.
    async fn generate(&self, req: &Request) -> Result<String, LlmError>;

    /// Generate an answer as a stream of text fragments.
    ///
    /// `None` means the backend has no streaming mode.
    fn generate_stream(&self, _req: &Request) -> Option<TextStream> {
        None
    }

    /// Send a request and return the final text.
    ///
    /// Streamed answers are drained completely before this returns.
    async fn send(&self, req: &Request) -> Result<String, LlmError> {
        if req.stream {
            if let Some(stream) = self.generate_stream(req) {
                return collect_text(stream).await;
            }
            debug!(backend = %self.kind(), "Streaming not supported, sending single request");
        }
        self.generate(req).await
    }
}
