// ABOUTME: Root module for llm-handler - one answer API over Ollama, OpenAI
// ABOUTME: and Gemini. Re-exports all public types from submodules.

pub mod attachment;
pub mod config;
pub mod error;
pub mod handler;
pub mod llm;
pub mod prelude;
pub mod sink;

pub use error::HandlerError;
pub use handler::{AnswerRequest, LlmHandler};
