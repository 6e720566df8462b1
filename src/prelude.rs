// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use llm_handler::prelude::*;` to get started quickly.

pub use crate::attachment::{Blob, ContentKind, NormalizedInput, classify, normalize};
pub use crate::config::{BackendConfig, BackendKind, Settings};
pub use crate::error::{AttachmentError, ConfigError, HandlerError, LlmError, SinkError};
pub use crate::handler::{AnswerRequest, LlmHandler};
pub use crate::llm::{
    GeminiClient, LlmBackend, OllamaClient, OpenAIClient, Request, TextStream, connect,
};
pub use crate::sink::write_answer;
