// ABOUTME: Defines all error types for the llm-handler library using thiserror.
// ABOUTME: Each stage has its own error enum, unified under HandlerError.

use std::path::PathBuf;

/// Top-level error type for the llm-handler library.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Output error: {0}")]
    Sink(#[from] SinkError),
}

/// Errors raised while selecting a backend.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown backend '{0}'. Use 'ollama', 'openai' or 'gemini'.")]
    UnknownBackend(String),
}

/// Errors from reading attached files.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from LLM backend calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream closed unexpectedly")]
    StreamClosed,

    /// The call succeeded but the response holds no answer to return.
    #[error("No answer in response: {0}")]
    NoAnswer(String),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Errors from persisting an answer.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
