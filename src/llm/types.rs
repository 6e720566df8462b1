// ABOUTME: Core request type handed to every backend - prompt, normalized
// ABOUTME: attachments, and generation parameters.

use crate::attachment::{Blob, NormalizedInput};

/// A single-shot request to a backend.
///
/// Backends read only the fields they support; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Model identifier. Empty means the backend's configured model.
    pub model: String,
    pub prompt: String,
    pub input: NormalizedInput,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl Request {
    /// Create a new request for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the model explicitly.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the attachments.
    pub fn input(mut self, input: NormalizedInput) -> Self {
        self.input = input;
        self
    }

    /// Add a text fragment.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.input.texts.push(text.into());
        self
    }

    /// Add a binary fragment.
    pub fn blob(mut self, blob: Blob) -> Self {
        self.input.blobs.push(blob);
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask the backend to stream its answer.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// The model to use, falling back to `default` when none was set.
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.model.is_empty() {
            default
        } else {
            &self.model
        }
    }
}
