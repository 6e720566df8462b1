// ABOUTME: Ollama API client using the native /api/generate endpoint.
// ABOUTME: Sends images as base64 and streams NDJSON chunks for local inference.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{LlmBackend, TextStream};
use super::stream_accumulator::LineBuffer;
use super::Request;
use crate::config::{BackendKind, OLLAMA_DEFAULT_HOST, OLLAMA_DEFAULT_MODEL};
use crate::error::LlmError;

/// Ollama generate request.
#[derive(Debug, Serialize, PartialEq)]
pub struct OllamaGenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Always sent; the server streams when it is omitted.
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "OllamaOptions::is_empty")]
    pub options: OllamaOptions,
}

/// Model options for a generate call.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl OllamaOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_predict.is_none()
    }
}

/// One generate response, or one NDJSON line when streaming.
#[derive(Debug, Deserialize)]
pub struct OllamaGenerateResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Ollama API error response.
#[derive(Debug, Deserialize)]
pub struct OllamaError {
    pub error: String,
}

impl From<&Request> for OllamaGenerateRequest {
    fn from(req: &Request) -> Self {
        // Only binary attachments are forwarded; text attachments are not merged.
        let images = req
            .input
            .blobs
            .iter()
            .map(|blob| STANDARD.encode(&blob.data))
            .collect();

        OllamaGenerateRequest {
            model: req.model.clone(),
            prompt: req.prompt.clone(),
            stream: false,
            images,
            options: OllamaOptions {
                temperature: req.temperature,
                num_predict: req.max_tokens,
            },
        }
    }
}

/// Build an API error from a non-success body.
fn api_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<OllamaError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string());
    LlmError::Api { status, message }
}

/// Client for a (usually local) Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    http: reqwest::Client,
    default_model: String,
}

impl OllamaClient {
    /// Create a new Ollama client connecting to the default host.
    pub fn new(model: &str) -> Self {
        Self::with_host(OLLAMA_DEFAULT_HOST, model)
    }

    /// Create a new Ollama client with a custom host.
    ///
    /// # Arguments
    /// * `host` - Server address (e.g., "http://gpu-box:11434")
    /// * `model` - The default model to use (e.g., "gpt-oss:20b", "llama3.2")
    pub fn with_host(host: &str, model: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            default_model: if model.is_empty() {
                OLLAMA_DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
        }
    }

    /// Set the default model to use when none is specified in the request.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn build_request(&self, req: &Request, stream: bool) -> OllamaGenerateRequest {
        let mut ollama_req = OllamaGenerateRequest::from(req);
        ollama_req.model = req.model_or(&self.default_model).to_string();
        ollama_req.stream = stream;
        ollama_req
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.host)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(OLLAMA_DEFAULT_MODEL)
    }
}

#[async_trait]
impl LlmBackend for OllamaClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, req: &Request) -> Result<String, LlmError> {
        let ollama_req = self.build_request(req, false);
        debug!(
            model = %ollama_req.model,
            images = ollama_req.images.len(),
            "Sending Ollama generate request"
        );

        let response = self.http.post(self.url()).json(&ollama_req).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(api_error(status.as_u16(), &body));
        }

        let resp: OllamaGenerateResponse = response.json().await?;
        Ok(resp.response)
    }

    fn generate_stream(&self, req: &Request) -> Option<TextStream> {
        let ollama_req = self.build_request(req, true);
        let url = self.url();
        let http = self.http.clone();

        Some(Box::pin(async_stream::try_stream! {
            debug!(model = %ollama_req.model, "Streaming Ollama generate request");
            let response = http.post(&url).json(&ollama_req).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await?;
                Err(api_error(status.as_u16(), &body))?;
                return;
            }

            let mut stream = response.bytes_stream();
            let mut lines = LineBuffer::new();
            let mut done = false;

            while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
                let chunk = chunk?;
                for line in lines.push(&chunk) {
                    let part: OllamaGenerateResponse = serde_json::from_str(&line)?;
                    if let Some(message) = part.error {
                        Err(LlmError::Api { status: status.as_u16(), message })?;
                    }
                    done |= part.done;
                    yield part.response;
                }
            }

            if let Some(line) = lines.finish() {
                let part: OllamaGenerateResponse = serde_json::from_str(&line)?;
                if let Some(message) = part.error {
                    Err(LlmError::Api { status: status.as_u16(), message })?;
                }
                done |= part.done;
                yield part.response;
            }

            if !done {
                Err(LlmError::StreamClosed)?;
            }
        }))
    }
}
