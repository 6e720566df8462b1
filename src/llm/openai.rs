// ABOUTME: OpenAI API client implementation.
// ABOUTME: Sends one user message to chat completions; no streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::LlmBackend;
use super::Request;
use crate::config::{BackendKind, OPENAI_DEFAULT_BASE_URL, OPENAI_DEFAULT_MODEL};
use crate::error::LlmError;

/// OpenAI API request format.
#[derive(Debug, Serialize, PartialEq)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
}

/// OpenAI message format.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<OpenAIChoice>,
}

/// OpenAI response choice.
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    #[serde(default)]
    pub index: usize,
    pub message: OpenAIResponseMessage,
    pub finish_reason: Option<String>,
}

/// OpenAI response message.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
pub struct OpenAIError {
    pub error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

/// Join text attachments and the prompt, attachments first.
pub fn combine_prompt(texts: &[String], prompt: &str) -> String {
    if texts.is_empty() {
        return prompt.to_string();
    }
    texts
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(prompt))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl From<&Request> for OpenAIRequest {
    /// Binary attachments, temperature, max tokens and streaming are not
    /// forwarded to this backend.
    fn from(req: &Request) -> Self {
        OpenAIRequest {
            model: req.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: combine_prompt(&req.input.texts, &req.prompt),
            }],
        }
    }
}

impl TryFrom<OpenAIResponse> for String {
    type Error = LlmError;

    /// Content of the first choice. A response without choices is an error.
    fn try_from(resp: OpenAIResponse) -> Result<Self, Self::Error> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::NoAnswer("no choices".to_string()))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Client for the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    api_key: Option<String>,
    base_url: String,
    http: reqwest::Client,
    default_model: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_optional_key(Some(api_key.into()))
    }

    /// Create a client whose key may be missing.
    ///
    /// Requests are still sent without a key; the API rejects them.
    pub fn with_optional_key(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; requests will fail to authenticate");
        }
        Self {
            api_key,
            base_url: OPENAI_DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
            default_model: OPENAI_DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model to use when none is specified in the request.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

#[async_trait]
impl LlmBackend for OpenAIClient {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, req: &Request) -> Result<String, LlmError> {
        let mut openai_req = OpenAIRequest::from(req);
        openai_req.model = req.model_or(&self.default_model).to_string();

        if !req.input.blobs.is_empty() {
            debug!(
                dropped = req.input.blobs.len(),
                "OpenAI backend does not take binary attachments"
            );
        }

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.http.post(&url).json(&openai_req);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(model = %openai_req.model, "Sending OpenAI chat completion");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = serde_json::from_str::<OpenAIError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let openai_resp: OpenAIResponse = response.json().await?;
        String::try_from(openai_resp)
    }
}
