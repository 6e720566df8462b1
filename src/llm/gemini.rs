// ABOUTME: Google Gemini API client implementation.
// ABOUTME: Sends the prompt plus inline media parts; streams over SSE.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::{LlmBackend, TextStream};
use super::stream_accumulator::LineBuffer;
use super::Request;
use crate::config::{BackendKind, GEMINI_DEFAULT_BASE_URL, GEMINI_DEFAULT_MODEL};
use crate::error::LlmError;

/// Media type used when none could be inferred for an attachment.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Gemini API request format.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

/// Gemini content (message).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Gemini content part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
    /// Parts this client does not produce or read (function calls, etc.).
    Other(serde_json::Value),
}

/// Inline media payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiBlob {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

/// Gemini generation config.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Gemini API response format. Streaming chunks share this shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
    /// Set when the server fails after a stream has started.
    #[serde(default)]
    pub error: Option<GeminiErrorDetail>,
}

/// Why a prompt produced no candidates.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Gemini response candidate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GeminiResponse {
    /// Text of the first candidate, parts joined in order.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        GeminiPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Text of one chunk, `None` when it carries no candidates.
    ///
    /// An embedded error or a blocked prompt is an error, never empty text.
    pub fn chunk_text(&self, status: u16) -> Result<Option<String>, LlmError> {
        if let Some(err) = &self.error {
            return Err(err.to_llm_error(status));
        }
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(LlmError::NoAnswer(format!("prompt blocked ({})", reason)));
        }
        if self.candidates.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.text()))
    }

    /// The answer of a complete response.
    pub fn answer(&self, status: u16) -> Result<String, LlmError> {
        self.chunk_text(status)?
            .ok_or_else(|| LlmError::NoAnswer("no candidates".to_string()))
    }
}

/// Gemini API error response.
#[derive(Debug, Deserialize)]
pub struct GeminiError {
    pub error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct GeminiErrorDetail {
    #[serde(default)]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub status: String,
}

impl GeminiErrorDetail {
    /// Prefer the code in the body; fall back to the HTTP status.
    fn to_llm_error(&self, status: u16) -> LlmError {
        let status = u16::try_from(self.code)
            .ok()
            .filter(|code| *code > 0)
            .unwrap_or(status);
        LlmError::Api {
            status,
            message: self.message.clone(),
        }
    }
}

impl From<&Request> for GeminiRequest {
    /// The prompt goes first, then one inline part per binary attachment.
    /// Text attachments and max tokens are not forwarded.
    fn from(req: &Request) -> Self {
        let mut parts = vec![GeminiPart::Text {
            text: req.prompt.clone(),
        }];
        parts.extend(req.input.blobs.iter().map(|blob| GeminiPart::InlineData {
            inline_data: GeminiBlob {
                mime_type: blob
                    .media_type
                    .clone()
                    .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string()),
                data: STANDARD.encode(&blob.data),
            },
        }));

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: req.temperature.map(|temperature| GeminiGenerationConfig {
                temperature: Some(temperature),
            }),
        }
    }
}

/// Parse an SSE line from Gemini streaming response.
fn parse_gemini_sse(line: &str) -> Option<Result<GeminiResponse, serde_json::Error>> {
    let data = line.strip_prefix("data:")?.trim_start();
    Some(serde_json::from_str(data))
}

fn api_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    LlmError::Api { status, message }
}

/// Client for the Google Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    base_url: String,
    http: reqwest::Client,
    default_model: String,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_optional_key(Some(api_key.into()))
    }

    /// Create a client whose key may be missing.
    ///
    /// Requests are still sent without a key; the API rejects them.
    pub fn with_optional_key(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("GEMINI_API_KEY is not set; requests will fail to authenticate");
        }
        Self {
            api_key,
            base_url: GEMINI_DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
            default_model: GEMINI_DEFAULT_MODEL.to_string(),
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

    /// Build the endpoint URL for a given model and method.
    fn endpoint(&self, model: &str, method: &str, sse: bool) -> String {
        let mut url = format!("{}/models/{}:{}", self.base_url, model, method);
        let mut query = Vec::new();
        if sse {
            query.push("alt=sse".to_string());
        }
        if let Some(key) = &self.api_key {
            query.push(format!("key={}", urlencoding::encode(key)));
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

#[async_trait]
impl LlmBackend for GeminiClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, req: &Request) -> Result<String, LlmError> {
        let gemini_req = GeminiRequest::from(req);
        let model = req.model_or(&self.default_model);
        let url = self.endpoint(model, "generateContent", false);

        debug!(model, parts = gemini_req.contents[0].parts.len(), "Sending Gemini request");
        let response = self.http.post(&url).json(&gemini_req).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(api_error(status.as_u16(), &body));
        }

        let gemini_resp: GeminiResponse = response.json().await?;
        gemini_resp.answer(status.as_u16())
    }

    fn generate_stream(&self, req: &Request) -> Option<TextStream> {
        let gemini_req = GeminiRequest::from(req);
        let model = req.model_or(&self.default_model).to_string();
        let url = self.endpoint(&model, "streamGenerateContent", true);
        let http = self.http.clone();

        Some(Box::pin(async_stream::try_stream! {
            debug!(model = %model, "Streaming Gemini request");
            let response = http.post(&url).json(&gemini_req).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await?;
                Err(api_error(status.as_u16(), &body))?;
                return;
            }

            let mut stream = response.bytes_stream();
            let mut lines = LineBuffer::new();
            let mut answered = false;

            while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
                let chunk = chunk?;
                for line in lines.push(&chunk) {
                    if let Some(parsed) = parse_gemini_sse(&line) {
                        if let Some(text) = parsed?.chunk_text(status.as_u16())? {
                            answered = true;
                            yield text;
                        }
                    }
                }
            }

            if let Some(line) = lines.finish() {
                if let Some(parsed) = parse_gemini_sse(&line) {
                    if let Some(text) = parsed?.chunk_text(status.as_u16())? {
                        answered = true;
                        yield text;
                    }
                }
            }

            if !answered {
                Err(LlmError::NoAnswer("no candidates".to_string()))?;
            }
        }))
    }
}
