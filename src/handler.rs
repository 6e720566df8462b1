// ABOUTME: LlmHandler - the single entry point. Resolves one backend at
// ABOUTME: construction and turns prompt + files + options into an answer.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::attachment;
use crate::config::{BackendConfig, BackendKind, Settings};
use crate::error::HandlerError;
use crate::llm::{self, LlmBackend, Request};
use crate::sink;

/// Everything one call needs. Built fresh per call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerRequest {
    pub prompt: String,
    pub attachments: Vec<PathBuf>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
    /// Where to persist the answer, if anywhere.
    pub output: Option<PathBuf>,
}

impl AnswerRequest {
    /// Create a request for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Attach a file.
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    /// Attach several files, keeping their order.
    pub fn attach_all(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.attachments.extend(paths.into_iter().map(Into::into));
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

    /// Ask the backend to stream; the answer is still returned whole.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Also write the answer to this path.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

/// Talks to one backend, chosen when the handler is built.
pub struct LlmHandler {
    config: BackendConfig,
    backend: Box<dyn LlmBackend>,
}

impl std::fmt::Debug for LlmHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmHandler")
            .field("kind", &self.config.kind)
            .field("model", &self.config.model)
            .field("host", &self.config.host)
            .finish_non_exhaustive()
    }
}

impl LlmHandler {
    /// Build a handler from a backend tag, reading settings from the environment.
    ///
    /// # Arguments
    /// * `backend` - "ollama", "openai" or "gemini" (any case)
    /// * `model` - Overrides the configured model
    /// * `host` - Ollama server address; ignored by the hosted backends
    pub fn new(backend: &str, model: Option<&str>, host: Option<&str>) -> Result<Self, HandlerError> {
        Self::with_settings(backend, model, host, &Settings::from_env())
    }

    /// Build a handler against an explicit settings snapshot.
    ///
    /// An unknown tag fails here, before anything touches the network.
    pub fn with_settings(
        backend: &str,
        model: Option<&str>,
        host: Option<&str>,
        settings: &Settings,
    ) -> Result<Self, HandlerError> {
        let kind: BackendKind = backend.parse()?;
        let config = BackendConfig::resolve(kind, model, host, settings);
        let backend = llm::connect(&config);

        info!(backend = %config.kind, model = %config.model, "LLM handler ready");
        Ok(Self { config, backend })
    }

    /// Wrap an already-built backend.
    pub fn from_backend(config: BackendConfig, backend: Box<dyn LlmBackend>) -> Self {
        Self { config, backend }
    }

    /// The resolved configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn kind(&self) -> BackendKind {
        self.config.kind
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask the backend and return its answer.
    ///
    /// Attachments are read before anything is sent; an unreadable file
    /// aborts the call. When `output` is set the answer is also written there.
    pub async fn get_answer(&self, req: &AnswerRequest) -> Result<String, HandlerError> {
        let input = attachment::normalize(req.attachments.as_slice())?;
        debug!(
            texts = input.texts.len(),
            blobs = input.blobs.len(),
            stream = req.stream,
            "Normalized attachments"
        );

        let mut request = Request::new(req.prompt.clone())
            .model(self.config.model.clone())
            .input(input)
            .stream(req.stream);
        request.temperature = req.temperature;
        request.max_tokens = req.max_tokens;

        let answer = self.backend.send(&request).await?;

        if let Some(path) = &req.output {
            sink::write_answer(path, &answer)?;
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AttachmentError, ConfigError, LlmError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records every request and answers with a fixed string.
    struct EchoBackend {
        seen: Arc<Mutex<Vec<Request>>>,
        answer: String,
    }

    #[async_trait]
    impl LlmBackend for EchoBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Ollama
        }

        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(&self, req: &Request) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(req.clone());
            Ok(self.answer.clone())
        }
    }

    fn echo_handler(answer: &str) -> (LlmHandler, Arc<Mutex<Vec<Request>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config =
            BackendConfig::resolve(BackendKind::Ollama, Some("echo"), None, &Settings::default());
        let backend = EchoBackend {
            seen: seen.clone(),
            answer: answer.to_string(),
        };
        (LlmHandler::from_backend(config, Box::new(backend)), seen)
    }

    #[test]
    fn test_unknown_backend_fails_at_construction() {
        let err = LlmHandler::with_settings("notareal backend", None, None, &Settings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Config(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_construction_resolves_config() {
        let handler =
            LlmHandler::with_settings("Gemini", Some("gemini-2.0-flash"), None, &Settings::default())
                .unwrap();
        assert_eq!(handler.kind(), BackendKind::Gemini);
        assert_eq!(handler.model(), "gemini-2.0-flash");
        assert_eq!(handler.config().host, None);
    }

    #[tokio::test]
    async fn test_get_answer_forwards_parameters() {
        let (handler, seen) = echo_handler("pong");
        let req = AnswerRequest::new("ping").temperature(0.0).max_tokens(16);

        let answer = handler.get_answer(&req).await.unwrap();
        assert_eq!(answer, "pong");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prompt, "ping");
        assert_eq!(seen[0].model, "echo");
        assert_eq!(seen[0].temperature, Some(0.0));
        assert_eq!(seen[0].max_tokens, Some(16));
        assert!(!seen[0].stream);
    }

    #[tokio::test]
    async fn test_get_answer_normalizes_attachments() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("notes.txt");
        let img = dir.path().join("photo.jpg");
        std::fs::write(&txt, "some notes").unwrap();
        std::fs::write(&img, [0xFF, 0xD8]).unwrap();

        let (handler, seen) = echo_handler("ok");
        let req = AnswerRequest::new("describe").attach_all([&txt, &img]);
        handler.get_answer(&req).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].input.texts, vec!["some notes"]);
        assert_eq!(seen[0].input.blobs[0].media_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_unreadable_attachment_aborts_before_send() {
        let (handler, seen) = echo_handler("never");
        let req = AnswerRequest::new("x").attach("/nonexistent/notes.txt");

        let err = handler.get_answer(&req).await.unwrap_err();
        assert!(matches!(err, HandlerError::Attachment(AttachmentError::Read { .. })));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_answer_writes_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a").join("b").join("answer.txt");

        let (handler, _) = echo_handler("the answer");
        let answer = handler
            .get_answer(&AnswerRequest::new("q").output(&out))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), answer);
    }

    #[tokio::test]
    async fn test_stream_flag_without_streaming_backend_falls_back() {
        let (handler, seen) = echo_handler("whole");
        let answer = handler
            .get_answer(&AnswerRequest::new("q").stream(true))
            .await
            .unwrap();
        assert_eq!(answer, "whole");
        assert!(seen.lock().unwrap()[0].stream);
    }
}
