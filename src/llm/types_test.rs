// ABOUTME: Tests for the request builder and backend selection.
// ABOUTME: Verifies connect() wires each config into the right adapter.

use super::*;
use crate::attachment::Blob;
use crate::config::Settings;

#[test]
fn test_request_defaults() {
    let req = Request::new("ping");
    assert_eq!(req.prompt, "ping");
    assert!(req.model.is_empty());
    assert!(req.input.is_empty());
    assert_eq!(req.temperature, None);
    assert_eq!(req.max_tokens, None);
    assert!(!req.stream);
}

#[test]
fn test_request_builder() {
    let req = Request::new("describe")
        .model("llava")
        .text("notes")
        .blob(Blob::new(vec![1u8], "image/png"))
        .temperature(0.7)
        .max_tokens(512)
        .stream(true);

    assert_eq!(req.model, "llava");
    assert_eq!(req.input.texts, vec!["notes"]);
    assert_eq!(req.input.blobs.len(), 1);
    assert_eq!(req.temperature, Some(0.7));
    assert_eq!(req.max_tokens, Some(512));
    assert!(req.stream);
}

#[test]
fn test_model_or() {
    assert_eq!(Request::new("x").model_or("fallback"), "fallback");
    assert_eq!(Request::new("x").model("set").model_or("fallback"), "set");
}

#[test]
fn test_connect_picks_adapter_per_kind() {
    let settings = Settings::default();
    for kind in BackendKind::ALL {
        let config = BackendConfig::resolve(kind, Some("some-model"), None, &settings);
        let backend = connect(&config);
        assert_eq!(backend.kind(), kind);
        assert_eq!(backend.model(), "some-model");
    }
}

#[test]
fn test_connect_uses_resolved_defaults() {
    let config = BackendConfig::resolve(BackendKind::Gemini, None, None, &Settings::default());
    let backend = connect(&config);
    assert_eq!(backend.model(), crate::config::GEMINI_DEFAULT_MODEL);
}
