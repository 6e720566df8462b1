// ABOUTME: Backend selection - environment settings snapshot, backend kinds,
// ABOUTME: and resolution of model/host/credentials into a BackendConfig.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::ConfigError;

/// Default Ollama server address.
pub const OLLAMA_DEFAULT_HOST: &str = "http://127.0.0.1:11434";

/// Default Ollama model when neither an override nor `OLLAMA_MODEL` is set.
pub const OLLAMA_DEFAULT_MODEL: &str = "gpt-oss:20b";

/// Default OpenAI model when neither an override nor `OPENAI_MODEL` is set.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4";

/// Default OpenAI API root.
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Gemini model when neither an override nor `GEMINI_MODEL` is set.
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Default Gemini API root.
pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Snapshot of every environment-sourced value the handler cares about.
///
/// Built once, before any handler exists, and passed explicitly into
/// [`BackendConfig::resolve`]. Nothing else in the crate reads the
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub ollama_host: Option<String>,
    pub ollama_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            ollama_host: get("OLLAMA_HOST"),
            ollama_model: get("OLLAMA_MODEL"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL"),
            openai_base_url: get("OPENAI_BASE_URL"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL"),
            gemini_base_url: get("GEMINI_BASE_URL"),
        }
    }
}

/// The three supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Local models served by Ollama.
    Ollama,
    /// Hosted chat completions (OpenAI).
    OpenAi,
    /// Hosted multimodal generation (Google Gemini).
    Gemini,
}

impl BackendKind {
    /// All kinds, in display order.
    pub const ALL: [BackendKind; 3] = [Self::Ollama, Self::OpenAi, Self::Gemini];

    /// The tag used on the command line and in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ConfigError::UnknownBackend(s.to_string()))
    }
}

/// Fully resolved backend configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    /// Server address; only set for Ollama.
    pub host: Option<String>,
    pub api_key: Option<String>,
    /// API root for the hosted backends.
    pub base_url: Option<String>,
}

impl BackendConfig {
    /// Resolve a backend kind plus optional overrides against the settings.
    ///
    /// Model precedence is override, then settings, then the per-backend
    /// default. Credentials are copied as-is; a missing key is not an error
    /// here and only shows up when the provider rejects the request.
    pub fn resolve(
        kind: BackendKind,
        model: Option<&str>,
        host: Option<&str>,
        settings: &Settings,
    ) -> Self {
        let pick = |over: Option<&str>, env: &Option<String>, default: &str| {
            over.filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| env.clone())
                .unwrap_or_else(|| default.to_string())
        };

        if host.is_some() && kind != BackendKind::Ollama {
            debug!(backend = %kind, "Ignoring host override for hosted backend");
        }

        match kind {
            BackendKind::Ollama => Self {
                kind,
                model: pick(model, &settings.ollama_model, OLLAMA_DEFAULT_MODEL),
                host: Some(pick(host, &settings.ollama_host, OLLAMA_DEFAULT_HOST)),
                api_key: None,
                base_url: None,
            },
            BackendKind::OpenAi => Self {
                kind,
                model: pick(model, &settings.openai_model, OPENAI_DEFAULT_MODEL),
                host: None,
                api_key: settings.openai_api_key.clone(),
                base_url: Some(pick(
                    None,
                    &settings.openai_base_url,
                    OPENAI_DEFAULT_BASE_URL,
                )),
            },
            BackendKind::Gemini => Self {
                kind,
                model: pick(model, &settings.gemini_model, GEMINI_DEFAULT_MODEL),
                host: None,
                api_key: settings.gemini_api_key.clone(),
                base_url: Some(pick(
                    None,
                    &settings.gemini_base_url,
                    GEMINI_DEFAULT_BASE_URL,
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_kind_parse_case_insensitive() {
        assert_eq!("OLLAMA".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
        assert_eq!("OpenAI".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!(" gemini ".parse::<BackendKind>().unwrap(), BackendKind::Gemini);
    }

    #[test]
    fn test_kind_parse_unknown() {
        let err = "notareal backend".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(ref tag) if tag == "notareal backend"));
    }

    #[test]
    fn test_kind_display_round_trips() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_empty_values_are_absent() {
        let s = settings(&[("OPENAI_API_KEY", ""), ("OLLAMA_MODEL", "  ")]);
        assert_eq!(s.openai_api_key, None);
        assert_eq!(s.ollama_model, None);
    }

    #[test]
    fn test_resolve_hardcoded_defaults() {
        let s = Settings::default();

        let ollama = BackendConfig::resolve(BackendKind::Ollama, None, None, &s);
        assert_eq!(ollama.model, OLLAMA_DEFAULT_MODEL);
        assert_eq!(ollama.host.as_deref(), Some(OLLAMA_DEFAULT_HOST));

        let openai = BackendConfig::resolve(BackendKind::OpenAi, None, None, &s);
        assert_eq!(openai.model, OPENAI_DEFAULT_MODEL);
        assert_eq!(openai.base_url.as_deref(), Some(OPENAI_DEFAULT_BASE_URL));
        assert_eq!(openai.api_key, None);

        let gemini = BackendConfig::resolve(BackendKind::Gemini, None, None, &s);
        assert_eq!(gemini.model, GEMINI_DEFAULT_MODEL);
        assert_eq!(gemini.base_url.as_deref(), Some(GEMINI_DEFAULT_BASE_URL));
    }

    #[test]
    fn test_resolve_settings_beat_defaults() {
        let s = settings(&[
            ("OLLAMA_MODEL", "llama3.2"),
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("GEMINI_API_KEY", "g-key"),
        ]);

        let ollama = BackendConfig::resolve(BackendKind::Ollama, None, None, &s);
        assert_eq!(ollama.model, "llama3.2");
        assert_eq!(ollama.host.as_deref(), Some("http://gpu-box:11434"));

        let gemini = BackendConfig::resolve(BackendKind::Gemini, None, None, &s);
        assert_eq!(gemini.api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn test_resolve_override_beats_settings() {
        let s = settings(&[("OPENAI_MODEL", "gpt-4o"), ("OLLAMA_HOST", "http://a:1")]);

        let openai = BackendConfig::resolve(BackendKind::OpenAi, Some("gpt-4o-mini"), None, &s);
        assert_eq!(openai.model, "gpt-4o-mini");

        let ollama =
            BackendConfig::resolve(BackendKind::Ollama, None, Some("http://b:2"), &s);
        assert_eq!(ollama.host.as_deref(), Some("http://b:2"));
    }

    #[test]
    fn test_host_override_ignored_for_hosted() {
        let cfg = BackendConfig::resolve(
            BackendKind::Gemini,
            None,
            Some("http://localhost:1"),
            &Settings::default(),
        );
        assert_eq!(cfg.host, None);
        assert_eq!(cfg.base_url.as_deref(), Some(GEMINI_DEFAULT_BASE_URL));
    }
}
