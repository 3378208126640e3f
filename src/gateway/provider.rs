use serde::{Deserialize, Serialize};
use std::fmt;

/// The model provider backing a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Anthropic,
    OpenRouter,
}

impl ProviderKind {
    /// Model used when the configuration names none
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o",
            Self::Anthropic => "claude-3-5-sonnet-20240620",
            Self::OpenRouter => "openai/gpt-4o",
        }
    }

    /// Public API root for the provider
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Whether the provider can ground answers in live web search
    pub fn supports_search(self) -> bool {
        matches!(self, Self::Gemini)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider selection and credential for one pipeline run
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    #[serde(default, rename = "api-key")]
    pub api_key: String,

    /// Overrides [`ProviderKind::default_model`]
    #[serde(default)]
    pub model: Option<String>,

    /// Overrides [`ProviderKind::default_base_url`]
    #[serde(default, rename = "base-url")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, api_key: &str) -> Self {
        Self {
            kind,
            api_key: api_key.to_string(),
            model: None,
            base_url: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The model requests are sent to
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.kind.default_model())
    }

    /// The API root without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// How the response text should be produced
///
/// Structured output and search grounding are separate variants because the
/// one provider offering search rejects requests that combine them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Free-form text
    #[default]
    Text,

    /// The provider is asked to emit a JSON object
    Structured,

    /// Text grounded in live web search, with cited sources; providers
    /// without search treat this as [`ResponseMode::Text`]
    SearchGrounded,
}
