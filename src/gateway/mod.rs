//! Provider-agnostic model gateway
//!
//! This module handles every call to a model provider:
//! - One backend per [`ProviderKind`] behind the [`CompletionClient`] seam
//! - Response-mode negotiation ([`ResponseMode`])
//! - Attempt-bounded retry with backoff ([`with_retry`])
//! - Recovery and validation of JSON payloads ([`robust_json_parse`])
//!
//! # Example
//!
//! ```no_run
//! use seo_orchestrator::gateway::{CompletionClient, Gateway, ModelRequest, ProviderConfig, ProviderKind, ResponseMode};
//!
//! # async fn run() -> seo_orchestrator::GatewayResult<()> {
//! let gateway = Gateway::new(ProviderConfig::new(ProviderKind::OpenAi, "sk-..."))?;
//! let request = ModelRequest::new("You are terse.", "Say hi as JSON.", ResponseMode::Structured);
//! let response = gateway.complete(&request).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

mod anthropic;
mod extract;
mod gemini;
mod openai;
mod provider;
mod retry;

pub use extract::{
    extract_json, parse_envelope, parse_envelope_as, robust_json_parse, Envelope, REFUSAL_PHRASES,
};
pub use provider::{ProviderConfig, ProviderKind, ResponseMode};
pub use retry::{with_retry, RetryClass, RetryPolicy};

use crate::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Timeout for a single provider request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Longest provider error body quoted in an error
const ERROR_BODY_CHARS: usize = 300;

/// One logical model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    pub mode: ResponseMode,

    /// Output token limit; providers' defaults apply when unset
    pub max_tokens: Option<u32>,

    /// Overrides the configured model for this call
    pub model: Option<String>,
}

impl ModelRequest {
    pub fn new(
        system_instruction: impl Into<String>,
        user_prompt: impl Into<String>,
        mode: ResponseMode,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_prompt: user_prompt.into(),
            mode,
            max_tokens: None,
            model: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A web page cited by a search-grounded response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The text of a model response and any cited sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    /// Deduplicated by URI; empty unless the call was search-grounded
    pub sources: Vec<GroundingSource>,
}

/// Anything that can answer a [`ModelRequest`]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// The provider requests are routed to
    fn provider(&self) -> ProviderKind;

    /// Performs one call, without retries
    async fn complete(&self, request: &ModelRequest) -> GatewayResult<ModelResponse>;
}

/// HTTP gateway to the configured provider
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    config: ProviderConfig,
}

impl Gateway {
    /// Creates a gateway for `config`
    ///
    /// # Errors
    ///
    /// `MissingCredential` when the API key is empty.
    pub fn new(config: ProviderConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| GatewayError::Transport {
                provider: config.kind.to_string(),
                source,
            })?;
        Self::with_client(client, config)
    }

    /// Creates a gateway over an existing client
    pub fn with_client(client: Client, config: ProviderConfig) -> GatewayResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::MissingCredential {
                provider: config.kind.to_string(),
            });
        }
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Checks that the credential is accepted with the cheapest call the
    /// provider offers
    ///
    /// [`credential_error_message`] turns a failure into advice for the user.
    pub async fn verify_credentials(&self) -> GatewayResult<()> {
        let check = ModelRequest::new("", "test", ResponseMode::Text).with_max_tokens(1);

        match self.config.kind {
            ProviderKind::OpenAi => openai::list_models(&self.client, &self.config).await,
            ProviderKind::Gemini => {
                gemini::complete(&self.client, &self.config, &check).await?;
                Ok(())
            }
            ProviderKind::Anthropic => {
                let check = match &self.config.model {
                    Some(_) => check,
                    None => check.with_model("claude-3-haiku-20240307"),
                };
                anthropic::complete(&self.client, &self.config, &check).await?;
                Ok(())
            }
            ProviderKind::OpenRouter => {
                let check = match &self.config.model {
                    Some(_) => check,
                    None => check.with_model("mistralai/mistral-7b-instruct"),
                };
                openai::complete(&self.client, &self.config, &check).await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CompletionClient for Gateway {
    fn provider(&self) -> ProviderKind {
        self.config.kind
    }

    async fn complete(&self, request: &ModelRequest) -> GatewayResult<ModelResponse> {
        if request.mode == ResponseMode::SearchGrounded && !self.config.kind.supports_search() {
            tracing::debug!(
                "{} has no search grounding; sending a plain text request",
                self.config.kind
            );
        }

        tracing::debug!(
            "Sending {:?} request to {} ({})",
            request.mode,
            self.config.kind,
            request.model.as_deref().unwrap_or_else(|| self.config.model())
        );

        match self.config.kind {
            ProviderKind::Gemini => gemini::complete(&self.client, &self.config, request).await,
            ProviderKind::OpenAi | ProviderKind::OpenRouter => {
                openai::complete(&self.client, &self.config, request).await
            }
            ProviderKind::Anthropic => {
                anthropic::complete(&self.client, &self.config, request).await
            }
        }
    }
}

/// Error body shapes used by the supported providers
#[derive(Deserialize)]
struct ErrorBody {
    error: Value,
}

/// Passes a successful response through, or reads the error body into a
/// `Provider` error
pub(crate) async fn error_for_status(kind: ProviderKind, response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = provider_message(&body).unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            body.chars().take(ERROR_BODY_CHARS).collect()
        }
    });

    tracing::warn!("{} returned HTTP {}: {}", kind, status.as_u16(), message);

    Err(GatewayError::Provider {
        provider: kind.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// Pulls `error.message` (and `error.code` or `error.type`) out of a JSON
/// error body
fn provider_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;

    match parsed.error {
        Value::String(message) => Some(message),
        Value::Object(error) => {
            let message = error.get("message")?.as_str()?.to_string();
            let code = error
                .get("code")
                .and_then(Value::as_str)
                .or_else(|| error.get("type").and_then(Value::as_str))
                .or_else(|| error.get("status").and_then(Value::as_str));
            Some(match code {
                Some(code) => format!("{} ({})", message, code),
                None => message,
            })
        }
        _ => None,
    }
}

/// Describes a credential check failure in terms a user can act on
pub fn credential_error_message(error: &GatewayError) -> String {
    if let GatewayError::MissingCredential { .. } = error {
        return "API Key cannot be empty.".to_string();
    }

    if let GatewayError::Provider { status, .. } = error {
        match status {
            401 => return "Authentication failed. The API key is incorrect, expired, or not authorized for the requested model.".to_string(),
            403 => return "Permission denied. Please check your project/organization permissions.".to_string(),
            429 => return "Rate limit exceeded. Please wait a moment or check your plan.".to_string(),
            _ => {}
        }
    }

    if let GatewayError::Transport { source, .. } = error {
        if source.is_timeout() {
            return "Request timed out. Please check your network connection.".to_string();
        }
    }

    let message = error.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("insufficient_quota") || lowered.contains("quota") {
        return "Your account has insufficient quota. Please check your billing.".to_string();
    }
    if lowered.contains("model_not_found") {
        return "The specified model was not found. Please check the model name.".to_string();
    }
    if lowered.contains("api key not valid") {
        return "The provided API Key is not valid. Please check and try again.".to_string();
    }

    message.lines().next().unwrap_or_default().to_string()
}
