//! Chat-completions backend shared by OpenAI and OpenRouter

use crate::gateway::{error_for_status, ModelRequest, ModelResponse, ProviderConfig, ProviderKind, ResponseMode};
use crate::{GatewayError, GatewayResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Attribution headers OpenRouter asks callers to send
const OPENROUTER_REFERER: &str = "https://github.com/seo-orchestrator";
const OPENROUTER_TITLE: &str = "SEO Orchestrator";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, request: &'a ModelRequest) -> Self {
        let response_format = match request.mode {
            ResponseMode::Structured => Some(ResponseFormat {
                kind: "json_object",
            }),
            ResponseMode::Text | ResponseMode::SearchGrounded => None,
        };

        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            response_format,
            max_tokens: request.max_tokens,
        }
    }
}

pub(crate) async fn complete(
    client: &Client,
    config: &ProviderConfig,
    request: &ModelRequest,
) -> GatewayResult<ModelResponse> {
    let model = request.model.as_deref().unwrap_or_else(|| config.model());
    let endpoint = format!("{}/chat/completions", config.base_url());
    let transport = |source: reqwest::Error| GatewayError::Transport {
        provider: config.kind.to_string(),
        source,
    };

    let mut builder = client
        .post(&endpoint)
        .bearer_auth(&config.api_key)
        .json(&ChatRequest::new(model, request));

    if config.kind == ProviderKind::OpenRouter {
        builder = builder
            .header("HTTP-Referer", OPENROUTER_REFERER)
            .header("X-Title", OPENROUTER_TITLE);
    }

    let response = builder.send().await.map_err(transport)?;
    let response = error_for_status(config.kind, response).await?;
    let body: ChatResponse = response.json().await.map_err(transport)?;

    let text = body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    Ok(ModelResponse {
        text,
        sources: Vec::new(),
    })
}

/// Lists models, the cheapest call that proves an OpenAI key works
pub(crate) async fn list_models(client: &Client, config: &ProviderConfig) -> GatewayResult<()> {
    let response = client
        .get(format!("{}/models", config.base_url()))
        .bearer_auth(&config.api_key)
        .send()
        .await
        .map_err(|source| GatewayError::Transport {
            provider: config.kind.to_string(),
            source,
        })?;

    error_for_status(config.kind, response).await?;
    Ok(())
}
