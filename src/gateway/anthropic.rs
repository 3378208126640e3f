//! Anthropic messages backend

use crate::gateway::{error_for_status, ModelRequest, ModelResponse, ProviderConfig};
use crate::{GatewayError, GatewayResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-06-01";

/// The messages API requires an explicit output limit
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

pub(crate) async fn complete(
    client: &Client,
    config: &ProviderConfig,
    request: &ModelRequest,
) -> GatewayResult<ModelResponse> {
    let model = request.model.as_deref().unwrap_or_else(|| config.model());
    let transport = |source: reqwest::Error| GatewayError::Transport {
        provider: config.kind.to_string(),
        source,
    };

    // Structured and search modes have no counterpart here; the prompts ask
    // for JSON and the response is parsed the same way.
    let body = MessagesRequest {
        model,
        system: &request.system_instruction,
        messages: vec![Message {
            role: "user",
            content: &request.user_prompt,
        }],
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    };

    let response = client
        .post(format!("{}/v1/messages", config.base_url()))
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", API_VERSION)
        .json(&body)
        .send()
        .await
        .map_err(transport)?;

    let response = error_for_status(config.kind, response).await?;
    let body: MessagesResponse = response.json().await.map_err(transport)?;

    let text = body
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<String>();

    Ok(ModelResponse {
        text,
        sources: Vec::new(),
    })
}
