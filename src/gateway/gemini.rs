//! Gemini `generateContent` backend

use crate::gateway::{error_for_status, GroundingSource, ModelRequest, ModelResponse, ProviderConfig, ResponseMode};
use crate::{GatewayError, GatewayResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl GenerateContentRequest {
    /// Builds the request body
    ///
    /// Search grounding attaches the `google_search` tool and leaves the
    /// response MIME type unset: the API rejects tools combined with an
    /// enforced JSON response.
    fn new(request: &ModelRequest) -> Self {
        let (tools, response_mime_type) = match request.mode {
            ResponseMode::SearchGrounded => (Some(vec![json!({ "google_search": {} })]), None),
            ResponseMode::Structured => (None, Some("application/json")),
            ResponseMode::Text => (None, Some("text/plain")),
        };

        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(request.system_instruction.clone()),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(request.user_prompt.clone()),
                }],
            }],
            tools,
            generation_config: GenerationConfig {
                response_mime_type,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

pub(crate) async fn complete(
    client: &Client,
    config: &ProviderConfig,
    request: &ModelRequest,
) -> GatewayResult<ModelResponse> {
    let model = request.model.as_deref().unwrap_or_else(|| config.model());
    let endpoint = format!("{}/v1beta/models/{}:generateContent", config.base_url(), model);
    let transport = |source: reqwest::Error| GatewayError::Transport {
        provider: config.kind.to_string(),
        source,
    };

    let response = client
        .post(&endpoint)
        .header("x-goog-api-key", &config.api_key)
        .json(&GenerateContentRequest::new(request))
        .send()
        .await
        .map_err(transport)?;

    let response = error_for_status(config.kind, response).await?;
    let body: GenerateContentResponse = response.json().await.map_err(transport)?;

    Ok(into_model_response(body))
}

fn into_model_response(body: GenerateContentResponse) -> ModelResponse {
    let Some(candidate) = body.candidates.into_iter().next() else {
        return ModelResponse::default();
    };

    let text = candidate
        .content
        .unwrap_or_default()
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<String>();

    let mut sources: Vec<GroundingSource> = Vec::new();
    let chunks = candidate
        .grounding_metadata
        .map(|metadata| metadata.grounding_chunks)
        .unwrap_or_default();

    for web in chunks.into_iter().filter_map(|chunk| chunk.web) {
        let Some(uri) = web.uri.filter(|uri| !uri.is_empty()) else {
            continue;
        };
        if sources.iter().any(|source| source.uri == uri) {
            continue;
        }
        sources.push(GroundingSource {
            uri,
            title: web.title.filter(|title| !title.is_empty()),
        });
    }

    ModelResponse { text, sources }
}
