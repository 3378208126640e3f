//! Model calls for each analysis stage
//!
//! Every stage retries the call and the decode together, so a malformed or
//! wrongly shaped response is asked for again within the attempt budget.

use super::prompts;
use super::types::{
    BatchGuides, CompetitorSitemaps, ExecutiveSummary, ImplementationGuide, SeoAnalysisResult,
    SitewideAnalysis,
};
use crate::config::AnalysisConfig;
use crate::events::{log, EventSender, LogStatus};
use crate::gateway::{
    parse_envelope, parse_envelope_as, with_retry, CompletionClient, Envelope, GroundingSource,
    ModelRequest, ProviderKind, ResponseMode, RetryPolicy,
};
use crate::GatewayError;
use serde::Serialize;
use std::collections::HashMap;

/// Most competitor sitemaps kept from a discovery call
pub const MAX_COMPETITORS: usize = 5;

/// A task as sent to the batch guide call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuideTask<'a> {
    pub id: &'a str,
    pub title: &'a str,
    #[serde(rename = "type")]
    pub task_type: &'a str,
    pub context: &'a str,
}

/// Finds competitor sitemaps for a site with a search-grounded call
///
/// Only Gemini can search; other providers get an empty list.
pub async fn discover_competitors(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    site_url: &str,
    events: Option<&EventSender>,
) -> crate::Result<Vec<String>> {
    if client.provider() != ProviderKind::Gemini {
        tracing::warn!(
            "Competitor discovery needs search grounding, which {} does not offer",
            client.provider()
        );
        return Ok(Vec::new());
    }

    log(events, "Discovering competitor sitemaps...", LogStatus::Running);
    let request = ModelRequest::new(
        prompts::COMPETITOR_DISCOVERY_INSTRUCTION,
        format!("The user's website is: {site_url}"),
        ResponseMode::SearchGrounded,
    );
    let request = &request;

    let found = with_retry(policy, CompetitorSitemaps::CONTEXT, move || async move {
        let response = client.complete(request).await?;
        parse_envelope::<CompetitorSitemaps>(&response.text)
    })
    .await?;

    let mut sitemaps = found.sitemaps;
    if sitemaps.len() > MAX_COMPETITORS {
        tracing::debug!("Keeping {} of {} competitor sitemaps", MAX_COMPETITORS, sitemaps.len());
        sitemaps.truncate(MAX_COMPETITORS);
    }

    log(
        events,
        format!("Found {} competitor sitemaps.", sitemaps.len()),
        LogStatus::Complete,
    );
    Ok(sitemaps)
}

/// Runs the sitewide strategic audit over the ranked page URLs
pub async fn generate_sitewide_audit(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    analysis: &AnalysisConfig,
    urls: &[String],
    competitor_urls: &[String],
    events: Option<&EventSender>,
) -> crate::Result<SitewideAnalysis> {
    let provider = client.provider();
    let request = ModelRequest::new(
        prompts::sitewide_audit_instruction(provider, analysis.kind, analysis.location.as_deref()),
        prompts::sitewide_audit_prompt(urls, competitor_urls),
        ResponseMode::SearchGrounded,
    );
    let request = &request;

    let audit = with_retry(policy, SitewideAnalysis::CONTEXT, move || async move {
        log(events, "Analyzing competitor strengths...", LogStatus::Running);
        log(
            events,
            format!("Sending request to {provider} for Sitewide Audit..."),
            LogStatus::Running,
        );
        let response = client.complete(request).await?;

        log(
            events,
            format!("Received response from {provider}. Validating structure..."),
            LogStatus::Running,
        );
        parse_envelope::<SitewideAnalysis>(&response.text)
    })
    .await?;

    log(events, "Validated sitewide audit.", LogStatus::Running);
    Ok(audit)
}

/// Runs the page-level analysis, steered by the sitewide strategic goals
///
/// Returns the analysis with the sources cited by the grounded call.
pub async fn generate_seo_analysis(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    analysis: &AnalysisConfig,
    urls: &[String],
    strategic_goals: &[String],
    events: Option<&EventSender>,
) -> crate::Result<(SeoAnalysisResult, Vec<GroundingSource>)> {
    let provider = client.provider();
    let request = ModelRequest::new(
        prompts::page_analysis_instruction(
            provider,
            analysis.kind,
            analysis.location.as_deref(),
            strategic_goals,
        ),
        prompts::page_analysis_prompt(urls),
        ResponseMode::SearchGrounded,
    );
    let request = &request;

    let (result, sources) = with_retry(policy, SeoAnalysisResult::CONTEXT, move || async move {
        log(
            events,
            "Analyzing individual page strengths and weaknesses...",
            LogStatus::Running,
        );
        let mode = if provider.supports_search() {
            " with Google Search grounding"
        } else {
            ""
        };
        log(
            events,
            format!("Sending request to {provider}{mode}..."),
            LogStatus::Running,
        );
        let response = client.complete(request).await?;

        log(
            events,
            format!("Received response from {provider}. Extracting sources and validating structure..."),
            LogStatus::Running,
        );
        let result = parse_envelope::<SeoAnalysisResult>(&response.text)?;
        Ok::<_, GatewayError>((result, response.sources))
    })
    .await?;

    log(events, "Validated page-level analysis.", LogStatus::Running);
    Ok((result, sources))
}

/// Writes the implementation guide for a single task
pub async fn generate_implementation_guide(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    task_type: &str,
    title: &str,
    context: &str,
) -> crate::Result<ImplementationGuide> {
    let request = ModelRequest::new(
        prompts::implementation_guide_instruction(),
        prompts::implementation_guide_prompt(task_type, title, context),
        ResponseMode::Structured,
    );
    let request = &request;
    let label = format!("{} for {}", ImplementationGuide::CONTEXT, title);
    let label = label.as_str();

    let guide = with_retry(policy, label, move || async move {
        let response = client.complete(request).await?;
        parse_envelope_as::<ImplementationGuide>(&response.text, label)
    })
    .await?;
    Ok(guide)
}

/// Writes implementation guides for a batch of tasks in one call
///
/// The guides are keyed by the id the model echoed back. Ids the model left
/// out are simply absent; when an id repeats, the first guide is kept.
pub async fn generate_batch_guides(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    tasks: &[GuideTask<'_>],
) -> crate::Result<HashMap<String, ImplementationGuide>> {
    let tasks_json = serde_json::to_string_pretty(tasks)?;
    let request = ModelRequest::new(
        prompts::batch_guide_instruction(),
        prompts::batch_guide_prompt(&tasks_json),
        ResponseMode::Structured,
    );
    let request = &request;

    let batch = with_retry(policy, BatchGuides::CONTEXT, move || async move {
        let response = client.complete(request).await?;
        parse_envelope::<BatchGuides>(&response.text)
    })
    .await?;

    let mut guides = HashMap::with_capacity(batch.guides.len());
    for entry in batch.guides {
        if guides.contains_key(&entry.id) {
            tracing::warn!("Ignoring repeated guide for task {}", entry.id);
            continue;
        }
        guides.insert(entry.id, entry.guide);
    }
    Ok(guides)
}

/// Condenses both analyses into an executive summary
pub async fn generate_executive_summary(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    sitewide: &SitewideAnalysis,
    analysis: &SeoAnalysisResult,
) -> crate::Result<ExecutiveSummary> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct FullAnalysis<'a> {
        sitewide_analysis: &'a SitewideAnalysis,
        seo_analysis: &'a SeoAnalysisResult,
    }

    let analysis_json = serde_json::to_string_pretty(&FullAnalysis {
        sitewide_analysis: sitewide,
        seo_analysis: analysis,
    })?;
    let request = ModelRequest::new(
        prompts::executive_summary_instruction(),
        prompts::executive_summary_prompt(&analysis_json),
        ResponseMode::Structured,
    );
    let request = &request;

    let summary = with_retry(policy, ExecutiveSummary::CONTEXT, move || async move {
        let response = client.complete(request).await?;
        parse_envelope::<ExecutiveSummary>(&response.text)
    })
    .await?;
    Ok(summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gateway::ModelResponse;
    use crate::{GatewayResult, OrchestratorError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned responses and records the requests it saw
    pub(crate) struct ScriptedClient {
        provider: ProviderKind,
        replies: Mutex<VecDeque<GatewayResult<ModelResponse>>>,
        pub(crate) requests: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedClient {
        pub(crate) fn new(provider: ProviderKind) -> Self {
            Self {
                provider,
                replies: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn reply(self, text: impl Into<String>) -> Self {
            self.replies.lock().unwrap().push_back(Ok(ModelResponse {
                text: text.into(),
                sources: Vec::new(),
            }));
            self
        }

        pub(crate) fn reply_with(self, response: GatewayResult<ModelResponse>) -> Self {
            self.replies.lock().unwrap().push_back(response);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        fn provider(&self) -> ProviderKind {
            self.provider
        }

        async fn complete(&self, request: &ModelRequest) -> GatewayResult<ModelResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::EmptyResponse { context: "script".to_string() }))
        }
    }

    pub(crate) fn quick_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_discovery_skipped_without_search() {
        let client = ScriptedClient::new(ProviderKind::OpenAi);
        let found = discover_competitors(&client, &quick_policy(), "https://x.com", None)
            .await
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_discovery_is_grounded_and_truncated() {
        let sitemaps: Vec<String> = (1..=7).map(|i| format!("https://c{i}.com/sitemap.xml")).collect();
        let client = ScriptedClient::new(ProviderKind::Gemini)
            .reply(format!("Here you go: {}", json!({ "sitemaps": sitemaps })));

        let found = discover_competitors(&client, &quick_policy(), "https://x.com", None)
            .await
            .unwrap();
        assert_eq!(found.len(), MAX_COMPETITORS);
        assert_eq!(found[0], "https://c1.com/sitemap.xml");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].mode, ResponseMode::SearchGrounded);
        assert!(requests[0].user_prompt.contains("https://x.com"));
    }

    #[tokio::test]
    async fn test_malformed_response_is_retried() {
        let body = json!({ "sitemaps": ["https://c.com/sitemap.xml"] }).to_string();
        let client = ScriptedClient::new(ProviderKind::Gemini)
            .reply("{ not json")
            .reply(body);

        let found = discover_competitors(&client, &quick_policy(), "https://x.com", None)
            .await
            .unwrap();
        assert_eq!(found, vec!["https://c.com/sitemap.xml".to_string()]);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_refusal_fails_the_stage_after_retries() {
        let client = ScriptedClient::new(ProviderKind::Anthropic)
            .reply("I apologize, but I cannot help with that.")
            .reply("I apologize, but I cannot help with that.")
            .reply("I apologize, but I cannot help with that.");

        let result = generate_executive_summary(
            &client,
            &quick_policy(),
            &crate::analysis::types::tests::sitewide(),
            &SeoAnalysisResult {
                page_actions: Vec::new(),
                keywords: Vec::new(),
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(OrchestratorError::Gateway(GatewayError::Blocked { .. }))
        ));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_seo_analysis_returns_sources() {
        let body = json!({
            "pageActions": [{ "url": "https://x.com/pricing", "priority": "high" }],
            "keywords": []
        })
        .to_string();
        let client = ScriptedClient::new(ProviderKind::Gemini).reply_with(Ok(ModelResponse {
            text: body,
            sources: vec![GroundingSource {
                uri: "https://news.test/a".to_string(),
                title: None,
            }],
        }));

        let config = AnalysisConfig::default();
        let goals = vec!["Own pricing searches".to_string()];
        let (analysis, sources) = generate_seo_analysis(
            &client,
            &quick_policy(),
            &config,
            &["https://x.com/pricing".to_string()],
            &goals,
            None,
        )
        .await
        .unwrap();

        assert_eq!(analysis.page_actions.len(), 1);
        assert_eq!(sources.len(), 1);
        let requests = client.requests.lock().unwrap();
        assert!(requests[0].system_instruction.contains("Own pricing searches"));
    }

    #[tokio::test]
    async fn test_sitewide_audit_logs_progress() {
        let client = ScriptedClient::new(ProviderKind::OpenAi)
            .reply(crate::analysis::types::tests::sitewide_json().to_string());
        let (sender, mut receiver) = crate::events::channel();

        let audit = generate_sitewide_audit(
            &client,
            &quick_policy(),
            &AnalysisConfig::default(),
            &["https://x.com/".to_string()],
            &[],
            Some(&sender),
        )
        .await
        .unwrap();
        assert_eq!(audit.technical_health.action_items.len(), 1);

        let mut messages = Vec::new();
        while let Ok(crate::events::ProgressEvent::Log(entry)) = receiver.try_recv() {
            messages.push(entry.message);
        }
        assert_eq!(messages.first().map(String::as_str), Some("Analyzing competitor strengths..."));
        assert_eq!(messages.last().map(String::as_str), Some("Validated sitewide audit."));
    }

    #[tokio::test]
    async fn test_batch_guides_keep_first_duplicate() {
        let guide = |time: &str| {
            json!({
                "id": "a",
                "priority": "medium",
                "impact": 5,
                "estimatedTime": time,
                "dependencies": [],
                "toolsRequired": [],
                "stepByStepImplementation": [],
                "prompts": [],
                "verificationChecklist": [],
                "successVerification": [],
                "nextSteps": []
            })
        };
        let client = ScriptedClient::new(ProviderKind::OpenAi)
            .reply(json!({ "guides": [guide("1 hour"), guide("9 hours")] }).to_string());

        let tasks = [GuideTask {
            id: "a",
            title: "Task A",
            task_type: "technical",
            context: "ctx",
        }];
        let guides = generate_batch_guides(&client, &quick_policy(), &tasks).await.unwrap();
        assert_eq!(guides.len(), 1);
        assert_eq!(guides["a"].estimated_time, "1 hour");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].mode, ResponseMode::Structured);
        assert!(requests[0].user_prompt.contains("\"type\": \"technical\""));
    }

    #[tokio::test]
    async fn test_single_guide_error_names_task() {
        let client = ScriptedClient::new(ProviderKind::OpenAi)
            .reply("{}")
            .reply("{}")
            .reply("{}");
        let err = generate_implementation_guide(&client, &quick_policy(), "technical", "Fix robots", "ctx")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ImplementationGuide for Fix robots"));
    }
}
