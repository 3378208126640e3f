//! Pipeline sequencer
//!
//! Runs the stages in a fixed order: crawl, rank, (discover competitors),
//! sitewide audit, page analysis, action plan, executive summary. The crawl
//! finishes before any model call starts.

use super::report::PipelineReport;
use crate::analysis::{
    discover_competitors, generate_executive_summary, generate_seo_analysis,
    generate_sitewide_audit,
};
use crate::config::Config;
use crate::crawler::crawl;
use crate::events::{channel, emit, log, EventSender, LogEntry, LogStatus, ProgressEvent};
use crate::gateway::{CompletionClient, RetryPolicy};
use crate::plan::create_action_plan;
use crate::scoring::rank_urls;
use crate::OrchestratorError;
use chrono::Utc;
use std::fmt;
use thiserror::Error;

/// What to analyze
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRequest {
    pub sitemap_url: String,
    /// Competitor sitemaps supplied by the user
    pub competitor_sitemaps: Vec<String>,
    /// Also ask the provider to find competitor sitemaps
    pub discover_competitors: bool,
}

impl PipelineRequest {
    pub fn new(sitemap_url: impl Into<String>) -> Self {
        Self {
            sitemap_url: sitemap_url.into(),
            ..Self::default()
        }
    }
}

/// The stage a pipeline run was in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Crawl,
    SitewideAudit,
    PageAnalysis,
    ExecutiveSummary,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Crawl => "Sitemap crawl",
            Self::SitewideAudit => "Sitewide audit",
            Self::PageAnalysis => "Page-level analysis",
            Self::ExecutiveSummary => "Executive summary",
        };
        f.write_str(name)
    }
}

/// A failed pipeline run
#[derive(Debug, Error)]
#[error("{stage} failed: {message}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub message: String,
    /// Log entries recorded up to and including the failure
    pub log: Vec<LogEntry>,
}

type StageResult<T> = Result<T, (PipelineStage, OrchestratorError)>;

/// Runs the whole pipeline for one sitemap
///
/// Every event (crawl progress and log entries) is forwarded to `events` as
/// it happens. The log entries are also collected into the report, or into
/// the failure when a stage fails.
///
/// # Errors
///
/// Fails when the seed sitemap is unreachable, the crawl finds no pages, or
/// a sitewide, page-level or summary call exhausts its retries. Competitor
/// discovery and guide generation degrade instead of failing.
pub async fn run_pipeline(
    config: &Config,
    client: &dyn CompletionClient,
    request: &PipelineRequest,
    events: Option<EventSender>,
) -> Result<PipelineReport, PipelineFailure> {
    let (sender, mut receiver) = channel();
    let recorder = tokio::spawn(async move {
        let mut entries = Vec::new();
        while let Some(event) = receiver.recv().await {
            if let ProgressEvent::Log(entry) = &event {
                entries.push(entry.clone());
            }
            emit(events.as_ref(), event);
        }
        entries
    });

    let result = run_stages(config, client, request, &sender).await;
    if let Err((stage, e)) = &result {
        log(
            Some(&sender),
            format!("Analysis failed: {}", e),
            LogStatus::Error,
        );
        tracing::error!("{} failed", stage);
    }

    drop(sender);
    let entries = recorder.await.unwrap_or_else(|e| {
        tracing::error!("Log recorder stopped: {}", e);
        Vec::new()
    });

    match result {
        Ok(mut report) => {
            report.log = entries;
            Ok(report)
        }
        Err((stage, e)) => Err(PipelineFailure {
            stage,
            message: e.to_string(),
            log: entries,
        }),
    }
}

async fn run_stages(
    config: &Config,
    client: &dyn CompletionClient,
    request: &PipelineRequest,
    sender: &EventSender,
) -> StageResult<PipelineReport> {
    let events = Some(sender);
    let policy = RetryPolicy::from(&config.gateway);

    log(events, "Crawling your sitemap...", LogStatus::Running);
    let outcome = crawl(
        &config.crawler,
        &config.proxy,
        &request.sitemap_url,
        Some(sender.clone()),
    )
    .await
    .map_err(|e| (PipelineStage::Crawl, e))?;
    log(
        events,
        format!("Found {} URLs in your sitemap.", outcome.pages.len()),
        LogStatus::Complete,
    );

    if outcome.pages.is_empty() {
        return Err((PipelineStage::Crawl, OrchestratorError::EmptyCrawl));
    }
    if outcome.sampled {
        log(
            events,
            format!("Analyzing a sample of {} URLs; the site lists more.", outcome.pages.len()),
            LogStatus::Complete,
        );
    }

    let ranked = rank_urls(&outcome.pages);
    let urls: Vec<String> = ranked.iter().map(|scored| scored.url.clone()).collect();
    log(
        events,
        format!("Scored and prioritized {} relevant pages.", ranked.len()),
        LogStatus::Complete,
    );

    let mut competitors: Vec<String> = request
        .competitor_sitemaps
        .iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    if request.discover_competitors {
        match discover_competitors(client, &policy, &request.sitemap_url, events).await {
            Ok(found) => {
                for url in found {
                    if !competitors.contains(&url) {
                        competitors.push(url);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Competitor discovery failed, continuing without it: {}", e);
            }
        }
    }

    log(events, "Initiating Sitewide Strategic Audit...", LogStatus::Running);
    let sitewide = generate_sitewide_audit(
        client,
        &policy,
        &config.analysis,
        &urls,
        &competitors,
        events,
    )
    .await
    .map_err(|e| (PipelineStage::SitewideAudit, e))?;
    log(events, "Sitewide Strategic Audit complete.", LogStatus::Complete);

    let strategic_goals: Vec<String> = sitewide
        .strategic_roadmap
        .action_plan
        .iter()
        .map(|step| step.title.clone())
        .collect();

    log(events, "Generating Page-Level Action Plan...", LogStatus::Running);
    let (analysis, sources) = generate_seo_analysis(
        client,
        &policy,
        &config.analysis,
        &urls,
        &strategic_goals,
        events,
    )
    .await
    .map_err(|e| (PipelineStage::PageAnalysis, e))?;
    log(events, "Page-Level Action Plan complete.", LogStatus::Complete);

    log(
        events,
        "Generating Step-by-Step Implementation Plan...",
        LogStatus::Running,
    );
    let action_plan =
        create_action_plan(client, &policy, &config.batch, &sitewide, &analysis, events).await;
    log(
        events,
        "Implementation Plan generated successfully.",
        LogStatus::Complete,
    );

    log(events, "Synthesizing 80/20 Executive Action Plan...", LogStatus::Running);
    let executive_summary = generate_executive_summary(client, &policy, &sitewide, &analysis)
        .await
        .map_err(|e| (PipelineStage::ExecutiveSummary, e))?;
    log(events, "Executive Action Plan complete.", LogStatus::Complete);

    Ok(PipelineReport {
        sitemap_url: request.sitemap_url.clone(),
        competitor_sitemaps: competitors,
        analysis_type: config.analysis.kind,
        location: config.analysis.location.clone(),
        ranked_urls: ranked,
        sampled: outcome.sampled,
        crawl_timed_out: outcome.timed_out,
        sitewide_analysis: sitewide,
        analysis,
        sources,
        action_plan,
        executive_summary,
        generated_at: Utc::now(),
        log: Vec::new(),
    })
}
