//! The assembled pipeline report

use crate::analysis::{AnalysisType, ExecutiveSummary, SeoAnalysisResult, SitewideAnalysis};
use crate::events::LogEntry;
use crate::gateway::GroundingSource;
use crate::plan::DailyActionPlan;
use crate::scoring::ScoredUrl;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything a finished pipeline run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub sitemap_url: String,
    /// Competitor sitemaps handed to the sitewide audit
    pub competitor_sitemaps: Vec<String>,
    pub analysis_type: AnalysisType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Discovered pages, highest score first
    pub ranked_urls: Vec<ScoredUrl>,
    /// Whether the pages are a sample of a larger site
    pub sampled: bool,
    /// Whether the crawl stopped at its deadline
    pub crawl_timed_out: bool,

    pub sitewide_analysis: SitewideAnalysis,
    pub analysis: SeoAnalysisResult,
    pub sources: Vec<GroundingSource>,
    pub action_plan: Vec<DailyActionPlan>,
    pub executive_summary: ExecutiveSummary,

    pub generated_at: DateTime<Utc>,
    pub log: Vec<LogEntry>,
}

impl PipelineReport {
    /// Number of action items across all days
    pub fn action_count(&self) -> usize {
        self.action_plan.iter().map(|day| day.actions.len()).sum()
    }
}
