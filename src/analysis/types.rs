//! Stage output envelopes
//!
//! Each envelope's top-level keys are required; a response missing one fails
//! with `WrongShape`. Descriptive fields inside list entries default when
//! a model leaves them out.

use crate::gateway::Envelope;
use serde::{Deserialize, Serialize};

/// Priority attached to findings, page actions and guides
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "High", alias = "HIGH", alias = "critical", alias = "Critical")]
    High,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

// ---------------------------------------------------------------------------
// Sitewide audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitewideAnalysis {
    pub strategic_roadmap: StrategicRoadmap,
    pub technical_health: TechnicalAudit,
    pub content_gaps: Vec<ContentGap>,
    pub topic_clusters: Vec<TopicCluster>,
    pub site_architecture_graph: GraphData,
    pub local_business_audit: LocalBusinessAudit,
    pub zero_to_one_initiatives: Vec<ZeroToOneInitiative>,
}

impl Envelope for SitewideAnalysis {
    const CONTEXT: &'static str = "SitewideAnalysis";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicRoadmap {
    pub mission_statement: String,
    pub projected_impact_score: f64,
    pub action_plan: Vec<RoadmapStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAudit {
    pub status: String,
    pub summary: String,
    pub action_items: Vec<TechnicalActionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalActionItem {
    pub item: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentGap {
    pub topic: String,
    pub rationale: String,
    pub suggested_title: String,
    pub keyword_ideas: Vec<String>,
    pub impact: f64,
    pub effort: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitor_source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopicCluster {
    pub cluster_name: String,
    pub pillar_page: String,
    pub supporting_pages: Vec<String>,
    pub fortification_plan: Vec<InternalLink>,
    pub impact: f64,
    pub effort: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InternalLink {
    pub link_from: String,
    pub link_to: String,
    pub anchor_text: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphNode {
    /// Page URL
    pub id: String,
    pub label: String,
    /// `pillar`, `cluster` or `orphan`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Local SEO findings; empty for global analyses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalBusinessAudit {
    pub status: String,
    pub summary: String,
    pub action_items: Vec<LocalActionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalActionItem {
    pub item: String,
    pub priority: Option<Priority>,
    pub checked: bool,
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZeroToOneInitiative {
    pub initiative_name: String,
    pub initiative_type: String,
    pub description: String,
    pub strategic_rationale: String,
    pub impact: f64,
    pub effort: f64,
}

// ---------------------------------------------------------------------------
// Page-level analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysisResult {
    pub page_actions: Vec<PageAction>,
    pub keywords: Vec<KeywordIdea>,
}

impl Envelope for SeoAnalysisResult {
    const CONTEXT: &'static str = "SeoAnalysisResult";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAction {
    pub url: String,
    pub priority: Priority,
    /// `analysis`, `keyword` or `decay`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_details: Option<RewriteDetails>,
    #[serde(default)]
    pub optimization_tasks: Vec<OptimizationTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RewriteDetails {
    pub reason: String,
    pub evidence: String,
    pub suggested_headline: String,
    /// `update`, `merge`, `prune`, `canonical` or `refresh`
    pub action: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategic_goal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationTask {
    pub task: String,
    #[serde(default)]
    pub impact: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordIdea {
    pub phrase: String,
    pub title: String,
    #[serde(default)]
    pub intent: String,
    /// `global` or `local`
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub difficulty: f64,
    #[serde(default)]
    pub content_angle: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub cluster: String,
}

// ---------------------------------------------------------------------------
// Implementation guides
// ---------------------------------------------------------------------------

/// Step-by-step guidance for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationGuide {
    pub priority: Priority,
    /// 1 to 10
    pub impact: f64,
    pub estimated_time: String,
    pub dependencies: Vec<String>,
    pub tools_required: Vec<Tool>,
    pub step_by_step_implementation: Vec<String>,
    pub prompts: Vec<PromptTemplate>,
    pub verification_checklist: Vec<ChecklistItem>,
    pub success_verification: Vec<SuccessCheck>,
    pub next_steps: Vec<NextStep>,
}

impl Envelope for ImplementationGuide {
    const CONTEXT: &'static str = "ImplementationGuide";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    pub title: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item: String,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessCheck {
    pub method: String,
    pub metric: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextStep {
    pub action: String,
    pub rationale: String,
}

/// A guide returned in a batch, keyed by the originating task id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchGuide {
    pub id: String,
    #[serde(flatten)]
    pub guide: ImplementationGuide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchGuides {
    pub guides: Vec<BatchGuide>,
}

impl Envelope for BatchGuides {
    const CONTEXT: &'static str = "BatchImplementationGuides";
}

// ---------------------------------------------------------------------------
// Executive summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub summary_title: String,
    pub summary_introduction: String,
    pub rewrites: Vec<SummaryAction>,
    pub optimizations: Vec<SummaryAction>,
    pub new_content: Vec<SummaryContent>,
    pub redirects: Vec<SummaryRedirect>,
}

impl Envelope for ExecutiveSummary {
    const CONTEXT: &'static str = "ExecutiveSummary";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryAction {
    pub url: String,
    pub reason: String,
    pub instruction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryContent {
    pub title: String,
    pub topic: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryRedirect {
    pub from: String,
    pub to: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Competitor discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorSitemaps {
    pub sitemaps: Vec<String>,
}

impl Envelope for CompetitorSitemaps {
    const CONTEXT: &'static str = "CompetitorSitemaps";
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gateway::parse_envelope;
    use crate::GatewayError;
    use serde_json::json;

    pub(crate) fn sitewide_json() -> serde_json::Value {
        json!({
            "strategicRoadmap": {
                "missionStatement": "Own the pricing conversation",
                "projectedImpactScore": 72,
                "actionPlan": [
                    { "title": "Fix crawl waste", "description": "Prune tag archives" },
                    { "title": "Build a pricing hub" }
                ]
            },
            "technicalHealth": {
                "status": "needs_improvement",
                "summary": "Thin taxonomy pages dilute crawl budget",
                "actionItems": [ { "item": "Noindex tag archives", "priority": "high" } ]
            },
            "contentGaps": [ { "topic": "Pricing calculators", "impact": 8, "effort": 3 } ],
            "topicClusters": [],
            "siteArchitectureGraph": { "nodes": [ { "id": "https://x.com/", "label": "Home", "type": "pillar" } ], "edges": [] },
            "localBusinessAudit": {},
            "zeroToOneInitiatives": []
        })
    }

    pub(crate) fn sitewide() -> SitewideAnalysis {
        serde_json::from_value(sitewide_json()).unwrap()
    }

    #[test]
    fn test_sitewide_analysis_parses() {
        let text = format!("```json\n{}\n```", sitewide_json());
        let audit = parse_envelope::<SitewideAnalysis>(&text).unwrap();

        assert_eq!(audit.strategic_roadmap.projected_impact_score, 72.0);
        assert_eq!(audit.strategic_roadmap.action_plan[1].description, "");
        assert_eq!(audit.technical_health.action_items[0].priority, Priority::High);
        assert_eq!(audit.site_architecture_graph.nodes[0].kind, "pillar");
        assert!(audit.local_business_audit.action_items.is_empty());
    }

    #[test]
    fn test_sitewide_analysis_missing_key_is_wrong_shape() {
        let mut value = sitewide_json();
        value.as_object_mut().unwrap().remove("zeroToOneInitiatives");

        let err = parse_envelope::<SitewideAnalysis>(&value.to_string()).unwrap_err();
        assert!(matches!(err, GatewayError::WrongShape { context, .. } if context == "SitewideAnalysis"));
    }

    #[test]
    fn test_impact_score_must_be_numeric() {
        let mut value = sitewide_json();
        value["strategicRoadmap"]["projectedImpactScore"] = json!("high");
        assert!(parse_envelope::<SitewideAnalysis>(&value.to_string()).is_err());
    }

    #[test]
    fn test_priority_aliases() {
        let parsed: Vec<Priority> = serde_json::from_value(json!(["High", "medium", "LOW"])).unwrap();
        assert_eq!(parsed, vec![Priority::High, Priority::Medium, Priority::Low]);
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), json!("high"));
        assert!(Priority::High < Priority::Low);
    }

    #[test]
    fn test_batch_guides_flatten_id() {
        let text = json!({
            "guides": [{
                "id": "technical-noindex-tag-archives",
                "priority": "high",
                "impact": 8,
                "estimatedTime": "2 hours",
                "dependencies": [],
                "toolsRequired": [ { "name": "Search Console", "url": "https://search.google.com" } ],
                "stepByStepImplementation": ["Open the CMS"],
                "prompts": [],
                "verificationChecklist": [ { "item": "Tags return noindex" } ],
                "successVerification": [ { "method": "Crawl", "metric": "Indexed pages" } ],
                "nextSteps": []
            }]
        })
        .to_string();

        let batch = parse_envelope::<BatchGuides>(&text).unwrap();
        assert_eq!(batch.guides[0].id, "technical-noindex-tag-archives");
        assert_eq!(batch.guides[0].guide.estimated_time, "2 hours");
        assert!(!batch.guides[0].guide.verification_checklist[0].checked);
    }

    #[test]
    fn test_guide_missing_field_is_rejected() {
        let text = json!({
            "priority": "low",
            "impact": 2,
            "estimatedTime": "1 hour",
            "dependencies": [],
            "toolsRequired": [],
            "stepByStepImplementation": [],
            "prompts": [],
            "verificationChecklist": [],
            "successVerification": []
        })
        .to_string();
        assert!(matches!(
            parse_envelope::<ImplementationGuide>(&text),
            Err(GatewayError::WrongShape { .. })
        ));
    }

    #[test]
    fn test_executive_summary_roundtrips_key_names() {
        let summary = ExecutiveSummary {
            summary_title: "The 80/20 plan".to_string(),
            summary_introduction: "Start here".to_string(),
            rewrites: vec![],
            optimizations: vec![],
            new_content: vec![],
            redirects: vec![SummaryRedirect {
                from: "/old".to_string(),
                to: "/new".to_string(),
                reason: "Consolidate".to_string(),
            }],
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("summaryTitle").is_some());
        assert!(value.get("newContent").is_some());
    }
}
