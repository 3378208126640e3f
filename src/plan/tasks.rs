//! Task collation
//!
//! Turns the two analyses into a flat list of tasks with unique, stable ids.

use crate::analysis::{GuideTask, Priority, SeoAnalysisResult, SitewideAnalysis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Kind of work a task describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Technical,
    ContentUpdate,
    NewContent,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::ContentUpdate => "content_update",
            Self::NewContent => "new_content",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work derived from the analyses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisTask {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: Priority,
    /// Background handed to the guide writer
    pub context: String,
}

impl AnalysisTask {
    /// The view of this task sent to the batch guide call
    pub fn guide_task(&self) -> GuideTask<'_> {
        GuideTask {
            id: &self.id,
            title: &self.title,
            task_type: self.task_type.as_str(),
            context: &self.context,
        }
    }
}

/// Lowercases `text` and joins its alphanumeric runs with `-`
///
/// # Example
///
/// ```
/// use seo_orchestrator::plan::slugify;
///
/// assert_eq!(slugify("https://X.com/Blog/Post?a=1"), "https-x-com-blog-post-a-1");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Hands out slug ids, suffixing repeats with `-2`, `-3`, ...
#[derive(Debug, Default)]
struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    fn allocate(&mut self, seed: &str) -> String {
        let mut base = slugify(seed);
        if base.is_empty() {
            base.push_str("task");
        }

        let mut id = base.clone();
        let mut suffix = 2;
        while self.used.contains(&id) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }
        self.used.insert(id.clone());
        id
    }
}

/// Collects every actionable finding into tasks
///
/// Technical-health items come first, then page actions, then keyword ideas,
/// each in the order the analysis listed them.
pub fn collate_tasks(sitewide: &SitewideAnalysis, analysis: &SeoAnalysisResult) -> Vec<AnalysisTask> {
    let mut ids = IdAllocator::default();
    let mut tasks = Vec::new();

    let health = &sitewide.technical_health;
    for action in &health.action_items {
        tasks.push(AnalysisTask {
            id: ids.allocate(&format!("technical-{}", action.item)),
            title: action.item.clone(),
            task_type: TaskType::Technical,
            priority: action.priority,
            context: format!(
                "This is a site-wide technical SEO fix. The issue identified was: \"{}\". \
                 The specific item to address is: \"{}\".",
                health.summary, action.item
            ),
        });
    }

    for page in &analysis.page_actions {
        let details = page.rewrite_details.as_ref();
        let title = details
            .map(|d| d.suggested_headline.trim())
            .filter(|headline| !headline.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Optimize: {}", page.url));

        let optimizations: Vec<&str> = page
            .optimization_tasks
            .iter()
            .map(|task| task.task.as_str())
            .collect();
        let optimizations = if optimizations.is_empty() {
            "N/A".to_string()
        } else {
            optimizations.join(", ")
        };

        tasks.push(AnalysisTask {
            id: ids.allocate(&page.url),
            title,
            task_type: TaskType::ContentUpdate,
            priority: page.priority,
            context: format!(
                "This is a content update for the existing page: {}.\nReason: {}.\nEvidence: {}.\nOptimization Tasks: {}",
                page.url,
                details.map_or("N/A", |d| d.reason.as_str()),
                details.map_or("N/A", |d| d.evidence.as_str()),
                optimizations
            ),
        });
    }

    for keyword in &analysis.keywords {
        tasks.push(AnalysisTask {
            id: ids.allocate(&format!("new-content-{}", keyword.phrase)),
            title: keyword.title.clone(),
            task_type: TaskType::NewContent,
            priority: Priority::Medium,
            context: format!(
                "This is a new piece of content based on a keyword opportunity.\nKeyword: \"{}\".\n\
                 Intent: {}.\nContent Angle: {}.\nStrategic Rationale: {}.",
                keyword.phrase, keyword.intent, keyword.content_angle, keyword.rationale
            ),
        });
    }

    tracing::debug!("Collated {} tasks", tasks.len());
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analyses() -> (SitewideAnalysis, SeoAnalysisResult) {
        let sitewide = serde_json::from_value(json!({
            "strategicRoadmap": { "missionStatement": "m", "projectedImpactScore": 50, "actionPlan": [] },
            "technicalHealth": {
                "status": "poor",
                "summary": "Duplicate titles everywhere",
                "actionItems": [
                    { "item": "Fix duplicate titles", "priority": "high" },
                    { "item": "Fix duplicate titles!", "priority": "low" }
                ]
            },
            "contentGaps": [],
            "topicClusters": [],
            "siteArchitectureGraph": { "nodes": [], "edges": [] },
            "localBusinessAudit": {},
            "zeroToOneInitiatives": []
        }))
        .unwrap();

        let analysis = serde_json::from_value(json!({
            "pageActions": [
                {
                    "url": "https://x.com/pricing",
                    "priority": "high",
                    "rewriteDetails": { "reason": "Thin", "evidence": "200 words", "suggestedHeadline": "Pricing, explained" },
                    "optimizationTasks": [ { "task": "Add FAQ" }, { "task": "Add schema" } ]
                },
                { "url": "https://x.com/about", "priority": "low" }
            ],
            "keywords": [
                { "phrase": "crm for dentists", "title": "The Dentist's CRM Guide", "intent": "commercial" }
            ]
        }))
        .unwrap();

        (sitewide, analysis)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Fix Duplicate  Titles!"), "fix-duplicate-titles");
        assert_eq!(slugify("--a--b--"), "a-b");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_collate_order_and_types() {
        let (sitewide, analysis) = analyses();
        let tasks = collate_tasks(&sitewide, &analysis);

        let types: Vec<TaskType> = tasks.iter().map(|t| t.task_type).collect();
        assert_eq!(
            types,
            vec![
                TaskType::Technical,
                TaskType::Technical,
                TaskType::ContentUpdate,
                TaskType::ContentUpdate,
                TaskType::NewContent,
            ]
        );
        assert_eq!(tasks[4].priority, Priority::Medium);
        assert_eq!(tasks[4].id, "new-content-crm-for-dentists");
    }

    #[test]
    fn test_repeated_slugs_get_suffixes() {
        let (sitewide, analysis) = analyses();
        let tasks = collate_tasks(&sitewide, &analysis);
        assert_eq!(tasks[0].id, "technical-fix-duplicate-titles");
        assert_eq!(tasks[1].id, "technical-fix-duplicate-titles-2");

        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), tasks.len());
    }

    #[test]
    fn test_page_titles_and_context() {
        let (sitewide, analysis) = analyses();
        let tasks = collate_tasks(&sitewide, &analysis);

        assert_eq!(tasks[2].title, "Pricing, explained");
        assert!(tasks[2].context.contains("Optimization Tasks: Add FAQ, Add schema"));
        assert_eq!(tasks[3].title, "Optimize: https://x.com/about");
        assert!(tasks[3].context.contains("Reason: N/A."));
        assert!(tasks[0].context.contains("\"Duplicate titles everywhere\""));
    }

    #[test]
    fn test_empty_slug_falls_back() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.allocate("!!!"), "task");
        assert_eq!(ids.allocate("???"), "task-2");
    }

    #[test]
    fn test_guide_task_view() {
        let (sitewide, analysis) = analyses();
        let tasks = collate_tasks(&sitewide, &analysis);
        let view = tasks[2].guide_task();
        assert_eq!(view.task_type, "content_update");
        assert_eq!(view.id, tasks[2].id);
    }
}
