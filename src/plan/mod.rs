//! Action planning
//!
//! This module turns the analyses into a day-by-day plan:
//! - Collating findings into uniquely identified tasks
//! - Generating an implementation guide per task, in batches
//! - Grouping the resulting items into daily phases

mod batch;
mod schedule;
mod tasks;

pub use batch::{fallback_action_item, generate_guides, ActionItem};
pub use schedule::{prioritize_and_group, DailyActionPlan};
pub use tasks::{collate_tasks, slugify, AnalysisTask, TaskType};

use crate::analysis::{SeoAnalysisResult, SitewideAnalysis};
use crate::config::BatchConfig;
use crate::events::{log, EventSender, LogStatus};
use crate::gateway::{CompletionClient, RetryPolicy};

/// Builds the daily action plan for both analyses
///
/// Guide generation never fails the plan; tasks without a guide carry a
/// fallback item.
pub async fn create_action_plan(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    config: &BatchConfig,
    sitewide: &SitewideAnalysis,
    analysis: &SeoAnalysisResult,
    events: Option<&EventSender>,
) -> Vec<DailyActionPlan> {
    log(
        events,
        "Collating tasks and initializing parallel execution engine...",
        LogStatus::Running,
    );
    let tasks = collate_tasks(sitewide, analysis);

    let mut guides = generate_guides(client, policy, config, &tasks, events).await;
    let items: Vec<ActionItem> = tasks
        .iter()
        .filter_map(|task| guides.remove(&task.id))
        .collect();

    log(
        events,
        "Prioritizing and grouping tasks into a daily plan...",
        LogStatus::Running,
    );
    let plans = prioritize_and_group(items);
    log(events, "Action plan successfully structured.", LogStatus::Running);
    plans
}
