//! Batched implementation-guide generation
//!
//! Tasks are split into fixed-size batches and the batches run in groups of
//! bounded width: a whole group is awaited before the next one starts. A
//! batch that fails, or a guide the model leaves out, degrades to a fallback
//! item, so every task id comes back exactly once.

use super::tasks::{AnalysisTask, TaskType};
use crate::analysis::{
    generate_batch_guides, ChecklistItem, GuideTask, ImplementationGuide, Priority,
};
use crate::config::BatchConfig;
use crate::events::{log, EventSender, LogStatus};
use crate::gateway::{CompletionClient, RetryPolicy};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A task with the guide for carrying it out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(flatten)]
    pub guide: ImplementationGuide,
    pub completed: bool,
}

impl ActionItem {
    pub fn new(task: &AnalysisTask, guide: ImplementationGuide) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            task_type: task.task_type,
            guide,
            completed: false,
        }
    }

    pub fn priority(&self) -> Priority {
        self.guide.priority
    }
}

/// The item used when no guide could be generated for `task`
pub fn fallback_action_item(task: &AnalysisTask) -> ActionItem {
    ActionItem::new(
        task,
        ImplementationGuide {
            priority: task.priority,
            impact: 1.0,
            estimated_time: "N/A".to_string(),
            dependencies: Vec::new(),
            tools_required: Vec::new(),
            step_by_step_implementation: vec![
                "AI failed to generate steps for this task. Please review the context manually."
                    .to_string(),
            ],
            prompts: Vec::new(),
            verification_checklist: vec![ChecklistItem {
                item: "Verify task was completed manually".to_string(),
                checked: false,
            }],
            success_verification: Vec::new(),
            next_steps: Vec::new(),
        },
    )
}

/// Runs one batch, falling back per task rather than failing
async fn run_batch(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    batch: &[AnalysisTask],
) -> Vec<ActionItem> {
    let view: Vec<GuideTask<'_>> = batch.iter().map(AnalysisTask::guide_task).collect();

    match generate_batch_guides(client, policy, &view).await {
        Ok(mut guides) => batch
            .iter()
            .map(|task| match guides.remove(&task.id) {
                Some(guide) => ActionItem::new(task, guide),
                None => {
                    tracing::warn!("No guide returned for task {}", task.id);
                    fallback_action_item(task)
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Batch of {} tasks failed, using fallback guides: {}", batch.len(), e);
            batch.iter().map(fallback_action_item).collect()
        }
    }
}

/// Generates an action item for every task
///
/// The result holds one entry per distinct task id, whatever the outcome of
/// the model calls.
///
/// # Arguments
///
/// * `client` - The model client
/// * `policy` - Retry policy applied to each batch call
/// * `config` - Batch size and group width
/// * `tasks` - The tasks to cover
/// * `events` - Optional progress channel
pub async fn generate_guides(
    client: &dyn CompletionClient,
    policy: &RetryPolicy,
    config: &BatchConfig,
    tasks: &[AnalysisTask],
    events: Option<&EventSender>,
) -> HashMap<String, ActionItem> {
    let batches: Vec<&[AnalysisTask]> = tasks.chunks(config.batch_size.max(1)).collect();
    log(
        events,
        format!("Scheduled {} batches for parallel processing...", batches.len()),
        LogStatus::Running,
    );

    let mut items = HashMap::with_capacity(tasks.len());
    for (group, batch_group) in batches.chunks(config.concurrent_batches.max(1)).enumerate() {
        log(
            events,
            format!("Executing parallel batch group {}...", group + 1),
            LogStatus::Running,
        );

        let results = join_all(
            batch_group
                .iter()
                .map(|batch| run_batch(client, policy, batch)),
        )
        .await;

        for item in results.into_iter().flatten() {
            items.entry(item.id.clone()).or_insert(item);
        }
    }

    log(
        events,
        "All implementation guides generated successfully.",
        LogStatus::Running,
    );
    items
}
