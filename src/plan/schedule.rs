//! Daily schedule for the action items

use super::batch::ActionItem;
use super::tasks::TaskType;
use crate::analysis::Priority;
use serde::Serialize;

/// One day of the action plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyActionPlan {
    /// 1-based day number
    pub day: u32,
    pub focus: String,
    pub actions: Vec<ActionItem>,
}

struct Phase {
    focus: &'static str,
    types: &'static [TaskType],
    priorities: &'static [Priority],
}

const PHASES: &[Phase] = &[
    Phase {
        focus: "Critical Technical Fixes & High-Impact Content",
        types: &[TaskType::Technical, TaskType::ContentUpdate],
        priorities: &[Priority::High],
    },
    Phase {
        focus: "High-Priority Content & New Opportunities",
        types: &[TaskType::ContentUpdate, TaskType::NewContent],
        priorities: &[Priority::High],
    },
    Phase {
        focus: "Medium-Priority Content Updates",
        types: &[TaskType::ContentUpdate],
        priorities: &[Priority::Medium],
    },
    Phase {
        focus: "New Content Creation",
        types: &[TaskType::NewContent],
        priorities: &[Priority::Medium, Priority::Low],
    },
    Phase {
        focus: "Low-Priority Optimizations",
        types: &[TaskType::Technical, TaskType::ContentUpdate],
        priorities: &[Priority::Low],
    },
];

/// Focus of the day holding items no phase claimed
const FINAL_PHASE: &str = "Final Optimizations";

impl Phase {
    fn claims(&self, item: &ActionItem) -> bool {
        self.types.contains(&item.task_type) && self.priorities.contains(&item.priority())
    }
}

/// Sorts items by priority and groups them into days
///
/// Each phase takes the items it matches that no earlier phase took; phases
/// with nothing to do are skipped, and whatever is left goes to a final day.
/// Every item lands in exactly one day, and items keep their relative order
/// within a priority.
pub fn prioritize_and_group(mut items: Vec<ActionItem>) -> Vec<DailyActionPlan> {
    items.sort_by_key(ActionItem::priority);

    let mut plans = Vec::new();
    let mut remaining = items;

    for phase in PHASES {
        let (claimed, rest): (Vec<_>, Vec<_>) =
            remaining.into_iter().partition(|item| phase.claims(item));
        remaining = rest;

        if !claimed.is_empty() {
            plans.push(DailyActionPlan {
                day: plans.len() as u32 + 1,
                focus: phase.focus.to_string(),
                actions: claimed,
            });
        }
    }

    if !remaining.is_empty() {
        plans.push(DailyActionPlan {
            day: plans.len() as u32 + 1,
            focus: FINAL_PHASE.to_string(),
            actions: remaining,
        });
    }

    plans
}
