use std::collections::BTreeMap;

use crate::config::{GoalCategory, GoalConfig};

use super::entities::CalendarTaskInstance;

/// Completed/target counts for one task or one category over a single week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Completion {
    pub completed: u32,
    pub target: u32,
}

impl Completion {
    /// Rounded completion percentage. A zero target is 0, never an error.
    /// Over-completion is visible here (the value may exceed 100); trend
    /// charts use [Completion::clamped_percentage] instead.
    pub fn percentage(&self) -> u32 {
        if self.target == 0 {
            0
        } else {
            (self.completed as f64 / self.target as f64 * 100.).round() as u32
        }
    }

    pub fn clamped_percentage(&self) -> u32 {
        self.percentage().min(100)
    }
}

/// Per-definition completion for one week: how many instances reference each
/// configured task, against its weekly target.
pub fn task_progress<'a>(
    tasks: &[CalendarTaskInstance],
    config: &'a GoalConfig,
) -> BTreeMap<&'a str, Completion> {
    config
        .tasks
        .iter()
        .map(|definition| {
            let completed = tasks.iter().filter(|t| t.task_id == definition.id).count() as u32;
            (
                definition.id.as_str(),
                Completion {
                    completed,
                    target: definition.weekly_target,
                },
            )
        })
        .collect()
}

/// Per-category completion, summed over the category's task definitions.
/// Every category is present in the result even when it has no definitions.
pub fn category_progress(
    tasks: &[CalendarTaskInstance],
    config: &GoalConfig,
) -> BTreeMap<GoalCategory, Completion> {
    let per_task = task_progress(tasks, config);

    let mut progress: BTreeMap<GoalCategory, Completion> = GoalCategory::ALL
        .into_iter()
        .map(|c| (c, Completion::default()))
        .collect();

    for definition in &config.tasks {
        let entry = progress
            .entry(definition.category)
            .or_default();
        let task = per_task[definition.id.as_str()];
        entry.completed += task.completed;
        entry.target += task.target;
    }

    progress
}
