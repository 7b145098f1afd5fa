use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::config::{GoalCategory, TaskDefinition};

/// A concrete placement of a task on the weekly grid. The `category` is a
/// denormalized copy of the definition's category taken at creation time, so
/// aggregation over stored weeks survives later configuration edits.
///
/// Field names follow the persisted JSON schema, see [crate::calendar::week_store].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTaskInstance {
    pub id: String,
    pub task_id: String,
    pub category: GoalCategory,
    pub name: String,
    /// 0-6, Monday is 0.
    pub day_index: u8,
    pub start_hour: f64,
    pub duration: f64,
}

impl CalendarTaskInstance {
    /// Whether this instance occupies the cell `(day_index, hour)`. The end
    /// hour is exclusive, so a 2h task starting at 9 covers hours 9 and 10.
    pub fn occupies(&self, day_index: u8, hour: f64) -> bool {
        self.day_index == day_index
            && self.start_hour <= hour
            && hour < self.start_hour + self.duration
    }

    pub fn end_hour(&self) -> f64 {
        self.start_hour + self.duration
    }
}

/// An instance that has not been assigned an id yet. Ids are handed out by
/// the grid model on insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPlacement {
    pub task_id: String,
    pub category: GoalCategory,
    pub name: String,
    pub day_index: u8,
    pub start_hour: f64,
    pub duration: f64,
}

impl TaskPlacement {
    /// The usual creation path: dropping a task template onto a cell.
    pub fn from_definition(definition: &TaskDefinition, day_index: u8, start_hour: f64) -> Self {
        Self {
            task_id: definition.id.clone(),
            category: definition.category,
            name: definition.name.clone(),
            day_index,
            start_hour,
            duration: definition.default_duration,
        }
    }

    pub fn with_duration(self, duration: f64) -> Self {
        Self { duration, ..self }
    }
}

/// A partial update for reschedule/resize. Absent fields are left untouched.
/// `task_id` and `category` are fixed at creation and cannot be patched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskPatch {
    pub day_index: Option<u8>,
    pub start_hour: Option<f64>,
    pub duration: Option<f64>,
}

/// Identifier a week's task list is persisted under, rendered as
/// `"<year>-W<week>"` with no zero padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }
}

impl Display for WeekKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, week) = s
            .split_once("-W")
            .ok_or_else(|| anyhow!("Week key {s:?} is missing the -W separator"))?;
        Ok(WeekKey {
            year: year.parse()?,
            week: week.parse()?,
        })
    }
}
