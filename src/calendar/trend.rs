use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{GoalCategory, GoalConfig};

use super::{progress::category_progress, week_store::WeekMap};

/// One charted week: clamped per-category completion percentages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendPoint {
    pub week: u32,
    pub week_label: String,
    pub percentages: BTreeMap<GoalCategory, u32>,
}

/// Bounded ordered series across the persisted weeks of one year, plus the
/// "is there anything to draw" flags that gate placeholder states in
/// dependent views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendSeries {
    pub points: Vec<TrendPoint>,
    pub has_category_data: BTreeMap<GoalCategory, bool>,
    pub has_data: bool,
}

/// Builds the charting series from a full store mapping: keeps `year`'s
/// non-empty weeks, drops keys with an unparseable week suffix, sorts
/// ascending and retains the most recent `max_weeks`.
pub fn trend_series(
    map: &WeekMap,
    config: &GoalConfig,
    year: i32,
    max_weeks: usize,
) -> TrendSeries {
    let prefix = format!("{year}-W");

    let mut weeks: Vec<u32> = map
        .iter()
        .filter(|(key, tasks)| key.starts_with(&prefix) && !tasks.is_empty())
        .filter_map(|(key, _)| match key[prefix.len()..].parse() {
            Ok(week) => Some(week),
            Err(_) => {
                debug!("Skipping stored key {key:?} with unparseable week number");
                None
            }
        })
        .collect();
    weeks.sort_unstable();
    if weeks.len() > max_weeks {
        weeks.drain(..weeks.len() - max_weeks);
    }

    let empty = Vec::new();
    let points: Vec<TrendPoint> = weeks
        .into_iter()
        .map(|week| {
            let tasks = map.get(&format!("{prefix}{week}")).unwrap_or(&empty);
            let percentages = category_progress(tasks, config)
                .into_iter()
                .map(|(category, completion)| (category, completion.clamped_percentage()))
                .collect();
            TrendPoint {
                week,
                week_label: format!("W{week}"),
                percentages,
            }
        })
        .collect();

    let has_category_data: BTreeMap<GoalCategory, bool> = GoalCategory::ALL
        .into_iter()
        .map(|category| {
            let any = points
                .iter()
                .any(|p| p.percentages.get(&category).is_some_and(|&v| v > 0));
            (category, any)
        })
        .collect();
    let has_data = has_category_data.values().any(|&v| v);

    TrendSeries {
        points,
        has_category_data,
        has_data,
    }
}

/// Symmetric left/right chart margins (percent of chart width) for a series
/// of the given length. Sparse series get wide margins so the few points
/// sit visually centered. The thresholds are a published contract for
/// chart-rendering collaborators.
pub fn chart_padding(data_length: usize) -> (u32, u32) {
    match data_length {
        0 => (0, 0),
        1 => (50, 50),
        2 => (35, 35),
        3..=4 => (20, 20),
        _ => (10, 10),
    }
}
