//! Terminal rendering of the grid, progress and trend views. All actual
//! calendar semantics live in [crate::calendar]; this module only formats.

use ansi_term::Colour;
use chrono::Datelike;

use crate::{
    calendar::{
        entities::CalendarTaskInstance,
        grid::{week_label, GridModel, GRID_END_HOUR, GRID_START_HOUR},
        progress::{category_progress, task_progress},
        trend::{chart_padding, TrendSeries},
        week_store::WeekStore,
    },
    config::{GoalCategory, GoalConfig},
};

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const CELL_WIDTH: usize = 9;
const CHART_WIDTH: usize = 40;
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn category_colour(config: &GoalConfig, category: GoalCategory) -> Colour {
    config
        .goal(category)
        .and_then(|goal| parse_hex(&goal.color))
        .map(|(r, g, b)| Colour::RGB(r, g, b))
        .unwrap_or(Colour::White)
}

fn paint(config: &GoalConfig, category: GoalCategory, text: &str) -> String {
    category_colour(config, category).paint(text).to_string()
}

pub fn print_week<S: WeekStore>(grid: &GridModel<S>, config: &GoalConfig) {
    let key = grid.key();
    println!("{}", week_label(key.year, key.week));

    print!("{:>5} ", "");
    for (day, date) in grid.dates().iter().enumerate() {
        print!(
            "{:<width$}",
            format!("{} {}", DAY_NAMES[day], date.day()),
            width = CELL_WIDTH
        );
    }
    println!();

    let mut hour = GRID_START_HOUR;
    while hour < GRID_END_HOUR {
        print!("{:>2}:00 ", hour as u32);
        for day in 0..7u8 {
            let cell = row_tasks(grid.tasks(), day, hour);
            let text = match cell.as_slice() {
                [] => " ".repeat(CELL_WIDTH),
                [task] => cell_text(task),
                [task, rest @ ..] => stacked_cell_text(task, rest.len()),
            };
            match cell.first() {
                Some(task) => print!("{}", paint(config, task.category, &text)),
                None => print!("{text}"),
            }
        }
        println!();
        hour += 1.;
    }
}

/// Everything visible in the one-hour row starting at `hour`. Wider than the
/// model's point query so fractional starts (9.5) still land in their row.
fn row_tasks(tasks: &[CalendarTaskInstance], day_index: u8, hour: f64) -> Vec<&CalendarTaskInstance> {
    tasks
        .iter()
        .filter(|t| t.day_index == day_index && t.start_hour < hour + 1. && hour < t.end_hour())
        .collect()
}

// Truncation is by characters, names out of goals.json may be non-ASCII.
fn cell_text(task: &CalendarTaskInstance) -> String {
    let name: String = task.name.chars().take(CELL_WIDTH - 1).collect();
    format!("{:<width$}", name, width = CELL_WIDTH)
}

fn stacked_cell_text(task: &CalendarTaskInstance, extra: usize) -> String {
    let text: String = cell_text(task).chars().take(CELL_WIDTH - 3).collect();
    format!("{text}+{extra} ")
}

/// The full per-task and per-goal breakdown for one week. Percentages are
/// intentionally unclamped so over-completion stays visible.
pub fn print_progress(tasks: &[CalendarTaskInstance], config: &GoalConfig) {
    let per_task = task_progress(tasks, config);
    for definition in &config.tasks {
        let completion = per_task[definition.id.as_str()];
        println!(
            "{:<20} {}/{} ({}%)",
            paint(config, definition.category, &definition.name),
            completion.completed,
            completion.target,
            completion.percentage()
        );
    }
    println!();
    print_goal_summary(tasks, config);
}

/// One line per goal, the terminal version of the goals header.
pub fn print_goal_summary(tasks: &[CalendarTaskInstance], config: &GoalConfig) {
    for (category, completion) in category_progress(tasks, config) {
        println!(
            "{:<15} {}/{} ({}%)",
            paint(config, category, &category.to_string()),
            completion.completed,
            completion.target,
            completion.percentage()
        );
    }
}

pub fn print_trend(series: &TrendSeries, config: &GoalConfig) {
    if !series.has_data {
        println!("No data yet. Place tasks on the calendar first.");
        return;
    }

    for category in GoalCategory::ALL {
        if !series.has_category_data[&category] {
            continue;
        }
        let values: Vec<u32> = series
            .points
            .iter()
            .map(|p| p.percentages[&category])
            .collect();
        println!(
            "{:<15} {}",
            paint(config, category, &category.to_string()),
            paint(config, category, &spark_row(&values))
        );
    }
    println!();

    print!("{:>6}", "");
    for category in GoalCategory::ALL {
        print!("{:>15}", paint(config, category, &category.to_string()));
    }
    println!();
    for point in &series.points {
        print!("{:>6}", point.week_label);
        for category in GoalCategory::ALL {
            print!("{:>6}%", point.percentages[&category]);
        }
        println!();
    }
}

/// Lays the points out across a fixed-width strip, with the published
/// sparse-series margins applied so short series sit centered.
fn spark_row(values: &[u32]) -> String {
    let (left, right) = chart_padding(values.len());
    let left_pad = CHART_WIDTH * left as usize / 100;
    let right_pad = CHART_WIDTH * right as usize / 100;
    let usable = CHART_WIDTH - left_pad - right_pad;

    let mut row = vec![' '; CHART_WIDTH];
    for (i, &value) in values.iter().enumerate() {
        let slot = if values.len() < 2 {
            0
        } else {
            i * (usable - 1) / (values.len() - 1)
        };
        row[left_pad + slot] = BLOCKS[(value.min(100) as usize * 8 / 101).min(7)];
    }
    row.into_iter().collect()
}

pub fn print_goals(config: &GoalConfig) {
    for category in GoalCategory::ALL {
        let Some(goal) = config.goal(category) else {
            continue;
        };
        println!(
            "{} {} ({})",
            paint(config, category, &goal.name_en),
            goal.name,
            category
        );
        if let Some(subtitle) = &goal.subtitle {
            println!("  {subtitle}");
        }
        println!("  {}", goal.objective);
        if let Some(detail) = &goal.objective_detail {
            println!("  {detail}");
        }
        if let Some(slots) = &goal.time_slots {
            println!("  {slots}");
        }
        for task in config.tasks_in(category) {
            println!(
                "    {:<20} {:<18} {}h, {}x/week",
                task.id, task.name, task.default_duration, task.weekly_target
            );
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_instance(name: &str, start_hour: f64, duration: f64) -> CalendarTaskInstance {
        CalendarTaskInstance {
            id: "i1".into(),
            task_id: "deep-work".into(),
            category: GoalCategory::Work,
            name: name.into(),
            day_index: 1,
            start_hour,
            duration,
        }
    }

    #[test]
    fn cell_text_truncates_wide_names_by_character() {
        let task = named_instance("深度产出深度产出深度", 9., 2.);

        let text = cell_text(&task);
        assert_eq!(text.chars().count(), CELL_WIDTH);
        assert!(text.starts_with("深度产出"));

        let stacked = stacked_cell_text(&task, 2);
        assert_eq!(stacked.chars().count(), CELL_WIDTH);
        assert!(stacked.ends_with("+2 "));
    }

    #[test]
    fn short_names_are_padded_to_the_cell() {
        let text = cell_text(&named_instance("Ship", 9., 2.));
        assert_eq!(text.chars().count(), CELL_WIDTH);
        assert!(text.starts_with("Ship "));
    }

    #[test]
    fn fractional_starts_render_in_their_containing_row() {
        let tasks = vec![named_instance("Zone 2 cardio", 9.5, 0.5)];

        assert_eq!(row_tasks(&tasks, 1, 9.).len(), 1);
        assert!(row_tasks(&tasks, 1, 10.).is_empty());
        assert!(row_tasks(&tasks, 1, 8.).is_empty());
        assert!(row_tasks(&tasks, 2, 9.).is_empty());
    }

    #[test]
    fn whole_hour_rows_match_the_cell_query() {
        let tasks = vec![named_instance("Deep work", 9., 2.)];

        assert_eq!(row_tasks(&tasks, 1, 9.).len(), 1);
        assert_eq!(row_tasks(&tasks, 1, 10.).len(), 1);
        assert!(row_tasks(&tasks, 1, 11.).is_empty());
    }

    #[test]
    fn hex_colors_parse_to_rgb() {
        assert_eq!(parse_hex("#4A90A4"), Some((0x4A, 0x90, 0xA4)));
        assert_eq!(parse_hex("#FFF"), None);
        assert_eq!(parse_hex("4A90A4"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn spark_row_centers_sparse_series() {
        let one = spark_row(&[100]);
        assert_eq!(one.chars().count(), CHART_WIDTH);
        // One point, 50% margins: the single glyph sits at the midpoint.
        assert_eq!(one.chars().position(|c| c != ' '), Some(CHART_WIDTH / 2));

        let many = spark_row(&[0, 25, 50, 75, 100, 100]);
        assert_eq!(many.chars().filter(|c| !c.is_whitespace()).count(), 6);
        assert_eq!(many.chars().position(|c| c != ' '), Some(CHART_WIDTH / 10));
    }
}
