pub mod render;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    calendar::{
        entities::{TaskPatch, TaskPlacement, WeekKey},
        grid::{current_week_now, GridModel},
        trend::trend_series,
        week_store::{JsonWeekStore, WeekStore, STORAGE_KEY},
    },
    config::GoalConfig,
    notify::ChangeBus,
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Yearcompass", version, long_about = None)]
#[command(about = "Weekly calendar for tracking recurring tasks against annual goals")]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Display the week's day/hour grid")]
    Show {
        #[command(flatten)]
        week: WeekSelection,
    },
    #[command(about = "Place a task on the grid")]
    Add {
        #[arg(help = "Task definition id, see `yearcompass goals`")]
        task: String,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=6), help = "Day of the week, Monday is 0")]
        day: u8,
        #[arg(long, help = "Start hour, may be fractional (9.5 is 9:30)")]
        hour: f64,
        #[arg(long, help = "Duration in hours. Defaults to the task's configured duration")]
        duration: Option<f64>,
        #[command(flatten)]
        week: WeekSelection,
    },
    #[command(about = "Reschedule a placed task")]
    Move {
        #[arg(help = "Instance id as shown by `show`")]
        id: String,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=6), help = "New day of the week, Monday is 0")]
        day: Option<u8>,
        #[arg(long, help = "New start hour")]
        hour: Option<f64>,
        #[command(flatten)]
        week: WeekSelection,
    },
    #[command(about = "Change the duration of a placed task")]
    Resize {
        #[arg(help = "Instance id as shown by `show`")]
        id: String,
        #[arg(long, help = "New duration in hours")]
        duration: f64,
        #[command(flatten)]
        week: WeekSelection,
    },
    #[command(about = "Remove a placed task from the grid")]
    Remove {
        #[arg(help = "Instance id as shown by `show`")]
        id: String,
        #[command(flatten)]
        week: WeekSelection,
    },
    #[command(about = "Show per-task and per-goal completion for the week")]
    Progress {
        #[command(flatten)]
        week: WeekSelection,
    },
    #[command(about = "Chart per-goal completion across recent weeks")]
    Trend {
        #[arg(long, default_value_t = 12, help = "Most recent weeks to include")]
        weeks: usize,
        #[arg(long, help = "Year to chart. Defaults to the current year")]
        year: Option<i32>,
    },
    #[command(about = "List the configured goals and task definitions")]
    Goals,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct WeekSelection {
    #[arg(long, help = "Week number 1-52. Defaults to the current week")]
    week: Option<u32>,
    #[arg(long, help = "Year. Defaults to the current year")]
    year: Option<i32>,
}

impl WeekSelection {
    fn resolve(self) -> Result<WeekKey> {
        let now = current_week_now();
        if let Some(week) = self.week {
            if !(1..=now.total_weeks).contains(&week) {
                bail!("Week {week} is outside 1..={}", now.total_weeks);
            }
        }
        Ok(WeekKey::new(
            self.year.unwrap_or(now.year),
            self.week.unwrap_or(now.week),
        ))
    }
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    let application_dir = match &args.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &application_dir, logging_level, args.log)?;

    let config = GoalConfig::load_or_builtin(&application_dir);
    let bus = Arc::new(ChangeBus::new());

    match args.commands {
        Commands::Show { week } => {
            let grid = open_grid(&application_dir, &bus, week)?;
            render::print_week(&grid, &config);
            Ok(())
        }
        Commands::Add {
            task,
            day,
            hour,
            duration,
            week,
        } => {
            let definition = config
                .task(&task)
                .ok_or_else(|| {
                    anyhow!("Unknown task {task:?}. See `yearcompass goals` for the list")
                })?
                .clone();
            let mut grid = open_grid(&application_dir, &bus, week)?;
            subscribe_goal_summary(&bus, &application_dir, &config, grid.key());

            let mut placement = TaskPlacement::from_definition(&definition, day, hour);
            if let Some(duration) = duration {
                placement = placement.with_duration(duration);
            }
            let id = grid.add(placement)?;
            println!("Placed {} as {id}", definition.name);
            Ok(())
        }
        Commands::Move { id, day, hour, week } => {
            let mut grid = open_grid(&application_dir, &bus, week)?;
            subscribe_goal_summary(&bus, &application_dir, &config, grid.key());
            grid.update(
                &id,
                TaskPatch {
                    day_index: day,
                    start_hour: hour,
                    duration: None,
                },
            )
        }
        Commands::Resize { id, duration, week } => {
            let mut grid = open_grid(&application_dir, &bus, week)?;
            subscribe_goal_summary(&bus, &application_dir, &config, grid.key());
            grid.update(
                &id,
                TaskPatch {
                    duration: Some(duration),
                    ..TaskPatch::default()
                },
            )
        }
        Commands::Remove { id, week } => {
            let mut grid = open_grid(&application_dir, &bus, week)?;
            subscribe_goal_summary(&bus, &application_dir, &config, grid.key());
            grid.remove(&id);
            Ok(())
        }
        Commands::Progress { week } => {
            let grid = open_grid(&application_dir, &bus, week)?;
            render::print_progress(grid.tasks(), &config);
            Ok(())
        }
        Commands::Trend { weeks, year } => {
            let store = JsonWeekStore::new(&application_dir)?;
            let year = year.unwrap_or_else(|| current_week_now().year);
            let series = trend_series(&store.load(), &config, year, weeks);
            render::print_trend(&series, &config);
            Ok(())
        }
        Commands::Goals => {
            render::print_goals(&config);
            Ok(())
        }
    }
}

fn open_grid(
    application_dir: &Path,
    bus: &Arc<ChangeBus>,
    selection: WeekSelection,
) -> Result<GridModel<JsonWeekStore>> {
    let store = JsonWeekStore::new(application_dir)?;
    Ok(GridModel::open(store, bus.clone(), selection.resolve()?))
}

/// The terminal counterpart of the sidebar: re-reads the store after every
/// mutation broadcast and prints the affected week's per-goal summary.
fn subscribe_goal_summary(
    bus: &ChangeBus,
    application_dir: &Path,
    config: &GoalConfig,
    key: WeekKey,
) {
    let dir = application_dir.to_owned();
    let config = config.clone();
    bus.subscribe(move |event| {
        if event.key != STORAGE_KEY {
            return;
        }
        let Ok(store) = JsonWeekStore::new(&dir) else {
            return;
        };
        let tasks = store.load().remove(&key.to_string()).unwrap_or_default();
        render::print_goal_summary(&tasks, &config);
    });
}
