use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use crate::notify::{ChangeBus, StoreChanged};

use super::{
    entities::{CalendarTaskInstance, TaskPatch, TaskPlacement, WeekKey},
    week_store::{WeekStore, STORAGE_KEY},
};

/// First visible hour row of the grid.
pub const GRID_START_HOUR: f64 = 6.;
/// Exclusive upper bound of the grid; a task must end by this hour.
pub const GRID_END_HOUR: f64 = 22.;

/// The year is modeled as exactly 52 Monday-anchored weeks. Years with an
/// ISO 53rd week are not represented, week 52's range may spill past
/// December 31.
pub const TOTAL_WEEKS: u32 = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentWeek {
    pub year: i32,
    pub week: u32,
    pub total_weeks: u32,
}

fn jan1(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).expect("Any supported year has a January 1")
}

/// The 7 dates of a week, Monday first. Weeks are anchored on the first
/// Monday on or after January 1, which is NOT the ISO-8601 numbering: week 1
/// never contains late-December days of the previous year.
pub fn week_dates(year: i32, week: u32) -> [NaiveDate; 7] {
    let jan1 = jan1(year);
    // Sunday=0 numbering, matching current_week below.
    let days_to_first_monday = (8 - jan1.weekday().num_days_from_sunday()) % 7;
    let week_start = jan1
        + Duration::days(days_to_first_monday as i64)
        + Duration::days((week as i64 - 1) * 7);

    std::array::from_fn(|i| week_start + Duration::days(i as i64))
}

/// Which week of its year a date falls in, per the fixed 52-week scheme.
pub fn current_week(today: NaiveDate) -> CurrentWeek {
    let jan1 = jan1(today.year());
    let days = (today - jan1).num_days();
    // Ceiling division; both operands are always positive here.
    let week = (days + jan1.weekday().num_days_from_sunday() as i64 + 1 + 6) / 7;

    CurrentWeek {
        year: today.year(),
        week: week as u32,
        total_weeks: TOTAL_WEEKS,
    }
}

pub fn current_week_now() -> CurrentWeek {
    current_week(Local::now().date_naive())
}

/// Human label for a week picker, e.g. `"Week 3: Jan 19 - Jan 25"`.
pub fn week_label(year: i32, week: u32) -> String {
    let dates = week_dates(year, week);
    format!(
        "Week {week}: {} - {}",
        dates[0].format("%b %-d"),
        dates[6].format("%b %-d")
    )
}

fn validate(day_index: u8, start_hour: f64, duration: f64) -> Result<()> {
    if day_index > 6 {
        bail!("Day index {day_index} is outside Monday(0)..Sunday(6)");
    }
    if !duration.is_finite() || duration <= 0. {
        bail!("Duration must be a positive number of hours, got {duration}");
    }
    if !(GRID_START_HOUR..GRID_END_HOUR).contains(&start_hour) {
        bail!(
            "Start hour {start_hour} is outside the visible grid \
             {GRID_START_HOUR}..{GRID_END_HOUR}"
        );
    }
    if start_hour + duration > GRID_END_HOUR {
        bail!(
            "Task ending at {} runs past the end of the grid ({GRID_END_HOUR})",
            start_hour + duration
        );
    }
    Ok(())
}

/// One week of the calendar: the authoritative in-memory task list plus its
/// read/write path through a [WeekStore]. Every successful mutation is
/// followed by a whole-mapping write and a change broadcast.
pub struct GridModel<S> {
    key: WeekKey,
    tasks: Vec<CalendarTaskInstance>,
    store: S,
    bus: Arc<ChangeBus>,
}

impl<S: WeekStore> GridModel<S> {
    /// Loads the given week. Weeks never written before come up empty.
    pub fn open(store: S, bus: Arc<ChangeBus>, key: WeekKey) -> Self {
        let tasks = store.load().remove(&key.to_string()).unwrap_or_default();
        Self {
            key,
            tasks,
            store,
            bus,
        }
    }

    pub fn key(&self) -> WeekKey {
        self.key
    }

    /// Tasks in insertion order. The order carries no meaning beyond stable
    /// display.
    pub fn tasks(&self) -> &[CalendarTaskInstance] {
        &self.tasks
    }

    pub fn dates(&self) -> [NaiveDate; 7] {
        week_dates(self.key.year, self.key.week)
    }

    /// Every instance occupying the cell `(day_index, hour)`. Several
    /// instances may stack on one cell, the model neither rejects nor
    /// merges overlaps.
    pub fn tasks_at(&self, day_index: u8, hour: f64) -> Vec<&CalendarTaskInstance> {
        self.tasks
            .iter()
            .filter(|t| t.occupies(day_index, hour))
            .collect()
    }

    /// Places a new instance, returning its freshly assigned id.
    pub fn add(&mut self, placement: TaskPlacement) -> Result<String> {
        validate(placement.day_index, placement.start_hour, placement.duration)?;

        let stacked = self.tasks.iter().any(|t| {
            t.day_index == placement.day_index
                && t.start_hour < placement.start_hour + placement.duration
                && placement.start_hour < t.end_hour()
        });
        if stacked {
            debug!(
                "Placement of {} on day {} overlaps an existing task",
                placement.task_id, placement.day_index
            );
        }

        let id = Uuid::new_v4().to_string();
        self.tasks.push(CalendarTaskInstance {
            id: id.clone(),
            task_id: placement.task_id,
            category: placement.category,
            name: placement.name,
            day_index: placement.day_index,
            start_hour: placement.start_hour,
            duration: placement.duration,
        });
        self.persist();
        Ok(id)
    }

    /// Merges the patch into the matching instance. An unknown id is a
    /// no-op, an invalid merged placement an error.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<()> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            debug!("Update of unknown task instance {id} ignored");
            return Ok(());
        };

        let task = &self.tasks[index];
        let day_index = patch.day_index.unwrap_or(task.day_index);
        let start_hour = patch.start_hour.unwrap_or(task.start_hour);
        let duration = patch.duration.unwrap_or(task.duration);
        validate(day_index, start_hour, duration)?;

        let task = &mut self.tasks[index];
        task.day_index = day_index;
        task.start_hour = start_hour;
        task.duration = duration;
        self.persist();
        Ok(())
    }

    /// Removes the matching instance. Removing an unknown id changes
    /// nothing and does not write.
    pub fn remove(&mut self, id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!("Removal of unknown task instance {id} ignored");
            return;
        }
        self.persist();
    }

    /// Whole-mapping read-modify-write: intentionally simple and not safe
    /// against a second concurrent writer (last write wins).
    fn persist(&self) {
        let mut map = self.store.load();
        map.insert(self.key.to_string(), self.tasks.clone());
        self.store.save(&map);
        self.bus.publish(&StoreChanged {
            key: STORAGE_KEY.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Weekday;
    use tempfile::tempdir;

    use crate::{
        calendar::week_store::{JsonWeekStore, MockWeekStore, WeekMap},
        config::{GoalCategory, GoalConfig},
    };

    use super::*;

    fn placement(day_index: u8, start_hour: f64, duration: f64) -> TaskPlacement {
        TaskPlacement {
            task_id: "ship".into(),
            category: GoalCategory::Build,
            name: "Ship a release".into(),
            day_index,
            start_hour,
            duration,
        }
    }

    #[test]
    fn week_one_starts_on_a_monday_every_year() {
        for year in 1990..=2100 {
            let dates = week_dates(year, 1);
            assert_eq!(dates[0].weekday(), Weekday::Mon, "year {year}");
            assert!(dates[0] >= jan1(year));
            assert!(dates[0] - jan1(year) < Duration::days(7));
        }
    }

    #[test]
    fn week_dates_are_seven_consecutive_days() {
        for week in [1, 2, 26, 52] {
            let dates = week_dates(2026, week);
            for pair in dates.windows(2) {
                assert_eq!(pair[1] - pair[0], Duration::days(1));
            }
        }
    }

    #[test]
    fn week_dates_use_the_fixed_monday_anchor() {
        // Jan 1 2026 is a Thursday, so the first Monday is Jan 5.
        assert_eq!(
            week_dates(2026, 1)[0],
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
        // Jan 1 2024 is itself a Monday.
        assert_eq!(
            week_dates(2024, 1)[0],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        // The 52-week model lets the last week spill past December 31.
        assert_eq!(
            week_dates(2026, 52)[6],
            NaiveDate::from_ymd_opt(2027, 1, 3).unwrap()
        );
    }

    #[test]
    fn current_week_counts_from_january_first() {
        let week = |y, m, d| current_week(NaiveDate::from_ymd_opt(y, m, d).unwrap());

        assert_eq!(week(2026, 1, 1).week, 1);
        assert_eq!(week(2026, 1, 3).week, 1);
        // The counting formula rolls over on Sundays, unlike the
        // Monday-anchored date ranges. Jan 4 2026 is a Sunday.
        assert_eq!(week(2026, 1, 4).week, 2);
        assert_eq!(week(2026, 1, 5).week, 2);
        assert_eq!(week(2026, 8, 30).week, 36);
        assert_eq!(week(2026, 8, 30).total_weeks, TOTAL_WEEKS);
        assert_eq!(week(2026, 1, 2).week, 1);
        // Late December can exceed the fixed 52, like the original.
        assert_eq!(week(2026, 12, 31).week, 53);
    }

    #[test]
    fn week_label_shows_the_date_range() {
        assert_eq!(week_label(2026, 1), "Week 1: Jan 5 - Jan 11");
    }

    #[test]
    fn cell_query_matches_occupied_hours() {
        let dir = tempdir().unwrap();
        let store = JsonWeekStore::new(dir.path()).unwrap();
        let mut grid = GridModel::open(store, Arc::new(ChangeBus::new()), WeekKey::new(2026, 2));

        grid.add(placement(2, 9., 2.)).unwrap();

        assert_eq!(grid.tasks_at(2, 9.).len(), 1);
        assert_eq!(grid.tasks_at(2, 10.).len(), 1);
        assert!(grid.tasks_at(2, 11.).is_empty());
        assert!(grid.tasks_at(3, 9.).is_empty());
    }

    #[test]
    fn overlapping_placements_are_permitted() {
        let dir = tempdir().unwrap();
        let store = JsonWeekStore::new(dir.path()).unwrap();
        let mut grid = GridModel::open(store, Arc::new(ChangeBus::new()), WeekKey::new(2026, 2));

        grid.add(placement(2, 9., 2.)).unwrap();
        grid.add(placement(2, 10., 2.)).unwrap();

        assert_eq!(grid.tasks_at(2, 10.).len(), 2);
    }

    #[test]
    fn invalid_placements_are_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonWeekStore::new(dir.path()).unwrap();
        let mut grid = GridModel::open(store, Arc::new(ChangeBus::new()), WeekKey::new(2026, 2));

        assert!(grid.add(placement(7, 9., 1.)).is_err());
        assert!(grid.add(placement(0, 9., 0.)).is_err());
        assert!(grid.add(placement(0, 4., 1.)).is_err());
        assert!(grid.add(placement(0, 21., 2.)).is_err());
        assert!(grid.tasks().is_empty());
    }

    #[test]
    fn mutations_survive_reopening_the_week() {
        let dir = tempdir().unwrap();
        let bus = Arc::new(ChangeBus::new());
        let key = WeekKey::new(2026, 2);

        let mut grid = GridModel::open(
            JsonWeekStore::new(dir.path()).unwrap(),
            bus.clone(),
            key,
        );
        let id = grid.add(placement(5, 10., 3.)).unwrap();
        grid.update(
            &id,
            TaskPatch {
                day_index: Some(6),
                start_hour: Some(8.),
                ..TaskPatch::default()
            },
        )
        .unwrap();

        let reopened = GridModel::open(JsonWeekStore::new(dir.path()).unwrap(), bus, key);
        assert_eq!(reopened.tasks().len(), 1);
        assert_eq!(reopened.tasks()[0].id, id);
        assert_eq!(reopened.tasks()[0].day_index, 6);
        assert_eq!(reopened.tasks()[0].start_hour, 8.);
        assert_eq!(reopened.tasks()[0].duration, 3.);
    }

    #[test]
    fn add_saves_the_whole_mapping_and_notifies() {
        let mut store = MockWeekStore::new();
        let mut other_week = WeekMap::new();
        other_week.insert("2026-W1".into(), vec![]);

        let fixture = other_week.clone();
        store.expect_load().times(2).returning(move || fixture.clone());
        store
            .expect_save()
            .times(1)
            .withf(|map: &WeekMap| {
                map.contains_key("2026-W1")
                    && map.get("2026-W2").is_some_and(|tasks| tasks.len() == 1)
            })
            .return_const(());

        let bus = Arc::new(ChangeBus::new());
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = seen.clone();
        bus.subscribe(move |event| sink.lock().unwrap().push(event.key.clone()));

        let mut grid = GridModel::open(store, bus, WeekKey::new(2026, 2));
        grid.add(placement(5, 10., 3.)).unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), [STORAGE_KEY]);
    }

    #[test]
    fn mutating_unknown_ids_is_a_quiet_noop() {
        let mut store = MockWeekStore::new();
        // A single load when opening; no-ops must neither write nor notify.
        store.expect_load().times(1).returning(WeekMap::new);
        store.expect_save().times(0);

        let mut grid = GridModel::open(store, Arc::new(ChangeBus::new()), WeekKey::new(2026, 2));
        grid.update("missing", TaskPatch::default()).unwrap();
        grid.remove("missing");

        assert!(grid.tasks().is_empty());
    }

    #[test]
    fn adding_counts_toward_the_denormalized_category() {
        let dir = tempdir().unwrap();
        let store = JsonWeekStore::new(dir.path()).unwrap();
        let config = GoalConfig::builtin();
        let mut grid = GridModel::open(store, Arc::new(ChangeBus::new()), WeekKey::new(2026, 2));

        let ship = config.task("ship").unwrap();
        grid.add(TaskPlacement::from_definition(ship, 5, 10.)).unwrap();

        let added = &grid.tasks()[0];
        assert_eq!(added.category, GoalCategory::Build);
        assert_eq!(added.duration, ship.default_duration);
    }
}
