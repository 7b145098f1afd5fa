use std::{collections::BTreeMap, fmt::Display, io::Read, path::Path};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The closed set of top-level life areas a task can belong to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    Work,
    Build,
    Health,
    Relationships,
}

impl GoalCategory {
    pub const ALL: [GoalCategory; 4] = [
        GoalCategory::Work,
        GoalCategory::Build,
        GoalCategory::Health,
        GoalCategory::Relationships,
    ];
}

impl Display for GoalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalCategory::Work => write!(f, "work"),
            GoalCategory::Build => write!(f, "build"),
            GoalCategory::Health => write!(f, "health"),
            GoalCategory::Relationships => write!(f, "relationships"),
        }
    }
}

/// Display metadata for one annual goal. Only read by rendering code, the
/// aggregation engine cares about [TaskDefinition] alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: GoalCategory,
    pub name: String,
    /// Short uppercase label for compact headers.
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub objective: String,
    #[serde(default)]
    pub objective_detail: Option<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub time_slots: Option<String>,
    /// Hex color like "#4A90A4", used by terminal and chart rendering.
    pub color: String,
}

/// An immutable template for a recurring action. `weekly_target` is the
/// number of placements expected per week, `default_duration` is in hours
/// and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub id: String,
    pub name: String,
    pub name_short: String,
    pub category: GoalCategory,
    pub default_duration: f64,
    pub weekly_target: u32,
}

/// Goal and task configuration, constructed once at startup and passed by
/// reference to every component that needs it. Never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    pub goals: BTreeMap<GoalCategory, Goal>,
    pub tasks: Vec<TaskDefinition>,
}

impl GoalConfig {
    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn goal(&self, category: GoalCategory) -> Option<&Goal> {
        self.goals.get(&category)
    }

    pub fn tasks_in(&self, category: GoalCategory) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.iter().filter(move |t| t.category == category)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads `goals.json` from the application directory if present,
    /// otherwise falls back to the built-in plan. A malformed file is
    /// reported but never fatal.
    pub fn load_or_builtin(application_dir: &Path) -> Self {
        let path = application_dir.join("goals.json");
        match std::fs::File::open(&path) {
            Ok(file) => match Self::from_reader(file) {
                Ok(config) => {
                    debug!("Loaded goal configuration from {path:?}");
                    config
                }
                Err(e) => {
                    warn!("Ignoring malformed goal configuration {path:?}: {e}");
                    Self::builtin()
                }
            },
            Err(_) => Self::builtin(),
        }
    }

    /// The default annual plan: four goals, eight recurring tasks.
    pub fn builtin() -> Self {
        let goals = [
            Goal {
                id: GoalCategory::Work,
                name: "Work".into(),
                name_en: "WORK".into(),
                subtitle: Some("Core product".into()),
                objective: "Deliver one core improvement proven out by data".into(),
                objective_detail: Some(
                    "Own one core product bet and prove it moved a metric, not just that it shipped.".into(),
                ),
                metrics: vec!["One owned metric improving for 8 straight weeks".into()],
                actions: vec![
                    "2 deep work blocks per week (2h)".into(),
                    "5+ user touchpoints per week".into(),
                ],
                time_slots: Some("Tue/Thu 9:00-11:00 deep work".into()),
                color: "#4A90A4".into(),
            },
            Goal {
                id: GoalCategory::Build,
                name: "Build".into(),
                name_en: "BUILD".into(),
                subtitle: Some("Side project".into()),
                objective: "Ship an MVP that earns real user feedback".into(),
                objective_detail: Some(
                    "Take a product from zero to real users; the goal is honest market contact, not polish.".into(),
                ),
                metrics: vec![
                    "10 real users (or 3 paying)".into(),
                    "Weekly release cadence held for 12 weeks".into(),
                ],
                actions: vec![
                    "1 ship per week".into(),
                    "1 growth experiment per week".into(),
                ],
                time_slots: Some("Sat 10:00-13:00 ship only".into()),
                color: "#E07B39".into(),
            },
            Goal {
                id: GoalCategory::Health,
                name: "Health".into(),
                name_en: "HEALTH".into(),
                subtitle: Some("Body and energy".into()),
                objective: "Fix the shoulder, keep training sustainable".into(),
                objective_detail: Some(
                    "Repair the body bottleneck so training and desk work stay sustainable long term.".into(),
                ),
                metrics: vec![
                    "Shoulder discomfort self-rating down by 2+".into(),
                    "Neck rotation up 10 degrees per side".into(),
                ],
                actions: vec![
                    "3 strength sessions per week".into(),
                    "2 zone 2 cardio sessions per week".into(),
                    "10min daily shoulder rehab".into(),
                ],
                time_slots: Some("Mon/Wed/Fri 18:30-19:30 strength".into()),
                color: "#7CB342".into(),
            },
            Goal {
                id: GoalCategory::Relationships,
                name: "Relationships".into(),
                name_en: "RELS".into(),
                subtitle: Some("Partner and key friendships".into()),
                objective: "Make relationship time a fixed rhythm, not leftovers".into(),
                objective_detail: Some(
                    "Turn relationship upkeep into a fixed rhythm instead of whatever time is left over.".into(),
                ),
                metrics: vec!["1 phone-free quality hour per week".into()],
                actions: vec![
                    "Book the weekly slot in advance".into(),
                    "Reach out to one key friend per month".into(),
                ],
                time_slots: Some("One fixed booked slot per week".into()),
                color: "#D4A574".into(),
            },
        ];

        let tasks = vec![
            TaskDefinition {
                id: "deep-work".into(),
                name: "Deep work".into(),
                name_short: "Deep".into(),
                category: GoalCategory::Work,
                default_duration: 2.0,
                weekly_target: 2,
            },
            TaskDefinition {
                id: "user-touchpoint".into(),
                name: "User touchpoint".into(),
                name_short: "Touch".into(),
                category: GoalCategory::Work,
                default_duration: 1.0,
                weekly_target: 5,
            },
            TaskDefinition {
                id: "ship".into(),
                name: "Ship a release".into(),
                name_short: "Ship".into(),
                category: GoalCategory::Build,
                default_duration: 3.0,
                weekly_target: 1,
            },
            TaskDefinition {
                id: "growth-experiment".into(),
                name: "Growth experiment".into(),
                name_short: "Growth".into(),
                category: GoalCategory::Build,
                default_duration: 1.0,
                weekly_target: 1,
            },
            TaskDefinition {
                id: "strength-training".into(),
                name: "Strength training".into(),
                name_short: "Strength".into(),
                category: GoalCategory::Health,
                default_duration: 1.0,
                weekly_target: 3,
            },
            TaskDefinition {
                id: "zone2-cardio".into(),
                name: "Zone 2 cardio".into(),
                name_short: "Zone2".into(),
                category: GoalCategory::Health,
                default_duration: 0.5,
                weekly_target: 2,
            },
            TaskDefinition {
                id: "rehab".into(),
                name: "Shoulder rehab".into(),
                name_short: "Rehab".into(),
                category: GoalCategory::Health,
                default_duration: 0.17,
                weekly_target: 7,
            },
            TaskDefinition {
                id: "quality-time".into(),
                name: "Quality time".into(),
                name_short: "Time".into(),
                category: GoalCategory::Relationships,
                default_duration: 1.0,
                weekly_target: 1,
            },
        ];

        GoalConfig {
            goals: goals.into_iter().map(|g| (g.id, g)).collect(),
            tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_category() {
        let config = GoalConfig::builtin();

        assert_eq!(config.goals.len(), 4);
        assert_eq!(config.tasks.len(), 8);
        for category in GoalCategory::ALL {
            assert!(config.goal(category).is_some());
            assert!(config.tasks_in(category).count() > 0);
        }
        assert!(config.tasks.iter().all(|t| t.weekly_target > 0));
        assert!(config.tasks.iter().all(|t| t.default_duration > 0.));
        assert!(config.goals.values().all(|g| !g.name_en.is_empty()));
        assert!(config.goals.values().all(|g| g.objective_detail.is_some()));
    }

    #[test]
    fn goal_labels_default_when_absent() {
        let json = r##"{
            "goals": {
                "work": { "id": "work", "name": "Arbeit", "color": "#0f766e", "objective": "Ship" }
            },
            "tasks": []
        }"##;
        let config = GoalConfig::from_reader(json.as_bytes()).unwrap();

        let goal = config.goal(GoalCategory::Work).unwrap();
        assert_eq!(goal.name_en, "");
        assert_eq!(goal.objective_detail, None);
    }

    #[test]
    fn task_lookup_by_id() {
        let config = GoalConfig::builtin();

        let ship = config.task("ship").unwrap();
        assert_eq!(ship.category, GoalCategory::Build);
        assert_eq!(ship.weekly_target, 1);

        assert!(config.task("does-not-exist").is_none());
    }

    #[test]
    fn category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&GoalCategory::Relationships).unwrap(),
            "\"relationships\""
        );
        assert_eq!(
            serde_json::from_str::<GoalCategory>("\"build\"").unwrap(),
            GoalCategory::Build
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = GoalConfig::builtin();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = GoalConfig::from_reader(json.as_bytes()).unwrap();
        assert_eq!(parsed, config);
    }
}
