use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Policy;

/// A renovation or construction project.
///
/// A project has no deadline of its own; it is implied by the deadlines of its
/// root tasks (phases).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier for the project.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Timestamp when the project was created (RFC 3339).
    pub created_at: String,
    /// Floor area in square metres, if known.
    #[serde(default)]
    pub area: Option<f64>,
    /// Ids of the construction methods used; each scales auto-estimates.
    #[serde(default)]
    pub construction_methods: Vec<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Planned start of work on site.
    #[serde(default)]
    pub project_start_date: Option<NaiveDate>,
    /// Person in charge.
    #[serde(default)]
    pub staff: Option<String>,
    /// Contract amount.
    #[serde(default)]
    pub amount: Option<f64>,
}

/// A construction method (e.g. a particular flooring system) with an effort multiplier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodTag {
    pub id: String,
    pub name: String,
    /// Multiplier applied to suggested estimates. Treated as 1.0 when unset.
    #[serde(default)]
    pub multiplier: Option<f64>,
}

/// A building part (kitchen, bathroom, ...) with a difficulty multiplier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: String,
    pub name: String,
    pub difficulty_multiplier: f64,
}

/// Catalog entry describing a standard kind of task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskType {
    pub id: String,
    pub name: String,
    /// Grouping folder in the catalog, if any.
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Disabled types stay resolvable for existing tasks but are not offered for new ones.
    #[serde(default)]
    pub is_disabled: bool,
}

/// A node in a project's task tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Parent task; `None` marks a root task (phase).
    #[serde(default)]
    pub parent_task_id: Option<String>,
    /// Link to the task-type catalog for standard tasks.
    #[serde(default)]
    pub task_type_id: Option<String>,
    /// Building part this task works on.
    #[serde(default)]
    pub part_id: Option<String>,
    /// Display name (free-form for free tasks).
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Planned minutes.
    #[serde(default)]
    pub estimated_min: u32,
    /// Whether the estimate was typed in rather than suggested.
    #[serde(default)]
    pub is_manual_estimate: bool,
    /// Human correction of the actual minutes; wins over logged entries.
    #[serde(default)]
    pub manual_actual_min: Option<u32>,
    /// Free tasks are excluded from statistics and auto-estimation.
    #[serde(default)]
    pub is_free_task: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

/// One recorded unit of actual work against a leaf task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub project_id: String,
    pub task_id: String,
    /// Calendar date the work was done on.
    pub date: NaiveDate,
    pub actual_min: u32,
    #[serde(default)]
    pub note: Option<String>,
    /// Outlier entries left out of the median computation.
    #[serde(default)]
    pub is_excluded_from_stats: bool,
    /// This entry finished the task.
    #[serde(default)]
    pub is_completed: bool,
    /// Timer start (RFC 3339), for timer-derived entries.
    #[serde(default)]
    pub start_at: Option<String>,
    /// Timer stop (RFC 3339), for timer-derived entries.
    #[serde(default)]
    pub end_at: Option<String>,
}

/// Classification tag of a calendar override. Informational only.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarOverrideType {
    Holiday,
    HalfDay,
    Overtime,
    WorkdayAdjust,
}

/// A per-date exception to the default availability rule.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarOverride {
    pub id: String,
    pub date: NaiveDate,
    /// Minutes available on `date`; 0 for a full holiday.
    pub available_min: u32,
    #[serde(rename = "type")]
    pub kind: CalendarOverrideType,
    #[serde(default)]
    pub note: Option<String>,
}

/// Cached public-holiday list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HolidayCache {
    pub dates: Vec<NaiveDate>,
    /// Fetch time in epoch milliseconds.
    pub last_updated: i64,
    pub source: String,
    /// Calendar years present in `dates`.
    pub years: Vec<i32>,
}

/// Working-calendar settings. Exactly one record is authoritative.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarSettings {
    /// Minutes in a full workday.
    pub standard_daily_min: u32,
    /// Working weekdays, 0 = Sunday .. 6 = Saturday.
    pub work_days: Vec<u32>,
    pub use_japan_holidays: bool,
    pub holiday_cache: Option<HolidayCache>,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        CalendarSettings {
            standard_daily_min: 480,
            work_days: vec![1, 2, 3, 4, 5],
            use_japan_holidays: true,
            holiday_cache: None,
        }
    }
}

/// Median actual duration for one task-type grouping.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Grouping key: the task type id, or the task name when untyped.
    pub key: String,
    /// Task type id when grouped by type.
    pub task_type_id: Option<String>,
    pub task_name: String,
    pub count: usize,
    pub median_min: f64,
    pub is_small_sample: bool,
}

/// Rolled-up figures for one task.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskCalculatedStats {
    pub estimated_min: u32,
    pub actual_min: u32,
    /// 0..=100
    pub progress_percent: u8,
    pub is_completed: bool,
    pub child_count: usize,
    /// Minutes by which actual exceeds estimate, never negative.
    pub overrun_min: u32,
    /// Latest date with logged work anywhere in the subtree.
    pub last_entry_date: Option<NaiveDate>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Normal,
    Tense,
    Overdue,
}

impl ProjectStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Normal => "normal",
            ProjectStatus::Tense => "tense",
            ProjectStatus::Overdue => "overdue",
        }
    }
}

/// Rolled-up figures and schedule status for one project.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCalculatedStats {
    pub project_id: String,
    pub estimated_min: u32,
    pub actual_min: u32,
    pub remaining_min: u32,
    /// Number of leaf tasks.
    pub task_count: usize,
    pub progress_percent: u8,
    pub expected_completion_date: NaiveDate,
    /// The completion projection ran out of days before the work was done.
    pub projection_exhausted: bool,
    /// Latest deadline among the root tasks.
    pub deadline: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub is_completed: bool,
}

/// Everything the tracker persists, loaded and saved as one unit.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub time_entries: Vec<TimeEntry>,
    pub settings: CalendarSettings,
    pub overrides: Vec<CalendarOverride>,
    pub method_tags: Vec<MethodTag>,
    pub parts: Vec<Part>,
    pub task_types: Vec<TaskType>,
    /// Tuning for the estimation thresholds.
    pub policy: Policy,
}
