use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;

use chrono::{Duration, Local, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use tracing::{debug, info};

use crate::calendar::{available_minutes, is_holiday, needs_holiday_refresh};
use crate::duration::{format_minutes, relative_days};
use crate::error::{Error, Result};
use crate::estimate::{standard_task_name, suggest_estimate, task_medians, Catalog};
use crate::models::{
    CalendarOverride, CalendarOverrideType, HolidayCache, MethodTag, Part, Project,
    ProjectCalculatedStats, ProjectStatus, Snapshot, Task, TaskType, TimeEntry,
};
use crate::progress::TaskTree;
use crate::status::{project_stats_in, sort_projects, task_status_of, Schedule};
use crate::storage::delete_database;

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project_id: String,
    pub parent_task_id: Option<String>,
    /// Catalog type for a standard task. Required unless `free` is set.
    pub task_type_id: Option<String>,
    pub part_id: Option<String>,
    /// Name of a free task.
    pub name: Option<String>,
    /// Planned minutes; suggested from history for standard tasks when absent.
    pub estimated_min: Option<u32>,
    pub start_date: Option<String>,
    pub deadline: Option<String>,
    pub free: bool,
}

/// Changes to a logged time entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryEdit {
    pub minutes: Option<u32>,
    pub date: Option<String>,
    pub note: Option<String>,
    pub clear_note: bool,
    /// `Some(true)` leaves the entry out of the median statistics.
    pub excluded: Option<bool>,
    pub completed: Option<bool>,
}

/// Changes to an existing task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub name: Option<String>,
    pub estimated_min: Option<u32>,
    pub manual_actual_min: Option<u32>,
    pub clear_manual_actual: bool,
    pub start_date: Option<String>,
    pub deadline: Option<String>,
}

/// A time log against a leaf task.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub task_id: String,
    pub minutes: u32,
    pub date: Option<String>,
    pub complete: bool,
    pub exclude: bool,
    pub note: Option<String>,
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

fn parse_optional_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.filter(|v| !v.trim().is_empty()).map(parse_date).transpose()
}

/// Parses an override classification (`holiday`, `half-day`, `overtime`, `workday-adjust`).
pub fn parse_override_type(s: &str) -> Result<CalendarOverrideType> {
    match s.to_lowercase().replace('_', "-").as_str() {
        "holiday" => Ok(CalendarOverrideType::Holiday),
        "half-day" => Ok(CalendarOverrideType::HalfDay),
        "overtime" => Ok(CalendarOverrideType::Overtime),
        "workday-adjust" => Ok(CalendarOverrideType::WorkdayAdjust),
        other => Err(Error::Invalid(format!(
            "Unknown override type '{}'. Supported: holiday, half-day, overtime, workday-adjust.",
            other
        ))),
    }
}

/// Next free id of the form `{prefix}{n}`.
fn next_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let n = existing
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|rest| rest.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    format!("{}{}", prefix, n)
}

fn schedule(snapshot: &Snapshot, today: NaiveDate) -> Schedule<'_> {
    Schedule {
        settings: &snapshot.settings,
        overrides: &snapshot.overrides,
        today,
        policy: &snapshot.policy,
    }
}

fn find_project<'a>(snapshot: &'a Snapshot, id: &str) -> Result<&'a Project> {
    snapshot
        .projects
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| Error::not_found("Project", id))
}

/// Adds a new project and returns its id.
pub fn cmd_project_add(
    snapshot: &mut Snapshot,
    name: String,
    methods: Vec<String>,
    start: Option<String>,
    staff: Option<String>,
    silent: bool,
) -> Result<String> {
    if name.trim().is_empty() {
        return Err(Error::Invalid("Project name must not be empty.".into()));
    }
    for m in &methods {
        if !snapshot.method_tags.iter().any(|t| t.id == *m) {
            return Err(Error::not_found("Method", m.clone()));
        }
    }
    let project_start_date = parse_optional_date(start.as_deref())?;
    let id = next_id("p", snapshot.projects.iter().map(|p| p.id.as_str()));
    snapshot.projects.push(Project {
        id: id.clone(),
        name,
        created_at: Local::now().to_rfc3339(),
        area: None,
        construction_methods: methods,
        tags: Vec::new(),
        project_start_date,
        staff,
        amount: None,
    });
    info!(project = %id, "Project added");
    if !silent {
        println!("Project added (id = {})", id);
    }
    Ok(id)
}

/// Removes a project together with its tasks and time entries.
pub fn cmd_project_remove(snapshot: &mut Snapshot, id: &str, silent: bool) -> Result<()> {
    find_project(snapshot, id)?;
    snapshot.projects.retain(|p| p.id != id);
    let tasks_before = snapshot.tasks.len();
    snapshot.tasks.retain(|t| t.project_id != id);
    let entries_before = snapshot.time_entries.len();
    snapshot.time_entries.retain(|e| e.project_id != id);
    info!(
        project = %id,
        tasks = tasks_before - snapshot.tasks.len(),
        entries = entries_before - snapshot.time_entries.len(),
        "Project removed"
    );
    if !silent {
        println!("Project {} removed.", id);
    }
    Ok(())
}

/// Adds a task and returns its id.
///
/// Standard tasks take their name from the catalog and, when no estimate is
/// given, get one suggested from the medians of past work.
pub fn cmd_task_add(snapshot: &mut Snapshot, new: NewTask, silent: bool) -> Result<String> {
    let project = find_project(snapshot, &new.project_id)?.clone();
    if let Some(parent) = &new.parent_task_id {
        match snapshot.tasks.iter().find(|t| t.id == *parent) {
            Some(t) if t.project_id == project.id => {}
            Some(_) => {
                return Err(Error::Invalid(format!(
                    "Parent task '{}' belongs to another project.",
                    parent
                )))
            }
            None => return Err(Error::not_found("Task", parent.clone())),
        }
    }
    let part = match &new.part_id {
        Some(pid) => Some(
            snapshot
                .parts
                .iter()
                .find(|p| p.id == *pid)
                .ok_or_else(|| Error::not_found("Part", pid.clone()))?,
        ),
        None => None,
    };

    let (name, task_type_id, estimated_min, is_manual_estimate) = if new.free {
        let name = new
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::Invalid("A free task needs a name.".into()))?;
        (name.trim().to_string(), None, new.estimated_min.unwrap_or(0), true)
    } else {
        let type_id = new
            .task_type_id
            .ok_or_else(|| Error::Invalid("A standard task needs a task type (or use --free).".into()))?;
        let task_type = snapshot
            .task_types
            .iter()
            .find(|tt| tt.id == type_id)
            .ok_or_else(|| Error::not_found("Task type", type_id.clone()))?;
        if task_type.is_disabled {
            return Err(Error::Invalid(format!("Task type '{}' is disabled.", task_type.name)));
        }
        let name = standard_task_name(task_type, part);
        let (estimate, manual) = match new.estimated_min {
            Some(m) => (m, true),
            None => {
                let stats = task_medians(
                    &snapshot.tasks,
                    &snapshot.time_entries,
                    &snapshot.task_types,
                    &snapshot.policy,
                );
                let catalog = Catalog {
                    task_types: &snapshot.task_types,
                    parts: &snapshot.parts,
                    method_tags: &snapshot.method_tags,
                };
                let suggested = suggest_estimate(
                    &type_id,
                    new.part_id.as_deref(),
                    &project,
                    &stats,
                    &catalog,
                    &snapshot.policy,
                );
                debug!(task_type = %type_id, suggested, "Suggested estimate");
                (suggested, false)
            }
        };
        (name, Some(type_id), estimate, manual)
    };

    let start_date = parse_optional_date(new.start_date.as_deref())?;
    let deadline = parse_optional_date(new.deadline.as_deref())?;
    let id = next_id("t", snapshot.tasks.iter().map(|t| t.id.as_str()));
    snapshot.tasks.push(Task {
        id: id.clone(),
        project_id: project.id.clone(),
        parent_task_id: new.parent_task_id,
        task_type_id,
        part_id: new.part_id,
        name,
        labels: Vec::new(),
        estimated_min,
        is_manual_estimate,
        manual_actual_min: None,
        is_free_task: new.free,
        start_date,
        deadline,
    });
    info!(task = %id, project = %project.id, estimated_min, "Task added");
    if !silent {
        println!(
            "Task added (id = {}, estimate = {})",
            id,
            format_minutes(i64::from(estimated_min), snapshot.settings.standard_daily_min)
        );
    }
    Ok(id)
}

/// Edits an existing task's details.
pub fn cmd_task_edit(snapshot: &mut Snapshot, id: &str, edit: TaskEdit, silent: bool) -> Result<()> {
    let start_date = parse_optional_date(edit.start_date.as_deref())?;
    let deadline = parse_optional_date(edit.deadline.as_deref())?;
    let t = snapshot
        .tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| Error::not_found("Task", id))?;
    if let Some(n) = edit.name {
        t.name = n;
    }
    if let Some(m) = edit.estimated_min {
        t.estimated_min = m;
        t.is_manual_estimate = true;
    }
    if edit.clear_manual_actual {
        t.manual_actual_min = None;
    }
    if let Some(m) = edit.manual_actual_min {
        t.manual_actual_min = Some(m);
    }
    if start_date.is_some() {
        t.start_date = start_date;
    }
    if deadline.is_some() {
        t.deadline = deadline;
    }
    info!(task = %id, "Task updated");
    if !silent {
        println!("Task {} updated.", id);
    }
    Ok(())
}

/// Removes a task, its whole subtree, and their time entries.
pub fn cmd_task_remove(snapshot: &mut Snapshot, id: &str, silent: bool) -> Result<()> {
    if !snapshot.tasks.iter().any(|t| t.id == id) {
        return Err(Error::not_found("Task", id));
    }
    let doomed: HashSet<String> = TaskTree::build(&snapshot.tasks, &snapshot.time_entries)
        .subtree_ids(id)
        .into_iter()
        .collect();
    snapshot.tasks.retain(|t| !doomed.contains(&t.id));
    snapshot.time_entries.retain(|e| !doomed.contains(&e.task_id));
    info!(task = %id, removed = doomed.len(), "Task subtree removed");
    if !silent {
        println!("Task {} removed ({} task(s) in total).", id, doomed.len());
    }
    Ok(())
}

/// Logs minutes worked on a leaf task and returns the entry id.
pub fn cmd_log(snapshot: &mut Snapshot, new: NewEntry, today: NaiveDate, silent: bool) -> Result<String> {
    let task = snapshot
        .tasks
        .iter()
        .find(|t| t.id == new.task_id)
        .ok_or_else(|| Error::not_found("Task", new.task_id.clone()))?;
    if snapshot
        .tasks
        .iter()
        .any(|t| t.parent_task_id.as_deref() == Some(task.id.as_str()))
    {
        return Err(Error::Invalid(format!(
            "Task '{}' has sub-tasks; log time against one of them.",
            task.name
        )));
    }
    let date = parse_optional_date(new.date.as_deref())?.unwrap_or(today);
    let project_id = task.project_id.clone();
    let id = next_id("e", snapshot.time_entries.iter().map(|e| e.id.as_str()));
    snapshot.time_entries.push(TimeEntry {
        id: id.clone(),
        project_id,
        task_id: new.task_id.clone(),
        date,
        actual_min: new.minutes,
        note: new.note,
        is_excluded_from_stats: new.exclude,
        is_completed: new.complete,
        start_at: None,
        end_at: None,
    });
    info!(entry = %id, task = %new.task_id, minutes = new.minutes, completed = new.complete, "Time logged");
    if !silent {
        println!(
            "Logged {} on task {}{}.",
            format_minutes(i64::from(new.minutes), snapshot.settings.standard_daily_min),
            new.task_id,
            if new.complete { " (completed)" } else { "" }
        );
    }
    Ok(id)
}

fn find_entry_mut<'a>(snapshot: &'a mut Snapshot, id: &str) -> Result<&'a mut TimeEntry> {
    snapshot
        .time_entries
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| Error::not_found("Time entry", id))
}

/// Time entries of a task and its sub-tasks, oldest first.
pub fn task_entries<'a>(snapshot: &'a Snapshot, task_id: &str) -> Result<Vec<&'a TimeEntry>> {
    if !snapshot.tasks.iter().any(|t| t.id == task_id) {
        return Err(Error::not_found("Task", task_id));
    }
    let ids: HashSet<String> = TaskTree::build(&snapshot.tasks, &snapshot.time_entries)
        .subtree_ids(task_id)
        .into_iter()
        .collect();
    let mut entries: Vec<&TimeEntry> = snapshot
        .time_entries
        .iter()
        .filter(|e| ids.contains(&e.task_id))
        .collect();
    entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    Ok(entries)
}

/// Table of a task's time entries.
pub fn log_table(snapshot: &Snapshot, task_id: &str) -> Result<Table> {
    let daily = snapshot.settings.standard_daily_min;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Task", "Date", "Time", "Flags", "Note"]));
    for e in task_entries(snapshot, task_id)? {
        let mut flags = Vec::new();
        if e.is_completed {
            flags.push("completed");
        }
        if e.is_excluded_from_stats {
            flags.push("excluded");
        }
        table.add_row(vec![
            Cell::new(&e.id),
            Cell::new(&e.task_id),
            Cell::new(e.date),
            Cell::new(format_minutes(i64::from(e.actual_min), daily)),
            Cell::new(flags.join(", ")).fg(if e.is_excluded_from_stats { Color::Yellow } else { Color::Reset }),
            Cell::new(e.note.as_deref().unwrap_or("")),
        ]);
    }
    Ok(table)
}

/// Lists the time entries of a task (including its sub-tasks).
pub fn cmd_log_list(snapshot: &Snapshot, task_id: &str) -> Result<()> {
    if task_entries(snapshot, task_id)?.is_empty() {
        println!("No time logged on task {}.", task_id);
        return Ok(());
    }
    println!("{}", log_table(snapshot, task_id)?);
    Ok(())
}

/// Edits a logged time entry.
pub fn cmd_log_edit(snapshot: &mut Snapshot, id: &str, edit: EntryEdit, silent: bool) -> Result<()> {
    let date = parse_optional_date(edit.date.as_deref())?;
    let e = find_entry_mut(snapshot, id)?;
    if let Some(m) = edit.minutes {
        e.actual_min = m;
    }
    if let Some(d) = date {
        e.date = d;
    }
    if edit.clear_note {
        e.note = None;
    }
    if let Some(n) = edit.note {
        e.note = Some(n);
    }
    if let Some(x) = edit.excluded {
        e.is_excluded_from_stats = x;
    }
    if let Some(c) = edit.completed {
        e.is_completed = c;
    }
    info!(entry = %id, excluded = e.is_excluded_from_stats, completed = e.is_completed, "Time entry updated");
    if !silent {
        println!("Time entry {} updated.", id);
    }
    Ok(())
}

/// Deletes one time entry.
pub fn cmd_log_remove(snapshot: &mut Snapshot, id: &str, silent: bool) -> Result<()> {
    let before = snapshot.time_entries.len();
    snapshot.time_entries.retain(|e| e.id != id);
    if before == snapshot.time_entries.len() {
        return Err(Error::not_found("Time entry", id));
    }
    info!(entry = %id, "Time entry removed");
    if !silent {
        println!("Time entry {} removed.", id);
    }
    Ok(())
}

/// Adds or replaces the availability override for one date.
pub fn cmd_override_add(
    snapshot: &mut Snapshot,
    date: &str,
    minutes: u32,
    kind: CalendarOverrideType,
    note: Option<String>,
    silent: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let id = next_id("o", snapshot.overrides.iter().map(|o| o.id.as_str()));
    let replaced = snapshot.overrides.len();
    snapshot.overrides.retain(|o| o.date != date);
    let replaced = replaced != snapshot.overrides.len();
    snapshot.overrides.push(CalendarOverride {
        id,
        date,
        available_min: minutes,
        kind,
        note,
    });
    snapshot.overrides.sort_by_key(|o| o.date);
    info!(%date, minutes, replaced, "Calendar override set");
    if !silent {
        println!("Override set for {} ({} min available).", date, minutes);
    }
    Ok(())
}

/// Removes the override for a date.
pub fn cmd_override_remove(snapshot: &mut Snapshot, date: &str, silent: bool) -> Result<()> {
    let date = parse_date(date)?;
    let before = snapshot.overrides.len();
    snapshot.overrides.retain(|o| o.date != date);
    if before == snapshot.overrides.len() {
        return Err(Error::not_found("Override", date.to_string()));
    }
    if !silent {
        println!("Override for {} removed.", date);
    }
    Ok(())
}

/// Updates the working-calendar settings.
pub fn cmd_settings(
    snapshot: &mut Snapshot,
    daily_min: Option<u32>,
    work_days: Option<Vec<u32>>,
    holidays: Option<bool>,
    silent: bool,
) -> Result<()> {
    if let Some(days) = &work_days {
        if let Some(bad) = days.iter().find(|d| **d > 6) {
            return Err(Error::Invalid(format!(
                "Invalid weekday {}. Use 0 (Sunday) to 6 (Saturday).",
                bad
            )));
        }
    }
    let s = &mut snapshot.settings;
    if let Some(m) = daily_min {
        s.standard_daily_min = m;
    }
    if let Some(mut days) = work_days {
        days.sort_unstable();
        days.dedup();
        s.work_days = days;
    }
    if let Some(h) = holidays {
        s.use_japan_holidays = h;
    }
    info!(daily_min = s.standard_daily_min, work_days = ?s.work_days, holidays = s.use_japan_holidays, "Settings updated");
    if !silent {
        println!(
            "Workday: {} min | Work days: {:?} | Holidays: {}",
            s.standard_daily_min,
            s.work_days,
            if s.use_japan_holidays { "on" } else { "off" }
        );
    }
    Ok(())
}

/// Imports a holiday list into the cache.
///
/// The file is a JSON object keyed by `YYYY-MM-DD` (values, usually holiday
/// names, are ignored).
pub fn cmd_holidays_import(snapshot: &mut Snapshot, file: &Path, now_ms: i64, silent: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file).map_err(|e| Error::io(file, e))?;
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)?;
    let dates = map
        .keys()
        .map(|k| parse_date(k))
        .collect::<Result<Vec<_>>>()?;
    let cache = HolidayCache::from_dates(dates, now_ms, "holidays-jp");
    info!(dates = cache.dates.len(), years = ?cache.years, "Holiday cache replaced");
    if !silent {
        println!("Imported {} holidays covering {:?}.", cache.dates.len(), cache.years);
    }
    snapshot.settings.holiday_cache = Some(cache);
    Ok(())
}

pub fn cmd_method_add(snapshot: &mut Snapshot, name: String, multiplier: Option<f64>, silent: bool) -> Result<String> {
    let id = next_id("m", snapshot.method_tags.iter().map(|m| m.id.as_str()));
    snapshot.method_tags.push(MethodTag {
        id: id.clone(),
        name,
        multiplier,
    });
    if !silent {
        println!("Method added (id = {})", id);
    }
    Ok(id)
}

pub fn cmd_part_add(snapshot: &mut Snapshot, name: String, difficulty: f64, silent: bool) -> Result<String> {
    let id = next_id("part", snapshot.parts.iter().map(|p| p.id.as_str()));
    snapshot.parts.push(Part {
        id: id.clone(),
        name,
        difficulty_multiplier: difficulty,
    });
    if !silent {
        println!("Part added (id = {})", id);
    }
    Ok(id)
}

pub fn cmd_type_add(snapshot: &mut Snapshot, name: String, folder: Option<String>, silent: bool) -> Result<String> {
    if snapshot.task_types.iter().any(|tt| tt.name == name) {
        return Err(Error::Invalid(format!("Task type '{}' already exists.", name)));
    }
    let id = next_id("tt", snapshot.task_types.iter().map(|t| t.id.as_str()));
    snapshot.task_types.push(TaskType {
        id: id.clone(),
        name,
        folder_id: folder,
        is_disabled: false,
    });
    if !silent {
        println!("Task type added (id = {})", id);
    }
    Ok(id)
}

/// Disables (or re-enables) a task type.
pub fn cmd_type_disable(snapshot: &mut Snapshot, id: &str, disabled: bool, silent: bool) -> Result<()> {
    let tt = snapshot
        .task_types
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| Error::not_found("Task type", id))?;
    tt.is_disabled = disabled;
    if !silent {
        println!("Task type '{}' {}.", tt.name, if disabled { "disabled" } else { "enabled" });
    }
    Ok(())
}

/// Stats for every project, in listing order.
pub fn all_project_stats(snapshot: &Snapshot, today: NaiveDate) -> Vec<ProjectCalculatedStats> {
    let tree = TaskTree::build(&snapshot.tasks, &snapshot.time_entries);
    let sched = schedule(snapshot, today);
    let mut stats: Vec<ProjectCalculatedStats> = snapshot
        .projects
        .iter()
        .map(|p| project_stats_in(&tree, &p.id, &snapshot.tasks, &snapshot.time_entries, &sched))
        .collect();
    sort_projects(&mut stats, today);
    stats
}

pub fn status_color(status: ProjectStatus) -> Color {
    match status {
        ProjectStatus::Normal => Color::Green,
        ProjectStatus::Tense => Color::Yellow,
        ProjectStatus::Overdue => Color::Red,
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

/// Table of all projects with progress, projection and status.
pub fn project_table(snapshot: &Snapshot, today: NaiveDate) -> Table {
    let daily = snapshot.settings.standard_daily_min;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[
            "ID", "Name", "Tasks", "Progress", "Actual", "Remaining", "Expected", "Deadline", "Status",
        ]));

    for s in all_project_stats(snapshot, today) {
        let name = snapshot
            .projects
            .iter()
            .find(|p| p.id == s.project_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let deadline = match s.deadline {
            Some(d) => {
                let days = relative_days(d, today);
                if days < 0 {
                    format!("{} ({}d overdue)", d, days.abs())
                } else {
                    format!("{} ({}d)", d, days)
                }
            }
            None => "-".to_string(),
        };
        let expected = if s.is_completed {
            format!("{} (done)", s.expected_completion_date)
        } else if s.projection_exhausted {
            format!("{} (?)", s.expected_completion_date)
        } else {
            s.expected_completion_date.to_string()
        };
        table.add_row(vec![
            Cell::new(&s.project_id),
            Cell::new(name),
            Cell::new(s.task_count),
            Cell::new(format!("{}%", s.progress_percent)).set_alignment(CellAlignment::Right),
            Cell::new(format_minutes(i64::from(s.actual_min), daily)),
            Cell::new(format_minutes(i64::from(s.remaining_min), daily)),
            Cell::new(expected),
            Cell::new(deadline),
            Cell::new(s.status.label()).fg(status_color(s.status)),
        ]);
    }
    table
}

/// Lists projects, most pressing deadline first.
pub fn cmd_project_list(snapshot: &Snapshot, today: NaiveDate) {
    if snapshot.projects.is_empty() {
        println!("No projects found.");
        return;
    }
    println!("{}", project_table(snapshot, today));
}

/// Rows of a project's task tree in display order, with their depth.
pub fn tree_rows<'a>(tree: &TaskTree<'a>, snapshot: &'a Snapshot, project_id: &str) -> Vec<(usize, &'a Task)> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<(usize, &'a Task)> = snapshot
        .tasks
        .iter()
        .filter(|t| t.project_id == project_id && t.parent_task_id.is_none())
        .rev()
        .map(|t| (0, t))
        .collect();
    while let Some((depth, task)) = stack.pop() {
        if !seen.insert(task.id.as_str()) {
            continue;
        }
        rows.push((depth, task));
        for child in tree.children_of(&task.id).iter().rev() {
            if let Some(c) = tree.task(child) {
                stack.push((depth + 1, c));
            }
        }
    }
    rows
}

/// Table of a project's task tree with rolled-up figures.
pub fn task_tree_table(snapshot: &Snapshot, project_id: &str, today: NaiveDate) -> Result<Table> {
    find_project(snapshot, project_id)?;
    let daily = snapshot.settings.standard_daily_min;
    let tree = TaskTree::build(&snapshot.tasks, &snapshot.time_entries);
    let sched = schedule(snapshot, today);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[
            "ID", "Task", "Est", "Actual", "Overrun", "Progress", "Deadline", "Status",
        ]));

    let all = tree.all_stats();
    for (depth, task) in tree_rows(&tree, snapshot, project_id) {
        let s = all.get(&task.id).copied().unwrap_or_default();
        let status = task_status_of(task, &s, &sched);
        let marker = if s.child_count > 0 { "▸ " } else { "" };
        let mut name = format!("{}{}{}", "  ".repeat(depth), marker, task.name);
        if task.is_free_task {
            name.push_str(" [free]");
        }
        let progress = if s.is_completed {
            "done".to_string()
        } else {
            format!("{}%", s.progress_percent)
        };
        table.add_row(vec![
            Cell::new(&task.id),
            Cell::new(name),
            Cell::new(format_minutes(i64::from(s.estimated_min), daily)),
            Cell::new(format_minutes(i64::from(s.actual_min), daily)),
            Cell::new(if s.overrun_min > 0 {
                format_minutes(i64::from(s.overrun_min), daily)
            } else {
                "-".to_string()
            })
            .fg(if s.overrun_min > 0 { Color::Red } else { Color::Reset }),
            Cell::new(progress).set_alignment(CellAlignment::Right),
            Cell::new(task.deadline.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(status.label()).fg(status_color(status)),
        ]);
    }
    Ok(table)
}

/// Shows one project's summary and task tree.
pub fn cmd_project_show(snapshot: &Snapshot, project_id: &str, today: NaiveDate) -> Result<()> {
    let project = find_project(snapshot, project_id)?;
    let tree = TaskTree::build(&snapshot.tasks, &snapshot.time_entries);
    let s = project_stats_in(&tree, project_id, &snapshot.tasks, &snapshot.time_entries, &schedule(snapshot, today));
    let daily = snapshot.settings.standard_daily_min;
    println!("{} ({})", project.name, project.id);
    println!(
        "Progress {}% | Estimated {} | Actual {} | Remaining {}",
        s.progress_percent,
        format_minutes(i64::from(s.estimated_min), daily),
        format_minutes(i64::from(s.actual_min), daily),
        format_minutes(i64::from(s.remaining_min), daily),
    );
    println!(
        "Expected completion {}{} | Deadline {} | Status {}",
        s.expected_completion_date,
        if s.projection_exhausted { " (calendar has too little availability)" } else { "" },
        s.deadline.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        s.status.label()
    );
    println!("{}", task_tree_table(snapshot, project_id, today)?);
    Ok(())
}

/// Table of median durations per task type.
pub fn medians_table(snapshot: &Snapshot) -> Table {
    let daily = snapshot.settings.standard_daily_min;
    let stats = task_medians(&snapshot.tasks, &snapshot.time_entries, &snapshot.task_types, &snapshot.policy);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(header(&["Task", "Samples", "Median", "Note"]));
    for s in stats {
        table.add_row(vec![
            Cell::new(&s.task_name),
            Cell::new(s.count),
            Cell::new(format_minutes(s.median_min.round() as i64, daily)),
            if s.is_small_sample {
                Cell::new("small sample").fg(Color::Yellow)
            } else {
                Cell::new("")
            },
        ]);
    }
    table
}

pub fn cmd_medians(snapshot: &Snapshot) {
    println!("{}", medians_table(snapshot));
}

/// Availability for up to `days` consecutive dates from `from`, with the
/// reason a day is short. Stops early at the last representable date.
pub fn calendar_days(snapshot: &Snapshot, from: NaiveDate, days: u32) -> Vec<(NaiveDate, u32, String)> {
    (0..days)
        .map_while(|i| from.checked_add_signed(Duration::days(i64::from(i))))
        .map(|date| {
            let minutes = available_minutes(date, &snapshot.settings, &snapshot.overrides);
            let reason = match snapshot.overrides.iter().find(|o| o.date == date) {
                Some(o) => format!(
                    "override {:?}{}",
                    o.kind,
                    o.note.as_ref().map(|n| format!(": {}", n)).unwrap_or_default()
                ),
                None if is_holiday(date, &snapshot.settings) => "holiday".into(),
                None if minutes == 0 => "day off".into(),
                None => String::new(),
            };
            (date, minutes, reason)
        })
        .collect()
}

/// Table of availability for `days` consecutive dates from `from`.
pub fn calendar_table(snapshot: &Snapshot, from: NaiveDate, days: u32) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(header(&["Date", "Day", "Available", "Reason"]));
    for (date, minutes, reason) in calendar_days(snapshot, from, days) {
        table.add_row(vec![
            Cell::new(date),
            Cell::new(date.format("%a")),
            Cell::new(format!("{} min", minutes)).fg(if minutes == 0 { Color::Grey } else { Color::Reset }),
            Cell::new(reason),
        ]);
    }
    table
}

pub fn cmd_calendar_show(snapshot: &Snapshot, from: NaiveDate, days: u32, today: NaiveDate) {
    if needs_holiday_refresh(&snapshot.settings, today, Local::now().timestamp_millis()) {
        eprintln!("Holiday data is missing or stale; run `renotrack holidays import <file>`.");
    }
    println!("{}", calendar_table(snapshot, from, days));
}

/// Lists methods, parts and task types.
pub fn cmd_catalog_list(snapshot: &Snapshot) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(header(&["Kind", "ID", "Name", "Multiplier"]));
    for m in &snapshot.method_tags {
        table.add_row(vec![
            "method".to_string(),
            m.id.clone(),
            m.name.clone(),
            format!("×{:.2}", m.multiplier.unwrap_or(1.0)),
        ]);
    }
    for p in &snapshot.parts {
        table.add_row(vec![
            "part".to_string(),
            p.id.clone(),
            p.name.clone(),
            format!("×{:.2}", p.difficulty_multiplier),
        ]);
    }
    for t in &snapshot.task_types {
        let name = if t.is_disabled { format!("{} (disabled)", t.name) } else { t.name.clone() };
        table.add_row(vec!["type".to_string(), t.id.clone(), name, "-".to_string()]);
    }
    println!("{table}");
}

/// Resets the database by deleting the data file.
pub fn cmd_reset(path: &Path, force: bool) -> Result<()> {
    if !force {
        print!("Are you sure you want to delete all projects, tasks and logs? This cannot be undone. [y/N] ");
        io::stdout().flush().map_err(|e| Error::io(path, e))?;
        let mut input = String::new();
        io::stdin().read_line(&mut input).map_err(|e| Error::io(path, e))?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    delete_database(path)?;
    println!("Database reset successfully.");
    Ok(())
}
