use chrono::NaiveDate;

use crate::calendar::project_completion;
use crate::config::Policy;
use crate::duration::relative_days;
use crate::models::{
    CalendarOverride, CalendarSettings, ProjectCalculatedStats, ProjectStatus, Task,
    TaskCalculatedStats, TimeEntry,
};
use crate::progress::TaskTree;

/// Calendar inputs shared by every status computation.
#[derive(Debug, Clone, Copy)]
pub struct Schedule<'a> {
    pub settings: &'a CalendarSettings,
    pub overrides: &'a [CalendarOverride],
    pub today: NaiveDate,
    pub policy: &'a Policy,
}

/// Classifies a completion date against a deadline.
///
/// - No deadline: `Normal`.
/// - Completion after the deadline, or unfinished work with the deadline
///   already past: `Overdue`.
/// - Completion strictly before the deadline, with fewer than
///   `policy.tense_window_days` days to spare: `Tense`.
pub fn classify(
    expected: NaiveDate,
    deadline: Option<NaiveDate>,
    is_completed: bool,
    today: NaiveDate,
    policy: &Policy,
) -> ProjectStatus {
    let Some(deadline) = deadline else {
        return ProjectStatus::Normal;
    };
    if expected > deadline || (!is_completed && today > deadline) {
        return ProjectStatus::Overdue;
    }
    let gap = relative_days(deadline, expected);
    if gap > 0 && gap < policy.tense_window_days {
        ProjectStatus::Tense
    } else {
        ProjectStatus::Normal
    }
}

/// Rolled-up stats and schedule status for one project.
pub fn project_stats(
    project_id: &str,
    tasks: &[Task],
    entries: &[TimeEntry],
    schedule: &Schedule,
) -> ProjectCalculatedStats {
    let tree = TaskTree::build(tasks, entries);
    project_stats_in(&tree, project_id, tasks, entries, schedule)
}

/// [`project_stats`] against an already built tree, for computing many projects in a row.
pub fn project_stats_in(
    tree: &TaskTree,
    project_id: &str,
    tasks: &[Task],
    entries: &[TimeEntry],
    schedule: &Schedule,
) -> ProjectCalculatedStats {
    let project_tasks: Vec<&Task> = tasks.iter().filter(|t| t.project_id == project_id).collect();
    let project_entries: Vec<&TimeEntry> = entries
        .iter()
        .filter(|e| e.project_id == project_id)
        .collect();
    let roots: Vec<&Task> = project_tasks
        .iter()
        .copied()
        .filter(|t| t.parent_task_id.is_none())
        .collect();

    // Sub-task estimates are already part of their root's figure.
    let estimated: u64 = roots.iter().map(|t| u64::from(t.estimated_min)).sum();
    let actual: u64 = project_entries.iter().map(|e| u64::from(e.actual_min)).sum();
    let estimated_min = u32::try_from(estimated).unwrap_or(u32::MAX);
    let actual_min = u32::try_from(actual).unwrap_or(u32::MAX);
    let remaining_min = estimated_min.saturating_sub(actual_min);
    let task_count = project_tasks.iter().filter(|t| tree.is_leaf(&t.id)).count();

    let mut weight_total: u64 = 0;
    let mut weighted: u64 = 0;
    for root in &roots {
        let s = tree.stats(&root.id);
        weight_total += u64::from(s.estimated_min);
        weighted += u64::from(s.estimated_min) * u64::from(s.progress_percent);
    }
    let progress_percent = if weight_total > 0 {
        (weighted as f64 / weight_total as f64).round() as u8
    } else {
        0
    };
    let is_completed = progress_percent == 100;

    let (expected_completion_date, projection_exhausted) = if is_completed {
        let last = project_entries.iter().map(|e| e.date).max();
        (last.unwrap_or(schedule.today), false)
    } else {
        let p = project_completion(
            i64::from(remaining_min),
            schedule.settings,
            schedule.overrides,
            schedule.today,
            schedule.policy.projection_day_limit,
        );
        (p.date_or(schedule.today), p.is_exhausted())
    };

    let deadline = roots.iter().filter_map(|t| t.deadline).max();
    let status = classify(
        expected_completion_date,
        deadline,
        is_completed,
        schedule.today,
        schedule.policy,
    );

    ProjectCalculatedStats {
        project_id: project_id.to_string(),
        estimated_min,
        actual_min,
        remaining_min,
        task_count,
        progress_percent,
        expected_completion_date,
        projection_exhausted,
        deadline,
        status,
        is_completed,
    }
}

/// Schedule status of a single task against its own deadline.
///
/// Completed tasks are judged by the last day work was logged in their
/// subtree; others by projecting their remaining minutes.
pub fn task_status(tree: &TaskTree, task_id: &str, schedule: &Schedule) -> ProjectStatus {
    match tree.task(task_id) {
        Some(task) => task_status_of(task, &tree.stats(task_id), schedule),
        None => ProjectStatus::Normal,
    }
}

/// [`task_status`] from already rolled-up stats, e.g. one entry of
/// [`TaskTree::all_stats`].
pub fn task_status_of(task: &Task, stats: &TaskCalculatedStats, schedule: &Schedule) -> ProjectStatus {
    let Some(deadline) = task.deadline else {
        return ProjectStatus::Normal;
    };
    let expected = if stats.is_completed {
        stats.last_entry_date.unwrap_or(schedule.today)
    } else {
        let remaining = i64::from(stats.estimated_min) - i64::from(stats.actual_min);
        project_completion(
            remaining,
            schedule.settings,
            schedule.overrides,
            schedule.today,
            schedule.policy.projection_day_limit,
        )
        .date_or(schedule.today)
    };
    classify(expected, Some(deadline), stats.is_completed, schedule.today, schedule.policy)
}

/// Orders projects for listing: most overdue deadline first, then nearest
/// deadline, projects without a deadline last; ties go to less remaining work.
pub fn sort_projects(stats: &mut [ProjectCalculatedStats], today: NaiveDate) {
    stats.sort_by_key(|s| {
        let days = s.deadline.map(|d| relative_days(d, today));
        (days.is_none(), days.unwrap_or(i64::MAX), s.remaining_min)
    });
}
