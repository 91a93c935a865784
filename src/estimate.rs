use std::collections::HashMap;

use crate::config::Policy;
use crate::models::{MethodTag, Part, Project, Task, TaskStats, TaskType, TimeEntry};

/// Lookup tables used when turning history into a suggested estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog<'a> {
    pub task_types: &'a [TaskType],
    pub parts: &'a [Part],
    pub method_tags: &'a [MethodTag],
}

/// Median actual duration per task type (or per name for untyped tasks).
///
/// Entries marked as excluded, entries of free tasks and entries whose task
/// cannot be found are ignored. Groups are returned in first-seen order.
pub fn task_medians(
    tasks: &[Task],
    entries: &[TimeEntry],
    task_types: &[TaskType],
    policy: &Policy,
) -> Vec<TaskStats> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut order: Vec<(String, Option<String>, String)> = Vec::new();
    let mut samples: HashMap<String, Vec<u32>> = HashMap::new();

    for entry in entries {
        if entry.is_excluded_from_stats {
            continue;
        }
        let task = match by_id.get(entry.task_id.as_str()) {
            Some(t) if !t.is_free_task => t,
            _ => continue,
        };
        let key = task
            .task_type_id
            .clone()
            .unwrap_or_else(|| task.name.clone());
        let times = samples.entry(key.clone()).or_insert_with(|| {
            let display = task
                .task_type_id
                .as_deref()
                .and_then(|id| task_types.iter().find(|tt| tt.id == id))
                .map(|tt| tt.name.clone())
                .unwrap_or_else(|| task.name.clone());
            order.push((key.clone(), task.task_type_id.clone(), display));
            Vec::new()
        });
        times.push(entry.actual_min);
    }

    order
        .into_iter()
        .map(|(key, task_type_id, task_name)| {
            let mut times = samples.remove(&key).unwrap_or_default();
            times.sort_unstable();
            TaskStats {
                count: times.len(),
                median_min: median(&times),
                is_small_sample: times.len() < policy.small_sample_threshold,
                key,
                task_type_id,
                task_name,
            }
        })
        .collect()
}

/// Median of an ascending slice; the mean of the two middle values for even lengths.
pub fn median(sorted: &[u32]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        f64::from(sorted[mid])
    } else {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    }
}

/// Suggested `estimated_min` for a new standard task.
///
/// The base is the historical median for the task type, or
/// `policy.default_median_min` when there is no history. It is scaled by the
/// part's difficulty and by every construction method of the project.
/// Unknown parts and methods, and unset or non-positive multipliers, count as 1.0.
pub fn suggest_estimate(
    task_type_id: &str,
    part_id: Option<&str>,
    project: &Project,
    stats: &[TaskStats],
    catalog: &Catalog,
    policy: &Policy,
) -> u32 {
    let type_name = catalog
        .task_types
        .iter()
        .find(|tt| tt.id == task_type_id)
        .map(|tt| tt.name.as_str());

    let base = stats
        .iter()
        .find(|s| {
            s.task_type_id.as_deref() == Some(task_type_id) || Some(s.task_name.as_str()) == type_name
        })
        .map(|s| s.median_min)
        .filter(|m| *m > 0.0)
        .unwrap_or(policy.default_median_min);

    let part_multiplier = part_id
        .and_then(|id| catalog.parts.iter().find(|p| p.id == id))
        .map(|p| neutral_if_unset(Some(p.difficulty_multiplier)))
        .unwrap_or(1.0);

    let method_multiplier: f64 = project
        .construction_methods
        .iter()
        .filter_map(|id| catalog.method_tags.iter().find(|m| m.id == *id))
        .map(|m| neutral_if_unset(m.multiplier))
        .product();

    let suggested = (base * part_multiplier * method_multiplier).round();
    if suggested.is_finite() && suggested > 0.0 {
        suggested.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

fn neutral_if_unset(multiplier: Option<f64>) -> f64 {
    match multiplier {
        Some(m) if m.is_finite() && m > 0.0 => m,
        _ => 1.0,
    }
}

/// Display name for a standard task: the type name, with the part in parentheses.
pub fn standard_task_name(task_type: &TaskType, part: Option<&Part>) -> String {
    match part {
        Some(p) => format!("{} ({})", task_type.name, p.name),
        None => task_type.name.clone(),
    }
}
