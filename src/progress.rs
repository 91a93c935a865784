//! Progress and time rollup over a project's task tree.
//!
//! Tasks are stored flat with parent pointers. [`TaskTree`] indexes them once
//! so that rolling up a whole tree is linear in tasks + entries.

use std::collections::{HashMap, HashSet};

use crate::models::{Task, TaskCalculatedStats, TimeEntry};

/// Index over tasks and time entries for one computation pass.
pub struct TaskTree<'a> {
    tasks: HashMap<&'a str, &'a Task>,
    children: HashMap<&'a str, Vec<&'a str>>,
    entries: HashMap<&'a str, Vec<&'a TimeEntry>>,
}

impl<'a> TaskTree<'a> {
    pub fn build(tasks: &'a [Task], entries: &'a [TimeEntry]) -> Self {
        let mut by_id = HashMap::with_capacity(tasks.len());
        let mut children: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        for t in tasks {
            by_id.entry(t.id.as_str()).or_insert(t);
            if let Some(parent) = &t.parent_task_id {
                children
                    .entry(parent.as_str())
                    .or_default()
                    .push(t.id.as_str());
            }
        }
        let mut by_task: HashMap<&'a str, Vec<&'a TimeEntry>> = HashMap::new();
        for e in entries {
            by_task.entry(e.task_id.as_str()).or_default().push(e);
        }
        TaskTree {
            tasks: by_id,
            children,
            entries: by_task,
        }
    }

    pub fn task(&self, id: &str) -> Option<&'a Task> {
        self.tasks.get(id).copied()
    }

    /// Direct children of `id`, in input order.
    pub fn children_of(&self, id: &str) -> &[&'a str] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Time entries logged directly against `id`.
    pub fn entries_of(&self, id: &str) -> &[&'a TimeEntry] {
        self.entries.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: &str) -> bool {
        self.children_of(id).is_empty()
    }

    /// `id` followed by all of its descendants.
    pub fn subtree_ids(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for child in self.children_of(&current).iter().rev() {
                stack.push((*child).to_string());
            }
            out.push(current);
        }
        out
    }

    /// Rolled-up stats for a single task.
    pub fn stats(&self, task_id: &str) -> TaskCalculatedStats {
        match self.key(task_id) {
            Some(key) => {
                let mut memo = HashMap::new();
                self.fill(key, &mut memo);
                memo.get(key).copied().unwrap_or_default()
            }
            None => TaskCalculatedStats::default(),
        }
    }

    /// Stats for every task, computed in one shared pass.
    pub fn all_stats(&self) -> HashMap<String, TaskCalculatedStats> {
        let mut memo = HashMap::with_capacity(self.tasks.len());
        for id in self.tasks.keys() {
            self.fill(*id, &mut memo);
        }
        memo.into_iter()
            .filter(|(id, _)| self.tasks.contains_key(id))
            .map(|(id, s)| (id.to_string(), s))
            .collect()
    }

    /// Resolves `id` to a key borrowed from the index.
    fn key(&self, id: &str) -> Option<&'a str> {
        self.tasks
            .get_key_value(id)
            .map(|(k, _)| *k)
            .or_else(|| self.children.get_key_value(id).map(|(k, _)| *k))
            .or_else(|| self.entries.get_key_value(id).map(|(k, _)| *k))
    }

    /// Post-order fill of `memo` for the subtree under `root`.
    ///
    /// A task already on the current path is not descended into again, so a
    /// parent cycle in malformed data contributes nothing instead of looping.
    fn fill(&self, root: &'a str, memo: &mut HashMap<&'a str, TaskCalculatedStats>) {
        let mut stack: Vec<(&'a str, bool)> = vec![(root, false)];
        let mut on_path: HashSet<&'a str> = HashSet::new();

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                on_path.remove(id);
                let s = self.rollup(id, memo);
                memo.insert(id, s);
                continue;
            }
            if memo.contains_key(id) || on_path.contains(id) {
                continue;
            }
            on_path.insert(id);
            stack.push((id, true));
            for child in self.children_of(id) {
                if !memo.contains_key(child) && !on_path.contains(child) {
                    stack.push((*child, false));
                }
            }
        }
    }

    fn rollup(&self, id: &str, memo: &HashMap<&'a str, TaskCalculatedStats>) -> TaskCalculatedStats {
        let children = self.children_of(id);
        if children.is_empty() {
            return self.leaf(id);
        }

        let mut estimated: u64 = 0;
        let mut actual: u64 = 0;
        let mut weighted: u64 = 0;
        let mut last_entry_date = None;
        for child in children {
            if let Some(s) = memo.get(child) {
                estimated += u64::from(s.estimated_min);
                actual += u64::from(s.actual_min);
                weighted += u64::from(s.estimated_min) * u64::from(s.progress_percent);
                last_entry_date = last_entry_date.max(s.last_entry_date);
            }
        }

        let progress_percent = if estimated > 0 {
            (weighted as f64 / estimated as f64).round() as u8
        } else {
            0
        };
        let estimated_min = clamp_u32(estimated);
        let actual_min = clamp_u32(actual);
        TaskCalculatedStats {
            estimated_min,
            actual_min,
            progress_percent,
            is_completed: progress_percent == 100,
            child_count: children.len(),
            overrun_min: actual_min.saturating_sub(estimated_min),
            last_entry_date,
        }
    }

    fn leaf(&self, id: &str) -> TaskCalculatedStats {
        let entries = self.entries_of(id);
        let task = self.task(id);

        let is_completed = entries.iter().any(|e| e.is_completed);
        let logged = clamp_u32(entries.iter().map(|e| u64::from(e.actual_min)).sum());
        let actual_min = task.and_then(|t| t.manual_actual_min).unwrap_or(logged);
        let estimated_min = task.map_or(0, |t| t.estimated_min);

        let progress_percent = if is_completed {
            100
        } else if estimated_min > 0 {
            let raw = (f64::from(actual_min) * 100.0 / f64::from(estimated_min)).round();
            raw.clamp(0.0, 99.0) as u8
        } else {
            0
        };

        TaskCalculatedStats {
            estimated_min,
            actual_min,
            progress_percent,
            is_completed,
            child_count: 0,
            overrun_min: actual_min.saturating_sub(estimated_min),
            last_entry_date: entries.iter().map(|e| e.date).max(),
        }
    }
}

fn clamp_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// One-shot form of [`TaskTree::stats`].
pub fn task_stats(task_id: &str, tasks: &[Task], entries: &[TimeEntry]) -> TaskCalculatedStats {
    TaskTree::build(tasks, entries).stats(task_id)
}
