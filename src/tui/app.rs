use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use ratatui::widgets::TableState;

use crate::commands::{all_project_stats, cmd_log, tree_rows, NewEntry};
use crate::error::Result;
use crate::models::{ProjectCalculatedStats, ProjectStatus, Snapshot, TaskCalculatedStats};
use crate::progress::TaskTree;
use crate::status::{task_status_of, Schedule};
use crate::storage::{load_snapshot_from, save_snapshot_to};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    LogMinutes,
}

#[derive(PartialEq)]
pub enum ViewMode {
    Projects,
    Tasks,
}

/// One line of the task view.
pub struct TaskRow {
    pub id: String,
    pub depth: usize,
    pub name: String,
    pub is_free: bool,
    pub deadline: Option<NaiveDate>,
    pub stats: TaskCalculatedStats,
    pub status: ProjectStatus,
}

pub struct App {
    pub path: PathBuf,
    pub snapshot: Snapshot,
    pub today: NaiveDate,
    pub projects: Vec<ProjectCalculatedStats>,
    pub rows: Vec<TaskRow>,
    pub project_state: TableState,
    pub task_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_buffer: String,
    /// Project whose tasks are shown in the task view.
    pub open_project: Option<String>,
    /// Last error or confirmation, shown in the help bar.
    pub message: Option<String>,
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new(path: PathBuf) -> Result<App> {
        let snapshot = load_snapshot_from(&path)?;
        let mut app = App {
            path,
            snapshot,
            today: Local::now().date_naive(),
            projects: Vec::new(),
            rows: Vec::new(),
            project_state: TableState::default(),
            task_state: TableState::default(),
            view_mode: ViewMode::Projects,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            open_project: None,
            message: None,
        };
        app.refresh();
        Ok(app)
    }

    pub fn project_name(&self, id: &str) -> &str {
        self.snapshot
            .projects
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
            .unwrap_or("")
    }

    /// Recomputes every derived figure from the in-memory snapshot.
    pub fn refresh(&mut self) {
        self.projects = all_project_stats(&self.snapshot, self.today);
        clamp_selection(&mut self.project_state, self.projects.len());

        self.rows.clear();
        if let Some(pid) = &self.open_project {
            let tree = TaskTree::build(&self.snapshot.tasks, &self.snapshot.time_entries);
            let schedule = Schedule {
                settings: &self.snapshot.settings,
                overrides: &self.snapshot.overrides,
                today: self.today,
                policy: &self.snapshot.policy,
            };
            let all = tree.all_stats();
            for (depth, task) in tree_rows(&tree, &self.snapshot, pid) {
                let stats = all.get(&task.id).copied().unwrap_or_default();
                self.rows.push(TaskRow {
                    id: task.id.clone(),
                    depth,
                    name: task.name.clone(),
                    is_free: task.is_free_task,
                    deadline: task.deadline,
                    stats,
                    status: task_status_of(task, &stats, &schedule),
                });
            }
        }
        clamp_selection(&mut self.task_state, self.rows.len());
    }

    /// Re-reads the data file.
    pub fn reload(&mut self) {
        match load_snapshot_from(&self.path) {
            Ok(s) => {
                self.snapshot = s;
                self.today = Local::now().date_naive();
                self.message = Some("Reloaded.".into());
            }
            Err(e) => self.message = Some(e.to_string()),
        }
        self.refresh();
    }

    fn len(&self) -> usize {
        match self.view_mode {
            ViewMode::Projects => self.projects.len(),
            ViewMode::Tasks => self.rows.len(),
        }
    }

    fn state_mut(&mut self) -> &mut TableState {
        match self.view_mode {
            ViewMode::Projects => &mut self.project_state,
            ViewMode::Tasks => &mut self.task_state,
        }
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let state = self.state_mut();
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let state = self.state_mut();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Opens the task tree of the selected project.
    pub fn open_selected(&mut self) {
        if self.view_mode != ViewMode::Projects {
            return;
        }
        if let Some(s) = self.project_state.selected().and_then(|i| self.projects.get(i)) {
            self.open_project = Some(s.project_id.clone());
            self.view_mode = ViewMode::Tasks;
            self.task_state.select(None);
            self.refresh();
        }
    }

    /// Returns to the project list.
    pub fn back(&mut self) {
        self.view_mode = ViewMode::Projects;
        self.open_project = None;
        self.refresh();
    }

    fn selected_task(&self) -> Option<&TaskRow> {
        if self.view_mode != ViewMode::Tasks {
            return None;
        }
        self.task_state.selected().and_then(|i| self.rows.get(i))
    }

    /// Starts logging minutes against the selected task.
    pub fn start_log(&mut self) {
        if self.selected_task().is_some() {
            self.input_mode = InputMode::LogMinutes;
            self.input_buffer.clear();
        }
    }

    /// Marks the selected leaf task as completed with a zero-minute entry.
    pub fn complete_selected(&mut self) {
        if let Some(id) = self.selected_task().map(|r| r.id.clone()) {
            self.log(id, 0, true);
        }
    }

    /// Handles the Enter key while typing.
    pub fn handle_input(&mut self) {
        if self.input_mode == InputMode::LogMinutes {
            let id = self.selected_task().map(|r| r.id.clone());
            match (id, self.input_buffer.trim().parse::<u32>()) {
                (Some(id), Ok(minutes)) => self.log(id, minutes, false),
                (_, Err(_)) => self.message = Some(format!("'{}' is not a number of minutes.", self.input_buffer)),
                _ => {}
            }
        }
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    fn log(&mut self, task_id: String, minutes: u32, complete: bool) {
        let entry = NewEntry {
            task_id,
            minutes,
            complete,
            ..NewEntry::default()
        };
        let result = cmd_log(&mut self.snapshot, entry, self.today, true).and_then(|id| {
            save_snapshot_to(&self.path, &self.snapshot).inspect_err(|_| {
                // The entry never reached the file.
                self.snapshot.time_entries.retain(|e| e.id != id);
            })
        });
        self.message = match result {
            Ok(()) if complete => Some("Task marked as completed.".into()),
            Ok(()) => Some(format!("Logged {} min.", minutes)),
            Err(e) => Some(e.to_string()),
        };
        self.refresh();
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
