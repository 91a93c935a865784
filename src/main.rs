//! # renotrack
//!
//! A terminal tracker for renovation and construction projects. Projects are
//! split into phases and tasks, time is logged per task, and each project gets
//! a projected completion date from a working calendar plus a status
//! (normal / tense / overdue) against its deadline.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! renotrack
//! # or explicitly
//! renotrack ui
//! ```
//!
//! **Project View**: `j`/`k` move, `Enter` opens the task tree, `r` reloads, `q` quits.
//!
//! **Task View**: `l` logs minutes, `Space` marks a task completed, `Esc` goes back.
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! # Catalog: task types, parts and construction methods
//! renotrack catalog type "Tiling"
//! renotrack catalog part "Bathroom" --difficulty 1.3
//! renotrack catalog method "Dry lining" --multiplier 0.8
//!
//! # A project with a phase and a standard task (estimate suggested from history)
//! renotrack project add "Suzuki house" --method m1
//! renotrack task add p1 --free --name "Interior" --deadline 2026-12-20
//! renotrack task add p1 --parent t1 --type tt1 --part part1
//!
//! # Log time, mark done, fix a mistyped entry
//! renotrack log add t2 90 --complete
//! renotrack log list t2
//! renotrack log edit e1 --exclude --note "included cleanup"
//! renotrack log remove e2
//!
//! # Reports
//! renotrack project list
//! renotrack project show p1
//! renotrack stats
//! renotrack calendar show --days 21
//! ```
//!
//! ## Data Storage
//!
//! Everything is saved in one JSON file in your local data directory
//! (`~/.local/share/renotrack/renotrack.json` on Linux). Override it with the
//! `RENOTRACK_DB` environment variable. Log verbosity is controlled with
//! `RENOTRACK_LOG` (e.g. `RENOTRACK_LOG=debug`).

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use renotrack::commands::*;
use renotrack::duration::parse_duration;
use renotrack::models::Snapshot;
use renotrack::storage::{db_path, load_snapshot_from, save_snapshot_to};
use renotrack::tui::run_tui;

#[derive(Parser)]
#[command(name = "renotrack")]
#[command(about = "Renovation project tracker with calendar-based completion forecasts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Log, list and correct time entries
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Median durations per task type
    Stats,
    /// Working calendar
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
    /// Task types, parts and construction methods
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Public holiday data
    Holidays {
        #[command(subcommand)]
        command: HolidayCommands,
    },
    /// Reset the database (delete all data)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a new project
    Add {
        name: String,
        /// Construction method id (repeatable)
        #[arg(short, long = "method")]
        methods: Vec<String>,
        /// Planned start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,
        /// Person in charge
        #[arg(long)]
        staff: Option<String>,
    },
    /// List projects with their forecast and status
    List,
    /// Show a project and its task tree
    Show { id: String },
    /// Remove a project with all its tasks and logs
    Remove { id: String },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a task to a project
    Add {
        /// Project id
        project: String,
        /// Task type id (standard task)
        #[arg(short = 'T', long = "type")]
        task_type: Option<String>,
        /// Part id
        #[arg(long)]
        part: Option<String>,
        /// Parent task id
        #[arg(short, long)]
        parent: Option<String>,
        /// Create a free task (excluded from statistics)
        #[arg(short, long)]
        free: bool,
        /// Name of a free task
        #[arg(short, long)]
        name: Option<String>,
        /// Estimate: workdays
        #[arg(long)]
        days: Option<u32>,
        /// Estimate: hours
        #[arg(short = 'H', long)]
        hours: Option<u32>,
        /// Estimate: minutes
        #[arg(short = 'M', long)]
        minutes: Option<u32>,
        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,
        /// Deadline (YYYY-MM-DD)
        #[arg(short, long)]
        deadline: Option<String>,
    },
    /// Edit a task
    Edit {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        /// New estimate: workdays
        #[arg(long)]
        days: Option<u32>,
        /// New estimate: hours
        #[arg(short = 'H', long)]
        hours: Option<u32>,
        /// New estimate: minutes
        #[arg(short = 'M', long)]
        minutes: Option<u32>,
        /// Manual actual minutes (overrides logged time)
        #[arg(short, long)]
        actual: Option<u32>,
        /// Drop the manual actual minutes
        #[arg(long)]
        clear_actual: bool,
        #[arg(short, long)]
        start: Option<String>,
        #[arg(short, long)]
        deadline: Option<String>,
    },
    /// Remove a task, its sub-tasks and their logs
    Remove { id: String },
    /// Show a project's task tree
    Tree { project: String },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Log minutes worked on a task
    Add {
        /// Task id
        task: String,
        /// Minutes worked
        minutes: u32,
        /// Date of the work (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,
        /// This entry finishes the task
        #[arg(short, long)]
        complete: bool,
        /// Leave this entry out of the median statistics
        #[arg(short = 'x', long)]
        exclude: bool,
        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },
    /// List the time entries of a task and its sub-tasks
    List { task: String },
    /// Correct a time entry
    Edit {
        /// Entry id
        id: String,
        /// Minutes worked
        #[arg(short, long)]
        minutes: Option<u32>,
        /// Date of the work (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long, conflicts_with = "clear_note")]
        note: Option<String>,
        #[arg(long)]
        clear_note: bool,
        /// Leave the entry out of the median statistics
        #[arg(short = 'x', long, conflicts_with = "include")]
        exclude: bool,
        /// Count the entry in the median statistics again
        #[arg(long)]
        include: bool,
        /// Mark the entry as finishing its task
        #[arg(short, long, conflicts_with = "incomplete")]
        complete: bool,
        /// Clear the completion mark
        #[arg(long)]
        incomplete: bool,
    },
    /// Delete a time entry
    Remove { id: String },
}

#[derive(Subcommand)]
enum CalendarCommands {
    /// Show availability per day
    Show {
        /// First date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        from: Option<String>,
        /// Number of days (1-366)
        #[arg(short, long, default_value_t = 14, value_parser = clap::value_parser!(u32).range(1..=366))]
        days: u32,
    },
    /// Per-date availability overrides
    Override {
        #[command(subcommand)]
        command: OverrideCommands,
    },
    /// Change workday length, work days or holiday handling
    Settings {
        /// Minutes in a full workday
        #[arg(long)]
        daily: Option<u32>,
        /// Working weekdays, 0 = Sunday .. 6 = Saturday (e.g. 1,2,3,4,5)
        #[arg(long, value_delimiter = ',')]
        work_days: Option<Vec<u32>>,
        /// Treat public holidays as days off
        #[arg(long)]
        holidays: Option<bool>,
    },
}

#[derive(Subcommand)]
enum OverrideCommands {
    /// Set the available minutes for a date
    Add {
        date: String,
        minutes: u32,
        /// holiday, half-day, overtime or workday-adjust
        #[arg(short, long, default_value = "holiday")]
        kind: String,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Remove the override for a date
    Remove { date: String },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Add a construction method
    Method {
        name: String,
        #[arg(short, long)]
        multiplier: Option<f64>,
    },
    /// Add a building part
    Part {
        name: String,
        #[arg(short, long, default_value_t = 1.0)]
        difficulty: f64,
    },
    /// Add a task type
    Type {
        name: String,
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Stop offering a task type for new tasks
    Disable { id: String },
    /// Offer a disabled task type again
    Enable { id: String },
    /// List the catalog
    List,
}

#[derive(Subcommand)]
enum HolidayCommands {
    /// Import holidays from a JSON object keyed by YYYY-MM-DD
    Import { file: PathBuf },
}

fn init_logging(interactive: bool) {
    // The TUI owns the terminal, so it stays quiet unless asked otherwise.
    let default = if interactive { "off" } else { "warn" };
    let filter = EnvFilter::try_from_env("RENOTRACK_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Combines optional day/hour/minute arguments into minutes.
fn estimate_arg(
    days: Option<u32>,
    hours: Option<u32>,
    minutes: Option<u32>,
    daily: u32,
) -> renotrack::error::Result<Option<u32>> {
    if days.is_none() && hours.is_none() && minutes.is_none() {
        return Ok(None);
    }
    parse_duration(
        days.unwrap_or(0),
        hours.unwrap_or(0),
        minutes.unwrap_or(0),
        daily,
    )
    .map(Some)
}

/// `--on` / `--off` flag pair as an optional setting.
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn load(path: &Path) -> anyhow::Result<Snapshot> {
    load_snapshot_from(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Loads the snapshot, applies `f`, and saves the result.
fn mutate<T>(
    path: &Path,
    f: impl FnOnce(&mut Snapshot) -> renotrack::error::Result<T>,
) -> anyhow::Result<T> {
    let mut snapshot = load(path)?;
    let out = f(&mut snapshot)?;
    save_snapshot_to(path, &snapshot).with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(out)
}

fn run(command: Option<Commands>) -> anyhow::Result<()> {
    let path = db_path();
    let today = Local::now().date_naive();

    match command {
        Some(Commands::Project { command }) => match command {
            ProjectCommands::Add { name, methods, start, staff } => {
                mutate(&path, |s| cmd_project_add(s, name, methods, start, staff, false))?;
            }
            ProjectCommands::List => cmd_project_list(&load(&path)?, today),
            ProjectCommands::Show { id } => cmd_project_show(&load(&path)?, &id, today)?,
            ProjectCommands::Remove { id } => mutate(&path, |s| cmd_project_remove(s, &id, false))?,
        },
        Some(Commands::Task { command }) => match command {
            TaskCommands::Add {
                project, task_type, part, parent, free, name, days, hours, minutes, start, deadline,
            } => {
                mutate(&path, |s| {
                    let estimated_min = estimate_arg(days, hours, minutes, s.settings.standard_daily_min)?;
                    let new = NewTask {
                        project_id: project,
                        parent_task_id: parent,
                        task_type_id: task_type,
                        part_id: part,
                        name,
                        estimated_min,
                        start_date: start,
                        deadline,
                        free,
                    };
                    cmd_task_add(s, new, false)
                })?;
            }
            TaskCommands::Edit {
                id, name, days, hours, minutes, actual, clear_actual, start, deadline,
            } => mutate(&path, |s| {
                let edit = TaskEdit {
                    name,
                    estimated_min: estimate_arg(days, hours, minutes, s.settings.standard_daily_min)?,
                    manual_actual_min: actual,
                    clear_manual_actual: clear_actual,
                    start_date: start,
                    deadline,
                };
                cmd_task_edit(s, &id, edit, false)
            })?,
            TaskCommands::Remove { id } => mutate(&path, |s| cmd_task_remove(s, &id, false))?,
            TaskCommands::Tree { project } => {
                println!("{}", task_tree_table(&load(&path)?, &project, today)?);
            }
        },
        Some(Commands::Log { command }) => match command {
            LogCommands::Add { task, minutes, date, complete, exclude, note } => {
                let new = NewEntry { task_id: task, minutes, date, complete, exclude, note };
                mutate(&path, |s| cmd_log(s, new, today, false))?;
            }
            LogCommands::List { task } => cmd_log_list(&load(&path)?, &task)?,
            LogCommands::Edit {
                id, minutes, date, note, clear_note, exclude, include, complete, incomplete,
            } => {
                let edit = EntryEdit {
                    minutes,
                    date,
                    note,
                    clear_note,
                    excluded: flag_pair(exclude, include),
                    completed: flag_pair(complete, incomplete),
                };
                mutate(&path, |s| cmd_log_edit(s, &id, edit, false))?;
            }
            LogCommands::Remove { id } => mutate(&path, |s| cmd_log_remove(s, &id, false))?,
        },
        Some(Commands::Stats) => cmd_medians(&load(&path)?),
        Some(Commands::Calendar { command }) => match command {
            CalendarCommands::Show { from, days } => {
                let from = match from {
                    Some(f) => parse_date(&f)?,
                    None => today,
                };
                cmd_calendar_show(&load(&path)?, from, days, today);
            }
            CalendarCommands::Override { command } => match command {
                OverrideCommands::Add { date, minutes, kind, note } => {
                    let kind = parse_override_type(&kind)?;
                    mutate(&path, |s| cmd_override_add(s, &date, minutes, kind, note, false))?;
                }
                OverrideCommands::Remove { date } => {
                    mutate(&path, |s| cmd_override_remove(s, &date, false))?;
                }
            },
            CalendarCommands::Settings { daily, work_days, holidays } => {
                mutate(&path, |s| cmd_settings(s, daily, work_days, holidays, false))?;
            }
        },
        Some(Commands::Catalog { command }) => match command {
            CatalogCommands::Method { name, multiplier } => {
                mutate(&path, |s| cmd_method_add(s, name, multiplier, false))?;
            }
            CatalogCommands::Part { name, difficulty } => {
                mutate(&path, |s| cmd_part_add(s, name, difficulty, false))?;
            }
            CatalogCommands::Type { name, folder } => {
                mutate(&path, |s| cmd_type_add(s, name, folder, false))?;
            }
            CatalogCommands::Disable { id } => mutate(&path, |s| cmd_type_disable(s, &id, true, false))?,
            CatalogCommands::Enable { id } => mutate(&path, |s| cmd_type_disable(s, &id, false, false))?,
            CatalogCommands::List => cmd_catalog_list(&load(&path)?),
        },
        Some(Commands::Holidays { command: HolidayCommands::Import { file } }) => {
            let now_ms = Local::now().timestamp_millis();
            mutate(&path, |s| cmd_holidays_import(s, &file, now_ms, false))?;
        }
        Some(Commands::Reset { force }) => cmd_reset(&path, force)?,
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => anyhow::bail!("Unsupported shell: {}", shell),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "renotrack", &mut io::stdout());
        }
        Some(Commands::Ui) | None => {
            run_tui(path).map_err(|e| anyhow::anyhow!("Error running TUI: {}", e))?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(matches!(cli.command, None | Some(Commands::Ui)));
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
