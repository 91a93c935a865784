#![allow(dead_code)]

use chrono::NaiveDate;
use renotrack::models::{CalendarSettings, Task, TimeEntry};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Monday.
pub fn monday() -> NaiveDate {
    d(2026, 10, 19)
}

pub fn task(id: &str, parent: Option<&str>, est: u32) -> Task {
    Task {
        id: id.into(),
        project_id: "p1".into(),
        parent_task_id: parent.map(Into::into),
        task_type_id: None,
        part_id: None,
        name: id.into(),
        labels: vec![],
        estimated_min: est,
        is_manual_estimate: true,
        manual_actual_min: None,
        is_free_task: false,
        start_date: None,
        deadline: None,
    }
}

pub fn entry(id: &str, task_id: &str, minutes: u32) -> TimeEntry {
    TimeEntry {
        id: id.into(),
        project_id: "p1".into(),
        task_id: task_id.into(),
        date: monday(),
        actual_min: minutes,
        note: None,
        is_excluded_from_stats: false,
        is_completed: false,
        start_at: None,
        end_at: None,
    }
}

pub fn completed(mut e: TimeEntry) -> TimeEntry {
    e.is_completed = true;
    e
}

/// 480 minutes a day, Monday to Friday, no holidays.
pub fn weekday_calendar() -> CalendarSettings {
    CalendarSettings {
        standard_daily_min: 480,
        work_days: vec![1, 2, 3, 4, 5],
        use_japan_holidays: false,
        holiday_cache: None,
    }
}
