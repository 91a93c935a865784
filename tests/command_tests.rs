mod common;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use common::{d, monday};
use pretty_assertions::assert_eq;
use renotrack::commands::*;
use renotrack::config::Policy;
use renotrack::error::Error;
use renotrack::estimate::task_medians;
use renotrack::models::{CalendarOverrideType, Snapshot};
use renotrack::progress::task_stats;
use renotrack::storage::{db_path, load_snapshot, load_snapshot_from, save_snapshot, save_snapshot_to};

// Tests that touch RENOTRACK_DB run one at a time.
static TEST_MUTEX: Mutex<()> = Mutex::new(());

fn with_test_db<F>(f: F)
where
    F: FnOnce(PathBuf),
{
    let _guard = TEST_MUTEX.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("renotrack.json");
    env::set_var("RENOTRACK_DB", &path);
    f(path);
    env::remove_var("RENOTRACK_DB");
}

/// A project with one task type, one part and one method.
fn seeded() -> (Snapshot, String) {
    let mut s = Snapshot::default();
    s.settings.use_japan_holidays = false;
    cmd_type_add(&mut s, "Tiling".into(), None, true).unwrap();
    cmd_part_add(&mut s, "Bathroom".into(), 1.5, true).unwrap();
    cmd_method_add(&mut s, "Wet".into(), Some(2.0), true).unwrap();
    let p = cmd_project_add(&mut s, "House".into(), vec![], None, None, true).unwrap();
    (s, p)
}

fn free_task(project: &str, parent: Option<&str>, name: &str, minutes: u32) -> NewTask {
    NewTask {
        project_id: project.into(),
        parent_task_id: parent.map(Into::into),
        name: Some(name.into()),
        estimated_min: Some(minutes),
        free: true,
        ..NewTask::default()
    }
}

fn log(task_id: &str, minutes: u32) -> NewEntry {
    NewEntry {
        task_id: task_id.into(),
        minutes,
        ..NewEntry::default()
    }
}

#[test]
fn test_ids_are_sequential() {
    let (mut s, p1) = seeded();
    assert_eq!(p1, "p1");
    assert_eq!(s.task_types[0].id, "tt1");
    assert_eq!(s.parts[0].id, "part1");
    assert_eq!(s.method_tags[0].id, "m1");
    let p2 = cmd_project_add(&mut s, "Shop".into(), vec![], None, None, true).unwrap();
    assert_eq!(p2, "p2");
}

#[test]
fn test_project_add_validates_input() {
    let (mut s, _) = seeded();
    assert!(matches!(
        cmd_project_add(&mut s, "  ".into(), vec![], None, None, true),
        Err(Error::Invalid(_))
    ));
    assert!(matches!(
        cmd_project_add(&mut s, "X".into(), vec!["m9".into()], None, None, true),
        Err(Error::NotFound { kind: "Method", .. })
    ));
    assert!(matches!(
        cmd_project_add(&mut s, "X".into(), vec![], Some("2026/10/19".into()), None, true),
        Err(Error::InvalidDate(_))
    ));
    assert_eq!(s.projects.len(), 1);
}

#[test]
fn test_standard_task_gets_name_and_suggestion() {
    let (mut s, _) = seeded();
    let p = cmd_project_add(&mut s, "Wet house".into(), vec!["m1".into()], None, None, true).unwrap();
    let id = cmd_task_add(
        &mut s,
        NewTask {
            project_id: p.clone(),
            task_type_id: Some("tt1".into()),
            part_id: Some("part1".into()),
            ..NewTask::default()
        },
        true,
    )
    .unwrap();

    let t = s.tasks.iter().find(|t| t.id == id).unwrap();
    assert_eq!(t.name, "Tiling (Bathroom)");
    // No history: 120 × 1.5 × 2.0
    assert_eq!(t.estimated_min, 360);
    assert!(!t.is_manual_estimate);
    assert_eq!(t.project_id, p);
}

#[test]
fn test_suggestion_learns_from_logged_work() {
    let (mut s, p) = seeded();
    let standard = |s: &mut Snapshot| {
        cmd_task_add(
            s,
            NewTask {
                project_id: p.clone(),
                task_type_id: Some("tt1".into()),
                estimated_min: Some(60),
                ..NewTask::default()
            },
            true,
        )
        .unwrap()
    };
    for minutes in [90, 30, 60] {
        let id = standard(&mut s);
        cmd_log(&mut s, log(&id, minutes), monday(), true).unwrap();
    }
    let id = cmd_task_add(
        &mut s,
        NewTask {
            project_id: p.clone(),
            task_type_id: Some("tt1".into()),
            ..NewTask::default()
        },
        true,
    )
    .unwrap();
    assert_eq!(s.tasks.iter().find(|t| t.id == id).unwrap().estimated_min, 60);
}

#[test]
fn test_free_task_rules() {
    let (mut s, p) = seeded();
    let err = cmd_task_add(
        &mut s,
        NewTask {
            project_id: p.clone(),
            free: true,
            ..NewTask::default()
        },
        true,
    );
    assert!(matches!(err, Err(Error::Invalid(_))));

    let id = cmd_task_add(
        &mut s,
        NewTask {
            project_id: p.clone(),
            name: Some(" Site cleanup ".into()),
            free: true,
            ..NewTask::default()
        },
        true,
    )
    .unwrap();
    let t = s.tasks.iter().find(|t| t.id == id).unwrap();
    assert_eq!(t.name, "Site cleanup");
    assert_eq!(t.estimated_min, 0);
    assert!(t.is_free_task);
    assert_eq!(t.task_type_id, None);
}

#[test]
fn test_disabled_type_cannot_be_used() {
    let (mut s, p) = seeded();
    cmd_type_disable(&mut s, "tt1", true, true).unwrap();
    let new = NewTask {
        project_id: p.clone(),
        task_type_id: Some("tt1".into()),
        ..NewTask::default()
    };
    assert!(matches!(cmd_task_add(&mut s, new.clone(), true), Err(Error::Invalid(_))));

    cmd_type_disable(&mut s, "tt1", false, true).unwrap();
    assert!(cmd_task_add(&mut s, new, true).is_ok());
    assert!(matches!(
        cmd_type_add(&mut s, "Tiling".into(), None, true),
        Err(Error::Invalid(_))
    ));
}

#[test]
fn test_parent_must_be_in_same_project() {
    let (mut s, p1) = seeded();
    let p2 = cmd_project_add(&mut s, "Other".into(), vec![], None, None, true).unwrap();
    let phase = cmd_task_add(&mut s, free_task(&p1, None, "Phase", 0), true).unwrap();
    assert!(matches!(
        cmd_task_add(&mut s, free_task(&p2, Some(&phase), "Stray", 10), true),
        Err(Error::Invalid(_))
    ));
    assert!(matches!(
        cmd_task_add(&mut s, free_task(&p1, Some("t99"), "Orphan", 10), true),
        Err(Error::NotFound { kind: "Task", .. })
    ));
}

#[test]
fn test_logging_against_container_is_rejected() {
    let (mut s, p) = seeded();
    let phase = cmd_task_add(&mut s, free_task(&p, None, "Phase", 0), true).unwrap();
    let leaf = cmd_task_add(&mut s, free_task(&p, Some(&phase), "Demolition", 120), true).unwrap();

    assert!(matches!(cmd_log(&mut s, log(&phase, 30), monday(), true), Err(Error::Invalid(_))));
    let entry_id = cmd_log(
        &mut s,
        NewEntry {
            date: Some("2026-10-16".into()),
            complete: true,
            ..log(&leaf, 30)
        },
        monday(),
        true,
    )
    .unwrap();

    let e = s.time_entries.iter().find(|e| e.id == entry_id).unwrap();
    assert_eq!(e.project_id, p);
    assert_eq!(e.date, d(2026, 10, 16));
    assert!(e.is_completed);

    let id = cmd_log(&mut s, log(&leaf, 10), monday(), true).unwrap();
    let e = s.time_entries.iter().find(|e| e.id == id).unwrap();
    assert_eq!(e.date, monday());
}

fn typed_task(s: &mut Snapshot, project: &str) -> String {
    let new = NewTask {
        project_id: project.into(),
        task_type_id: Some("tt1".into()),
        estimated_min: Some(60),
        ..NewTask::default()
    };
    cmd_task_add(s, new, true).unwrap()
}

#[test]
fn test_excluding_an_entry_drops_it_from_medians() {
    let (mut s, p) = seeded();
    let mut entry_ids = Vec::new();
    for minutes in [30, 60, 900] {
        let t = typed_task(&mut s, &p);
        entry_ids.push(cmd_log(&mut s, log(&t, minutes), monday(), true).unwrap());
    }
    let medians = |s: &Snapshot| task_medians(&s.tasks, &s.time_entries, &s.task_types, &Policy::default());
    assert_eq!(medians(&s)[0].median_min, 60.0);

    let exclude = EntryEdit {
        excluded: Some(true),
        note: Some("forgot to stop the timer".into()),
        ..EntryEdit::default()
    };
    cmd_log_edit(&mut s, &entry_ids[2], exclude, true).unwrap();
    let stats = medians(&s);
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[0].median_min, 45.0);

    let e = s.time_entries.iter().find(|e| e.id == entry_ids[2]).unwrap();
    assert!(e.is_excluded_from_stats);
    assert_eq!(e.note.as_deref(), Some("forgot to stop the timer"));

    let include = EntryEdit {
        excluded: Some(false),
        ..EntryEdit::default()
    };
    cmd_log_edit(&mut s, &entry_ids[2], include, true).unwrap();
    assert_eq!(medians(&s)[0].count, 3);
}

#[test]
fn test_removing_the_completing_entry_reopens_the_task() {
    let (mut s, p) = seeded();
    let t = cmd_task_add(&mut s, free_task(&p, None, "Paint", 120), true).unwrap();
    cmd_log(&mut s, log(&t, 30), monday(), true).unwrap();
    let done = cmd_log(
        &mut s,
        NewEntry {
            complete: true,
            ..log(&t, 10)
        },
        monday(),
        true,
    )
    .unwrap();
    assert!(task_stats(&t, &s.tasks, &s.time_entries).is_completed);

    cmd_log_remove(&mut s, &done, true).unwrap();
    let stats = task_stats(&t, &s.tasks, &s.time_entries);
    assert!(!stats.is_completed);
    assert_eq!(stats.actual_min, 30);
    assert_eq!(stats.progress_percent, 25);

    assert!(matches!(
        cmd_log_remove(&mut s, &done, true),
        Err(Error::NotFound { kind: "Time entry", .. })
    ));
}

#[test]
fn test_log_edit_fields() {
    let (mut s, p) = seeded();
    let t = cmd_task_add(&mut s, free_task(&p, None, "Paint", 120), true).unwrap();
    let id = cmd_log(
        &mut s,
        NewEntry {
            note: Some("first coat".into()),
            ..log(&t, 30)
        },
        monday(),
        true,
    )
    .unwrap();

    let edit = EntryEdit {
        minutes: Some(45),
        date: Some("2026-10-16".into()),
        completed: Some(true),
        clear_note: true,
        ..EntryEdit::default()
    };
    cmd_log_edit(&mut s, &id, edit, true).unwrap();
    let e = &s.time_entries[0];
    assert_eq!(e.actual_min, 45);
    assert_eq!(e.date, d(2026, 10, 16));
    assert!(e.is_completed);
    assert_eq!(e.note, None);

    let bad_date = EntryEdit {
        date: Some("friday".into()),
        minutes: Some(1),
        ..EntryEdit::default()
    };
    assert!(matches!(cmd_log_edit(&mut s, &id, bad_date, true), Err(Error::InvalidDate(_))));
    assert_eq!(s.time_entries[0].actual_min, 45);
    assert!(matches!(
        cmd_log_edit(&mut s, "e99", EntryEdit::default(), true),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn test_task_entries_cover_subtree_oldest_first() {
    let (mut s, p) = seeded();
    let phase = cmd_task_add(&mut s, free_task(&p, None, "Phase", 0), true).unwrap();
    let a = cmd_task_add(&mut s, free_task(&p, Some(&phase), "A", 60), true).unwrap();
    let b = cmd_task_add(&mut s, free_task(&p, Some(&phase), "B", 60), true).unwrap();
    let other = cmd_task_add(&mut s, free_task(&p, None, "Other", 60), true).unwrap();
    let late = cmd_log(&mut s, log(&a, 10), monday(), true).unwrap();
    let early = cmd_log(
        &mut s,
        NewEntry {
            date: Some("2026-10-12".into()),
            ..log(&b, 20)
        },
        monday(),
        true,
    )
    .unwrap();
    cmd_log(&mut s, log(&other, 5), monday(), true).unwrap();

    let ids: Vec<&str> = task_entries(&s, &phase).unwrap().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![early.as_str(), late.as_str()]);
    assert_eq!(task_entries(&s, &a).unwrap().len(), 1);
    assert!(matches!(task_entries(&s, "t99"), Err(Error::NotFound { .. })));
    assert!(log_table(&s, &phase).is_ok());
}

#[test]
fn test_task_remove_cascades() {
    let (mut s, p) = seeded();
    let phase = cmd_task_add(&mut s, free_task(&p, None, "Phase", 0), true).unwrap();
    let a = cmd_task_add(&mut s, free_task(&p, Some(&phase), "A", 60), true).unwrap();
    let b = cmd_task_add(&mut s, free_task(&p, Some(&a), "B", 60), true).unwrap();
    let other = cmd_task_add(&mut s, free_task(&p, None, "Other", 60), true).unwrap();
    cmd_log(&mut s, log(&b, 30), monday(), true).unwrap();
    cmd_log(&mut s, log(&other, 30), monday(), true).unwrap();

    cmd_task_remove(&mut s, &phase, true).unwrap();
    let ids: Vec<&str> = s.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![other.as_str()]);
    assert_eq!(s.time_entries.len(), 1);
    assert_eq!(s.time_entries[0].task_id, other);

    assert!(matches!(cmd_task_remove(&mut s, &phase, true), Err(Error::NotFound { .. })));
}

#[test]
fn test_project_remove_cascades() {
    let (mut s, p1) = seeded();
    let p2 = cmd_project_add(&mut s, "Keep".into(), vec![], None, None, true).unwrap();
    let t1 = cmd_task_add(&mut s, free_task(&p1, None, "Gone", 60), true).unwrap();
    let t2 = cmd_task_add(&mut s, free_task(&p2, None, "Kept", 60), true).unwrap();
    cmd_log(&mut s, log(&t1, 10), monday(), true).unwrap();
    cmd_log(&mut s, log(&t2, 10), monday(), true).unwrap();

    cmd_project_remove(&mut s, &p1, true).unwrap();
    assert_eq!(s.projects.len(), 1);
    assert!(s.tasks.iter().all(|t| t.project_id == p2));
    assert!(s.time_entries.iter().all(|e| e.project_id == p2));
    assert_eq!(s.time_entries.len(), 1);
}

#[test]
fn test_task_edit() {
    let (mut s, p) = seeded();
    let id = cmd_task_add(&mut s, free_task(&p, None, "Paint", 60), true).unwrap();
    cmd_task_edit(
        &mut s,
        &id,
        TaskEdit {
            estimated_min: Some(90),
            manual_actual_min: Some(45),
            deadline: Some("2026-11-02".into()),
            ..TaskEdit::default()
        },
        true,
    )
    .unwrap();
    let t = s.tasks.iter().find(|t| t.id == id).unwrap();
    assert_eq!(t.estimated_min, 90);
    assert_eq!(t.manual_actual_min, Some(45));
    assert_eq!(t.deadline, Some(d(2026, 11, 2)));

    cmd_task_edit(
        &mut s,
        &id,
        TaskEdit {
            clear_manual_actual: true,
            ..TaskEdit::default()
        },
        true,
    )
    .unwrap();
    assert_eq!(s.tasks.iter().find(|t| t.id == id).unwrap().manual_actual_min, None);

    assert!(matches!(
        cmd_task_edit(
            &mut s,
            &id,
            TaskEdit {
                deadline: Some("soon".into()),
                ..TaskEdit::default()
            },
            true
        ),
        Err(Error::InvalidDate(_))
    ));
}

#[test]
fn test_override_replaces_same_date() {
    let mut s = Snapshot::default();
    cmd_override_add(&mut s, "2026-10-21", 240, CalendarOverrideType::HalfDay, None, true).unwrap();
    cmd_override_add(&mut s, "2026-10-20", 0, CalendarOverrideType::Holiday, None, true).unwrap();
    cmd_override_add(&mut s, "2026-10-21", 600, CalendarOverrideType::Overtime, Some("rush".into()), true).unwrap();

    let dates: Vec<_> = s.overrides.iter().map(|o| (o.date, o.available_min)).collect();
    assert_eq!(dates, vec![(d(2026, 10, 20), 0), (d(2026, 10, 21), 600)]);

    cmd_override_remove(&mut s, "2026-10-20", true).unwrap();
    assert_eq!(s.overrides.len(), 1);
    assert!(matches!(
        cmd_override_remove(&mut s, "2026-10-20", true),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        cmd_override_add(&mut s, "21/10/2026", 0, CalendarOverrideType::Holiday, None, true),
        Err(Error::InvalidDate(_))
    ));
}

#[test]
fn test_override_type_names() {
    assert_eq!(parse_override_type("half-day").unwrap(), CalendarOverrideType::HalfDay);
    assert_eq!(parse_override_type("WORKDAY_ADJUST").unwrap(), CalendarOverrideType::WorkdayAdjust);
    assert!(parse_override_type("vacation").is_err());
}

#[test]
fn test_settings_validation() {
    let mut s = Snapshot::default();
    assert!(matches!(
        cmd_settings(&mut s, None, Some(vec![1, 7]), None, true),
        Err(Error::Invalid(_))
    ));
    cmd_settings(&mut s, Some(420), Some(vec![6, 1, 1, 2]), Some(false), true).unwrap();
    assert_eq!(s.settings.standard_daily_min, 420);
    assert_eq!(s.settings.work_days, vec![1, 2, 6]);
    assert!(!s.settings.use_japan_holidays);
}

#[test]
fn test_holidays_import() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("holidays.json");
    fs::write(
        &file,
        r#"{"2026-11-03": "Culture Day", "2027-01-01": "New Year's Day", "2026-11-23": "Labour Thanksgiving Day"}"#,
    )
    .unwrap();

    let mut s = Snapshot::default();
    cmd_holidays_import(&mut s, &file, 42, true).unwrap();
    let cache = s.settings.holiday_cache.as_ref().unwrap();
    assert_eq!(cache.dates, vec![d(2026, 11, 3), d(2026, 11, 23), d(2027, 1, 1)]);
    assert_eq!(cache.years, vec![2026, 2027]);
    assert_eq!(cache.last_updated, 42);

    fs::write(&file, r#"{"not a date": ""}"#).unwrap();
    assert!(matches!(cmd_holidays_import(&mut s, &file, 43, true), Err(Error::InvalidDate(_))));
    assert!(matches!(
        cmd_holidays_import(&mut s, &dir.path().join("missing.json"), 43, true),
        Err(Error::Io { .. })
    ));
}

#[test]
fn test_calendar_days_reasons() {
    let mut s = Snapshot::default();
    s.settings.use_japan_holidays = false;
    cmd_override_add(&mut s, "2026-10-20", 240, CalendarOverrideType::HalfDay, Some("inspection".into()), true).unwrap();

    let days = calendar_days(&s, monday(), 7);
    assert_eq!(days.len(), 7);
    assert_eq!(days[0], (monday(), 480, String::new()));
    assert_eq!(days[1], (d(2026, 10, 20), 240, "override HalfDay: inspection".to_string()));
    assert_eq!(days[5], (d(2026, 10, 24), 0, "day off".to_string()));
}

#[test]
fn test_calendar_days_stop_at_last_date() {
    let s = Snapshot::default();
    let from = chrono::NaiveDate::MAX - chrono::Duration::days(2);
    let days = calendar_days(&s, from, 10);
    assert_eq!(days.len(), 3);
    assert_eq!(days[2].0, chrono::NaiveDate::MAX);
    let _ = calendar_table(&s, from, 10);
}

#[test]
fn test_project_stats_are_sorted_for_listing() {
    let (mut s, p1) = seeded();
    let p2 = cmd_project_add(&mut s, "Urgent".into(), vec![], None, None, true).unwrap();
    let p3 = cmd_project_add(&mut s, "Open-ended".into(), vec![], None, None, true).unwrap();
    let mut relaxed = free_task(&p1, None, "Work", 60);
    relaxed.deadline = Some("2026-12-01".into());
    let mut urgent = free_task(&p2, None, "Work", 60);
    urgent.deadline = Some("2026-10-20".into());
    cmd_task_add(&mut s, relaxed, true).unwrap();
    cmd_task_add(&mut s, urgent, true).unwrap();
    cmd_task_add(&mut s, free_task(&p3, None, "Work", 60), true).unwrap();

    let order: Vec<String> = all_project_stats(&s, monday())
        .into_iter()
        .map(|st| st.project_id)
        .collect();
    assert_eq!(order, vec![p2, p1, p3]);
}

#[test]
fn test_tree_rows_are_depth_first() {
    let (mut s, p) = seeded();
    let phase = cmd_task_add(&mut s, free_task(&p, None, "Phase", 0), true).unwrap();
    let a = cmd_task_add(&mut s, free_task(&p, Some(&phase), "A", 60), true).unwrap();
    let solo = cmd_task_add(&mut s, free_task(&p, None, "Solo", 60), true).unwrap();
    let b = cmd_task_add(&mut s, free_task(&p, Some(&a), "B", 60), true).unwrap();

    let tree = renotrack::progress::TaskTree::build(&s.tasks, &s.time_entries);
    let rows: Vec<(usize, String)> = tree_rows(&tree, &s, &p)
        .into_iter()
        .map(|(depth, t)| (depth, t.id.clone()))
        .collect();
    assert_eq!(rows, vec![(0, phase), (1, a), (2, b), (0, solo)]);
    assert!(task_tree_table(&s, "p99", monday()).is_err());
}

#[test]
fn test_snapshot_round_trip_through_db_path() {
    with_test_db(|path| {
        assert_eq!(db_path(), path);
        let (mut s, p) = seeded();
        let t = cmd_task_add(&mut s, free_task(&p, None, "Paint", 60), true).unwrap();
        cmd_log(&mut s, log(&t, 15), monday(), true).unwrap();
        cmd_override_add(&mut s, "2026-10-21", 0, CalendarOverrideType::Holiday, None, true).unwrap();

        save_snapshot(&s).unwrap();
        assert!(path.exists());
        assert_eq!(load_snapshot().unwrap(), s);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"timeEntries\""));
        assert!(raw.contains("\"type\": \"HOLIDAY\""));
    });
}

#[test]
fn test_reset_deletes_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    save_snapshot_to(&path, &Snapshot::default()).unwrap();
    cmd_reset(&path, true).unwrap();
    assert!(!path.exists());
    assert_eq!(load_snapshot_from(&path).unwrap(), Snapshot::default());
}
