//! CSV export, plain and calendar dated.

use std::sync::Arc;

use chrono::NaiveDate;

use taskforge::model::{MachineGroup, Problem, Task, TimeUnit, WorkHours};
use taskforge::schedule::{Assignment, Schedule};

/// An eight-hour task followed by a two-hour task on one machine, with
/// schedule times in minutes.
fn two_shift_schedule(hours: WorkHours) -> Schedule {
    let long = Task::new(1, 1, 480.0, 1);
    let short = Task::new(2, 1, 120.0, 1);
    let problem = Problem::with_calendar(
        vec![long, short],
        vec![MachineGroup::new(1, vec![101])],
        hours,
        TimeUnit::Minute,
    )
    .expect("fixture problem must build");
    Schedule::new(
        Arc::new(problem),
        vec![
            Assignment {
                task: 1,
                machine: 101,
                begin: 0.0,
                end: 480.0,
            },
            Assignment {
                task: 2,
                machine: 101,
                begin: 480.0,
                end: 600.0,
            },
        ],
    )
}

fn march_second() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

#[test]
fn test_plain_export_writes_raw_times() {
    let schedule = two_shift_schedule(WorkHours::new(8, 0, 16, 0));
    let mut buffer = Vec::new();
    schedule.write_csv(&mut buffer).expect("export succeeds");
    let text = String::from_utf8(buffer).expect("csv is utf-8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "task,machine,piece,begin,end",
            "1,101,0,0,480",
            "2,101,1,480,600",
        ]
    );
}

#[test]
fn test_dated_export_projects_onto_working_days() {
    let schedule = two_shift_schedule(WorkHours::new(8, 0, 16, 0));
    let mut buffer = Vec::new();
    schedule
        .write_dated_csv(&mut buffer, march_second())
        .expect("export succeeds");
    let text = String::from_utf8(buffer).expect("csv is utf-8");
    let lines: Vec<&str> = text.lines().collect();
    // 480 minutes fill the eight-hour day exactly: the first task ends at
    // Monday's closing time, and the second starts at Tuesday's opening.
    assert_eq!(
        lines,
        vec![
            "task,machine,piece,begin,end",
            "1,101,0,2026-03-02 08:00:00,2026-03-02 16:00:00",
            "2,101,1,2026-03-03 08:00:00,2026-03-03 10:00:00",
        ]
    );
}

#[test]
fn test_full_day_window_keeps_boundary_at_next_opening() {
    let problem = Problem::with_calendar(
        vec![Task::new(1, 1, 1440.0, 1)],
        vec![MachineGroup::new(1, vec![101])],
        WorkHours::default(),
        TimeUnit::Minute,
    )
    .expect("fixture problem must build");
    let schedule = Schedule::new(
        Arc::new(problem),
        vec![Assignment {
            task: 1,
            machine: 101,
            begin: 0.0,
            end: 1440.0,
        }],
    );
    let mut buffer = Vec::new();
    schedule
        .write_dated_csv(&mut buffer, march_second())
        .expect("export succeeds");
    let text = String::from_utf8(buffer).expect("csv is utf-8");
    // A full-day window has no distinct closing time to pull back to.
    assert!(
        text.lines()
            .any(|line| line.ends_with("2026-03-02 00:00:00,2026-03-03 00:00:00")),
        "got: {text}"
    );
}

#[test]
fn test_empty_working_window_is_rejected() {
    let schedule = two_shift_schedule(WorkHours::new(8, 0, 8, 0));
    let error = schedule
        .write_dated_csv(&mut Vec::new(), march_second())
        .expect_err("a zero-width window cannot host any work");
    assert!(error.to_string().contains("no working time"), "got: {error}");
}

#[test]
fn test_makespan_spans_the_latest_end() {
    let schedule = two_shift_schedule(WorkHours::default());
    assert_eq!(schedule.makespan(), 600.0);
}
