mod common;

use taskforge::schedule::{Assignment, Schedule};

fn assignment(task: i32, machine: i32, begin: f64, end: f64) -> Assignment {
    Assignment {
        task,
        machine,
        begin,
        end,
    }
}

#[test]
fn test_wrong_machine_is_rejected_by_name() {
    let problem = common::forked_join();
    // Machine 999 is not part of group 1.
    let schedule = Schedule::new(
        problem,
        vec![
            assignment(1, 999, 0.0, 5.0),
            assignment(2, 102, 0.0, 5.0),
            assignment(3, 101, 5.0, 10.0),
        ],
    );

    let verdict = schedule.validate();
    let message = verdict.expect_err("wrong machine must fail validation");
    assert!(
        message.contains("task 1") && message.contains("999"),
        "diagnostic must name the task and the machine, got: {message}"
    );
}

#[test]
fn test_missing_assignment_is_rejected() {
    let problem = common::forked_join();
    let schedule = Schedule::new(
        problem,
        vec![assignment(1, 101, 0.0, 5.0), assignment(2, 102, 0.0, 5.0)],
    );
    let message = schedule.validate().expect_err("incomplete schedule");
    assert!(message.contains("not all tasks are assigned"), "got: {message}");
}

#[test]
fn test_predecessor_overlap_is_rejected() {
    let problem = common::forked_join();
    // Task 3 starts before task 1 (its predecessor) finishes.
    let schedule = Schedule::new(
        problem,
        vec![
            assignment(1, 101, 0.0, 5.0),
            assignment(2, 102, 0.0, 5.0),
            assignment(3, 101, 4.9, 9.9),
        ],
    );
    let message = schedule.validate().expect_err("precedence violation");
    assert!(
        message.contains("task 3") && message.contains("predecessor"),
        "got: {message}"
    );
}

#[test]
fn test_busy_machine_is_rejected() {
    let problem = common::contended_machine();
    let schedule = Schedule::new(
        problem,
        vec![
            assignment(1, 101, 0.0, 5.0),
            assignment(2, 101, 3.0, 8.0),
        ],
    );
    let message = schedule.validate().expect_err("machine double booking");
    assert!(
        message.contains("busy machine 101"),
        "diagnostic must name the machine, got: {message}"
    );
}

#[test]
fn test_boundary_handover_is_allowed() {
    // End and begin touching exactly is not an overlap.
    let problem = common::contended_machine();
    let schedule = Schedule::new(
        problem,
        vec![
            assignment(1, 101, 0.0, 5.0),
            assignment(2, 101, 5.0, 10.0),
        ],
    );
    assert!(schedule.validate().is_ok());
}

#[test]
fn test_verdict_is_stable_across_calls() {
    let problem = common::contended_machine();
    let schedule = Schedule::new(
        problem,
        vec![
            assignment(1, 101, 0.0, 5.0),
            assignment(2, 101, 3.0, 8.0),
        ],
    );
    let first = schedule.validate();
    let second = schedule.validate();
    assert_eq!(first, second, "the cached verdict must not change");
}

#[test]
fn test_expirations_report_overrun_amounts() {
    let problem = common::dependent_steps();
    // Chain decoded late on purpose: task 1 misses its deadline of 10.
    let schedule = Schedule::new(
        problem,
        vec![
            assignment(1, 101, 7.0, 12.0),
            assignment(2, 101, 12.0, 17.0),
        ],
    );

    let expired = schedule.expirations();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].0, 1);
    assert!((expired[0].1 - 2.0).abs() < 1e-9, "overrun is finish minus deadline");
}
