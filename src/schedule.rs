use std::collections::HashMap;
use std::io;
use std::sync::{Arc, OnceLock};

use chrono::{Duration, NaiveDateTime};

use crate::error::{TaskForgeError, TfResult};
use crate::model::{MachineId, Problem, TaskId, WorkHours};

/// Comparison tolerance for schedule times.
pub const TOLERANCE: f64 = 1e-5;

/// One task placed on one machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub task: TaskId,
    pub machine: MachineId,
    pub begin: f64,
    pub end: f64,
}

/// A fully decoded schedule.
///
/// The validity verdict is computed once on first request and cached, so
/// repeated checks of a shared schedule stay cheap.
#[derive(Debug)]
pub struct Schedule {
    problem: Arc<Problem>,
    assignments: Vec<Assignment>,
    verdict: OnceLock<Result<(), String>>,
}

impl Schedule {
    pub fn new(problem: Arc<Problem>, assignments: Vec<Assignment>) -> Self {
        Self {
            problem,
            assignments,
            verdict: OnceLock::new(),
        }
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks the schedule against the problem constraints. The first failed
    /// constraint is reported; the verdict is cached.
    pub fn validate(&self) -> Result<(), String> {
        self.verdict.get_or_init(|| self.check()).clone()
    }

    fn check(&self) -> Result<(), String> {
        if self.assignments.len() < self.problem.task_count() {
            return Err("not all tasks are assigned".into());
        }

        let mut ordered: Vec<&Assignment> = self.assignments.iter().collect();
        ordered.sort_by(|a, b| a.begin.total_cmp(&b.begin));

        let mut finish_times: HashMap<TaskId, f64> = HashMap::new();
        let mut busy_until: HashMap<MachineId, f64> = HashMap::new();
        for assignment in ordered {
            let task = self
                .problem
                .task(assignment.task)
                .ok_or_else(|| format!("unknown task {}", assignment.task))?;
            if !self.problem.group_for(task).contains(assignment.machine) {
                return Err(format!(
                    "task {} is assigned to a wrong machine {}",
                    assignment.task, assignment.machine
                ));
            }
            for &pre in task.predecessors() {
                match finish_times.get(&pre) {
                    Some(&finish) if finish - assignment.begin <= TOLERANCE => {}
                    _ => {
                        return Err(format!(
                            "task {} begins before predecessor {} finishes",
                            assignment.task, pre
                        ))
                    }
                }
            }
            if !self.problem.is_virtual(task.group) {
                if let Some(&occupied) = busy_until.get(&assignment.machine) {
                    if assignment.begin - occupied < -TOLERANCE {
                        return Err(format!(
                            "task {} is assigned to a busy machine {}",
                            assignment.task, assignment.machine
                        ));
                    }
                }
                busy_until.insert(assignment.machine, assignment.end);
            }
            finish_times.insert(assignment.task, assignment.end);
        }
        Ok(())
    }

    /// Latest finish time, `0.0` for an empty schedule.
    pub fn makespan(&self) -> f64 {
        self.assignments.iter().map(|a| a.end).fold(0.0, f64::max)
    }

    /// Tasks finishing past their deadline, with the overrun per task.
    pub fn expirations(&self) -> Vec<(TaskId, f64)> {
        let mut expired = Vec::new();
        for assignment in &self.assignments {
            let Some(task) = self.problem.task(assignment.task) else {
                continue;
            };
            if let Some(expire) = task.expire_time {
                let exceed = assignment.end - expire;
                if exceed > TOLERANCE {
                    expired.push((assignment.task, exceed));
                }
            }
        }
        expired
    }

    /// Writes assignments as CSV with raw schedule times.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> TfResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["task", "machine", "piece", "begin", "end"])?;
        for a in &self.assignments {
            let piece = self
                .problem
                .piece_of(a.task)
                .map(|p| p.to_string())
                .unwrap_or_default();
            csv.write_record([
                a.task.to_string(),
                a.machine.to_string(),
                piece,
                a.begin.to_string(),
                a.end.to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Writes assignments as CSV with schedule times projected onto calendar
    /// dates starting at `base` (midnight of the first production day).
    ///
    /// Each working day covers the problem's work-hours window; time outside
    /// the window does not exist on the schedule axis. An end time landing
    /// exactly on a day boundary is rendered as the previous day's closing
    /// time rather than the next day's opening time.
    pub fn write_dated_csv<W: io::Write>(&self, writer: W, base: NaiveDateTime) -> TfResult<()> {
        let work_hours = self.problem.work_hours();
        let unit_millis = self.problem.time_unit().millis();
        let work_millis = work_hours.work_millis();
        if work_millis <= 0 {
            return Err(TaskForgeError::Data(format!(
                "work hours {work_hours} leave no working time"
            )));
        }

        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["task", "machine", "piece", "begin", "end"])?;
        for a in &self.assignments {
            let piece = self
                .problem
                .piece_of(a.task)
                .map(|p| p.to_string())
                .unwrap_or_default();
            let begin = project_on_calendar(base, a.begin, unit_millis, work_hours, true)?;
            let end = project_on_calendar(base, a.end, unit_millis, work_hours, false)?;
            csv.write_record([
                a.task.to_string(),
                a.machine.to_string(),
                piece,
                begin.format("%Y-%m-%d %H:%M:%S").to_string(),
                end.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// Maps a schedule time onto a calendar date.
///
/// `day_start` keeps a boundary value at the opening of its day; otherwise it
/// is pulled back to the closing of the previous day, unless the working
/// window already spans the full day.
fn project_on_calendar(
    base: NaiveDateTime,
    time: f64,
    unit_millis: i64,
    work_hours: WorkHours,
    day_start: bool,
) -> TfResult<NaiveDateTime> {
    const DAY_MILLIS: i64 = 86_400_000;
    let work_millis = work_hours.work_millis();
    let start_offset = work_hours.start_offset_millis();

    let offset = time * unit_millis as f64;
    let mut day = (offset / work_millis as f64).floor() as i64;
    let mut in_day = (offset - day as f64 * work_millis as f64).round() as i64;
    if in_day == 0 && !day_start && start_offset + work_millis < DAY_MILLIS - 1 {
        in_day = work_millis;
        day -= 1;
    }

    base.checked_add_signed(Duration::milliseconds(
        day * DAY_MILLIS + start_offset + in_day,
    ))
    .ok_or_else(|| TaskForgeError::Data("schedule extends beyond representable dates".into()))
}
