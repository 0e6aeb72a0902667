use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{TaskForgeError, TfResult};
use crate::model::{
    GroupId, MachineGroup, MachineId, Problem, Task, TaskId, TimeUnit, WorkHours,
    UNRESTRICTED_GROUP,
};

/// Task CSV columns, in order: id, expire_time, require_time_each,
/// machine_group, count, next_task, prepare_time.
///
/// An empty or negative expire time means no deadline; an empty machine
/// group means the unrestricted group; an empty or `-1` next task means no
/// successor.
pub fn load_tasks<P: AsRef<Path>>(path: P, has_header: bool) -> TfResult<Vec<Task>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .trim(csv::Trim::All)
        .from_path(&path)?;

    let mut tasks = Vec::new();
    let mut seen: HashSet<TaskId> = HashSet::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let task = parse_task(&record)
            .map_err(|message| TaskForgeError::Data(format!("task row {}: {message}", row + 1)))?;
        if !seen.insert(task.id) {
            return Err(TaskForgeError::Data(format!(
                "duplicate task id {} in {}",
                task.id,
                path.as_ref().display()
            )));
        }
        tasks.push(task);
    }
    debug!(tasks = tasks.len(), path = %path.as_ref().display(), "tasks loaded");
    Ok(tasks)
}

/// Machine CSV columns, in order: machine_id, group_id, enable.
///
/// An empty group id means group 0; rows with enable 0 (or empty) are
/// skipped. The unrestricted group is derived later, during problem
/// construction, from every enabled machine.
pub fn load_machines<P: AsRef<Path>>(path: P, has_header: bool) -> TfResult<Vec<MachineGroup>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .trim(csv::Trim::All)
        .from_path(&path)?;

    let mut groups: BTreeMap<GroupId, Vec<MachineId>> = BTreeMap::new();
    let mut seen: HashSet<MachineId> = HashSet::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let (machine, group, enabled) = parse_machine(&record).map_err(|message| {
            TaskForgeError::Data(format!("machine row {}: {message}", row + 1))
        })?;
        if !seen.insert(machine) {
            return Err(TaskForgeError::Data(format!(
                "duplicate machine id {} in {}",
                machine,
                path.as_ref().display()
            )));
        }
        if !enabled {
            continue;
        }
        groups.entry(group).or_default().push(machine);
    }
    debug!(groups = groups.len(), path = %path.as_ref().display(), "machines loaded");
    Ok(groups
        .into_iter()
        .map(|(id, machines)| MachineGroup::new(id, machines))
        .collect())
}

/// Loads both CSV files and builds the scheduling problem.
pub fn load_problem<P: AsRef<Path>, Q: AsRef<Path>>(
    task_csv: P,
    machine_csv: Q,
    has_header: bool,
    work_hours: WorkHours,
    time_unit: TimeUnit,
) -> TfResult<Problem> {
    let tasks = load_tasks(task_csv, has_header)?;
    let groups = load_machines(machine_csv, has_header)?;
    Problem::with_calendar(tasks, groups, work_hours, time_unit)
}

fn parse_task(record: &csv::StringRecord) -> Result<Task, String> {
    let id: TaskId = required(record, 0, "id")?;
    let expire_time = optional::<f64>(record, 1, "expire_time")?.filter(|&t| t >= 0.0);
    let require_time_each: f64 = required(record, 2, "require_time_each")?;
    let group = optional::<GroupId>(record, 3, "machine_group")?.unwrap_or(UNRESTRICTED_GROUP);
    let count: u32 = required(record, 4, "count")?;
    let successor = optional::<TaskId>(record, 5, "next_task")?.filter(|&id| id >= 0);
    let prepare_time: f64 = required(record, 6, "prepare_time")?;

    let mut task = Task::new(id, group, require_time_each, count);
    task.expire_time = expire_time;
    task.successor = successor;
    task.prepare_time = prepare_time;
    Ok(task)
}

fn parse_machine(record: &csv::StringRecord) -> Result<(MachineId, GroupId, bool), String> {
    let machine: MachineId = required(record, 0, "machine_id")?;
    let group = optional::<GroupId>(record, 1, "group_id")?.unwrap_or(0);
    let enable = optional::<i32>(record, 2, "enable")?.unwrap_or(0);
    Ok((machine, group, enable != 0))
}

fn required<T: FromStr>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, String> {
    let raw = record
        .get(index)
        .ok_or_else(|| format!("missing column {name}"))?;
    raw.parse()
        .map_err(|_| format!("invalid {name} value '{raw}'"))
}

fn optional<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<Option<T>, String> {
    match record.get(index) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid {name} value '{raw}'")),
    }
}
