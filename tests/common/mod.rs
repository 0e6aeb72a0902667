#![allow(dead_code)]

use std::sync::Arc;

use taskforge::evaluator::FitnessStrategy;
use taskforge::model::{GroupId, MachineGroup, MachineId, Problem, Task, TaskId};
use taskforge::solver::{DecodePolicy, Encoding, SolverContext};

pub fn task(id: TaskId, group: GroupId, each: f64, count: u32) -> Task {
    Task::new(id, group, each, count)
}

pub fn group(id: GroupId, machines: &[MachineId]) -> MachineGroup {
    MachineGroup::new(id, machines.to_vec())
}

pub fn problem(tasks: Vec<Task>, groups: Vec<MachineGroup>) -> Arc<Problem> {
    Arc::new(Problem::new(tasks, groups).expect("fixture problem must build"))
}

pub fn context(problem: Arc<Problem>, policy: DecodePolicy) -> Arc<SolverContext> {
    context_with(problem, policy, FitnessStrategy::Tardiness)
}

pub fn context_with(
    problem: Arc<Problem>,
    policy: DecodePolicy,
    strategy: FitnessStrategy,
) -> Arc<SolverContext> {
    let encoding = Encoding::new(&problem);
    Arc::new(SolverContext {
        problem,
        encoding,
        policy,
        strategy,
        ms_crossover_repeat: 10,
    })
}

/// Task 1 feeds task 2 on a single machine: one piece with two steps.
/// Durations 5 each, deadlines 10 and 20.
pub fn dependent_steps() -> Arc<Problem> {
    let mut first = task(1, 1, 5.0, 1);
    first.expire_time = Some(10.0);
    first.successor = Some(2);
    let mut second = task(2, 1, 5.0, 1);
    second.expire_time = Some(20.0);
    problem(vec![first, second], vec![group(1, &[101])])
}

/// Tasks 1 and 2 both feed task 3 over a two-machine group: three pieces,
/// the last waiting on the other two.
pub fn forked_join() -> Arc<Problem> {
    let mut left = task(1, 1, 5.0, 1);
    left.expire_time = Some(10.0);
    left.successor = Some(3);
    let mut right = task(2, 1, 5.0, 1);
    right.expire_time = Some(10.0);
    right.successor = Some(3);
    let mut last = task(3, 1, 5.0, 1);
    last.expire_time = Some(20.0);
    problem(vec![left, right, last], vec![group(1, &[101, 102])])
}

/// Two independent single-task pieces contending for one machine.
pub fn contended_machine() -> Arc<Problem> {
    problem(
        vec![task(1, 1, 5.0, 1), task(2, 1, 5.0, 1)],
        vec![group(1, &[101])],
    )
}

/// Two independent tasks racing one machine. The deadlines admit zero
/// tardiness only when task 1 runs first, so a solve has exactly one
/// optimal processing order to discover.
pub fn deadline_race() -> Arc<Problem> {
    let mut urgent = task(1, 1, 5.0, 1);
    urgent.expire_time = Some(5.0);
    let mut relaxed = task(2, 1, 5.0, 1);
    relaxed.expire_time = Some(10.0);
    problem(vec![urgent, relaxed], vec![group(1, &[101])])
}

/// Six two-step chains funneling into a single finishing machine, with
/// deadlines the finishing machine cannot all meet. Keeps the optimum out of
/// reach so solver runs show gradual improvement.
pub fn crowded_shop() -> Arc<Problem> {
    let mut tasks = Vec::new();
    for job in 0..6 {
        let cut_id = (job * 2 + 1) as TaskId;
        let finish_id = cut_id + 1;
        let mut cut = task(cut_id, 1, 8.0, 1);
        cut.successor = Some(finish_id);
        let mut finish = task(finish_id, 2, 6.0, 1);
        finish.expire_time = Some(20.0 + 2.5 * job as f64);
        tasks.push(cut);
        tasks.push(finish);
    }
    problem(
        tasks,
        vec![group(1, &[101, 102]), group(2, &[201])],
    )
}
