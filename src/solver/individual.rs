use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::model::{MachineId, TaskId};
use crate::schedule::{Assignment, Schedule};
use crate::solver::repair::RepairEngine;
use crate::solver::SolverContext;

/// Direction a chromosome is turned into concrete times.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Earliest-start scheduling from time zero.
    #[default]
    Forward,
    /// Latest-start scheduling from the chain ends, shifted back to zero.
    /// Biases schedules toward deadline feasibility.
    Backward,
}

/// One candidate solution: a two-segment chromosome plus its memoized decoded
/// schedule and fitness.
///
/// Individuals never change after construction; every genetic operator builds
/// a new one, which is what keeps the two caches trustworthy.
#[derive(Debug)]
pub struct Individual {
    ctx: Arc<SolverContext>,
    ms: Vec<usize>,
    os: Vec<usize>,
    schedule: OnceLock<Arc<Schedule>>,
    fitness: OnceLock<f64>,
}

impl Individual {
    /// Builds an individual from raw segments. `os` must already be
    /// dependency-feasible; operators repair before calling this.
    pub fn new(ctx: Arc<SolverContext>, ms: Vec<usize>, os: Vec<usize>) -> Self {
        Self {
            ctx,
            ms,
            os,
            schedule: OnceLock::new(),
            fitness: OnceLock::new(),
        }
    }

    pub fn random(
        ctx: &Arc<SolverContext>,
        rng: &mut fastrand::Rng,
        repair: &mut RepairEngine,
    ) -> Self {
        let ms = ctx.encoding.random_ms(rng);
        let mut os = ctx.encoding.shuffled_os(rng);
        repair.repair(&ctx.problem, &mut os);
        Self::new(Arc::clone(ctx), ms, os)
    }

    pub fn ms(&self) -> &[usize] {
        &self.ms
    }

    pub fn os(&self) -> &[usize] {
        &self.os
    }

    pub fn context(&self) -> &Arc<SolverContext> {
        &self.ctx
    }

    pub fn schedule(&self) -> &Arc<Schedule> {
        self.schedule.get_or_init(|| Arc::new(self.decode()))
    }

    pub fn fitness(&self) -> f64 {
        *self
            .fitness
            .get_or_init(|| self.ctx.strategy.evaluate(self.schedule()))
    }

    fn decode(&self) -> Schedule {
        match self.ctx.policy {
            DecodePolicy::Forward => self.decode_forward(),
            DecodePolicy::Backward => self.decode_backward(),
        }
    }

    /// Scans OS left to right, starting every task-step as early as its
    /// predecessors and (for contended groups) its chosen machine allow.
    fn decode_forward(&self) -> Schedule {
        let problem = &self.ctx.problem;
        let encoding = &self.ctx.encoding;
        let pieces = problem.pieces();

        let mut steps_taken = vec![0usize; pieces.len()];
        let mut finish_times: HashMap<TaskId, f64> = HashMap::new();
        let mut machine_free: HashMap<MachineId, f64> = HashMap::new();
        let mut assignments = Vec::with_capacity(self.os.len());
        for &piece_id in &self.os {
            let order = steps_taken[piece_id];
            steps_taken[piece_id] += 1;
            let task_id = pieces[piece_id].tasks[order];
            let task = problem.task_ref(task_id);
            let machine = problem
                .group_for(task)
                .machine_at(self.ms[encoding.slot(piece_id, order)]);

            let mut begin = 0.0f64;
            for &pre in task.predecessors() {
                if let Some(&finish) = finish_times.get(&pre) {
                    begin = begin.max(finish);
                }
            }
            let end;
            if problem.is_virtual(task.group) {
                end = begin + task.require_time();
            } else {
                if let Some(&free) = machine_free.get(&machine) {
                    begin = begin.max(free);
                }
                end = begin + task.require_time();
                machine_free.insert(machine, end);
            }
            finish_times.insert(task_id, end);
            assignments.push(Assignment {
                task: task_id,
                machine,
                begin,
                end,
            });
        }
        Schedule::new(Arc::clone(problem), assignments)
    }

    /// Scans OS right to left, resolving each piece's task-steps from last to
    /// first and ending every task as late as its successor and machine
    /// allow, then shifts the whole schedule so it starts at zero.
    fn decode_backward(&self) -> Schedule {
        let problem = &self.ctx.problem;
        let encoding = &self.ctx.encoding;
        let pieces = problem.pieces();

        let mut steps_taken = vec![0usize; pieces.len()];
        let mut begin_times: HashMap<TaskId, f64> = HashMap::new();
        // Earliest occupied time per machine, moving backward.
        let mut machine_edge: HashMap<MachineId, f64> = HashMap::new();
        let mut earliest = 0.0f64;
        let mut reversed: Vec<(TaskId, MachineId, f64, f64)> =
            Vec::with_capacity(self.os.len());
        for &piece_id in self.os.iter().rev() {
            let order = steps_taken[piece_id];
            steps_taken[piece_id] += 1;
            let offset = pieces[piece_id].len() - 1 - order;
            let task_id = pieces[piece_id].tasks[offset];
            let task = problem.task_ref(task_id);
            let machine = problem
                .group_for(task)
                .machine_at(self.ms[encoding.slot(piece_id, offset)]);

            let mut end = 0.0f64;
            if let Some(successor) = task.successor {
                if let Some(&succ_begin) = begin_times.get(&successor) {
                    end = end.min(succ_begin);
                }
            }
            let require = task.require_time();
            let begin;
            if problem.is_virtual(task.group) {
                begin = end - require;
            } else {
                if let Some(&edge) = machine_edge.get(&machine) {
                    end = end.min(edge);
                }
                begin = end - require;
                machine_edge.insert(machine, begin);
            }
            earliest = earliest.min(begin);
            begin_times.insert(task_id, begin);
            reversed.push((task_id, machine, begin, require));
        }

        let assignments = reversed
            .into_iter()
            .rev()
            .map(|(task, machine, begin, require)| {
                let begin = begin - earliest;
                Assignment {
                    task,
                    machine,
                    begin,
                    end: begin + require,
                }
            })
            .collect();
        Schedule::new(Arc::clone(problem), assignments)
    }

    /// New individual with one machine-selection gene re-rolled.
    pub fn ms_mutated(&self, rng: &mut fastrand::Rng) -> Self {
        let mut ms = self.ms.clone();
        let slot = rng.usize(0..ms.len());
        ms[slot] = rng.usize(0..self.ctx.encoding.ms_range[slot]);
        Self::new(Arc::clone(&self.ctx), ms, self.os.clone())
    }

    /// New individual with two sequence positions swapped and repaired.
    pub fn os_mutated(&self, rng: &mut fastrand::Rng, repair: &mut RepairEngine) -> Self {
        let mut os = self.os.clone();
        let a = rng.usize(0..os.len());
        let b = rng.usize(0..os.len());
        os.swap(a, b);
        repair.repair(&self.ctx.problem, &mut os);
        Self::new(Arc::clone(&self.ctx), self.ms.clone(), os)
    }

    /// Crosses two parents and returns the fitter child first.
    ///
    /// The sequence segments go through order crossover and repair once; the
    /// machine segments are then re-mixed `ms_crossover_repeat` extra times
    /// on the children's sequences, keeping the two best candidates seen.
    /// A fresh machine mix needs no repair, which makes the retrials a cheap
    /// fitness-driven search.
    pub fn crossover(
        first: &Individual,
        second: &Individual,
        rng: &mut fastrand::Rng,
        repair: &mut RepairEngine,
    ) -> (Individual, Individual) {
        let ctx = &first.ctx;
        let (mut os_a, mut os_b) = order_crossover(&first.os, &second.os, rng);
        repair.repair(&ctx.problem, &mut os_a);
        repair.repair(&ctx.problem, &mut os_b);
        let (ms_a, ms_b) = uniform_crossover(&first.ms, &second.ms, rng);

        let mut best = Individual::new(Arc::clone(ctx), ms_a, os_a);
        let mut runner_up = Individual::new(Arc::clone(ctx), ms_b, os_b);
        if runner_up.fitness() > best.fitness() {
            std::mem::swap(&mut best, &mut runner_up);
        }

        // Retrials keep the sequence pairing fixed and only re-draw the
        // machine segments from the parents.
        let (os_a, os_b) = (best.os.clone(), runner_up.os.clone());
        for _ in 0..ctx.ms_crossover_repeat {
            let (ms_a, ms_b) = uniform_crossover(&first.ms, &second.ms, rng);
            let retry_a = Individual::new(Arc::clone(ctx), ms_a, os_a.clone());
            let retry_b = Individual::new(Arc::clone(ctx), ms_b, os_b.clone());
            for candidate in [retry_a, retry_b] {
                if candidate.fitness() > best.fitness() {
                    runner_up = std::mem::replace(&mut best, candidate);
                } else if candidate.fitness() > runner_up.fitness() {
                    runner_up = candidate;
                }
            }
        }
        (best, runner_up)
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ms={:?} os={:?}", self.ms, self.os)?;
        if let Some(fitness) = self.fitness.get() {
            write!(f, " fitness={fitness}")?;
        }
        Ok(())
    }
}

/// Order crossover over sequences with repeated entries.
///
/// A random window is copied by position from the direct parent; the rest is
/// filled from the other parent, scanning from just past the window and
/// wrapping, skipping occurrences already covered by the window. Occurrences
/// are matched as (piece, occurrence-index) pairs so multiplicities survive.
fn order_crossover(
    a: &[usize],
    b: &[usize],
    rng: &mut fastrand::Rng,
) -> (Vec<usize>, Vec<usize>) {
    let len = a.len();
    let mut lo = rng.usize(0..len);
    let mut hi = rng.usize(0..len);
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }
    (ox_child(a, b, lo, hi), ox_child(b, a, lo, hi))
}

fn ox_child(direct: &[usize], fill: &[usize], lo: usize, hi: usize) -> Vec<usize> {
    let len = direct.len();
    // Occurrence ordinal of every direct-parent position, left to right.
    let mut ordinal = vec![0usize; len];
    let mut seen = vec![0usize; len];
    for (position, &piece) in direct.iter().enumerate() {
        ordinal[position] = seen[piece];
        seen[piece] += 1;
    }
    let placed: std::collections::HashSet<(usize, usize)> =
        (lo..=hi).map(|position| (direct[position], ordinal[position])).collect();

    let mut child = vec![0usize; len];
    child[lo..=hi].copy_from_slice(&direct[lo..=hi]);

    let mut write = (hi + 1) % len;
    let mut seen_fill = vec![0usize; len];
    for step in 1..=len {
        let position = (hi + step) % len;
        let piece = fill[position];
        let occurrence = seen_fill[piece];
        seen_fill[piece] += 1;
        if placed.contains(&(piece, occurrence)) {
            continue;
        }
        child[write] = piece;
        write = (write + 1) % len;
    }
    child
}

/// Per-gene coin-flip mix producing two complementary children.
fn uniform_crossover(
    a: &[usize],
    b: &[usize],
    rng: &mut fastrand::Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut child_a = Vec::with_capacity(a.len());
    let mut child_b = Vec::with_capacity(a.len());
    for (&gene_a, &gene_b) in a.iter().zip(b) {
        if rng.bool() {
            child_a.push(gene_a);
            child_b.push(gene_b);
        } else {
            child_a.push(gene_b);
            child_b.push(gene_a);
        }
    }
    (child_a, child_b)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn multiset(sequence: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; sequence.len()];
        for &piece in sequence {
            counts[piece] += 1;
        }
        counts
    }

    #[test]
    fn ox_window_is_copied_verbatim() {
        let a = vec![0, 1, 2, 2, 3];
        let b = vec![3, 2, 2, 1, 0];
        let child = ox_child(&a, &b, 1, 3);
        assert_eq!(&child[1..=3], &a[1..=3]);
        assert_eq!(multiset(&child), multiset(&a));
    }

    #[test]
    fn ox_full_window_reproduces_direct_parent() {
        let a = vec![0, 1, 2, 2, 3];
        let b = vec![3, 2, 2, 1, 0];
        assert_eq!(ox_child(&a, &b, 0, 4), a);
    }

    #[test]
    fn uniform_crossover_children_are_complementary() {
        let a = vec![0, 0, 0, 0, 0, 0];
        let b = vec![1, 1, 1, 1, 1, 1];
        let mut rng = fastrand::Rng::with_seed(11);
        let (c1, c2) = uniform_crossover(&a, &b, &mut rng);
        for i in 0..a.len() {
            assert_eq!(c1[i] + c2[i], 1);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn ox_children_preserve_occurrence_multiplicity(seed in any::<u64>()) {
            let mut rng = fastrand::Rng::with_seed(seed);
            let template = vec![0, 0, 1, 2, 2, 2, 3, 4, 4];
            let mut a = template.clone();
            let mut b = template.clone();
            rng.shuffle(&mut a);
            rng.shuffle(&mut b);
            let (c1, c2) = order_crossover(&a, &b, &mut rng);
            prop_assert_eq!(multiset(&c1), multiset(&template));
            prop_assert_eq!(multiset(&c2), multiset(&template));
        }
    }
}
