use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::debug;

use crate::error::{TaskForgeError, TfResult};
use crate::solver::individual::Individual;
use crate::solver::repair::RepairEngine;

/// Work published by the controller. Decode items partition the population by
/// stride; crossover items carry disjoint index pairs, so workers never touch
/// the same slot twice in one phase.
pub enum WorkItem {
    Decode {
        population: Arc<Vec<Arc<Individual>>>,
        offset: usize,
        stride: usize,
    },
    Crossover {
        population: Arc<Vec<Arc<Individual>>>,
        pairs: Vec<(usize, usize)>,
        seed: u64,
    },
    Exit,
}

#[derive(Debug)]
pub enum WorkReply {
    Decode(SliceStats),
    /// `(slot of fitter child, slot of other child, children)` per pair.
    Crossover(Vec<(usize, usize, Individual, Individual)>),
    Failed(String),
}

/// Local result of one decode slice.
#[derive(Debug, Clone, Copy)]
pub struct SliceStats {
    pub offset: usize,
    pub best_index: usize,
    pub best_fitness: f64,
    pub fitness_sum: f64,
}

/// Fixed set of long-lived solver threads.
///
/// Each worker owns a private repair engine for its lifetime and a bounded
/// input channel; replies funnel into one shared channel the controller
/// drains, counting replies against dispatched items as the phase barrier.
pub struct WorkerPool {
    senders: Vec<mpsc::SyncSender<WorkItem>>,
    replies: mpsc::Receiver<WorkReply>,
    handles: Vec<JoinHandle<()>>,
}

const INPUT_QUEUE_BOUND: usize = 16;

impl WorkerPool {
    pub fn spawn(workers: usize) -> TfResult<Self> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let (item_tx, item_rx) = mpsc::sync_channel(INPUT_QUEUE_BOUND);
            let replies = reply_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("taskforge-worker-{index}"))
                .spawn(move || worker_loop(index, item_rx, replies))?;
            senders.push(item_tx);
            handles.push(handle);
        }
        Ok(Self {
            senders,
            replies: reply_rx,
            handles,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Blocks when the worker's input queue is full.
    pub fn dispatch(&self, worker: usize, item: WorkItem) -> TfResult<()> {
        self.senders[worker]
            .send(item)
            .map_err(|_| TaskForgeError::Solve("solver worker channel closed".into()))
    }

    /// Barrier: waits for exactly `expected` replies. A failure reply aborts
    /// the phase immediately.
    pub fn collect(&self, expected: usize) -> TfResult<Vec<WorkReply>> {
        let mut replies = Vec::with_capacity(expected);
        for _ in 0..expected {
            match self.replies.recv() {
                Ok(WorkReply::Failed(message)) => {
                    return Err(TaskForgeError::Solve(format!(
                        "solver worker failed: {message}"
                    )))
                }
                Ok(reply) => replies.push(reply),
                Err(_) => {
                    return Err(TaskForgeError::Solve(
                        "solver workers exited before completing the phase".into(),
                    ))
                }
            }
        }
        Ok(replies)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for sender in &self.senders {
            let _ = sender.send(WorkItem::Exit);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    index: usize,
    items: mpsc::Receiver<WorkItem>,
    replies: mpsc::Sender<WorkReply>,
) {
    debug!(worker = index, "solver worker started");
    let mut repair = RepairEngine::new();
    while let Ok(item) = items.recv() {
        match item {
            WorkItem::Exit => break,
            WorkItem::Decode {
                population,
                offset,
                stride,
            } => {
                let mut guard = ReplyGuard::new(&replies);
                let stats = decode_slice(&population, offset, stride);
                if guard.send(WorkReply::Decode(stats)).is_err() {
                    break;
                }
            }
            WorkItem::Crossover {
                population,
                pairs,
                seed,
            } => {
                let mut guard = ReplyGuard::new(&replies);
                let children = crossover_batch(&population, &pairs, seed, &mut repair);
                if guard.send(WorkReply::Crossover(children)).is_err() {
                    break;
                }
            }
        }
    }
    debug!(worker = index, "solver worker stopped");
}

/// A panicking work unit still serves the barrier, as a failure reply.
struct ReplyGuard<'a> {
    replies: &'a mpsc::Sender<WorkReply>,
    armed: bool,
}

impl<'a> ReplyGuard<'a> {
    fn new(replies: &'a mpsc::Sender<WorkReply>) -> Self {
        Self {
            replies,
            armed: true,
        }
    }

    fn send(&mut self, reply: WorkReply) -> Result<(), mpsc::SendError<WorkReply>> {
        self.armed = false;
        self.replies.send(reply)
    }
}

impl Drop for ReplyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self
                .replies
                .send(WorkReply::Failed("work unit panicked".into()));
        }
    }
}

/// Decodes indices `offset, offset + stride, ...`, tracking the local best
/// and the fitness sum of the slice. The best starts from index 0 so every
/// slice reports against the same baseline.
pub(crate) fn decode_slice(
    population: &[Arc<Individual>],
    offset: usize,
    stride: usize,
) -> SliceStats {
    let mut best_index = 0;
    let mut best_fitness = population[0].fitness();
    let mut fitness_sum = 0.0;
    let mut index = offset;
    while index < population.len() {
        let fitness = population[index].fitness();
        fitness_sum += fitness;
        if fitness > best_fitness {
            best_fitness = fitness;
            best_index = index;
        }
        index += stride;
    }
    SliceStats {
        offset,
        best_index,
        best_fitness,
        fitness_sum,
    }
}

/// Runs one crossover batch with its own seeded generator, so results do not
/// depend on which worker picks the batch up.
pub(crate) fn crossover_batch(
    population: &[Arc<Individual>],
    pairs: &[(usize, usize)],
    seed: u64,
    repair: &mut RepairEngine,
) -> Vec<(usize, usize, Individual, Individual)> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut children = Vec::with_capacity(pairs.len());
    for &(first, second) in pairs {
        let (fitter, other) =
            Individual::crossover(&population[first], &population[second], &mut rng, repair);
        children.push((first, second, fitter, other));
    }
    children
}
