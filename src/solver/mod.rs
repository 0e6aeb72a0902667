pub mod encoding;
pub mod individual;
pub mod pool;
pub mod repair;

pub use encoding::Encoding;
pub use individual::{DecodePolicy, Individual};
pub use repair::RepairEngine;

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::error::{TaskForgeError, TfResult};
use crate::evaluator::FitnessStrategy;
use crate::model::Problem;
use crate::schedule::{Schedule, TOLERANCE};
use pool::{SliceStats, WorkItem, WorkReply, WorkerPool};

/// Pairs dispatched per crossover work item.
const CROSSOVER_BATCH: usize = 20;

/// Immutable state shared by the controller and every worker for one solve.
#[derive(Debug)]
pub struct SolverContext {
    pub problem: Arc<Problem>,
    pub encoding: Encoding,
    pub policy: DecodePolicy,
    pub strategy: FitnessStrategy,
    pub ms_crossover_repeat: usize,
}

/// Outcome of a completed solve.
pub struct Solution {
    pub schedule: Arc<Schedule>,
    pub fitness: f64,
    pub generations: usize,
}

/// Genetic-algorithm scheduler. One instance solves one problem; `run` may be
/// called repeatedly and reproduces its result for a fixed seed.
pub struct Solver {
    ctx: Arc<SolverContext>,
    config: SolverConfig,
}

impl Solver {
    /// Validates the configuration and prepares the shared solve context.
    pub fn new(problem: Arc<Problem>, config: SolverConfig) -> TfResult<Self> {
        config.validate()?;
        let encoding = Encoding::new(&problem);
        let ctx = Arc::new(SolverContext {
            problem,
            encoding,
            policy: config.decode_policy,
            strategy: config.strategy,
            ms_crossover_repeat: config.ms_crossover_repeat,
        });
        Ok(Self { ctx, config })
    }

    pub fn context(&self) -> &Arc<SolverContext> {
        &self.ctx
    }

    pub fn run(&self) -> TfResult<Solution> {
        let started = Instant::now();
        let mut rng = match self.config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let pool = if self.config.workers > 1 {
            Some(WorkerPool::spawn(self.config.workers)?)
        } else {
            None
        };
        let mut repair = RepairEngine::new();

        let size = self.config.population;
        let elite = size / 100;
        let optimum = self.ctx.strategy.optimum();
        let mut population: Vec<Arc<Individual>> = (0..size)
            .map(|_| {
                let mut child_rng = rng.fork();
                Arc::new(Individual::random(&self.ctx, &mut child_rng, &mut repair))
            })
            .collect();
        let mut best = Arc::clone(&population[0]);

        let mut generations = 0;
        for generation in 0..self.config.max_generations {
            generations = generation + 1;

            let stats = self.decode_phase(pool.as_ref(), &population)?;
            if stats.best_fitness > best.fitness() {
                best = Arc::clone(&population[stats.best_index]);
            }

            if self.config.debug_validate {
                self.assert_population_valid(&population)?;
            }
            if best.schedule().validate().is_err() {
                best = self.recover_best(&mut population, &mut rng, &mut repair);
            }

            debug!(
                generation,
                best_fitness = best.fitness(),
                average_fitness = stats.fitness_sum / size as f64,
                "generation complete"
            );
            if (best.fitness() - optimum).abs() < TOLERANCE {
                debug!(generation, "optimum reached");
                break;
            }

            let mut generation_rng = rng.fork();
            self.select(&mut population, elite, &mut generation_rng);
            self.crossover_phase(pool.as_ref(), &mut population, elite, &mut generation_rng, &mut repair)?;
            self.mutate(&mut population, &mut generation_rng, &mut repair);
        }

        if best.schedule().validate().is_err() {
            population.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
            match population.iter().find(|i| i.schedule().is_valid()) {
                Some(valid) => best = Arc::clone(valid),
                None => {
                    return Err(TaskForgeError::Solve(
                        "no feasible individual in the final population; \
                         gene repair or decoding is defective"
                            .into(),
                    ))
                }
            }
        }

        info!(
            fitness = best.fitness(),
            generations,
            elapsed = ?started.elapsed(),
            "solve finished"
        );
        Ok(Solution {
            schedule: Arc::clone(best.schedule()),
            fitness: best.fitness(),
            generations,
        })
    }

    /// Computes every individual's fitness, in parallel when a pool exists,
    /// and reports the generation's best slot and fitness sum. Slice results
    /// are merged in offset order, ties broken toward the lower index, so the
    /// outcome does not depend on worker timing.
    fn decode_phase(
        &self,
        pool: Option<&WorkerPool>,
        population: &[Arc<Individual>],
    ) -> TfResult<SliceStats> {
        let Some(pool) = pool else {
            return Ok(pool::decode_slice(population, 0, 1));
        };

        let snapshot = Arc::new(population.to_vec());
        let workers = pool.worker_count();
        for worker in 0..workers {
            pool.dispatch(
                worker,
                WorkItem::Decode {
                    population: Arc::clone(&snapshot),
                    offset: worker,
                    stride: workers,
                },
            )?;
        }
        let mut slices = Vec::with_capacity(workers);
        for reply in pool.collect(workers)? {
            match reply {
                WorkReply::Decode(stats) => slices.push(stats),
                _ => return Err(TaskForgeError::Solve("unexpected worker reply".into())),
            }
        }
        slices.sort_by_key(|slice| slice.offset);

        let mut merged = slices[0];
        merged.fitness_sum = 0.0;
        for slice in &slices {
            merged.fitness_sum += slice.fitness_sum;
            match slice.best_fitness.total_cmp(&merged.best_fitness) {
                Ordering::Greater => {
                    merged.best_fitness = slice.best_fitness;
                    merged.best_index = slice.best_index;
                }
                Ordering::Equal if slice.best_index < merged.best_index => {
                    merged.best_index = slice.best_index;
                }
                _ => {}
            }
        }
        Ok(merged)
    }

    fn assert_population_valid(&self, population: &[Arc<Individual>]) -> TfResult<()> {
        for individual in population {
            if let Err(diagnostic) = individual.schedule().validate() {
                return Err(TaskForgeError::Solve(format!(
                    "debug validation failed: {diagnostic}; offending individual: {individual}"
                )));
            }
        }
        Ok(())
    }

    /// Adopts the first valid individual as best, replacing the invalid ones
    /// scanned over with fresh random individuals. When nothing validates,
    /// one extra fresh individual becomes the best.
    fn recover_best(
        &self,
        population: &mut [Arc<Individual>],
        rng: &mut fastrand::Rng,
        repair: &mut RepairEngine,
    ) -> Arc<Individual> {
        debug!("best individual decoded invalid, scanning population for a valid one");
        for slot in population.iter_mut() {
            if slot.schedule().is_valid() {
                return Arc::clone(slot);
            }
            let mut child_rng = rng.fork();
            *slot = Arc::new(Individual::random(&self.ctx, &mut child_rng, repair));
        }
        let mut child_rng = rng.fork();
        Arc::new(Individual::random(&self.ctx, &mut child_rng, repair))
    }

    /// Elitist tournament selection: the top slots survive unchanged, the
    /// rest are drawn pairwise from the non-elite pool, keeping the fitter
    /// pick with the configured probability.
    fn select(
        &self,
        population: &mut Vec<Arc<Individual>>,
        elite: usize,
        rng: &mut fastrand::Rng,
    ) {
        population.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        let size = population.len();
        let pool_size = size - elite;
        let mut next = Vec::with_capacity(size);
        next.extend(population[..elite].iter().cloned());
        for _ in elite..size {
            let first = rng.usize(0..pool_size);
            let second = rng.usize(0..pool_size);
            // The pool is sorted descending, so the lower index is fitter.
            let (better, worse) = if first <= second {
                (first, second)
            } else {
                (second, first)
            };
            let chosen = if rng.f64() < self.config.select_better_rate {
                better
            } else {
                worse
            };
            next.push(Arc::clone(&population[elite + chosen]));
        }
        *population = next;
    }

    /// Pairs non-elite individuals in a single-threaded scan, then replaces
    /// each pair with its crossover children, batch by batch. Batch seeds are
    /// drawn here, in batch order, so the children are reproducible for any
    /// worker count.
    fn crossover_phase(
        &self,
        pool: Option<&WorkerPool>,
        population: &mut [Arc<Individual>],
        elite: usize,
        rng: &mut fastrand::Rng,
        repair: &mut RepairEngine,
    ) -> TfResult<()> {
        let size = population.len();
        let threshold = 1.0 - self.config.crossover_rate;
        let mut paired = vec![false; size];
        let mut pairs = Vec::new();
        for first in elite..size {
            if paired[first] {
                continue;
            }
            for second in (first + 1)..size {
                if paired[second] {
                    continue;
                }
                if rng.f64() >= threshold {
                    paired[first] = true;
                    paired[second] = true;
                    pairs.push((first, second));
                    break;
                }
            }
        }
        if pairs.is_empty() {
            return Ok(());
        }
        let batches: Vec<(Vec<(usize, usize)>, u64)> = pairs
            .chunks(CROSSOVER_BATCH)
            .map(|chunk| (chunk.to_vec(), rng.u64(..)))
            .collect();
        let snapshot = Arc::new(population.to_vec());

        let Some(pool) = pool else {
            for (batch, seed) in batches {
                for (first, second, fitter, other) in
                    pool::crossover_batch(&snapshot, &batch, seed, repair)
                {
                    population[first] = Arc::new(fitter);
                    population[second] = Arc::new(other);
                }
            }
            return Ok(());
        };

        let expected = batches.len();
        for (index, (batch, seed)) in batches.into_iter().enumerate() {
            pool.dispatch(
                index % pool.worker_count(),
                WorkItem::Crossover {
                    population: Arc::clone(&snapshot),
                    pairs: batch,
                    seed,
                },
            )?;
        }
        for reply in pool.collect(expected)? {
            match reply {
                WorkReply::Crossover(children) => {
                    for (first, second, fitter, other) in children {
                        population[first] = Arc::new(fitter);
                        population[second] = Arc::new(other);
                    }
                }
                _ => return Err(TaskForgeError::Solve("unexpected worker reply".into())),
            }
        }
        Ok(())
    }

    /// Swap and reset mutation, each applied with half the configured rate so
    /// the two together meet the rate in expectation. Elite slots are not
    /// exempt.
    fn mutate(
        &self,
        population: &mut [Arc<Individual>],
        rng: &mut fastrand::Rng,
        repair: &mut RepairEngine,
    ) {
        let half_rate = self.config.mutation_rate / 2.0;
        for slot in population.iter_mut() {
            if rng.f64() < half_rate {
                *slot = Arc::new(slot.ms_mutated(rng));
            }
            if rng.f64() < half_rate {
                *slot = Arc::new(slot.os_mutated(rng, repair));
            }
        }
    }
}
