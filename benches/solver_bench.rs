use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use taskforge::config::SolverConfig;
use taskforge::evaluator::FitnessStrategy;
use taskforge::model::{MachineGroup, Problem, Task};
use taskforge::solver::{DecodePolicy, Encoding, Individual, RepairEngine, Solver, SolverContext};

/// Ten jobs of three chained steps across three machine groups.
fn setup_problem() -> Arc<Problem> {
    let mut tasks = Vec::new();
    for job in 0..10i32 {
        let cut = job * 3 + 1;
        let fit = cut + 1;
        let finish = cut + 2;

        let mut first = Task::new(cut, 1, 4.0, 1);
        first.successor = Some(fit);
        let mut second = Task::new(fit, 2, 6.0, 1);
        second.successor = Some(finish);
        let mut last = Task::new(finish, 3, 5.0, 1);
        last.expire_time = Some(40.0 + 6.0 * job as f64);
        tasks.extend([first, second, last]);
    }
    let groups = vec![
        MachineGroup::new(1, vec![101, 102, 103]),
        MachineGroup::new(2, vec![201, 202]),
        MachineGroup::new(3, vec![301]),
    ];
    Arc::new(Problem::new(tasks, groups).expect("bench problem must build"))
}

fn setup_context(problem: &Arc<Problem>) -> Arc<SolverContext> {
    Arc::new(SolverContext {
        problem: Arc::clone(problem),
        encoding: Encoding::new(problem),
        policy: DecodePolicy::Forward,
        strategy: FitnessStrategy::Tardiness,
        ms_crossover_repeat: 10,
    })
}

fn criterion_benchmark(c: &mut Criterion) {
    let problem = setup_problem();
    let ctx = setup_context(&problem);
    let mut rng = fastrand::Rng::with_seed(7);
    let mut repair = RepairEngine::new();

    let seed_individual = Individual::random(&ctx, &mut rng, &mut repair);
    let ms = seed_individual.ms().to_vec();
    let os = seed_individual.os().to_vec();
    c.bench_function("decode_forward (30 tasks)", |b| {
        b.iter(|| {
            let individual =
                Individual::new(Arc::clone(&ctx), black_box(ms.clone()), black_box(os.clone()));
            black_box(individual.fitness())
        })
    });

    let shuffled = ctx.encoding.shuffled_os(&mut rng);
    c.bench_function("repair_sequence (30 tasks)", |b| {
        b.iter(|| {
            let mut os = black_box(shuffled.clone());
            repair.repair(&problem, &mut os);
            black_box(os)
        })
    });

    let config = SolverConfig {
        population: 40,
        max_generations: 5,
        workers: 1,
        seed: Some(11),
        ..SolverConfig::default()
    };
    let solver = Solver::new(Arc::clone(&problem), config).expect("bench config is valid");
    c.bench_function("solve (40x5, 30 tasks)", |b| b.iter(|| black_box(solver.run())));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
