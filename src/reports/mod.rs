use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use taskforge::config::SolverConfig;
use taskforge::evaluator::FitnessStrategy;
use taskforge::model::{Problem, UNRESTRICTED_GROUP};
use taskforge::schedule::Schedule;
use taskforge::solver::Solution;

pub fn print_problem_summary(problem: &Problem) {
    let deadlined = problem
        .tasks()
        .filter(|task| task.expire_time.is_some())
        .count();
    let total_work: f64 = problem.tasks().map(|task| task.require_time()).sum();
    let machine_count = problem
        .group(UNRESTRICTED_GROUP)
        .map(|group| group.len())
        .unwrap_or(0);
    let group_count = problem
        .groups()
        .filter(|group| group.id != UNRESTRICTED_GROUP)
        .count();

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Tasks").add_attribute(Attribute::Bold),
        Cell::new("Pieces"),
        Cell::new("Groups"),
        Cell::new("Machines"),
        Cell::new("Deadlined"),
        Cell::new("Total Work"),
    ]);
    table.add_row(vec![
        Cell::new(problem.task_count()).fg(Color::Cyan),
        Cell::new(problem.pieces().len()),
        Cell::new(group_count),
        Cell::new(machine_count),
        Cell::new(deadlined),
        Cell::new(format!("{:.1}", total_work)),
    ]);

    for i in 0..=5 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("\n{}", table);

    let mut groups = Table::new();
    groups
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    groups.add_row(vec![
        Cell::new("Group").add_attribute(Attribute::Bold),
        Cell::new("Machines"),
        Cell::new("Virtual"),
    ]);

    for group in problem.groups() {
        if group.id == UNRESTRICTED_GROUP {
            continue;
        }
        let members = group
            .machines()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let virtual_cell = if problem.is_virtual(group.id) {
            Cell::new("yes").fg(Color::Yellow)
        } else {
            Cell::new("")
        };
        groups.add_row(vec![
            Cell::new(group.id).add_attribute(Attribute::Bold),
            Cell::new(members),
            virtual_cell,
        ]);
    }
    println!("\n{}", groups);
}

/// Piece decomposition: each row is one chain of tasks plus the pieces whose
/// completion it waits for.
pub fn print_pieces(problem: &Problem) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Piece").add_attribute(Attribute::Bold),
        Cell::new("Task Chain"),
        Cell::new("Waits For"),
    ]);

    for piece in problem.pieces() {
        let chain = piece
            .tasks
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        let waits = if piece.predecessors.is_empty() {
            "-".to_string()
        } else {
            piece
                .predecessors
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            Cell::new(piece.id).add_attribute(Attribute::Bold),
            Cell::new(chain),
            Cell::new(waits),
        ]);
    }
    println!("\n{}", table);
}

pub fn print_schedule(schedule: &Schedule) {
    let problem = schedule.problem();
    let mut rows: Vec<_> = schedule.assignments().to_vec();
    rows.sort_by(|a, b| a.machine.cmp(&b.machine).then(a.begin.total_cmp(&b.begin)));

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Machine").add_attribute(Attribute::Bold),
        Cell::new("Task"),
        Cell::new("Piece"),
        Cell::new("Begin"),
        Cell::new("End"),
        Cell::new("Duration"),
    ]);

    for i in 1..=5 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    let mut last_machine = None;
    for a in &rows {
        let machine_cell = if last_machine == Some(a.machine) {
            Cell::new("")
        } else {
            last_machine = Some(a.machine);
            Cell::new(a.machine).add_attribute(Attribute::Bold)
        };
        let piece = problem
            .piece_of(a.task)
            .map(|p| p.to_string())
            .unwrap_or_default();
        table.add_row(vec![
            machine_cell,
            Cell::new(a.task),
            Cell::new(piece),
            Cell::new(format!("{:.2}", a.begin)),
            Cell::new(format!("{:.2}", a.end)),
            Cell::new(format!("{:.2}", a.end - a.begin)),
        ]);
    }
    println!("\n{}", table);
}

pub fn print_metrics(solution: &Solution, strategy: FitnessStrategy) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Strategy").add_attribute(Attribute::Bold),
        Cell::new("Fitness"),
        Cell::new("Optimum"),
        Cell::new("Generations"),
        Cell::new("Time Cost"),
    ]);
    table.add_row(vec![
        Cell::new(strategy).add_attribute(Attribute::Bold),
        Cell::new(format!("{:.4}", solution.fitness)).fg(Color::Cyan),
        Cell::new(format!("{:.1}", strategy.optimum())),
        Cell::new(solution.generations),
        Cell::new(format!("{:.2}", solution.schedule.makespan())).fg(Color::Cyan),
    ]);

    for i in 1..=4 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("\n{}", table);

    let expired = solution.schedule.expirations();
    if expired.is_empty() {
        return;
    }

    let problem = solution.schedule.problem();
    let mut late = Table::new();
    late.load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    late.add_row(vec![
        Cell::new("Late Task").add_attribute(Attribute::Bold).fg(Color::Red),
        Cell::new("Deadline"),
        Cell::new("Finish"),
        Cell::new("Overrun"),
    ]);

    for (task_id, overrun) in &expired {
        let deadline = problem
            .task(*task_id)
            .and_then(|task| task.expire_time)
            .unwrap_or(0.0);
        late.add_row(vec![
            Cell::new(task_id).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.2}", deadline)),
            Cell::new(format!("{:.2}", deadline + overrun)),
            Cell::new(format!("{:.2}", overrun)).fg(Color::Red),
        ]);
    }

    for i in 1..=3 {
        if let Some(col) = late.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("\n{}", late);
}

pub fn print_config(config: &SolverConfig) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Parameter").add_attribute(Attribute::Bold),
        Cell::new("Value"),
    ]);

    let seed = config
        .seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "entropy".to_string());
    let rows: Vec<(&str, String)> = vec![
        ("population", config.population.to_string()),
        ("max_generations", config.max_generations.to_string()),
        ("ms_crossover_repeat", config.ms_crossover_repeat.to_string()),
        ("mutation_rate", config.mutation_rate.to_string()),
        ("crossover_rate", config.crossover_rate.to_string()),
        ("select_better_rate", config.select_better_rate.to_string()),
        ("workers", config.workers.to_string()),
        ("seed", seed),
        ("decode_policy", config.decode_policy.to_string()),
        ("strategy", config.strategy.to_string()),
        ("debug_validate", config.debug_validate.to_string()),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value).set_alignment(CellAlignment::Right)]);
    }
    println!("\n{}", table);
}
