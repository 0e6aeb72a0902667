use std::process;
use std::str::FromStr;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use taskforge::config::SolverConfig;
use taskforge::loader;
use taskforge::model::{GroupId, TimeUnit, WorkHours};
use tracing::{error, info};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, short, long, default_value = "data/example-task.csv")]
    tasks: String,

    #[arg(global = true, short, long, default_value = "data/example-machine.csv")]
    machines: String,

    /// Treat the first CSV row as data instead of a header.
    #[arg(global = true, long, default_value_t = false)]
    no_header: bool,

    /// Machine groups whose capacity is unlimited, e.g. outsourced work.
    #[arg(global = true, long, value_delimiter = ',')]
    virtual_groups: Vec<GroupId>,

    /// Daily working window used when dating the schedule.
    #[arg(global = true, long, default_value = "8:00-24:00", value_parser = WorkHours::from_str)]
    work_hours: WorkHours,

    /// Calendar meaning of one schedule time unit.
    #[arg(global = true, long, default_value_t = TimeUnit::Minute, value_parser = TimeUnit::from_str)]
    time_unit: TimeUnit,

    /// JSON preset with solver parameters; explicit CLI flags win over it.
    #[arg(global = true, short, long)]
    preset: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the genetic algorithm and report the best schedule found.
    Solve(cmd::solve::SolveArgs),
    /// Load and summarize the problem without solving it.
    Check(cmd::check::CheckArgs),
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    info!("🚀 Initializing TaskForge...");

    let (mut config, sub_matches) = match &cli.command {
        Commands::Solve(args) => (
            args.config.clone(),
            matches.subcommand_matches("solve").unwrap(),
        ),
        Commands::Check(args) => (
            args.config.clone(),
            matches.subcommand_matches("check").unwrap(),
        ),
    };

    if let Some(path) = &cli.preset {
        info!("⚙️  Loading preset from: {}", path);
        match SolverConfig::load_from_file(path) {
            Ok(mut preset) => {
                preset.merge_from_cli(&config, sub_matches);
                config = preset;
            }
            Err(e) => {
                error!("❌ {}", e);
                process::exit(1);
            }
        }
    }

    info!("📂 Loading tasks: {} / machines: {}", cli.tasks, cli.machines);
    let mut problem = loader::load_problem(
        &cli.tasks,
        &cli.machines,
        !cli.no_header,
        cli.work_hours,
        cli.time_unit,
    )
    .unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(1);
    });

    if !cli.virtual_groups.is_empty() {
        problem.set_virtual_groups(cli.virtual_groups.iter().copied());
    }

    let result = match &cli.command {
        Commands::Solve(args) => cmd::solve::run(args, config, Arc::new(problem)),
        Commands::Check(_) => cmd::check::run(&config, &problem),
    };

    if let Err(e) = result {
        error!("❌ {}", e);
        process::exit(1);
    }
}
