use std::fs::File;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::Args;
use strum_macros::{Display, EnumString};
use taskforge::config::SolverConfig;
use taskforge::error::{TaskForgeError, TfResult};
use taskforge::model::Problem;
use taskforge::solver::Solver;
use tracing::{info, warn};

use crate::reports;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    /// Calendar timestamps projected onto the working-hours window.
    #[default]
    Dated,
    /// Raw begin/end times in schedule units.
    Plain,
}

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    pub config: SolverConfig,

    /// Write the schedule CSV here; omit to only print tables.
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(long, default_value_t = ExportFormat::Dated, value_parser = ExportFormat::from_str)]
    pub format: ExportFormat,

    /// First calendar day of the schedule (defaults to tomorrow).
    #[arg(long, value_parser = NaiveDate::from_str)]
    pub start_date: Option<NaiveDate>,
}

pub fn run(args: &SolveArgs, config: SolverConfig, problem: Arc<Problem>) -> TfResult<()> {
    reports::print_problem_summary(&problem);

    info!(
        "🧬 Evolving {} individuals for up to {} generations ({} workers)",
        config.population, config.max_generations, config.workers
    );

    let solver = Solver::new(problem, config.clone())?;
    let started = Instant::now();
    let solution = solver.run()?;
    info!(
        "🏁 Best fitness {:.4} after {} generations in {:.2}s",
        solution.fitness,
        solution.generations,
        started.elapsed().as_secs_f64()
    );

    reports::print_schedule(&solution.schedule);
    reports::print_metrics(&solution, config.strategy);

    let expired = solution.schedule.expirations();
    if !expired.is_empty() {
        warn!("⚠️  {} task(s) finish past their deadline", expired.len());
    }

    if let Some(path) = &args.output {
        let file = File::create(path)?;
        match args.format {
            ExportFormat::Plain => solution.schedule.write_csv(file)?,
            ExportFormat::Dated => {
                let base = export_base(args.start_date)?;
                solution.schedule.write_dated_csv(file, base)?;
            }
        }
        info!("💾 Schedule written to {}", path);
    }

    Ok(())
}

/// Midnight starting the first schedule day. The working window shifts the
/// actual first timestamp later during export.
fn export_base(start_date: Option<NaiveDate>) -> TfResult<NaiveDateTime> {
    let date = match start_date {
        Some(date) => date,
        None => Local::now()
            .date_naive()
            .succ_opt()
            .ok_or_else(|| TaskForgeError::Data("calendar overflow computing tomorrow".into()))?,
    };
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| TaskForgeError::Data(format!("invalid start of day for {date}")))
}
