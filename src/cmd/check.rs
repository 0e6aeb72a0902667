use clap::Args;
use taskforge::config::SolverConfig;
use taskforge::error::TfResult;
use taskforge::model::Problem;
use taskforge::solver::Encoding;
use tracing::info;

use crate::reports;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: SolverConfig,
}

/// Dry run: the problem already loaded cleanly, so report its shape and make
/// sure the effective configuration would be accepted by the solver.
pub fn run(config: &SolverConfig, problem: &Problem) -> TfResult<()> {
    config.validate()?;

    reports::print_problem_summary(problem);
    reports::print_pieces(problem);
    reports::print_config(config);

    let encoding = Encoding::new(problem);
    info!(
        "🧬 Genome: {} machine-selection slots + {} sequence slots over {} pieces",
        encoding.ms_range.len(),
        encoding.os_template.len(),
        problem.pieces().len()
    );
    info!("✅ Problem is well formed and the configuration is valid");
    Ok(())
}
