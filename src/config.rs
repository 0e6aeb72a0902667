use std::fs;
use std::path::Path;
use std::str::FromStr;

use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};

use crate::error::{TaskForgeError, TfResult};
use crate::evaluator::FitnessStrategy;
use crate::solver::DecodePolicy;

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Solver parameters, loadable from a JSON preset and overridable per field
/// from the command line.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Individuals per generation
    #[arg(long, default_value_t = 200)]
    pub population: usize,

    /// Generation limit when the optimum is not reached earlier
    #[arg(long, default_value_t = 100)]
    pub max_generations: usize,

    /// Extra machine-segment mixes tried per crossover
    #[arg(long, default_value_t = 10)]
    pub ms_crossover_repeat: usize,

    /// Per-individual mutation probability, split between the two operators
    #[arg(long, default_value_t = 0.01)]
    pub mutation_rate: f64,

    /// Pairing probability during the crossover scan
    #[arg(long, default_value_t = 0.6)]
    pub crossover_rate: f64,

    /// Probability that a tournament keeps the fitter candidate
    #[arg(long, default_value_t = 0.8)]
    pub select_better_rate: f64,

    /// Solver threads; 1 disables the worker pool
    #[arg(long, default_value_t = default_workers())]
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fixed random seed; omit for a fresh seed per run
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = DecodePolicy::Forward, value_parser = DecodePolicy::from_str)]
    pub decode_policy: DecodePolicy,

    #[arg(long, default_value_t = FitnessStrategy::Tardiness, value_parser = FitnessStrategy::from_str)]
    pub strategy: FitnessStrategy,

    /// Validate every individual each generation and abort on the first
    /// invalid one
    #[arg(long)]
    pub debug_validate: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            population: 200,
            max_generations: 100,
            ms_crossover_repeat: 10,
            mutation_rate: 0.01,
            crossover_rate: 0.6,
            select_better_rate: 0.8,
            workers: default_workers(),
            seed: None,
            decode_policy: DecodePolicy::Forward,
            strategy: FitnessStrategy::Tardiness,
            debug_validate: false,
        }
    }
}

impl SolverConfig {
    /// Rejects out-of-range parameters, naming the field and its valid range.
    pub fn validate(&self) -> TfResult<()> {
        fn at_least_one(name: &str, value: usize) -> TfResult<()> {
            if value < 1 {
                return Err(TaskForgeError::Config(format!(
                    "{name} must be at least 1 (got {value})"
                )));
            }
            Ok(())
        }
        fn rate(name: &str, value: f64) -> TfResult<()> {
            if !(0.0..=1.0).contains(&value) {
                return Err(TaskForgeError::Config(format!(
                    "{name} must be within [0, 1] (got {value})"
                )));
            }
            Ok(())
        }
        at_least_one("population", self.population)?;
        at_least_one("max_generations", self.max_generations)?;
        at_least_one("ms_crossover_repeat", self.ms_crossover_repeat)?;
        at_least_one("workers", self.workers)?;
        rate("mutation_rate", self.mutation_rate)?;
        rate("crossover_rate", self.crossover_rate)?;
        rate("select_better_rate", self.select_better_rate)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> TfResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Overwrites fields the user passed explicitly on the command line,
    /// leaving preset values in place for everything else.
    pub fn merge_from_cli(&mut self, cli: &SolverConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident, $arg_name:expr) => {
                if matches.value_source($arg_name) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(population, "population");
        update_if_present!(max_generations, "max_generations");
        update_if_present!(ms_crossover_repeat, "ms_crossover_repeat");
        update_if_present!(mutation_rate, "mutation_rate");
        update_if_present!(crossover_rate, "crossover_rate");
        update_if_present!(select_better_rate, "select_better_rate");
        update_if_present!(workers, "workers");
        update_if_present!(seed, "seed");
        update_if_present!(decode_policy, "decode_policy");
        update_if_present!(strategy, "strategy");
        update_if_present!(debug_validate, "debug_validate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_population_is_rejected_by_name() {
        let config = SolverConfig {
            population: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("population"));
        assert!(err.contains("at least 1"));
    }

    #[test]
    fn out_of_range_rate_is_rejected_by_name() {
        let config = SolverConfig {
            mutation_rate: 1.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("mutation_rate"));
        assert!(err.contains("[0, 1]"));
    }

    #[test]
    fn select_better_rate_error_names_its_own_field() {
        let config = SolverConfig {
            select_better_rate: -0.1,
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("select_better_rate"));
    }

    #[test]
    fn preset_json_round_trips() {
        let config = SolverConfig {
            population: 64,
            seed: Some(7),
            strategy: FitnessStrategy::Makespan,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SolverConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.population, 64);
        assert_eq!(back.seed, Some(7));
        assert_eq!(back.strategy, FitnessStrategy::Makespan);
    }
}
