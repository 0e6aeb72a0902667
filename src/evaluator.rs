use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::schedule::Schedule;

/// How decoded schedules are ranked. Every strategy yields a fitness where
/// higher is better and the unreachable-or-perfect optimum is `0.0`.
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
pub enum FitnessStrategy {
    /// Minimizes total deadline overrun, with a penalty for spreading the
    /// overrun across many tasks.
    #[default]
    Tardiness,
    /// Minimizes the number of tasks finishing past their deadline.
    LateTasks,
    /// Minimizes the overall makespan.
    Makespan,
}

impl FitnessStrategy {
    pub fn evaluate(self, schedule: &Schedule) -> f64 {
        match self {
            FitnessStrategy::Tardiness => tardiness_fitness(schedule),
            FitnessStrategy::LateTasks => -(schedule.expirations().len() as f64),
            FitnessStrategy::Makespan => -schedule.makespan(),
        }
    }

    /// Fitness of a schedule that cannot be improved further.
    pub fn optimum(self) -> f64 {
        0.0
    }
}

fn tardiness_fitness(schedule: &Schedule) -> f64 {
    let expirations = schedule.expirations();
    let mut sum = 0.0;
    let mut spread = 0.0;
    for (_, exceed) in &expirations {
        sum -= exceed;
        spread += exceed * exceed;
    }
    let mut spread = spread.sqrt();
    if expirations.len() > 1 {
        spread /= (expirations.len() - 1) as f64;
    }
    sum - spread
}
