//! CLI & solve config: planner selection, priority policy, and the
//! wall-time/expansion caps threaded into every planner.

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Independent,
    Cooperative,
    Cbs,
    Mip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityPolicy {
    DistanceFirst,
    ConstrainedFirst,
    IdOrder,
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        PriorityPolicy::DistanceFirst
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mapf_solver",
    about = "Multi-agent pathfinding solver: space-time A*, prioritized, CBS, and MIP planners.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a JSON solve-request file")]
    pub request_path: String,

    #[arg(long, help = "Path to write the JSON solve-response to (stdout if omitted)")]
    pub output_path: Option<String>,

    #[arg(long, value_enum, help = "Planner to use", default_value_t = Algorithm::Cbs)]
    pub algorithm: Algorithm,

    #[arg(long, value_enum, help = "Priority policy for the cooperative planner")]
    pub priority_policy: Option<PriorityPolicy>,

    #[arg(long, help = "Wall-time budget in seconds", default_value_t = 100)]
    pub max_time: u64,

    #[arg(long, help = "Expansion cap for STA*/CBS", default_value_t = 1_000_000)]
    pub max_expansions: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub algorithm: Algorithm,
    pub priority_policy: PriorityPolicy,
    pub max_wall_ms: u64,
    pub max_expansions: usize,
}

impl Config {
    pub fn new(cli: &Cli) -> Self {
        Config {
            algorithm: cli.algorithm,
            priority_policy: cli.priority_policy.unwrap_or_default(),
            max_wall_ms: cli.max_time.saturating_mul(1000),
            max_expansions: cli.max_expansions,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_expansions == 0 {
            return Err(anyhow!("max_expansions must be greater than 0"));
        }

        if matches!(self.algorithm, Algorithm::Mip) && !cfg!(feature = "mip") {
            return Err(anyhow!(
                "algorithm = mip requires the crate's `mip` feature to be enabled"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_expansions_rejected() {
        let config = Config {
            algorithm: Algorithm::Cbs,
            priority_policy: PriorityPolicy::DistanceFirst,
            max_wall_ms: 1000,
            max_expansions: 0,
        };
        assert!(config.validate().is_err());
    }
}
