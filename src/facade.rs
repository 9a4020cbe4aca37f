//! Solver façade: the single entry point an external caller
//! (HTTP layer, CLI, test) goes through. Validates the request, dispatches
//! to the chosen planner, and assembles the uniform response envelope.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::{Algorithm, PriorityPolicy};
use crate::conflict::{self, Conflict};
use crate::error::{Result, SolveError};
use crate::grid::Grid;
use crate::model::{Agent, Cell, Plan};
use crate::solver::{cbs, cooperative, independent};
use crate::stats::Stats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: usize,
    pub start: [usize; 2],
    pub goal: [usize; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub blocks: Vec<Vec<bool>>,
    pub agents: Vec<AgentSpec>,
    pub size: usize,
    pub algorithm: Algorithm,
    #[serde(default = "default_max_time")]
    pub max_time: u64,
    pub priority_policy: Option<PriorityPolicy>,
    /// Overrides the expansion cap derived from `max_time` for STA*/CBS.
    /// `None` falls back to the derived default.
    #[serde(default)]
    pub max_expansions: Option<usize>,
    /// Overrides the wall-clock budget (in milliseconds) handed to the
    /// MIP planner. `None` falls back to `max_time` converted to
    /// milliseconds.
    #[serde(default)]
    pub max_wall_ms: Option<u64>,
}

fn default_max_time() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub success: bool,
    pub sum_of_costs: usize,
    pub makespan: usize,
    pub num_conflicts: usize,
    pub explored_size: usize,
    pub time_taken_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub paths: Option<Vec<Vec<[usize; 2]>>>,
    #[serde(default)]
    pub exploration_orders: Vec<Vec<[usize; 2]>>,
    pub metrics: Metrics,
    pub conflicts: Vec<Conflict>,
}

fn to_cell(pair: [usize; 2]) -> Cell {
    (pair[0], pair[1])
}

fn from_cell(cell: Cell) -> [usize; 2] {
    [cell.0, cell.1]
}

fn validate(request: &SolveRequest) -> Result<(Grid, Vec<Agent>)> {
    if request.blocks.len() != request.size || request.blocks.iter().any(|row| row.len() != request.size) {
        return Err(SolveError::InvalidInput(format!(
            "blocks must be a {0}x{0} matrix",
            request.size
        )));
    }

    let grid = Grid::from_blocks(request.blocks.clone());
    let mut seen_ids = std::collections::HashSet::new();
    let mut agents = Vec::with_capacity(request.agents.len());

    for spec in &request.agents {
        if !seen_ids.insert(spec.id) {
            return Err(SolveError::InvalidInput(format!("duplicate agent id {}", spec.id)));
        }

        let start = to_cell(spec.start);
        let goal = to_cell(spec.goal);

        if !grid.is_passable(start) {
            return Err(SolveError::InvalidInput(format!(
                "agent {} start {:?} is out of bounds or blocked",
                spec.id, start
            )));
        }
        if !grid.is_passable(goal) {
            return Err(SolveError::InvalidInput(format!(
                "agent {} goal {:?} is out of bounds or blocked",
                spec.id, goal
            )));
        }

        agents.push(Agent {
            id: spec.id,
            start,
            goal,
        });
    }

    Ok((grid, agents))
}

fn metrics_for(plan: &Plan, success: bool, conflicts: &[Conflict], stats: &Stats) -> Metrics {
    Metrics {
        success,
        sum_of_costs: plan.sum_of_costs(),
        makespan: plan.makespan(),
        num_conflicts: conflicts.len(),
        explored_size: stats.expansions + stats.high_level_expansions,
        time_taken_ms: stats.elapsed_ms,
    }
}

fn response_from_plan(plan: Plan, success: bool, conflicts: Vec<Conflict>, stats: &Stats) -> SolveResponse {
    let metrics = metrics_for(&plan, success, &conflicts, stats);
    SolveResponse {
        paths: Some(
            plan.paths
                .into_iter()
                .map(|path| path.into_iter().map(from_cell).collect())
                .collect(),
        ),
        exploration_orders: Vec::new(),
        metrics,
        conflicts,
    }
}

fn failure_response(stats: &Stats) -> SolveResponse {
    SolveResponse {
        paths: None,
        exploration_orders: Vec::new(),
        metrics: Metrics {
            success: false,
            sum_of_costs: 0,
            makespan: 0,
            num_conflicts: 0,
            explored_size: stats.expansions + stats.high_level_expansions,
            time_taken_ms: stats.elapsed_ms,
        },
        conflicts: Vec::new(),
    }
}

/// Reports a planner's best plan seen so far as a failure: `success =
/// false`, but `paths` still carries whatever partial data is available,
/// per a bound breach (as opposed to a planner that found nothing at
/// all, which goes through [`failure_response`]).
fn partial_response(plan: Plan, stats: &Stats) -> SolveResponse {
    let conflicts = conflict::detect_all(&plan.paths);
    response_from_plan(plan, false, conflicts, stats)
}

/// Solves `request`, dispatching to the planner named by
/// `request.algorithm`. The only error path is request validation — once
/// planning starts, failure is reported through the response's
/// `metrics.success = false`, never as an error.
#[instrument(skip_all, fields(algorithm = ?request.algorithm, agents = request.agents.len()))]
pub fn solve(request: &SolveRequest) -> Result<SolveResponse> {
    let (grid, agents) = validate(request)?;
    let mut stats = Stats::start();
    let max_expansions = request
        .max_expansions
        .unwrap_or_else(|| (request.max_time as usize).saturating_mul(10_000).max(1));
    let max_wall_ms = request.max_wall_ms.unwrap_or_else(|| request.max_time.saturating_mul(1000));

    let response = match request.algorithm {
        Algorithm::Independent => match independent::solve(&grid, &agents, max_expansions, &mut stats) {
            Ok(outcome) => {
                stats.finish();
                response_from_plan(outcome.plan, true, outcome.conflicts, &stats)
            }
            Err(SolveError::NoSolution) => {
                stats.finish();
                warn!("independent planner failed for at least one agent");
                failure_response(&stats)
            }
            Err(other) => return Err(other),
        },
        Algorithm::Cooperative => {
            let policy = request.priority_policy.unwrap_or(PriorityPolicy::DistanceFirst);
            let outcome = cooperative::solve(&grid, &agents, policy, max_expansions, &mut stats);
            stats.finish();
            match outcome.plan() {
                Some(plan) => {
                    let conflicts = conflict::detect_all(&plan.paths);
                    response_from_plan(plan, true, conflicts, &stats)
                }
                None => {
                    warn!("cooperative planner failed for at least one agent");
                    failure_response(&stats)
                }
            }
        }
        Algorithm::Cbs => {
            match cbs::solve(&grid, &agents, max_expansions, max_expansions, &mut stats) {
                Ok(outcome) => {
                    stats.finish();
                    if outcome.success {
                        let conflicts = conflict::detect_all(&outcome.plan.paths);
                        response_from_plan(outcome.plan, true, conflicts, &stats)
                    } else {
                        warn!("cbs hit its expansion cap; returning its best plan so far");
                        partial_response(outcome.plan, &stats)
                    }
                }
                Err(SolveError::NoSolution) => {
                    stats.finish();
                    failure_response(&stats)
                }
                Err(other) => return Err(other),
            }
        }
        Algorithm::Mip => {
            #[cfg(feature = "mip")]
            {
                match crate::solver::mip::solve(&grid, &agents, max_wall_ms) {
                    Ok(plan) => {
                        stats.finish();
                        response_from_plan(plan, true, Vec::new(), &stats)
                    }
                    Err(SolveError::Timeout) => {
                        stats.finish();
                        warn!("mip planner exceeded its time budget");
                        failure_response(&stats)
                    }
                    Err(_) => {
                        stats.finish();
                        failure_response(&stats)
                    }
                }
            }
            #[cfg(not(feature = "mip"))]
            {
                return Err(SolveError::InvalidInput(
                    "algorithm = mip requires the crate's mip feature".into(),
                ));
            }
        }
    };

    info!(success = response.metrics.success, "solve complete");
    Ok(response)
}
