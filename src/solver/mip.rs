//! Time-expanded MIP planner: an oracle formulation for small
//! instances, not a production path. One binary variable per
//! agent/cell/tick; flow-conservation, vertex-collision, and edge-swap
//! constraints; objective approximates sum-of-costs by counting ticks an
//! agent has not yet settled on its goal.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{constraint, variable, Expression, ProblemVariables, Solution as LpSolution, SolverModel, Variable};
use tracing::{debug, instrument};

use crate::error::{Result, SolveError};
use crate::grid::Grid;
use crate::model::{Agent, Cell, Path, Plan};

/// Padding added to the sum of per-agent Manhattan distances when seeding
/// the time-expanded horizon — enough slack for agents to wait each other
/// out without immediately forcing a retry at a larger horizon.
const HORIZON_PAD: usize = 4;

/// How many times the horizon is doubled after an infeasible attempt
/// before the planner gives up, scoped to keep this an oracle for small
/// instances rather than an open-ended search.
const MAX_HORIZON_DOUBLINGS: u32 = 3;

fn passable_cells(grid: &Grid) -> Vec<Cell> {
    (0..grid.size)
        .flat_map(|r| (0..grid.size).map(move |c| (r, c)))
        .filter(|&cell| grid.is_passable(cell))
        .collect()
}

fn initial_horizon(grid: &Grid, agents: &[Agent]) -> usize {
    let sum: usize = agents.iter().map(|a| grid.heuristic(a.start, a.goal)).sum();
    sum.saturating_add(HORIZON_PAD).max(1)
}

/// Builds and solves the time-expanded ILP at a fixed `horizon`, giving
/// the CBC backend a hard wall-clock budget of `time_budget`.
fn solve_at_horizon(grid: &Grid, agents: &[Agent], horizon: usize, time_budget: Duration) -> Result<Plan> {
    let cells = passable_cells(grid);
    let cell_index: HashMap<Cell, usize> = cells.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    debug!(horizon, cells = cells.len(), agents = agents.len(), "building time-expanded MIP");

    let mut vars = ProblemVariables::new();
    let x: Vec<Vec<Vec<Variable>>> = agents
        .iter()
        .map(|_| {
            cells
                .iter()
                .map(|_| (0..=horizon).map(|_| vars.add(variable().binary())).collect())
                .collect()
        })
        .collect();

    let objective: Expression = agents
        .iter()
        .enumerate()
        .flat_map(|(a, agent)| {
            let goal_idx = cell_index[&agent.goal];
            (0..=horizon).map(move |t| x[a][goal_idx][t])
        })
        .map(|v| Expression::from(1.0) - v)
        .sum();

    let mut model = vars.minimise(objective).using(coin_cbc);
    model.set_parameter("seconds", &time_budget.as_secs_f64().to_string());

    for (a, agent) in agents.iter().enumerate() {
        let start_idx = cell_index
            .get(&agent.start)
            .ok_or_else(|| SolveError::InvalidInput(format!("agent {} start is blocked", agent.id)))?;
        let goal_idx = cell_index
            .get(&agent.goal)
            .ok_or_else(|| SolveError::InvalidInput(format!("agent {} goal is blocked", agent.id)))?;

        model.add_constraint(constraint!(x[a][*start_idx][0] == 1));
        model.add_constraint(constraint!(x[a][*goal_idx][horizon] == 1));

        for t in 0..=horizon {
            let occupancy: Expression = (0..cells.len()).map(|ci| x[a][ci][t]).sum();
            model.add_constraint(constraint!(occupancy == 1));
        }

        // Once an agent settles on its goal it stays — this is what makes
        // the objective's "not yet at goal" tick count behave like a
        // sum-of-costs arrival time rather than flickering occupancy.
        for t in 0..horizon {
            model.add_constraint(constraint!(x[a][*goal_idx][t] <= x[a][*goal_idx][t + 1]));
        }

        for (ci, &cell) in cells.iter().enumerate() {
            for t in 0..horizon {
                let reachable: Expression = grid
                    .successors(cell)
                    .into_iter()
                    .filter_map(|next| cell_index.get(&next).map(|&ni| x[a][ni][t]))
                    .sum();
                model.add_constraint(constraint!(x[a][ci][t + 1] <= reachable));
            }
        }
    }

    for t in 0..=horizon {
        for ci in 0..cells.len() {
            let occupants: Expression = (0..agents.len()).map(|a| x[a][ci][t]).sum();
            model.add_constraint(constraint!(occupants <= 1));
        }
    }

    // Edge-swap exclusion: two agents may not trade `u <-> v` on the same
    // tick. `<= 3` forbids all four participating indicators being 1 at
    // once without needing a separate swap variable per pair.
    for t in 0..horizon {
        for i in 0..agents.len() {
            for j in (i + 1)..agents.len() {
                for (ui, &u) in cells.iter().enumerate() {
                    for v in grid.successors(u) {
                        if v == u {
                            continue;
                        }
                        if let Some(&vi) = cell_index.get(&v) {
                            model.add_constraint(constraint!(
                                x[i][ui][t] + x[i][vi][t + 1] + x[j][vi][t] + x[j][ui][t + 1] <= 3
                            ));
                        }
                    }
                }
            }
        }
    }

    let solution = model.solve().map_err(|_| SolveError::NoSolution)?;

    let mut paths = Vec::with_capacity(agents.len());
    for a in 0..agents.len() {
        let mut path: Path = Vec::with_capacity(horizon + 1);
        for t in 0..=horizon {
            let cell = cells
                .iter()
                .enumerate()
                .find(|&(ci, _)| solution.value(x[a][ci][t]).round() > 0.5)
                .map(|(_, &cell)| cell)
                .ok_or_else(|| SolveError::Internal("MIP solution missing occupancy".into()))?;
            path.push(cell);
        }
        paths.push(path);
    }

    Ok(Plan::new(paths))
}

/// Solves the time-expanded MIP within `max_wall_ms`, starting the
/// horizon at the sum of per-agent Manhattan distances plus a pad and
/// doubling it on infeasibility up to a bounded number of retries. The
/// whole attempt — including every retry — shares one hard deadline.
#[instrument(skip_all, name = "mip_solve", level = "debug")]
pub fn solve(grid: &Grid, agents: &[Agent], max_wall_ms: u64) -> Result<Plan> {
    let deadline = Instant::now() + Duration::from_millis(max_wall_ms.max(1));
    let mut horizon = initial_horizon(grid, agents);
    let mut doublings = 0u32;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(SolveError::Timeout);
        }

        match solve_at_horizon(grid, agents, horizon, remaining) {
            Ok(plan) => return Ok(plan),
            Err(SolveError::NoSolution) if doublings < MAX_HORIZON_DOUBLINGS => {
                doublings += 1;
                horizon = horizon.saturating_mul(2);
                debug!(horizon, doublings, "horizon infeasible, doubling and retrying");
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_horizon_uses_the_sum_of_agent_distances() {
        let grid = Grid::from_blocks(vec![vec![false; 5]; 5]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (4, 4) },
            Agent { id: 1, start: (0, 4), goal: (4, 0) },
        ];
        assert_eq!(initial_horizon(&grid, &agents), 8 + 8 + HORIZON_PAD);
    }

    #[test]
    fn single_agent_direct_path() {
        let grid = Grid::from_blocks(vec![vec![false; 2]; 1]);
        let agents = vec![Agent { id: 0, start: (0, 0), goal: (0, 1) }];
        let plan = solve(&grid, &agents, 5_000).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.paths[0].first(), Some(&(0, 0)));
        assert_eq!(plan.paths[0].last(), Some(&(0, 1)));
    }
}
