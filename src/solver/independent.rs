//! Independent planner: every agent plans against an empty
//! constraint set, oblivious to the others. Fast, but makes no collision
//! guarantee — conflicts are reported, not resolved, and the solve still
//! reports success (the accompanying conflict list is what tells the
//! caller the plan isn't collision-free).

use crate::conflict::{self, Conflict};
use crate::constraint::ConstraintSet;
use crate::error::Result;
use crate::grid::Grid;
use crate::model::{Agent, Plan};
use crate::stats::Stats;
use crate::{astar, error::SolveError};

pub struct Outcome {
    pub plan: Plan,
    pub conflicts: Vec<Conflict>,
}

pub fn solve(
    grid: &Grid,
    agents: &[Agent],
    max_expansions: usize,
    stats: &mut Stats,
) -> Result<Outcome> {
    let empty = ConstraintSet::new();
    let mut paths = Vec::with_capacity(agents.len());

    for agent in agents {
        let path = astar::search(grid, agent, &empty, None, max_expansions, stats)
            .ok_or(SolveError::NoSolution)?;
        paths.push(path);
    }

    let conflicts = conflict::detect_all(&paths);
    Ok(Outcome {
        plan: Plan::new(paths),
        conflicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_conflicts_without_resolving_them() {
        let grid = Grid::from_blocks(vec![vec![false; 3]; 1]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (0, 2) },
            Agent { id: 1, start: (0, 2), goal: (0, 0) },
        ];
        let mut stats = Stats::start();
        let outcome = solve(&grid, &agents, 10_000, &mut stats).unwrap();
        assert_eq!(outcome.plan.len(), 2);
        assert!(!outcome.conflicts.is_empty());
    }

    #[test]
    fn disjoint_agents_have_no_conflicts() {
        let grid = Grid::from_blocks(vec![vec![false; 3]; 3]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (0, 1) },
            Agent { id: 1, start: (2, 2), goal: (2, 1) },
        ];
        let mut stats = Stats::start();
        let outcome = solve(&grid, &agents, 10_000, &mut stats).unwrap();
        assert!(outcome.conflicts.is_empty());
    }
}
