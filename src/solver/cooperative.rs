//! Prioritized / cooperative planner: agents are ordered by a
//! priority policy and planned one at a time against a reservation table
//! built from every higher-priority agent's committed path. A failure for
//! one agent does not stop the others from being attempted — each agent's
//! success is independent, and the plan as a whole only succeeds if every
//! agent does.

use tracing::{debug, instrument};

use crate::config::PriorityPolicy;
use crate::constraint::ConstraintSet;
use crate::conflict;
use crate::grid::Grid;
use crate::model::{Agent, Path, Plan};
use crate::reservation::ReservationTable;
use crate::stats::Stats;
use crate::astar;

/// The radius (in Manhattan rings) searched around an agent's start cell
/// to count nearby blocks for the constrained-first policy.
const CONSTRAINT_RADIUS: isize = 2;

pub struct Outcome {
    pub success: bool,
    pub paths: Vec<Option<Path>>,
}

/// Indices into `agents`, ordered highest-priority first.
fn priority_order(grid: &Grid, agents: &[Agent], policy: PriorityPolicy) -> Vec<usize> {
    let mut order: Vec<usize> = (0..agents.len()).collect();
    match policy {
        // Agents with the longest unconstrained path plan first — they have
        // the least room to be detoured around later. Stable sort keeps
        // ties in ascending-id order.
        PriorityPolicy::DistanceFirst => {
            order.sort_by_key(|&i| std::cmp::Reverse(grid.heuristic(agents[i].start, agents[i].goal)));
        }
        PriorityPolicy::ConstrainedFirst => {
            order.sort_by_key(|&i| std::cmp::Reverse(blocked_neighbors(grid, agents[i].start)));
        }
        PriorityPolicy::IdOrder => {
            order.sort_by_key(|&i| agents[i].id);
        }
    }
    order
}

fn blocked_neighbors(grid: &Grid, start: crate::model::Cell) -> usize {
    let (sr, sc) = (start.0 as isize, start.1 as isize);
    let mut count = 0;
    for dr in -CONSTRAINT_RADIUS..=CONSTRAINT_RADIUS {
        for dc in -CONSTRAINT_RADIUS..=CONSTRAINT_RADIUS {
            if dr.unsigned_abs() + dc.unsigned_abs() > CONSTRAINT_RADIUS as usize {
                continue;
            }
            let (r, c) = (sr + dr, sc + dc);
            if r < 0 || c < 0 {
                continue;
            }
            if !grid.is_passable((r as usize, c as usize)) {
                count += 1;
            }
        }
    }
    count
}

#[instrument(skip_all, name = "cooperative_solve", level = "debug")]
pub fn solve(
    grid: &Grid,
    agents: &[Agent],
    policy: PriorityPolicy,
    max_expansions: usize,
    stats: &mut Stats,
) -> Outcome {
    let order = priority_order(grid, agents, policy);
    let empty = ConstraintSet::new();
    let mut table = ReservationTable::new();
    let mut paths: Vec<Option<Path>> = vec![None; agents.len()];

    for idx in order {
        let agent = &agents[idx];
        match astar::search(grid, agent, &empty, Some(&table), max_expansions, stats) {
            Some(path) => {
                debug!(agent = agent.id, cost = path.len() - 1, "agent planned");
                table.reserve_path(&path);
                paths[idx] = Some(path);
            }
            None => {
                debug!(agent = agent.id, "agent failed to find a path");
            }
        }
    }

    let success = paths.iter().all(Option::is_some);
    if success {
        let assembled: Vec<Path> = paths.iter().cloned().map(Option::unwrap).collect();
        debug_assert!(conflict::detect_all(&assembled).is_empty());
    }

    Outcome { success, paths }
}

impl Outcome {
    /// The assembled plan, present only when every agent succeeded.
    pub fn plan(&self) -> Option<Plan> {
        if !self.success {
            return None;
        }
        Some(Plan::new(
            self.paths.iter().cloned().map(Option::unwrap).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_agents_succeed_with_room_to_detour() {
        // A 3x3 open grid gives the lower-priority agent a side passage,
        // unlike a single-row corridor where a head-on reservation leaves
        // no room to wait the other agent out.
        let grid = Grid::from_blocks(vec![vec![false; 3]; 3]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (2, 2) },
            Agent { id: 1, start: (0, 2), goal: (2, 0) },
        ];
        let mut stats = Stats::start();
        let outcome = solve(&grid, &agents, PriorityPolicy::DistanceFirst, 10_000, &mut stats);
        assert!(outcome.success);
        let plan = outcome.plan().unwrap();
        assert_eq!(plan.len(), 2);
        assert!(conflict::detect_all(&plan.paths).is_empty());
    }

    #[test]
    fn id_order_policy_plans_agent_zero_first() {
        let grid = Grid::from_blocks(vec![vec![false; 1]; 1]);
        let agents = vec![Agent { id: 0, start: (0, 0), goal: (0, 0) }];
        assert_eq!(priority_order(&grid, &agents, PriorityPolicy::IdOrder), vec![0]);
    }

    #[test]
    fn crossing_corridor_fails_under_id_order() {
        // Two agents in a 1x2 corridor swapping places — whichever
        // plans second under id-order has no room left to pass.
        let grid = Grid::from_blocks(vec![vec![false; 2]; 1]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (0, 1) },
            Agent { id: 1, start: (0, 1), goal: (0, 0) },
        ];
        let mut stats = Stats::start();
        let outcome = solve(&grid, &agents, PriorityPolicy::IdOrder, 10_000, &mut stats);
        assert!(!outcome.success);
    }
}
