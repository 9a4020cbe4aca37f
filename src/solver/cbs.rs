//! Conflict-Based Search: best-first search over a constraint
//! tree. Each node refines one agent's constraint set along one branch of
//! the first conflict in its plan; the tree is explored lowest-cost first,
//! with deterministic tie-breaks so the same instance always returns the
//! same plan.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, instrument};

use crate::astar;
use crate::conflict::{self, Conflict};
use crate::constraint::{Constraint, ConstraintSet};
use crate::error::{Result, SolveError};
use crate::grid::Grid;
use crate::model::{cost, Agent, Path, Plan};
use crate::stats::Stats;

/// A CBS node's plan. Unchanged agents' entries are shared with the parent
/// node via `Rc`; only the branch agent's constraint set and path are
/// freshly built when a child is created.
#[derive(Clone)]
struct Node {
    constraints: Vec<Rc<ConstraintSet>>,
    paths: Vec<Rc<Path>>,
    total_cost: usize,
    conflict_count: usize,
    id: usize,
}

/// The outcome of a CBS run: either a conflict-free plan, or — if the
/// high-level expansion cap was hit first — the best (lowest-cost) plan
/// popped from the open list at the moment of breach, which may still
/// contain conflicts.
pub struct Outcome {
    pub plan: Plan,
    pub success: bool,
}

fn materialize_paths(paths: &[Rc<Path>]) -> Vec<Path> {
    paths.iter().map(|p| (**p).clone()).collect()
}

impl Node {
    fn conflict(&self) -> Option<Conflict> {
        conflict::first_conflict(&materialize_paths(&self.paths))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lowest sum-of-costs first, ties broken by fewer conflicts in the
        // node's plan, then by insertion order — never by path contents,
        // which would make the tie-break depend on `Cell`'s arbitrary `Ord`
        // rather than anything meaningful.
        self.total_cost
            .cmp(&other.total_cost)
            .then_with(|| self.conflict_count.cmp(&other.conflict_count))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Builds the two vertex-branch constraints (one per agent in conflict).
fn branch_constraints(conflict: &Conflict) -> [(usize, Constraint); 2] {
    match *conflict {
        Conflict::Vertex { agents, cell, t } => [
            (agents.0, Constraint::Vertex { cell, time_step: t }),
            (agents.1, Constraint::Vertex { cell, time_step: t }),
        ],
        Conflict::Edge { agents, from, to, t } => [
            (
                agents.0,
                Constraint::Edge {
                    from,
                    to,
                    time_step: t + 1,
                },
            ),
            (
                agents.1,
                Constraint::Edge {
                    from: to,
                    to: from,
                    time_step: t + 1,
                },
            ),
        ],
    }
}

fn replan_agent(
    grid: &Grid,
    agent: &Agent,
    constraints: &ConstraintSet,
    max_expansions: usize,
    stats: &mut Stats,
) -> Option<Path> {
    astar::search(grid, agent, constraints, None, max_expansions, stats)
}

#[instrument(skip_all, name = "cbs_solve", level = "debug")]
pub fn solve(
    grid: &Grid,
    agents: &[Agent],
    max_high_level_expansions: usize,
    max_low_level_expansions: usize,
    stats: &mut Stats,
) -> Result<Outcome> {
    let mut next_id = 0usize;
    let mut open: BTreeSet<Node> = BTreeSet::new();

    let empty = ConstraintSet::new();
    let mut root_paths = Vec::with_capacity(agents.len());
    for agent in agents {
        let path = replan_agent(grid, agent, &empty, max_low_level_expansions, stats)
            .ok_or(SolveError::NoSolution)?;
        root_paths.push(Rc::new(path));
    }
    let root_materialized = materialize_paths(&root_paths);
    let root = Node {
        total_cost: root_materialized.iter().map(|p| cost(p)).sum(),
        conflict_count: conflict::detect_all(&root_materialized).len(),
        constraints: vec![Rc::new(ConstraintSet::new()); agents.len()],
        paths: root_paths,
        id: next_id,
    };
    next_id += 1;
    open.insert(root);

    while let Some(current) = open.pop_first() {
        stats.high_level_expansions += 1;
        if stats.high_level_expansions > max_high_level_expansions {
            debug!("high-level expansion cap reached");
            return Ok(Outcome {
                plan: Plan::new(materialize_paths(&current.paths)),
                success: false,
            });
        }

        let Some(conflict) = current.conflict() else {
            debug!(cost = current.total_cost, "conflict-free plan found");
            return Ok(Outcome {
                plan: Plan::new(materialize_paths(&current.paths)),
                success: true,
            });
        };
        debug!(?conflict, "branching");

        for (branch_agent, new_constraint) in branch_constraints(&conflict) {
            let mut branch_constraints_set = (*current.constraints[branch_agent]).clone();
            branch_constraints_set.insert(new_constraint);

            if let Some(path) = replan_agent(
                grid,
                &agents[branch_agent],
                &branch_constraints_set,
                max_low_level_expansions,
                stats,
            ) {
                let mut constraints = current.constraints.clone();
                constraints[branch_agent] = Rc::new(branch_constraints_set);

                let mut paths = current.paths.clone();
                paths[branch_agent] = Rc::new(path);

                let materialized = materialize_paths(&paths);
                let total_cost = materialized.iter().map(|p| cost(p)).sum();
                let conflict_count = conflict::detect_all(&materialized).len();

                open.insert(Node {
                    constraints,
                    paths,
                    total_cost,
                    conflict_count,
                    id: next_id,
                });
                next_id += 1;
            }
        }
    }

    Err(SolveError::NoSolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_head_on_corridor_by_waiting() {
        // A 1x3 corridor, head-on agents — CBS must find a wait, unlike
        // the cooperative planner, which can fail here.
        let grid = Grid::from_blocks(vec![vec![false; 3]; 1]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (0, 2) },
            Agent { id: 1, start: (0, 2), goal: (0, 0) },
        ];
        let mut stats = Stats::start();
        let outcome = solve(&grid, &agents, 10_000, 10_000, &mut stats).unwrap();
        assert!(outcome.success);
        assert!(conflict::detect_all(&outcome.plan.paths).is_empty());
    }

    #[test]
    fn resolves_edge_swap_corridor() {
        // A 1x2 row, agents swapping.
        let grid = Grid::from_blocks(vec![vec![false; 2]; 1]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (0, 1) },
            Agent { id: 1, start: (0, 1), goal: (0, 0) },
        ];
        let mut stats = Stats::start();
        let outcome = solve(&grid, &agents, 10_000, 10_000, &mut stats).unwrap();
        assert!(outcome.success);
        assert!(conflict::detect_all(&outcome.plan.paths).is_empty());
    }

    #[test]
    fn no_solution_when_agent_fully_boxed_in() {
        let mut blocks = vec![vec![true; 3]; 3];
        blocks[0][0] = false;
        let grid = Grid::from_blocks(blocks);
        let agents = vec![Agent { id: 0, start: (0, 0), goal: (2, 2) }];
        let mut stats = Stats::start();
        assert!(matches!(
            solve(&grid, &agents, 10_000, 10_000, &mut stats),
            Err(SolveError::NoSolution)
        ));
    }

    #[test]
    fn deterministic_across_runs() {
        let grid = Grid::from_blocks(vec![vec![false; 4]; 4]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (3, 3) },
            Agent { id: 1, start: (0, 3), goal: (3, 0) },
            Agent { id: 2, start: (3, 0), goal: (0, 3) },
        ];
        let mut stats_a = Stats::start();
        let mut stats_b = Stats::start();
        let outcome_a = solve(&grid, &agents, 100_000, 100_000, &mut stats_a).unwrap();
        let outcome_b = solve(&grid, &agents, 100_000, 100_000, &mut stats_b).unwrap();
        assert_eq!(outcome_a.plan.paths, outcome_b.plan.paths);
    }

    #[test]
    fn expansion_cap_breach_returns_the_best_plan_seen_so_far() {
        // A tiny cap forces the breach on the very first pop (the root
        // node), which is still a fully-planned, independently-optimal
        // plan for each agent even though it may conflict.
        let grid = Grid::from_blocks(vec![vec![false; 3]; 1]);
        let agents = vec![
            Agent { id: 0, start: (0, 0), goal: (0, 2) },
            Agent { id: 1, start: (0, 2), goal: (0, 0) },
        ];
        let mut stats = Stats::start();
        let outcome = solve(&grid, &agents, 1, 10_000, &mut stats).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.plan.paths.len(), 2);
        assert_eq!(outcome.plan.paths[0].first(), Some(&(0, 0)));
        assert_eq!(outcome.plan.paths[0].last(), Some(&(0, 2)));
    }
}
