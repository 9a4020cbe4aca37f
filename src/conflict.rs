//! Conflict model: vertex/edge conflict records and detection over a
//! plan's path set.

use serde::Serialize;

use crate::model::{max_len, position_at, Cell, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conflict {
    Vertex {
        agents: (usize, usize),
        cell: Cell,
        t: usize,
    },
    Edge {
        agents: (usize, usize),
        from: Cell,
        to: Cell,
        t: usize,
    },
}

impl Conflict {
    pub fn agents(&self) -> (usize, usize) {
        match *self {
            Conflict::Vertex { agents, .. } => agents,
            Conflict::Edge { agents, .. } => agents,
        }
    }

    pub fn tick(&self) -> usize {
        match *self {
            Conflict::Vertex { t, .. } => t,
            Conflict::Edge { t, .. } => t,
        }
    }

    /// Lexicographic cell used for CBS's conflict tie-break (earliest tick,
    /// then lexicographic cell).
    fn sort_cell(&self) -> Cell {
        match *self {
            Conflict::Vertex { cell, .. } => cell,
            Conflict::Edge { from, .. } => from,
        }
    }
}

/// Detects every conflict between `path_i` (agent `i`) and `path_j` (agent
/// `j`), `i < j`: a vertex conflict per shared tick, an
/// edge conflict per swap between consecutive ticks, parking treated as
/// indefinite goal occupancy.
fn conflicts_between(i: usize, path_i: &Path, j: usize, path_j: &Path) -> Vec<Conflict> {
    let mut found = Vec::new();
    let max_len = max_len(path_i, path_j);

    for t in 0..max_len {
        if position_at(path_i, t) == position_at(path_j, t) {
            found.push(Conflict::Vertex {
                agents: (i, j),
                cell: position_at(path_i, t),
                t,
            });
        }
    }

    for t in 0..max_len.saturating_sub(1) {
        let (a_now, a_next) = (position_at(path_i, t), position_at(path_i, t + 1));
        let (b_now, b_next) = (position_at(path_j, t), position_at(path_j, t + 1));
        if a_now == b_next && a_next == b_now && a_now != a_next {
            found.push(Conflict::Edge {
                agents: (i, j),
                from: a_now,
                to: a_next,
                t,
            });
        }
    }

    found
}

/// Every conflict across all agent pairs in `paths`, agent id = index.
/// Used for reporting (independent planner, sanity checks) — all
/// conflicts are kept, not just the first per pair.
pub fn detect_all(paths: &[Path]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for i in 0..paths.len() {
        for j in (i + 1)..paths.len() {
            conflicts.extend(conflicts_between(i, &paths[i], j, &paths[j]));
        }
    }
    conflicts
}

/// The conflict CBS should branch on next: earliest tick, ties broken by
/// lexicographic cell, then by agent-id pair.
pub fn first_conflict(paths: &[Path]) -> Option<Conflict> {
    detect_all(paths).into_iter().min_by_key(|c| {
        (c.tick(), c.sort_cell(), c.agents())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_on_corridor_vertex_conflict() {
        // A 1x3 corridor, agents crossing head-on.
        let a = vec![(0, 0), (0, 1), (0, 2)];
        let b = vec![(0, 2), (0, 1), (0, 0)];
        let conflicts = detect_all(&[a, b]);
        assert_eq!(
            conflicts,
            vec![Conflict::Vertex {
                agents: (0, 1),
                cell: (0, 1),
                t: 1
            }]
        );
    }

    #[test]
    fn edge_swap_conflict() {
        // A 1x2 row, agents swapping.
        let a = vec![(0, 0), (0, 1)];
        let b = vec![(0, 1), (0, 0)];
        let conflicts = detect_all(&[a, b]);
        assert_eq!(
            conflicts,
            vec![Conflict::Edge {
                agents: (0, 1),
                from: (0, 0),
                to: (0, 1),
                t: 0
            }]
        );
    }

    #[test]
    fn parked_agent_blocks_later_arrival() {
        let parked = vec![(0, 0)];
        let mover = vec![(0, 1), (0, 0)];
        let conflicts = detect_all(&[parked, mover]);
        assert!(conflicts
            .iter()
            .any(|c| matches!(c, Conflict::Vertex { t: 1, .. })));
    }

    #[test]
    fn no_conflicts_for_disjoint_paths() {
        let a = vec![(0, 0), (0, 1)];
        let b = vec![(2, 2), (2, 1)];
        assert!(detect_all(&[a, b]).is_empty());
    }
}
