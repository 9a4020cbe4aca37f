//! Space-time A*: single-agent shortest path in `(row, col,
//! tick)` state space, honoring a constraint set and, optionally, a
//! reservation table already committed by other agents.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, instrument, trace};

use crate::constraint::{latest_vertex_constraint, ConstraintSet};
use crate::grid::Grid;
use crate::model::{Agent, Cell, Path};
use crate::reservation::ReservationTable;
use crate::stats::Stats;

#[derive(Clone, Debug)]
struct LowLevelNode {
    position: Cell,
    f_cost: usize,
    g_cost: usize,
    time_step: usize,
}

/// Open-list ordering: lowest `f`, ties broken toward the higher `g` (the
/// node closer to its goal in time), then lexicographically by position —
/// keeps expansion order, and therefore the returned path, deterministic.
#[derive(Debug)]
struct OpenOrderWrapper(Rc<RefCell<LowLevelNode>>);

impl PartialEq for OpenOrderWrapper {
    fn eq(&self, other: &Self) -> bool {
        let a = self.0.borrow();
        let b = other.0.borrow();
        a.position == b.position && a.g_cost == b.g_cost
    }
}

impl Eq for OpenOrderWrapper {}

impl PartialOrd for OpenOrderWrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenOrderWrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.0.borrow();
        let b = other.0.borrow();
        a.f_cost
            .cmp(&b.f_cost)
            .then_with(|| b.g_cost.cmp(&a.g_cost))
            .then_with(|| a.position.cmp(&b.position))
    }
}

fn node(position: Cell, f_cost: usize, g_cost: usize, time_step: usize) -> OpenOrderWrapper {
    OpenOrderWrapper(Rc::new(RefCell::new(LowLevelNode {
        position,
        f_cost,
        g_cost,
        time_step,
    })))
}

/// Whether a constraint or an already-committed reservation forbids moving
/// `from -> to`, departing at `departure_time` and arriving one tick
/// later. The reservation table's edge index is keyed by departure tick,
/// so the departure tick — not the arrival tick — is what must be
/// checked against it.
fn move_is_blocked(
    from: Cell,
    to: Cell,
    departure_time: usize,
    constraints: &ConstraintSet,
    reservations: Option<&ReservationTable>,
) -> bool {
    let arrival_time = departure_time + 1;
    if constraints
        .iter()
        .any(|c| c.is_violated(from, to, arrival_time))
    {
        return true;
    }
    if let Some(table) = reservations {
        if table.is_vertex_reserved(to, arrival_time) || table.is_edge_reserved(from, to, departure_time) {
            return true;
        }
    }
    false
}

/// The latest tick at which arriving at `goal` could still be invalidated
/// by a constraint or a committed reservation, `None` if nothing ever
/// binds the goal cell. STA* must not treat an arrival as final until it
/// is past this tick — otherwise it could park on
/// a cell another agent needs to pass through later. `None` rather than a
/// default of 0 matters for the trivial `start == goal` case: with no
/// constraint at all, arriving at tick 0 must still terminate immediately.
fn park_safety_bound(
    goal: Cell,
    constraints: &ConstraintSet,
    reservations: Option<&ReservationTable>,
) -> Option<usize> {
    let from_constraints = latest_vertex_constraint(constraints, goal);
    let from_reservations = reservations.and_then(|table| table.latest_bound(goal));
    match (from_constraints, from_reservations) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0).max(b.unwrap_or(0))),
    }
}

fn construct_path(trace: &HashMap<(Cell, usize), (Cell, usize)>, goal: (Cell, usize)) -> Path {
    let mut path = vec![goal.0];
    let mut current = goal;
    while let Some(&prev) = trace.get(&current) {
        path.push(prev.0);
        current = prev;
    }
    path.reverse();
    path
}

/// Finds a cost-minimal path for `agent` on `grid`, honoring `constraints`
/// and, if given, a reservation table of paths already committed by other
/// agents. Returns `None` if no such path exists within `max_expansions`.
#[instrument(skip_all, name = "space_time_a_star", fields(agent = agent.id, start = ?agent.start, goal = ?agent.goal), level = "debug")]
pub fn search(
    grid: &Grid,
    agent: &Agent,
    constraints: &ConstraintSet,
    reservations: Option<&ReservationTable>,
    max_expansions: usize,
    stats: &mut Stats,
) -> Option<Path> {
    let bound = park_safety_bound(agent.goal, constraints, reservations);
    debug!(?bound, "park safety bound computed");

    #[allow(clippy::mutable_key_type)]
    let mut open_list = BTreeSet::new();
    let mut closed_list = HashSet::new();
    let mut trace = HashMap::new();

    let start_h = grid.heuristic(agent.start, agent.goal);
    open_list.insert(node(agent.start, start_h, 0, 0));

    while let Some(current_wrapper) = open_list.pop_first() {
        if stats.expansions >= max_expansions {
            debug!("expansion cap reached");
            return None;
        }
        let current = current_wrapper.0.borrow();
        trace!(position = ?current.position, g = current.g_cost, "expand");
        stats.record_expansion(open_list.len());

        if current.position == agent.goal && bound.map_or(true, |b| current.time_step > b) {
            return Some(construct_path(&trace, (current.position, current.g_cost)));
        }

        if !closed_list.insert((current.position, current.time_step)) {
            continue;
        }

        let tentative_g = current.g_cost + 1;
        let tentative_t = current.time_step + 1;

        for neighbor in grid.successors(current.position) {
            if closed_list.contains(&(neighbor, tentative_t)) {
                continue;
            }
            if move_is_blocked(current.position, neighbor, current.time_step, constraints, reservations) {
                continue;
            }

            let h = grid.heuristic(neighbor, agent.goal);
            if open_list.insert(node(neighbor, tentative_g + h, tentative_g, tentative_t)) {
                trace.insert((neighbor, tentative_g), (current.position, current.g_cost));
            }
        }
    }

    debug!("no path exists");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_grid(n: usize) -> Grid {
        Grid::from_blocks(vec![vec![false; n]; n])
    }

    fn agent(start: Cell, goal: Cell) -> Agent {
        Agent { id: 0, start, goal }
    }

    #[test]
    fn finds_shortest_path_on_empty_grid() {
        let grid = empty_grid(5);
        let a = agent((0, 0), (0, 4));
        let mut stats = Stats::start();
        let path = search(&grid, &a, &ConstraintSet::new(), None, 10_000, &mut stats).unwrap();
        assert_eq!(path.len() - 1, 4);
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(0, 4)));
    }

    #[test]
    fn trivial_start_equals_goal() {
        let grid = empty_grid(3);
        let a = agent((1, 1), (1, 1));
        let mut stats = Stats::start();
        let path = search(&grid, &a, &ConstraintSet::new(), None, 10_000, &mut stats).unwrap();
        assert_eq!(path, vec![(1, 1)]);
    }

    #[test]
    fn vertex_constraint_forces_detour() {
        use crate::constraint::Constraint;

        let grid = empty_grid(3);
        let a = agent((0, 0), (0, 2));
        let mut constraints = ConstraintSet::new();
        constraints.insert(Constraint::Vertex {
            cell: (0, 1),
            time_step: 1,
        });
        let mut stats = Stats::start();
        let path = search(&grid, &a, &constraints, None, 10_000, &mut stats).unwrap();
        assert!(!path
            .iter()
            .enumerate()
            .any(|(t, &cell)| cell == (0, 1) && t == 1));
    }

    #[test]
    fn no_path_around_full_wall() {
        let mut blocks = vec![vec![false; 3]; 3];
        blocks[1] = vec![true; 3];
        let grid = Grid::from_blocks(blocks);
        let a = agent((0, 0), (2, 0));
        let mut stats = Stats::start();
        assert!(search(&grid, &a, &ConstraintSet::new(), None, 10_000, &mut stats).is_none());
    }

    #[test]
    fn waits_out_a_reserved_goal_cell() {
        let grid = empty_grid(2);
        let mut table = ReservationTable::new();
        // Another agent occupies (0, 1) through tick 2, then parks on (0, 0).
        table.reserve_path(&vec![(1, 1), (0, 1), (0, 1), (0, 0)]);

        let a = agent((0, 0), (0, 1));
        let mut stats = Stats::start();
        let path = search(&grid, &a, &ConstraintSet::new(), Some(&table), 10_000, &mut stats)
            .expect("a path exists by waiting out the reservation");
        // Must not arrive at (0, 1) before tick 3, and must not collide
        // with the other agent's tick-2 -> tick-3 move into (0, 0).
        assert_eq!(path.last(), Some(&(0, 1)));
        assert!(path.len() - 1 >= 3);
    }

    #[test]
    fn expansion_cap_reports_no_path() {
        let grid = empty_grid(2);
        let a = agent((0, 0), (1, 1));
        let mut stats = Stats::start();
        assert!(search(&grid, &a, &ConstraintSet::new(), None, 0, &mut stats).is_none());
    }
}
