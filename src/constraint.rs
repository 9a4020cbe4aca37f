//! Constraint set: per-agent vertex/edge prohibitions at specific ticks,
//! consumed by space-time A* and produced by CBS.

use std::collections::HashSet;

use crate::model::Cell;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Constraint {
    /// Agent may not occupy `cell` at `time_step`.
    Vertex { cell: Cell, time_step: usize },
    /// Agent may not traverse `from -> to` arriving at `time_step`.
    Edge {
        from: Cell,
        to: Cell,
        time_step: usize,
    },
}

impl Constraint {
    /// Whether moving `from -> to`, arriving at `arrival_time`, violates
    /// this constraint.
    pub fn is_violated(&self, from: Cell, to: Cell, arrival_time: usize) -> bool {
        match *self {
            Constraint::Vertex { cell, time_step } => to == cell && arrival_time == time_step,
            Constraint::Edge {
                from: cfrom,
                to: cto,
                time_step,
            } => from == cfrom && to == cto && arrival_time == time_step,
        }
    }

    pub fn time_step(&self) -> usize {
        match *self {
            Constraint::Vertex { time_step, .. } => time_step,
            Constraint::Edge { time_step, .. } => time_step,
        }
    }
}

/// All constraints scoped to a single agent for one low-level search.
pub type ConstraintSet = HashSet<Constraint>;

/// The latest tick any constraint in `constraints` binds `cell`, if any —
/// used by STA* to decide whether an arrival at `cell` can safely park.
pub fn latest_vertex_constraint(constraints: &ConstraintSet, cell: Cell) -> Option<usize> {
    constraints
        .iter()
        .filter_map(|c| match *c {
            Constraint::Vertex {
                cell: ccell,
                time_step,
            } if ccell == cell => Some(time_step),
            _ => None,
        })
        .max()
}
