//! Multi-agent pathfinding: space-time A*, independent, prioritized
//! (cooperative), CBS, and (optional) MIP planners over a shared
//! grid/agent/conflict data model. [`facade::solve`] is the crate's single
//! entry point.

pub mod astar;
pub mod config;
pub mod conflict;
pub mod constraint;
pub mod error;
pub mod facade;
pub mod grid;
pub mod model;
pub mod reservation;
pub mod solver;
pub mod stats;
