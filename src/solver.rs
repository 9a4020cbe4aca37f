//! Planners: independent, prioritized/cooperative, CBS, and
//! (feature-gated) time-expanded MIP. Each takes a [`Grid`](crate::grid::Grid)
//! and a slice of [`Agent`](crate::model::Agent)s and returns a
//! [`Plan`](crate::model::Plan).

pub mod cbs;
pub mod cooperative;
pub mod independent;

#[cfg(feature = "mip")]
pub mod mip;
