//! Transition history aggregation
//!
//! Groups overlay fragments by their ordered tuple of per-period classes
//! and sums area per unique tuple.

mod aggregate;

pub use aggregate::{aggregate, TransitionTable};
