//! optimization: numerical helpers and the optimizer-facing objective.
//!
//! Purpose
//! -------
//! Provide what a model-fitting layer needs around the likelihood engine:
//! floored log-space pmfs shared with the engine, links between
//! unconstrained `θ` and natural-scale parameters, and an `argmin`
//! [`CostFunction`](argmin::core::CostFunction) wrapping the negative
//! log-likelihood.
//!
//! Key behaviors
//! -------------
//! - [`numerical_stability`]: log-pmfs, the underflow floor and the
//!   softplus/logistic links.
//! - [`adapter`]: [`NllObjective`], a deterministic cost oracle for any
//!   argmin solver.
//!
//! Conventions
//! -----------
//! - The cost is the negative log-likelihood itself; solvers minimize it.
//! - Failures surface as `AbundanceError`, converted into argmin's error
//!   type at the `CostFunction` boundary.
//! - No solver, line search or stopping rule is configured here.

pub mod adapter;
pub mod numerical_stability;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::adapter::{NllObjective, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use open_population::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::adapter::{NllObjective, Theta};
    pub use super::numerical_stability::prelude::*;
}
