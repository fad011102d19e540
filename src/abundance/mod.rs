//! abundance: open-population abundance models from repeated surveys.
//!
//! Purpose
//! -------
//! Evaluate the negative log-likelihood of hierarchical open-population
//! models: latent site abundance in `0..=K` evolves between primary periods
//! under a dynamics law (constant, no-trend, autoregressive, trend, Ricker,
//! Gompertz), starts from a Poisson, negative-binomial or zero-inflated
//! Poisson mixture, and is observed through repeated counts or distance
//! sampling.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds inputs, tables and leaf computations.
//! - [`models`] holds the forward engine and the survey protocols.
//! - [`errors`] defines [`AbundanceError`], shared by every layer.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters arrive already on their natural scale (link functions and
//!   covariates live upstream).
//! - Evaluations are deterministic: the same inputs give bitwise-identical
//!   results regardless of parallelism or transition-matrix reuse.
//!
//! Downstream usage
//! ----------------
//! - Optimizers call [`OpenPopulationModel::negative_log_likelihood`] or go
//!   through `optimization::adapter::NllObjective` for argmin solvers.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{AbundanceError, AbundanceResult};
pub use self::models::{NllEvaluation, OpenPopulationModel, SurveyLikelihood};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use open_population::abundance::prelude::*;
//
// to import the main abundance surface in a single line.

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::errors::{AbundanceError, AbundanceResult};
    pub use super::models::prelude::*;
}
