//! numerical_stability: floored log-space pmfs and parameter links.
//!
//! Purpose
//! -------
//! Collect the small numerical primitives the abundance engine and its
//! optimizer-facing adapter share, so every layer applies the same
//! underflow floor and the same overflow guards.
//!
//! Key behaviors
//! -------------
//! - [`log_pmf`]: Poisson, binomial, negative-binomial (mean/size) and
//!   zero-inflated Poisson log-pmfs built on `statrs::function`, plus
//!   [`UNDERFLOW_FLOOR`] and [`floored_ln`].
//! - [`links`]: softplus and logistic maps from unconstrained `θ` to
//!   natural-scale rates and probabilities.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite and already domain-checked by the caller; impossible
//!   outcomes return `-inf`, never `NaN`.
//! - Nothing here logs, allocates or touches global state.
//!
//! Testing notes
//! -------------
//! - Unit tests compare against closed forms and `statrs` distributions on
//!   safe grids and check boundary cases (`mean = 0`, `p ∈ {0, 1}`,
//!   `k > n`).

pub mod links;
pub mod log_pmf;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::links::{logistic, softplus};
pub use self::log_pmf::{
    UNDERFLOW_FLOOR, floored_ln, ln_binomial, ln_factorial, ln_neg_binomial_mu, ln_poisson,
    ln_zero_inflated_poisson,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use open_population::optimization::numerical_stability::prelude::*;
//
// to import the numerical-stability surface in a single line.

pub mod prelude {
    pub use super::links::{logistic, softplus};
    pub use super::log_pmf::{UNDERFLOW_FLOOR, floored_ln};
}
