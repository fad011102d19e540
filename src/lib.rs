//! open_population: likelihood engine for open-population abundance
//! models.
//!
//! Purpose
//! -------
//! Evaluate negative log-likelihoods of dynamic N-mixture style models:
//! latent abundance at each site starts from a Poisson, negative-binomial
//! or zero-inflated Poisson prior, evolves between primary periods under a
//! survival/recruitment or growth law, and is observed through repeated
//! counts or binned distance sampling. Parameters arrive on their natural
//! scale; the crate returns a finite `f64` or a structured error.
//!
//! Key behaviors
//! -------------
//! - [`abundance`]: families, schedules, rates, transition matrices,
//!   detection and observation likelihoods, and the forward engine behind
//!   [`OpenPopulationModel`](abundance::OpenPopulationModel).
//! - [`optimization`]: floored log-pmfs, parameter links and an argmin
//!   `CostFunction` wrapping the likelihood.
//!
//! Invariants & assumptions
//! ------------------------
//! - Evaluations are pure and deterministic; the per-site loop may run on
//!   the rayon pool, and results are identical either way.
//! - Every validation error is raised before any site is processed.
//!
//! Conventions
//! -----------
//! - Indices are 0-based; abundance support is `0..=K`.
//! - The library emits `tracing` spans and events but never installs a
//!   subscriber.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; end-to-end checks live in
//!   `tests/integration_open_population.rs`.

pub mod abundance;
pub mod optimization;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use open_population::prelude::*;
//
// to import the model front door, survey types and errors in one line.

pub mod prelude {
    pub use crate::abundance::prelude::*;
    pub use crate::optimization::prelude::*;
}
