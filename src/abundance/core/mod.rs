//! core: building blocks of the open-population likelihood.
//!
//! Purpose
//! -------
//! Hold the inputs, tables and leaf computations that the forward engine in
//! `abundance::models` combines: family selectors, survey schedules, rate
//! arrays, transition matrices, detection probabilities, observation
//! likelihoods, mixture pmfs and the transition-matrix cache.
//!
//! Key behaviors
//! -------------
//! - [`families`] parses dynamics, mixture, key-function and survey-type
//!   selectors once into closed enums.
//! - [`schedule`] and [`rates`] validate what the caller supplies: survey
//!   windows and gaps, and per-site/per-transition dynamics rates.
//! - [`tables`], [`transition`] and [`cache`] build the `(K+1) × (K+1)`
//!   transition matrices and decide how many distinct ones an evaluation
//!   needs.
//! - [`detection`], [`quadrature`] and [`observation`] turn survey data into
//!   per-period likelihood vectors over latent abundance.
//! - [`mixture`] provides the initial-abundance prior.
//!
//! Invariants & assumptions
//! ------------------------
//! - Everything in this module is rebuilt per evaluation or is immutable
//!   input; nothing keeps state between evaluations.
//! - Domain checks live in the constructors and `validate` methods; the
//!   numerical kernels assume validated inputs and never fail.
//!
//! Conventions
//! -----------
//! - Abundance support is `0..=K`; vectors over it have length `K + 1`.
//! - Transition matrices are row-stochastic up to truncation, with
//!   `P[[n1, n2]] = P(N_t = n2 | N_{t−1} = n1)`.
//! - Rate arrays are `M × (T−1)`; column `t − 1` governs the transition
//!   that ends at period `t`.
//!
//! Testing notes
//! -------------
//! - Unit tests sit next to each submodule: closed-form agreement for
//!   detection and pmfs, row sums of transition matrices (property tests),
//!   matrix powers, schedule gap derivation and reuse detection.
//! - End-to-end likelihood values are tested in the integration suite.

pub mod cache;
pub mod detection;
pub mod families;
pub mod mixture;
pub mod observation;
pub mod options;
pub mod quadrature;
pub mod rates;
pub mod schedule;
pub mod tables;
pub mod transition;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::cache::{ReuseMode, TransitionCache};
pub use self::detection::{
    SurveyGeometry, bin_widths, detection_probabilities, fill_detection_probabilities, ring_areas,
};
pub use self::families::{Dynamics, KeyFunction, MixtureFamily, OmegaRole, SurveyType};
pub use self::mixture::{Mixture, mixture_pmf};
pub use self::observation::{fill_count_likelihood, fill_distance_likelihood};
pub use self::options::{EngineOptions, Quadrature, ReusePolicy};
pub use self::quadrature::integrate;
pub use self::rates::{DemographicRates, EffectiveRates};
pub use self::schedule::SurveySchedule;
pub use self::tables::{DistanceTables, RecruitmentIndex};
pub use self::transition::{
    TransitionBuilder, TransitionScratch, build_transition_matrix, matrix_power, propagate,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use open_population::abundance::core::prelude::*;
//
// to import the main core surface in a single line.

pub mod prelude {
    pub use super::detection::{SurveyGeometry, detection_probabilities};
    pub use super::families::{Dynamics, KeyFunction, MixtureFamily, SurveyType};
    pub use super::mixture::Mixture;
    pub use super::options::{EngineOptions, Quadrature, ReusePolicy};
    pub use super::rates::DemographicRates;
    pub use super::schedule::SurveySchedule;
    pub use super::transition::{build_transition_matrix, matrix_power};
}
