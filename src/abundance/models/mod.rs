//! models: the forward likelihood engine and the survey protocols built on
//! it.
//!
//! Purpose
//! -------
//! Combine the `abundance::core` building blocks into negative
//! log-likelihoods of open-population survey data.
//!
//! Key behaviors
//! -------------
//! - [`forward`] runs the per-site HMM recursion, sequentially or on the
//!   rayon pool, against any [`ObservationModel`].
//! - [`count`] and [`distance`] implement the repeated-count and
//!   distance-sampling observation processes.
//! - [`open_population`] is the front door: [`OpenPopulationModel`] validates
//!   parameters, builds per-evaluation tables, runs the engine and returns an
//!   [`NllEvaluation`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover parameter validation of each survey protocol.
//! - The integration suite checks hand-computed likelihoods, agreement
//!   between protocols, missing-period handling, reuse and parallel
//!   invariance, and underflow flooring.

pub mod count;
pub mod distance;
pub mod forward;
pub mod open_population;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::count::{CountParameters, CountSurvey};
pub use self::distance::{DistanceParameters, DistanceSurvey};
pub use self::forward::{ForwardEngine, ObservationModel, SiteOutcome, SiteWorkspace};
pub use self::open_population::{NllEvaluation, OpenPopulationModel, SurveyLikelihood};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::count::{CountParameters, CountSurvey};
    pub use super::distance::{DistanceParameters, DistanceSurvey};
    pub use super::open_population::{NllEvaluation, OpenPopulationModel, SurveyLikelihood};
}
