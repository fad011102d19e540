//! Engine configuration: parallelism, transition-matrix reuse, quadrature
//! and the underflow floor.
//!
//! Purpose
//! -------
//! Carry the knobs that change *how* a likelihood is evaluated without
//! changing *what* is evaluated. Every setting here is observationally
//! neutral up to floating-point summation order, which the engine keeps
//! fixed, so two evaluations that differ only in options return identical
//! values (quadrature aside).
//!
//! Key behaviors
//! -------------
//! - [`EngineOptions`] is a plain data carrier with `Default` and serde
//!   support (`#[serde(default)]`), so partial configs deserialize cleanly.
//! - [`EngineOptions::validate`] checks numeric ranges once before an
//!   evaluation starts.
//!
//! Conventions
//! -----------
//! - Quadrature settings only affect non-uniform distance keys that are
//!   integrated numerically (exponential point surveys, hazard-rate).
use crate::{
    abundance::errors::{AbundanceError, AbundanceResult},
    optimization::numerical_stability::UNDERFLOW_FLOOR,
};
use serde::{Deserialize, Serialize};

/// Default number of trapezoid panels per distance bin.
pub const DEFAULT_SUBDIVISIONS: usize = 100;

/// Whether the engine may share transition matrices across sites/periods.
///
/// - `Auto`: detect the sharing pattern from the effective dynamics rates
///   (scalar, per-period or none) and build each distinct matrix once.
/// - `Never`: build a fresh matrix for every site/period pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReusePolicy {
    #[default]
    Auto,
    Never,
}

/// Numerical integration rule for distance-bin detection probabilities.
///
/// - `Trapezoid { subdivisions }`: composite trapezoid rule with a fixed
///   number of equal panels per bin.
/// - `AdaptiveSimpson { rel_tol, max_depth }`: recursive Simpson rule that
///   refines each half-interval until the Richardson error estimate falls
///   below `rel_tol` times the running estimate, or `max_depth` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Quadrature {
    Trapezoid { subdivisions: usize },
    AdaptiveSimpson { rel_tol: f64, max_depth: u32 },
}

impl Default for Quadrature {
    fn default() -> Self {
        Quadrature::Trapezoid { subdivisions: DEFAULT_SUBDIVISIONS }
    }
}

/// Evaluation options.
///
/// Fields:
/// - `parallel: bool`: evaluate sites on the rayon pool.
/// - `reuse: ReusePolicy`: transition-matrix sharing policy.
/// - `quadrature: Quadrature`: integration rule for distance keys.
/// - `underflow_floor: f64`: added before every logarithm of a possibly
///   zero probability. Must be finite and `> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub parallel: bool,
    pub reuse: ReusePolicy,
    pub quadrature: Quadrature,
    pub underflow_floor: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            parallel: true,
            reuse: ReusePolicy::Auto,
            quadrature: Quadrature::default(),
            underflow_floor: UNDERFLOW_FLOOR,
        }
    }
}

impl EngineOptions {
    /// Sequential evaluation with otherwise default settings.
    pub fn sequential() -> Self {
        EngineOptions { parallel: false, ..Default::default() }
    }

    /// Check numeric option ranges.
    ///
    /// # Errors
    /// Returns [`AbundanceError::InvalidOption`] when the floor is not finite
    /// and positive, the trapezoid rule has zero panels, or the adaptive rule
    /// has a non-positive tolerance or zero depth.
    pub fn validate(&self) -> AbundanceResult<()> {
        if !(self.underflow_floor.is_finite() && self.underflow_floor > 0.0) {
            return Err(AbundanceError::InvalidOption {
                option: "underflow_floor",
                value: self.underflow_floor,
                reason: "must be finite and > 0",
            });
        }
        match self.quadrature {
            Quadrature::Trapezoid { subdivisions } if subdivisions == 0 => {
                Err(AbundanceError::InvalidOption {
                    option: "quadrature.subdivisions",
                    value: 0.0,
                    reason: "need at least one panel",
                })
            }
            Quadrature::AdaptiveSimpson { rel_tol, .. } if !(rel_tol.is_finite() && rel_tol > 0.0) => {
                Err(AbundanceError::InvalidOption {
                    option: "quadrature.rel_tol",
                    value: rel_tol,
                    reason: "must be finite and > 0",
                })
            }
            Quadrature::AdaptiveSimpson { max_depth: 0, .. } => Err(AbundanceError::InvalidOption {
                option: "quadrature.max_depth",
                value: 0.0,
                reason: "need at least one refinement level",
            }),
            _ => Ok(()),
        }
    }
}
