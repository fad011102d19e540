//! Maps from unconstrained optimizer coordinates to natural-scale rates and
//! probabilities.
//!
//! Solvers search over `θ ∈ ℝ^p`; the engine wants rates `≥ 0` and
//! probabilities in `[0, 1]`. Both maps here are written in terms of
//! `ln(1 + e^{−|x|})`, which never overflows, so parameter closures can
//! feed any finite `θ` to the engine.

/// `softplus(x) = ln(1 + e^x)`, evaluated as `max(x, 0) + ln(1 + e^{−|x|})`.
///
/// Maps `ℝ` onto `(0, ∞)`; saturates to `x` for large `x` and to `0` when
/// `e^x` underflows.
#[inline]
pub fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// Logistic map `1 / (1 + e^{−x}) = exp(−softplus(−x))`, from `ℝ` onto
/// `[0, 1]`.
#[inline]
pub fn logistic(x: f64) -> f64 {
    (-softplus(-x)).exp()
}
