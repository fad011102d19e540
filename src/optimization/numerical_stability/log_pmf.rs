//! Log-space probability mass functions for count models.
//!
//! Provides the discrete log-pmfs the abundance engine is assembled from
//! (Poisson, binomial, negative binomial in mean/size form, zero-inflated
//! Poisson) together with the underflow floor used before every logarithm
//! of a quantity that may be exactly zero.
//!
//! # Provided items
//! - [`UNDERFLOW_FLOOR`]: smallest positive normal `f64`, added before `ln`.
//! - [`floored_ln`]: `ln(x + floor)`.
//! - [`ln_poisson`], [`ln_binomial`], [`ln_neg_binomial_mu`],
//!   [`ln_zero_inflated_poisson`]: log-pmfs returning `-inf` on impossible
//!   outcomes instead of `NaN`.
//!
//! # Conventions
//! - Degenerate parameters on the closed boundary (`mean = 0`, `p ∈ {0, 1}`)
//!   are handled exactly: the pmf collapses to a point mass.
//! - Domain checks (negative means, probabilities outside `[0, 1]`) are the
//!   caller's job; these helpers assume validated inputs.
use statrs::function::{
    factorial::{ln_binomial as ln_choose, ln_factorial as statrs_ln_factorial},
    gamma::ln_gamma,
};

/// Default underflow floor: the smallest positive normal `f64`.
///
/// Added to a probability before taking its logarithm so that an exactly
/// zero likelihood maps to `ln(f64::MIN_POSITIVE) ≈ -708.4` instead of `-inf`.
pub const UNDERFLOW_FLOOR: f64 = f64::MIN_POSITIVE;

/// `ln(x + floor)`.
#[inline]
pub fn floored_ln(x: f64, floor: f64) -> f64 {
    (x + floor).ln()
}

/// `ln k!`.
#[inline]
pub fn ln_factorial(k: u32) -> f64 {
    statrs_ln_factorial(k as u64)
}

/// Poisson log-pmf `ln P(X = k)` for `X ~ Poisson(mean)`.
///
/// A zero mean is a point mass at zero. A non-finite mean (an overflowed
/// growth law) puts no mass on any finite `k`, so every value is `-inf`.
pub fn ln_poisson(k: u32, mean: f64) -> f64 {
    if !mean.is_finite() {
        return f64::NEG_INFINITY;
    }
    if mean == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    k as f64 * mean.ln() - mean - ln_factorial(k)
}

/// Binomial log-pmf `ln P(X = k)` for `X ~ Binomial(n, p)`.
///
/// Returns `-inf` when `k > n`; `p = 0` and `p = 1` are point masses at
/// `0` and `n` respectively.
pub fn ln_binomial(k: u32, n: u32, p: f64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if p == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if p == 1.0 {
        return if k == n { 0.0 } else { f64::NEG_INFINITY };
    }
    ln_choose(n as u64, k as u64) + k as f64 * p.ln() + (n - k) as f64 * (-p).ln_1p()
}

/// Negative binomial log-pmf in mean/size parameterization.
///
/// `size` is the dispersion (`alpha > 0`), `mu` the mean. Variance is
/// `mu + mu² / size`. A zero mean is a point mass at zero.
pub fn ln_neg_binomial_mu(k: u32, size: f64, mu: f64) -> f64 {
    if mu == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    let kf = k as f64;
    let denom = size + mu;
    ln_gamma(kf + size) - ln_gamma(size) - ln_factorial(k)
        + size * (size / denom).ln()
        + kf * (mu / denom).ln()
}

/// Zero-inflated Poisson log-pmf: `psi·[k = 0] + (1 - psi)·Poisson(k; mean)`.
pub fn ln_zero_inflated_poisson(k: u32, mean: f64, psi: f64) -> f64 {
    if k == 0 {
        (psi + (1.0 - psi) * (-mean).exp()).ln()
    } else {
        (-psi).ln_1p() + ln_poisson(k, mean)
    }
}
