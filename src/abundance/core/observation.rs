//! Observation likelihood of one site/period as a function of latent
//! abundance `k ∈ 0..=K`.
//!
//! - Repeated counts: `g(k) = Π_j Bin(y_j; k, p_j)` over non-missing
//!   secondary occasions, evaluated as `exp(Σ_j ln Bin(y_j; k, p_j))`.
//! - Distance sampling with per-bin capture probabilities `cp_j` and total
//!   detections `y_t = Σ_j y_j` (multinomial over bins plus an undetected
//!   cell):
//!   - non-uniform keys:
//!     `g(k) = [k ≥ y_t]·exp(ln k! − ln (k − y_t)! + Σ_j y_j ln cp_j + (k − y_t)·ln(1 − Σ_j cp_j))`;
//!   - uniform key: detection is certain, so only `k = y_t` has non-zero
//!     likelihood `exp(ln y_t! + Σ_j y_j ln cp_j)`, the `k = y_t` term of the
//!     non-uniform form.
//!
//! The multinomial constant `−Σ_j ln y_j!` does not depend on `k` or on any
//! parameter and is omitted. Every logarithm of a possibly-zero probability
//! adds the underflow floor first.
use crate::{
    abundance::core::tables::DistanceTables,
    optimization::numerical_stability::{floored_ln, ln_binomial},
};
use ndarray::{ArrayView1, ArrayViewMut1, Zip};

/// Repeated-count likelihood for one site/period.
///
/// `counts[j] = None` marks a missing secondary occasion, which contributes
/// a factor of 1.
pub fn fill_count_likelihood(
    counts: ArrayView1<Option<u32>>, detection: ArrayView1<f64>, mut out: ArrayViewMut1<f64>,
) {
    for (k, slot) in out.iter_mut().enumerate() {
        let mut ln_g = 0.0;
        Zip::from(&counts).and(&detection).for_each(|y, &p| {
            if let Some(y) = *y {
                ln_g += ln_binomial(y, k as u32, p);
            }
        });
        *slot = ln_g.exp();
    }
}

/// Distance-sampling likelihood for one site/period.
///
/// Parameters
/// ----------
/// - `counts`: detections per distance bin.
/// - `capture`: per-bin capture probabilities `cp_j` (detection times
///   availability).
/// - `total`: `Σ_j counts[j]`.
/// - `tables`: factorial table for `0..=K`.
/// - `uniform`: whether the key function is uniform.
/// - `floor`: underflow floor added before each logarithm.
#[allow(clippy::too_many_arguments)]
pub fn fill_distance_likelihood(
    counts: ArrayView1<u32>, capture: ArrayView1<f64>, total: u32, tables: &DistanceTables,
    uniform: bool, floor: f64, mut out: ArrayViewMut1<f64>,
) {
    let mut ln_captured = 0.0;
    Zip::from(&counts).and(&capture).for_each(|&y, &cp| {
        if y > 0 {
            ln_captured += y as f64 * floored_ln(cp, floor);
        }
    });

    out.fill(0.0);
    if uniform {
        if let Some(slot) = out.get_mut(total as usize) {
            *slot = (tables.ln_factorial(total as usize) + ln_captured).exp();
        }
        return;
    }

    let ln_missed = floored_ln((1.0 - capture.sum()).max(0.0), floor);
    for (k, slot) in out.iter_mut().enumerate() {
        if let Some(ln_fact_rest) = tables.ln_factorial_remaining(k, total) {
            let missed = (k - total as usize) as f64;
            *slot = (tables.ln_factorial(k) - ln_fact_rest + ln_captured + ln_missed * missed).exp();
        }
    }
}
