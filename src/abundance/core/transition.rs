//! Transition matrices of latent abundance under each dynamics law.
//!
//! Purpose
//! -------
//! Build the `(K+1) × (K+1)` one-step transition matrix `P`, with
//! `P[[n1, n2]] = P(N_t = n2 | N_{t−1} = n1)`, for the requested dynamics
//! law, and apply its powers to abundance vectors.
//!
//! Key behaviors
//! -------------
//! - Convolution laws (constant, no-trend, autoregressive) sum
//!   `Bin(c; n1, ω)·Pois(n2 − c; μ)` over survivors `c` using the
//!   [`RecruitmentIndex`] arena. Log binomial terms are computed once per
//!   survivor pair and log Poisson terms once per recruit count (per row
//!   for the autoregressive law), so each arena entry costs one add and
//!   one `exp`.
//! - Growth laws (trend, Ricker, Gompertz) are a single Poisson with a
//!   law-specific mean.
//! - The law-specific kernel is resolved to a function pointer once, in
//!   [`TransitionBuilder::new`], and never re-dispatched per matrix.
//! - [`propagate`] applies `P^d · v` as `d` matrix-vector products, which
//!   equals `matrix_power(P, d).dot(v)` without forming the power.
//!
//! Invariants & assumptions
//! ------------------------
//! - Rates are validated upstream (see `DemographicRates::validate`);
//!   kernels assume `γ, ι ≥ 0` and `ω` inside its law's domain.
//! - Rows are not renormalized: mass above `K` is truncated.
use crate::{
    abundance::{
        core::{
            families::{Dynamics, OmegaRole},
            tables::RecruitmentIndex,
        },
        errors::{AbundanceError, AbundanceResult},
    },
    optimization::numerical_stability::{ln_binomial, ln_poisson},
};
use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2, linalg::general_mat_vec_mul};

/// Scratch space for convolution kernels.
///
/// - `ln_survival[pair]`: `ln Bin(c; n1, ω)` for each survivor pair.
/// - `ln_recruitment[n1·(K+1) + r]`: `ln Pois(r; μ(n1))`. Only the first
///   row is used when the recruitment mean does not depend on `n1`.
#[derive(Debug, Clone)]
pub struct TransitionScratch {
    ln_survival: Vec<f64>,
    ln_recruitment: Vec<f64>,
}

impl TransitionScratch {
    pub fn new(k: usize) -> Self {
        let lk = k + 1;
        TransitionScratch {
            ln_survival: vec![0.0; lk * (lk + 1) / 2],
            ln_recruitment: vec![0.0; lk * lk],
        }
    }
}

type Kernel = fn(&TransitionBuilder<'_>, f64, f64, f64, &mut TransitionScratch, ArrayViewMut2<f64>);

/// Builder of transition matrices for one dynamics law and truncation
/// bound.
///
/// Holds no mutable state: per-thread scratch is passed to [`fill`].
///
/// [`fill`]: TransitionBuilder::fill
#[derive(Clone)]
pub struct TransitionBuilder<'a> {
    dynamics: Dynamics,
    lk: usize,
    index: Option<&'a RecruitmentIndex>,
    kernel: Kernel,
}

impl std::fmt::Debug for TransitionBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionBuilder")
            .field("dynamics", &self.dynamics)
            .field("lk", &self.lk)
            .finish()
    }
}

impl<'a> TransitionBuilder<'a> {
    /// Resolve the kernel for `dynamics` over support `0..=k`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when a convolution law is requested without a
    /// recruitment index for the same `k`.
    pub fn new(
        dynamics: Dynamics, k: usize, index: Option<&'a RecruitmentIndex>,
    ) -> AbundanceResult<Self> {
        let kernel: Kernel = match dynamics {
            Dynamics::Constant | Dynamics::NoTrend => constant_kernel,
            Dynamics::Autoreg => autoreg_kernel,
            Dynamics::Trend => trend_kernel,
            Dynamics::Ricker => ricker_kernel,
            Dynamics::Gompertz => gompertz_kernel,
        };
        if dynamics.is_convolution() {
            let index_k = index.map(RecruitmentIndex::k);
            if index_k != Some(k) {
                return Err(AbundanceError::ShapeMismatch {
                    what: "recruitment index",
                    expected: vec![k + 1],
                    actual: index_k.map(|ik| vec![ik + 1]).unwrap_or_default(),
                });
            }
        }
        Ok(TransitionBuilder { dynamics, lk: k + 1, index, kernel })
    }

    pub fn dynamics(&self) -> Dynamics {
        self.dynamics
    }

    /// Overwrite `out` with the transition matrix for rates `(γ, ω, ι)`.
    ///
    /// `out` must be `(K+1) × (K+1)`.
    pub fn fill(
        &self, gamma: f64, omega: f64, iota: f64, scratch: &mut TransitionScratch,
        out: ArrayViewMut2<f64>,
    ) {
        debug_assert_eq!(out.dim(), (self.lk, self.lk));
        (self.kernel)(self, gamma, omega, iota, scratch, out);
    }

    /// Allocate and return the transition matrix for rates `(γ, ω, ι)`.
    pub fn build(&self, gamma: f64, omega: f64, iota: f64, scratch: &mut TransitionScratch) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((self.lk, self.lk));
        self.fill(gamma, omega, iota, scratch, out.view_mut());
        out
    }

    fn recruitment_index(&self) -> &RecruitmentIndex {
        // `new` guarantees an index for convolution laws.
        self.index.unwrap_or_else(|| unreachable!("convolution kernel without recruitment index"))
    }
}

fn fill_survival(index: &RecruitmentIndex, omega: f64, scratch: &mut TransitionScratch) {
    for (slot, &(c, n1)) in scratch.ln_survival.iter_mut().zip(index.pairs()) {
        *slot = ln_binomial(c, n1, omega);
    }
}

fn convolve(
    index: &RecruitmentIndex, lk: usize, per_row: bool, scratch: &TransitionScratch,
    mut out: ArrayViewMut2<f64>,
) {
    for n1 in 0..lk {
        let row_offset = if per_row { n1 * lk } else { 0 };
        for n2 in 0..lk {
            let mut acc = 0.0;
            for term in index.cell_terms(n1, n2) {
                acc += (scratch.ln_survival[term.pair as usize]
                    + scratch.ln_recruitment[row_offset + term.recruits as usize])
                    .exp();
            }
            out[[n1, n2]] = acc;
        }
    }
}

fn constant_kernel(
    builder: &TransitionBuilder<'_>, gamma: f64, omega: f64, _iota: f64, scratch: &mut TransitionScratch,
    out: ArrayViewMut2<f64>,
) {
    let index = builder.recruitment_index();
    fill_survival(index, omega, scratch);
    for r in 0..builder.lk {
        scratch.ln_recruitment[r] = ln_poisson(r as u32, gamma);
    }
    convolve(index, builder.lk, false, scratch, out);
}

fn autoreg_kernel(
    builder: &TransitionBuilder<'_>, gamma: f64, omega: f64, iota: f64, scratch: &mut TransitionScratch,
    out: ArrayViewMut2<f64>,
) {
    let index = builder.recruitment_index();
    let lk = builder.lk;
    fill_survival(index, omega, scratch);
    for n1 in 0..lk {
        let mean = gamma * n1 as f64 + iota;
        for r in 0..lk {
            scratch.ln_recruitment[n1 * lk + r] = ln_poisson(r as u32, mean);
        }
    }
    convolve(index, lk, true, scratch, out);
}

fn fill_poisson_rows(lk: usize, mean: impl Fn(f64) -> f64, mut out: ArrayViewMut2<f64>) {
    for n1 in 0..lk {
        let mu = mean(n1 as f64);
        for n2 in 0..lk {
            out[[n1, n2]] = ln_poisson(n2 as u32, mu).exp();
        }
    }
}

fn trend_kernel(
    builder: &TransitionBuilder<'_>, gamma: f64, _omega: f64, iota: f64, _scratch: &mut TransitionScratch,
    out: ArrayViewMut2<f64>,
) {
    fill_poisson_rows(builder.lk, |n1| gamma * n1 + iota, out);
}

/// `n1·e^exponent`, exactly zero for an empty site even when the exponential
/// overflows.
fn density_dependent_growth(n1: f64, exponent: f64) -> f64 {
    if n1 == 0.0 { 0.0 } else { n1 * exponent.exp() }
}

fn ricker_kernel(
    builder: &TransitionBuilder<'_>, gamma: f64, omega: f64, iota: f64, _scratch: &mut TransitionScratch,
    out: ArrayViewMut2<f64>,
) {
    fill_poisson_rows(builder.lk, |n1| density_dependent_growth(n1, gamma * (1.0 - n1 / omega)) + iota, out);
}

fn gompertz_kernel(
    builder: &TransitionBuilder<'_>, gamma: f64, omega: f64, iota: f64, _scratch: &mut TransitionScratch,
    out: ArrayViewMut2<f64>,
) {
    let ln_capacity = omega.ln_1p();
    fill_poisson_rows(
        builder.lk,
        |n1| density_dependent_growth(n1, gamma * (1.0 - n1.ln_1p() / ln_capacity)) + iota,
        out,
    );
}

/// Build one transition matrix for scalar rates.
///
/// Convenience entry point for callers outside the engine; builds the
/// recruitment index on the fly when the law needs it.
///
/// # Errors
/// - `InvalidRate` / `InvalidProbability` for rates outside their domain.
/// - `TruncationTooLarge` for convolution laws with `k` beyond the index
///   limit.
pub fn build_transition_matrix(
    dynamics: Dynamics, k: usize, gamma: f64, omega: f64, iota: f64,
) -> AbundanceResult<Array2<f64>> {
    check_scalar_rates(dynamics, gamma, omega, iota)?;
    let index = if dynamics.is_convolution() { Some(RecruitmentIndex::new(k)?) } else { None };
    let builder = TransitionBuilder::new(dynamics, k, index.as_ref())?;
    let mut scratch = TransitionScratch::new(k);
    Ok(builder.build(gamma, omega, iota, &mut scratch))
}

fn check_scalar_rates(dynamics: Dynamics, gamma: f64, omega: f64, iota: f64) -> AbundanceResult<()> {
    let rate_error = |what, value, reason| AbundanceError::InvalidRate { what, site: 0, column: 0, value, reason };
    if !(gamma.is_finite() && gamma >= 0.0) {
        return Err(rate_error("gamma", gamma, "must be finite and >= 0"));
    }
    if !(iota.is_finite() && iota >= 0.0) {
        return Err(rate_error("iota", iota, "must be finite and >= 0"));
    }
    if iota != 0.0 && !dynamics.supports_immigration() {
        return Err(rate_error("iota", iota, "the constant and notrend laws have no immigration term"));
    }
    match dynamics.omega_role() {
        OmegaRole::Survival if !(0.0..=1.0).contains(&omega) => {
            Err(AbundanceError::InvalidProbability { what: "omega", index: vec![0, 0], value: omega })
        }
        OmegaRole::CarryingCapacity if !(omega.is_finite() && omega > 0.0) => {
            Err(rate_error("omega", omega, "must be finite and > 0"))
        }
        _ => Ok(()),
    }
}

/// `P^power` by repeated multiplication; `power = 0` gives the identity.
pub fn matrix_power(matrix: ArrayView2<f64>, power: u32) -> Array2<f64> {
    let mut result = Array2::<f64>::eye(matrix.nrows());
    for _ in 0..power {
        result = result.dot(&matrix);
    }
    result
}

/// Replace `vector` with `P^power · vector`, using `buffer` as scratch.
///
/// Both vectors must have length `K+1`.
pub fn propagate(matrix: ArrayView2<f64>, power: u32, vector: &mut Array1<f64>, buffer: &mut Array1<f64>) {
    for _ in 0..power {
        general_mat_vec_mul(1.0, &matrix, &*vector, 0.0, buffer);
        std::mem::swap(vector, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use proptest::prelude::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Hand-checked entries for each law on tiny supports.
    // - Row sums equal to 1 away from the truncation bound (property tests).
    // - Matrix powers and `propagate` agreement.
    // -------------------------------------------------------------------------

    const WIDE_K: usize = 60;
    const INNER_ROWS: usize = 15;

    fn assert_inner_rows_sum_to_one(p: &Array2<f64>) {
        for n1 in 0..=INNER_ROWS {
            let row_sum: f64 = p.row(n1).sum();
            assert!((row_sum - 1.0).abs() < 1e-8, "row {n1} sums to {row_sum}");
        }
    }

    #[test]
    // Purpose
    // -------
    // The constant law reproduces the survival/recruitment convolution.
    //
    // Given
    // -----
    // - `K = 5`, `γ = 0.5`, `ω = 0.8`, `ι = 0`.
    //
    // Expect
    // ------
    // - `P[1, 2] = 0.8·Pois(1; 0.5) + 0.2·Pois(2; 0.5)`.
    // - `P[0, n2] = Pois(n2; 0.5)`.
    fn constant_law_matches_hand_convolution() {
        let p = build_transition_matrix(Dynamics::Constant, 5, 0.5, 0.8, 0.0).unwrap();
        let e = (-0.5_f64).exp();
        let pois = |r: i32| e * 0.5_f64.powi(r) / (1..=r).product::<i32>().max(1) as f64;
        assert_relative_eq!(p[[1, 2]], 0.8 * pois(1) + 0.2 * pois(2), epsilon = 1e-14);
        for n2 in 0..6 {
            assert_relative_eq!(p[[0, n2]], pois(n2 as i32), epsilon = 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // The autoregressive law scales recruitment by current abundance, so an
    // empty site with no immigration stays empty.
    fn autoreg_empty_site_is_absorbing_without_immigration() {
        let p = build_transition_matrix(Dynamics::Autoreg, 6, 0.7, 0.5, 0.0).unwrap();
        assert_relative_eq!(p[[0, 0]], 1.0);
        assert_eq!(p.row(0).slice(ndarray::s![1..]).sum(), 0.0);
        let with_iota = build_transition_matrix(Dynamics::Autoreg, 6, 0.7, 0.5, 0.4).unwrap();
        assert_relative_eq!(with_iota[[0, 0]], (-0.4_f64).exp(), epsilon = 1e-14);
    }

    #[test]
    // Purpose
    // -------
    // Growth laws are single Poissons with the documented means.
    //
    // Given
    // -----
    // - `n1 = 3`, `γ = 0.4`, carrying capacity `ω = 6`.
    //
    // Expect
    // ------
    // - Trend mean `1.2`, Ricker mean `3·e^{0.2}`, Gompertz mean
    //   `3·e^{0.4(1 − ln 4/ln 7)}`; `P[3, 2]` matches `Pois(2; mean)`.
    fn growth_laws_use_documented_means() {
        let pois2 = |mu: f64| (-mu).exp() * mu * mu / 2.0;
        let trend = build_transition_matrix(Dynamics::Trend, 10, 0.4, 0.0, 0.0).unwrap();
        assert_relative_eq!(trend[[3, 2]], pois2(1.2), epsilon = 1e-14);
        let ricker = build_transition_matrix(Dynamics::Ricker, 10, 0.4, 6.0, 0.0).unwrap();
        assert_relative_eq!(ricker[[3, 2]], pois2(3.0 * 0.2_f64.exp()), epsilon = 1e-13);
        let gompertz = build_transition_matrix(Dynamics::Gompertz, 10, 0.4, 6.0, 0.0).unwrap();
        let mu = 3.0 * (0.4 * (1.0 - 4.0_f64.ln() / 7.0_f64.ln())).exp();
        assert_relative_eq!(gompertz[[3, 2]], pois2(mu), epsilon = 1e-13);
    }

    #[test]
    // Purpose
    // -------
    // Explosive growth rates overflow the Poisson mean without poisoning the
    // matrix with NaN.
    //
    // Given
    // -----
    // - `K = 5`, `γ = 800`, carrying capacity `ω = 50`, `ι = 0`.
    //
    // Expect
    // ------
    // - Every entry finite.
    // - Row 0 is a point mass at 0; rows 1..=5 send all mass beyond `K`.
    fn explosive_growth_stays_finite() {
        for dynamics in [Dynamics::Ricker, Dynamics::Gompertz] {
            let p = build_transition_matrix(dynamics, 5, 800.0, 50.0, 0.0).unwrap();
            assert!(p.iter().all(|v| v.is_finite()), "{dynamics}: {p}");
            assert_eq!(p[[0, 0]], 1.0);
            assert_eq!(p.row(0).sum(), 1.0);
            for n1 in 1..6 {
                assert_eq!(p.row(n1).sum(), 0.0, "{dynamics} row {n1}");
            }
            let with_iota = build_transition_matrix(dynamics, 5, 800.0, 50.0, 0.5).unwrap();
            assert_relative_eq!(with_iota[[0, 1]], 0.5 * (-0.5_f64).exp(), epsilon = 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // Out-of-domain scalar rates are rejected.
    fn build_rejects_bad_rates() {
        assert!(matches!(
            build_transition_matrix(Dynamics::Constant, 4, -1.0, 0.5, 0.0),
            Err(AbundanceError::InvalidRate { what: "gamma", .. })
        ));
        assert!(matches!(
            build_transition_matrix(Dynamics::Autoreg, 4, 1.0, 1.5, 0.0),
            Err(AbundanceError::InvalidProbability { what: "omega", .. })
        ));
        assert!(matches!(
            build_transition_matrix(Dynamics::Ricker, 4, 1.0, 0.0, 0.0),
            Err(AbundanceError::InvalidRate { what: "omega", .. })
        ));
        assert!(matches!(
            build_transition_matrix(Dynamics::Constant, 4, 1.0, 0.5, 0.2),
            Err(AbundanceError::InvalidRate { what: "iota", .. })
        ));
        assert!(build_transition_matrix(Dynamics::Autoreg, 4, 1.0, 0.5, 0.2).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // `matrix_power` agrees with explicit products; power 1 is the matrix
    // itself and power 0 the identity.
    fn matrix_power_matches_explicit_products() {
        let p = build_transition_matrix(Dynamics::Constant, 8, 0.9, 0.6, 0.0).unwrap();
        let cubed = p.dot(&p).dot(&p);
        let powered = matrix_power(p.view(), 3);
        for (a, b) in powered.iter().zip(cubed.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
        assert_eq!(matrix_power(p.view(), 1), p);
        assert_eq!(matrix_power(p.view(), 0), Array2::<f64>::eye(9));
    }

    #[test]
    // Purpose
    // -------
    // `propagate` equals multiplying by the matrix power, and a unit gap
    // applies the matrix exactly once.
    fn propagate_matches_matrix_power() {
        let p = build_transition_matrix(Dynamics::Trend, 4, 0.8, 0.0, 0.2).unwrap();
        let v = array![0.1, 0.5, 0.2, 0.9, 0.3];
        let mut out = v.clone();
        let mut buffer = Array1::zeros(5);
        propagate(p.view(), 3, &mut out, &mut buffer);
        let expected = matrix_power(p.view(), 3).dot(&v);
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
        let mut once = v.clone();
        propagate(p.view(), 1, &mut once, &mut buffer);
        for (a, b) in once.iter().zip(p.dot(&v).iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-15);
        }
    }

    #[test]
    // Purpose
    // -------
    // Convolution laws need a recruitment index of matching size.
    fn builder_requires_matching_index() {
        let index = RecruitmentIndex::new(3).unwrap();
        assert!(TransitionBuilder::new(Dynamics::Constant, 4, Some(&index)).is_err());
        assert!(TransitionBuilder::new(Dynamics::Autoreg, 4, None).is_err());
        assert!(TransitionBuilder::new(Dynamics::Ricker, 4, None).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn survival_law_rows_sum_to_one(
            gamma in 0.0f64..1.5,
            omega in 0.0f64..=1.0,
            iota in 0.0f64..2.0,
        ) {
            for dynamics in [Dynamics::Constant, Dynamics::NoTrend] {
                let p = build_transition_matrix(dynamics, WIDE_K, gamma, omega, 0.0).unwrap();
                assert_inner_rows_sum_to_one(&p);
            }
            let p = build_transition_matrix(Dynamics::Autoreg, WIDE_K, gamma.min(0.8), omega, iota).unwrap();
            assert_inner_rows_sum_to_one(&p);
        }

        #[test]
        fn growth_law_rows_sum_to_one(
            gamma in 0.0f64..1.0,
            capacity in 1.0f64..20.0,
            iota in 0.0f64..2.0,
        ) {
            let trend = build_transition_matrix(Dynamics::Trend, WIDE_K, gamma, 0.0, iota).unwrap();
            assert_inner_rows_sum_to_one(&trend);
            for dynamics in [Dynamics::Ricker, Dynamics::Gompertz] {
                let p = build_transition_matrix(dynamics, WIDE_K, gamma, capacity, iota).unwrap();
                assert_inner_rows_sum_to_one(&p);
            }
        }
    }
}
