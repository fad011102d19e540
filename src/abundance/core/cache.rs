//! Transition-matrix reuse across sites and periods.
//!
//! Purpose
//! -------
//! Building a transition matrix costs `O(K³)` for survival/recruitment
//! laws, so when the effective dynamics rates are shared the engine builds
//! each distinct matrix once, before the site loop, and only reads it
//! inside.
//!
//! Key behaviors
//! -------------
//! - [`ReuseMode::detect`] inspects the effective `(γ, ω, ι)` arrays:
//!   - `Scalar`: every site and column carries the same triple;
//!   - `RowVec`: each column is constant across sites;
//!   - `Matrix`: anything else, so matrices are built per site/column.
//! - [`TransitionCache`] stores one matrix (`Scalar`), one per column
//!   (`RowVec`) or none (`Matrix`), and hands out views, filling a caller
//!   buffer on a miss.
//!
//! Invariants & assumptions
//! ------------------------
//! - Detection uses exact equality, so cached and freshly built matrices
//!   are bitwise identical and reuse never changes a likelihood.
use crate::abundance::core::{
    options::ReusePolicy,
    rates::EffectiveRates,
    transition::{TransitionBuilder, TransitionScratch},
};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Sharing pattern of transition matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseMode {
    Scalar,
    RowVec,
    Matrix,
}

impl ReuseMode {
    /// Detect the widest sharing pattern the effective rates allow.
    pub fn detect(rates: &EffectiveRates) -> Self {
        let arrays = [&rates.gamma, &rates.omega, &rates.iota];
        let all_equal = arrays.iter().all(|a| a.first().is_none_or(|v0| a.iter().all(|v| v == v0)));
        if all_equal {
            return ReuseMode::Scalar;
        }
        let columns_constant = (0..rates.n_columns()).all(|c| {
            arrays.iter().all(|a| {
                let col = a.column(c);
                col.first().is_none_or(|v0| col.iter().all(|v| v == v0))
            })
        });
        if columns_constant { ReuseMode::RowVec } else { ReuseMode::Matrix }
    }

    /// Mode implied by a reuse policy.
    pub fn resolve(policy: ReusePolicy, rates: &EffectiveRates) -> Self {
        match policy {
            ReusePolicy::Auto => ReuseMode::detect(rates),
            ReusePolicy::Never => ReuseMode::Matrix,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReuseMode::Scalar => "scalar",
            ReuseMode::RowVec => "rowvec",
            ReuseMode::Matrix => "matrix",
        }
    }
}

/// Pre-built transition matrices for one evaluation.
#[derive(Debug, Clone)]
pub struct TransitionCache {
    mode: ReuseMode,
    matrices: Vec<Array2<f64>>,
}

impl TransitionCache {
    /// Build every shared matrix up front.
    ///
    /// `RowVec` columns are built on the rayon pool when `parallel` is set.
    pub fn build(
        mode: ReuseMode, builder: &TransitionBuilder<'_>, rates: &EffectiveRates, k: usize, parallel: bool,
    ) -> Self {
        let n_sites = rates.gamma.nrows();
        let columns = if n_sites == 0 { 0 } else { rates.n_columns() };
        let matrices = match mode {
            ReuseMode::Scalar if columns > 0 => {
                let (g, w, i) = rates.at(0, 0);
                vec![builder.build(g, w, i, &mut TransitionScratch::new(k))]
            }
            ReuseMode::RowVec if parallel => (0..columns)
                .into_par_iter()
                .map_init(
                    || TransitionScratch::new(k),
                    |scratch, c| {
                        let (g, w, i) = rates.at(0, c);
                        builder.build(g, w, i, scratch)
                    },
                )
                .collect(),
            ReuseMode::RowVec => {
                let mut scratch = TransitionScratch::new(k);
                (0..columns)
                    .map(|c| {
                        let (g, w, i) = rates.at(0, c);
                        builder.build(g, w, i, &mut scratch)
                    })
                    .collect()
            }
            _ => Vec::new(),
        };
        TransitionCache { mode, matrices }
    }

    pub fn mode(&self) -> ReuseMode {
        self.mode
    }

    pub fn n_cached(&self) -> usize {
        self.matrices.len()
    }

    /// Transition matrix for `site` and `column`.
    ///
    /// Cached matrices are returned directly; otherwise the matrix is built
    /// into `buffer` and a view of it returned.
    pub fn matrix<'a>(
        &'a self, site: usize, column: usize, builder: &TransitionBuilder<'_>, rates: &EffectiveRates,
        scratch: &mut TransitionScratch, buffer: &'a mut Array2<f64>,
    ) -> ArrayView2<'a, f64> {
        match self.mode {
            ReuseMode::Scalar => self.matrices[0].view(),
            ReuseMode::RowVec => self.matrices[column].view(),
            ReuseMode::Matrix => {
                let (g, w, i) = rates.at(site, column);
                builder.fill(g, w, i, scratch, buffer.view_mut());
                buffer.view()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abundance::core::{families::Dynamics, tables::RecruitmentIndex};
    use ndarray::array;

    fn rates(gamma: Array2<f64>) -> EffectiveRates {
        let dim = gamma.raw_dim();
        EffectiveRates { gamma, omega: Array2::from_elem(dim.clone(), 0.5), iota: Array2::zeros(dim) }
    }

    #[test]
    // Purpose
    // -------
    // Detection picks the widest sharing pattern.
    //
    // Given
    // -----
    // - Constant γ; γ varying by column only; γ varying by site.
    //
    // Expect
    // ------
    // - `Scalar`, `RowVec`, `Matrix` respectively, and `Never` forces
    //   `Matrix`.
    fn detect_picks_widest_pattern() {
        let scalar = rates(array![[0.3, 0.3], [0.3, 0.3]]);
        let rowvec = rates(array![[0.3, 0.4], [0.3, 0.4]]);
        let matrix = rates(array![[0.3, 0.4], [0.5, 0.4]]);
        assert_eq!(ReuseMode::detect(&scalar), ReuseMode::Scalar);
        assert_eq!(ReuseMode::detect(&rowvec), ReuseMode::RowVec);
        assert_eq!(ReuseMode::detect(&matrix), ReuseMode::Matrix);
        assert_eq!(ReuseMode::resolve(ReusePolicy::Never, &scalar), ReuseMode::Matrix);
    }

    #[test]
    // Purpose
    // -------
    // Cached matrices are bitwise identical to fresh builds.
    fn cached_matrices_equal_fresh_builds() {
        let k = 6;
        let index = RecruitmentIndex::new(k).unwrap();
        let builder = TransitionBuilder::new(Dynamics::Constant, k, Some(&index)).unwrap();
        let eff = rates(array![[0.3, 0.9], [0.3, 0.9]]);
        let mut scratch = TransitionScratch::new(k);
        let mut buffer = Array2::zeros((k + 1, k + 1));
        let mut fresh_buffer = Array2::zeros((k + 1, k + 1));
        for parallel in [false, true] {
            let cache = TransitionCache::build(ReuseMode::RowVec, &builder, &eff, k, parallel);
            let fresh = TransitionCache::build(ReuseMode::Matrix, &builder, &eff, k, parallel);
            assert_eq!(cache.n_cached(), 2);
            assert_eq!(fresh.n_cached(), 0);
            for site in 0..2 {
                for column in 0..2 {
                    let cached = cache.matrix(site, column, &builder, &eff, &mut scratch, &mut buffer).to_owned();
                    let built = fresh.matrix(site, column, &builder, &eff, &mut scratch, &mut fresh_buffer);
                    assert_eq!(cached.view(), built);
                }
            }
        }
    }
}
