//! Index tables built once per evaluation and shared read-only by every
//! site.
//!
//! Purpose
//! -------
//! Precompute the combinatorial layout of survival/recruitment
//! convolutions and the factorial tables used by distance-sampling
//! likelihoods, so the per-site loop performs only table lookups,
//! additions and exponentials.
//!
//! Key behaviors
//! -------------
//! - [`RecruitmentIndex`] enumerates every survivor pair `(c, n1)` with
//!   `c ≤ n1` and, for every target cell `(n1, n2)` of a transition
//!   matrix, the arena slice of `(pair, recruits)` terms with
//!   `recruits = n2 − c`, `0 ≤ c ≤ min(n1, n2)`.
//! - [`DistanceTables`] holds `ln k!` for `k ∈ 0..=K` and the per-site,
//!   per-period total of detections `y_t`, from which `k − y_t`,
//!   `ln (k − y_t)!` and the feasibility indicator `k ≥ y_t` follow.
//!
//! Invariants & assumptions
//! ------------------------
//! - Pair index of `(c, n1)` is `n1(n1 + 1)/2 + c`.
//! - Cell `(n1, n2)` has flat index `n1·(K+1) + n2`; its terms occupy
//!   `terms[offsets[cell]..offsets[cell + 1]]`.
//! - Tables are immutable after construction.
use crate::{
    abundance::errors::{AbundanceError, AbundanceResult},
    optimization::numerical_stability::ln_factorial,
};
use ndarray::{Array1, Array2, Array3, Axis};

/// Largest truncation bound supported by the recruitment index.
///
/// The arena holds [`convolution_terms`]`(K) ≈ K³/3` terms of 8 bytes, all
/// allocated before the first matrix is built: about 340 MB at this cap,
/// and 9 GB at `K = 1500`.
pub const MAX_CONVOLUTION_K: usize = 500;

/// Number of convolution terms for support `0..=k`:
/// `Σ_{n1,n2} (min(n1, n2) + 1) = (k+1)(k+2)(2k+3)/6`.
pub const fn convolution_terms(k: usize) -> usize {
    (k + 1) * (k + 2) * (2 * k + 3) / 6
}

/// One summand of a survival/recruitment convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvolutionTerm {
    /// Index of the survivor pair `(c, n1)`.
    pub pair: u32,
    /// Recruits `n2 − c`.
    pub recruits: u32,
}

/// Arena-backed index of convolution terms for every transition cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RecruitmentIndex {
    k: usize,
    pairs: Vec<(u32, u32)>,
    offsets: Vec<u32>,
    terms: Vec<ConvolutionTerm>,
}

impl RecruitmentIndex {
    /// Build the index for abundance support `0..=k`.
    ///
    /// # Errors
    /// Returns `TruncationTooLarge` when `k > MAX_CONVOLUTION_K`.
    pub fn new(k: usize) -> AbundanceResult<Self> {
        if k > MAX_CONVOLUTION_K {
            return Err(AbundanceError::TruncationTooLarge { k, max: MAX_CONVOLUTION_K });
        }
        let lk = k + 1;

        let mut pairs = Vec::with_capacity(lk * (lk + 1) / 2);
        for n1 in 0..lk as u32 {
            for c in 0..=n1 {
                pairs.push((c, n1));
            }
        }

        let mut offsets = Vec::with_capacity(lk * lk + 1);
        let mut terms = Vec::with_capacity(convolution_terms(k));
        offsets.push(0);
        for n1 in 0..lk {
            let row_base = n1 * (n1 + 1) / 2;
            for n2 in 0..lk {
                for c in 0..=n1.min(n2) {
                    terms.push(ConvolutionTerm {
                        pair: (row_base + c) as u32,
                        recruits: (n2 - c) as u32,
                    });
                }
                offsets.push(terms.len() as u32);
            }
        }
        Ok(RecruitmentIndex { k, pairs, offsets, terms })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Survivor pairs `(c, n1)` in pair-index order.
    pub fn pairs(&self) -> &[(u32, u32)] {
        &self.pairs
    }

    /// Terms contributing to cell `(n1, n2)`.
    #[inline]
    pub fn cell_terms(&self, n1: usize, n2: usize) -> &[ConvolutionTerm] {
        let cell = n1 * (self.k + 1) + n2;
        &self.terms[self.offsets[cell] as usize..self.offsets[cell + 1] as usize]
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }
}

/// Factorial table and per-period detection totals for distance sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTables {
    ln_factorial: Array1<f64>,
    totals: Array2<u32>,
}

impl DistanceTables {
    /// Build from the `M × T × J` detection counts and truncation bound `k`.
    pub fn new(counts: &Array3<u32>, k: usize) -> Self {
        let ln_factorial = Array1::from_shape_fn(k + 1, |j| ln_factorial(j as u32));
        let totals = counts.sum_axis(Axis(2));
        DistanceTables { ln_factorial, totals }
    }

    /// `ln k!`.
    #[inline]
    pub fn ln_factorial(&self, k: usize) -> f64 {
        self.ln_factorial[k]
    }

    /// Total detections `y_t` at `site`, `period`.
    #[inline]
    pub fn total(&self, site: usize, period: usize) -> u32 {
        self.totals[[site, period]]
    }

    /// `ln (k − y_t)!` when `k ≥ y_t`, `None` otherwise.
    #[inline]
    pub fn ln_factorial_remaining(&self, k: usize, total: u32) -> Option<f64> {
        k.checked_sub(total as usize).map(|rest| self.ln_factorial[rest])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    // Purpose
    // -------
    // Each cell lists exactly `min(n1, n2) + 1` terms pointing at pairs
    // with the right `n1` and consistent recruit counts.
    //
    // Given
    // -----
    // - `K = 4`.
    //
    // Expect
    // ------
    // - For every term, `pairs[pair] = (c, n1)` and `c + recruits = n2`.
    fn cell_terms_are_consistent_with_pairs() {
        let index = RecruitmentIndex::new(4).unwrap();
        assert_eq!(index.pairs().len(), 15);
        for n1 in 0..5 {
            for n2 in 0..5 {
                let terms = index.cell_terms(n1, n2);
                assert_eq!(terms.len(), n1.min(n2) + 1);
                for term in terms {
                    let (c, pair_n1) = index.pairs()[term.pair as usize];
                    assert_eq!(pair_n1 as usize, n1);
                    assert_eq!((c + term.recruits) as usize, n2);
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Oversized truncation bounds are rejected before anything is
    // allocated, and the arena at the cap stays within a few hundred MB.
    fn oversized_k_is_rejected() {
        assert!(matches!(
            RecruitmentIndex::new(MAX_CONVOLUTION_K + 1),
            Err(AbundanceError::TruncationTooLarge { k: 501, max: 500 })
        ));
        let arena_bytes = convolution_terms(MAX_CONVOLUTION_K) * std::mem::size_of::<ConvolutionTerm>();
        assert!(arena_bytes < 400 * 1024 * 1024, "{arena_bytes} bytes");
    }

    #[test]
    // Purpose
    // -------
    // The closed-form term count matches the built arena.
    fn term_count_matches_closed_form() {
        for k in 0..8 {
            assert_eq!(RecruitmentIndex::new(k).unwrap().n_terms(), convolution_terms(k));
        }
        assert_eq!(convolution_terms(3), 30);
    }

    #[test]
    // Purpose
    // -------
    // Distance tables sum counts over bins and guard `k < y_t`.
    fn distance_tables_sum_bins() {
        let mut counts = Array3::<u32>::zeros((1, 2, 3));
        counts[[0, 0, 0]] = 2;
        counts[[0, 0, 2]] = 1;
        let tables = DistanceTables::new(&counts, 5);
        assert_eq!(tables.total(0, 0), 3);
        assert_eq!(tables.total(0, 1), 0);
        assert_eq!(tables.ln_factorial_remaining(2, 3), None);
        assert!((tables.ln_factorial_remaining(5, 3).unwrap() - 2.0_f64.ln()).abs() < 1e-12);
        assert!((tables.ln_factorial(4) - 24.0_f64.ln()).abs() < 1e-12);
    }
}
