//! Demographic rates supplied by the caller and their effective form.
//!
//! The engine consumes already-computed rates (link functions and
//! covariates live upstream):
//! - `lambda` (length `M`): initial-abundance intensity per site.
//! - `gamma`, `omega` (`M × (T−1)`): recruitment/growth and survival or
//!   carrying capacity; column `t−1` governs the transition ending at
//!   period `t`.
//! - `iota` (optional, `M × (T−1)`): immigration added to the Poisson mean
//!   of the autoregressive and growth laws. Absent means zero; the constant
//!   and no-trend laws have no immigration term and accept only zeros.
//!
//! [`DemographicRates::effective`] resolves law-specific conventions once
//! (no-trend recruitment, unused rates zeroed, default immigration) so the
//! transition builder and the reuse detector see exactly the numbers that
//! enter each matrix.
use crate::abundance::{
    core::{
        families::{Dynamics, OmegaRole},
        validation::{check_non_negative, check_positive, check_probabilities, check_shape},
    },
    errors::{AbundanceError, AbundanceResult},
};
use ndarray::{Array1, Array2, Axis};

/// Per-site and per-transition dynamics rates.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicRates {
    pub lambda: Array1<f64>,
    pub gamma: Array2<f64>,
    pub omega: Array2<f64>,
    pub iota: Option<Array2<f64>>,
}

/// Rates exactly as they enter the transition matrices.
///
/// All three arrays are `M × (T−1)`. Rates a dynamics law ignores are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveRates {
    pub gamma: Array2<f64>,
    pub omega: Array2<f64>,
    pub iota: Array2<f64>,
}

impl EffectiveRates {
    /// `(γ, ω, ι)` for the transition at `column` of `site`.
    #[inline]
    pub fn at(&self, site: usize, column: usize) -> (f64, f64, f64) {
        (self.gamma[[site, column]], self.omega[[site, column]], self.iota[[site, column]])
    }

    pub fn n_columns(&self) -> usize {
        self.gamma.ncols()
    }
}

impl DemographicRates {
    pub fn new(
        lambda: Array1<f64>, gamma: Array2<f64>, omega: Array2<f64>, iota: Option<Array2<f64>>,
    ) -> Self {
        DemographicRates { lambda, gamma, omega, iota }
    }

    /// Check shapes against `M` sites and `T` periods and domains against the
    /// dynamics law.
    ///
    /// # Errors
    /// - `ShapeMismatch` if `lambda` is not length `M` or a rate array is not
    ///   `M × (T−1)`.
    /// - `InvalidRate` for negative/non-finite `lambda`, `gamma` (when the
    ///   law reads it) or `iota`, non-zero `iota` under `Constant` or
    ///   `NoTrend`, and non-positive carrying capacities.
    /// - `InvalidProbability` for survival outside `[0, 1]`.
    pub fn validate(&self, dynamics: Dynamics, m: usize, t: usize) -> AbundanceResult<()> {
        let columns = t.saturating_sub(1);
        check_shape("lambda", &[m], self.lambda.shape())?;
        check_shape("gamma", &[m, columns], self.gamma.shape())?;
        check_shape("omega", &[m, columns], self.omega.shape())?;
        if let Some(iota) = &self.iota {
            check_shape("iota", &[m, columns], iota.shape())?;
            check_non_negative("iota", iota.view())?;
            if !dynamics.supports_immigration() {
                if let Some(((site, column), &value)) = iota.indexed_iter().find(|(_, v)| **v != 0.0) {
                    return Err(AbundanceError::InvalidRate {
                        what: "iota",
                        site,
                        column,
                        value,
                        reason: "the constant and notrend laws have no immigration term",
                    });
                }
            }
        }
        check_non_negative("lambda", self.lambda.view().insert_axis(Axis(1)))?;
        if dynamics.uses_gamma() {
            check_non_negative("gamma", self.gamma.view())?;
        }
        match dynamics.omega_role() {
            OmegaRole::Survival => check_probabilities("omega", self.omega.view().into_dyn())?,
            OmegaRole::CarryingCapacity => check_positive("omega", self.omega.view())?,
            OmegaRole::Unused => {}
        }
        Ok(())
    }

    /// Resolve the rates each transition matrix is built from.
    ///
    /// - `NoTrend`: `γ(i, c) = (1 − ω(i, c))·λ(i)`.
    /// - `Trend`: `ω` is zeroed.
    /// - Missing `iota` becomes zeros.
    pub fn effective(&self, dynamics: Dynamics) -> EffectiveRates {
        let dim = self.gamma.raw_dim();
        let gamma = if dynamics.uses_gamma() {
            self.gamma.clone()
        } else {
            Array2::from_shape_fn(dim.clone(), |(i, c)| (1.0 - self.omega[[i, c]]) * self.lambda[i])
        };
        let omega = match dynamics.omega_role() {
            OmegaRole::Unused => Array2::zeros(dim.clone()),
            _ => self.omega.clone(),
        };
        let iota = self.iota.clone().unwrap_or_else(|| Array2::zeros(dim));
        EffectiveRates { gamma, omega, iota }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abundance::errors::AbundanceError;
    use ndarray::array;

    fn rates_2x3() -> DemographicRates {
        DemographicRates::new(
            array![2.0, 4.0],
            array![[0.5, 0.6], [0.7, 0.8]],
            array![[0.9, 0.5], [0.25, 1.0]],
            None,
        )
    }

    #[test]
    // Purpose
    // -------
    // No-trend recruitment is derived from survival and intensity.
    //
    // Expect
    // ------
    // - `γ(i, c) = (1 − ω(i, c))·λ(i)`; supplied γ ignored.
    fn notrend_derives_gamma_from_lambda() {
        let eff = rates_2x3().effective(Dynamics::NoTrend);
        let expected = array![[0.2, 1.0], [3.0, 0.0]];
        for (a, b) in eff.gamma.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(eff.iota, Array2::<f64>::zeros((2, 2)));
    }

    #[test]
    // Purpose
    // -------
    // Trend ignores ω, which is zeroed in the effective rates.
    fn trend_zeroes_omega() {
        let eff = rates_2x3().effective(Dynamics::Trend);
        assert_eq!(eff.omega, Array2::<f64>::zeros((2, 2)));
        assert_eq!(eff.at(1, 0), (0.7, 0.0, 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Validation is law-aware: ω > 1 is a bad survival probability but a
    // valid carrying capacity.
    fn validation_depends_on_omega_role() {
        let mut rates = rates_2x3();
        rates.omega[[0, 0]] = 12.0;
        assert!(matches!(
            rates.validate(Dynamics::Constant, 2, 3),
            Err(AbundanceError::InvalidProbability { what: "omega", .. })
        ));
        assert!(rates.validate(Dynamics::Ricker, 2, 3).is_ok());
        assert!(rates.validate(Dynamics::Trend, 2, 3).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Rate arrays must be `M × (T−1)`.
    fn validation_checks_shapes() {
        let rates = rates_2x3();
        assert!(matches!(
            rates.validate(Dynamics::Constant, 2, 4),
            Err(AbundanceError::ShapeMismatch { what: "gamma", .. })
        ));
        let mut with_iota = rates_2x3();
        with_iota.iota = Some(array![[0.1], [0.2]]);
        assert!(matches!(
            with_iota.validate(Dynamics::Constant, 2, 3),
            Err(AbundanceError::ShapeMismatch { what: "iota", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Immigration is only defined for the autoregressive and growth laws.
    //
    // Given
    // -----
    // - `ι` zero except at site 1, column 0.
    //
    // Expect
    // ------
    // - `Constant` and `NoTrend` reject it, naming the offending cell.
    // - An all-zero `ι` is accepted by every law.
    // - `Autoreg` and `Trend` accept the non-zero value.
    fn immigration_is_rejected_for_constant_laws() {
        let mut rates = rates_2x3();
        rates.iota = Some(array![[0.0, 0.0], [0.3, 0.0]]);
        for dynamics in [Dynamics::Constant, Dynamics::NoTrend] {
            match rates.validate(dynamics, 2, 3) {
                Err(AbundanceError::InvalidRate { what: "iota", site, column, value, .. }) => {
                    assert_eq!((site, column), (1, 0));
                    assert_eq!(value, 0.3);
                }
                other => panic!("{dynamics}: unexpected result {other:?}"),
            }
        }
        assert!(rates.validate(Dynamics::Autoreg, 2, 3).is_ok());
        assert!(rates.validate(Dynamics::Trend, 2, 3).is_ok());

        rates.iota = Some(Array2::zeros((2, 2)));
        assert!(rates.validate(Dynamics::Constant, 2, 3).is_ok());
    }
}
