//! Initial-abundance mixture: the prior over latent abundance at a site's
//! first period.
//!
//! Three families, each driven by the per-site intensity `λ(i)`:
//! - Poisson `Pois(k; λ)`;
//! - negative binomial with mean `λ` and dispersion `α`
//!   (variance `λ + λ²/α`);
//! - zero-inflated Poisson `ψ·[k = 0] + (1 − ψ)·Pois(k; λ)`.
//!
//! The pmf is evaluated on the truncated support `0..=K` and is not
//! renormalized; mass beyond `K` is dropped.
use crate::{
    abundance::{
        core::families::MixtureFamily,
        errors::{AbundanceError, AbundanceResult},
    },
    optimization::numerical_stability::{ln_neg_binomial_mu, ln_poisson, ln_zero_inflated_poisson},
};
use ndarray::{Array1, ArrayViewMut1};

/// Mixture family with its numeric parameter attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mixture {
    Poisson,
    NegBinomial { alpha: f64 },
    ZeroInflatedPoisson { psi: f64 },
}

impl Mixture {
    /// Attach a parameter to a mixture family.
    ///
    /// - `Poisson` ignores `param`.
    /// - `NegBinomial` needs `alpha > 0` and finite.
    /// - `ZeroInflatedPoisson` needs `psi ∈ [0, 1]`.
    ///
    /// # Errors
    /// - `MissingMixtureParam` when NB/ZIP is requested without a parameter.
    /// - `InvalidMixtureParam` when the parameter is outside its domain.
    pub fn new(family: MixtureFamily, param: Option<f64>) -> AbundanceResult<Self> {
        match family {
            MixtureFamily::Poisson => Ok(Mixture::Poisson),
            MixtureFamily::NegBinomial => {
                let alpha = param.ok_or(AbundanceError::MissingMixtureParam {
                    mixture: "NB",
                    param: "alpha",
                })?;
                if !(alpha.is_finite() && alpha > 0.0) {
                    return Err(AbundanceError::InvalidMixtureParam {
                        param: "alpha",
                        value: alpha,
                        reason: "dispersion must be finite and > 0",
                    });
                }
                Ok(Mixture::NegBinomial { alpha })
            }
            MixtureFamily::ZeroInflatedPoisson => {
                let psi = param.ok_or(AbundanceError::MissingMixtureParam {
                    mixture: "ZIP",
                    param: "psi",
                })?;
                if !(0.0..=1.0).contains(&psi) {
                    return Err(AbundanceError::InvalidMixtureParam {
                        param: "psi",
                        value: psi,
                        reason: "zero-inflation weight must lie in [0, 1]",
                    });
                }
                Ok(Mixture::ZeroInflatedPoisson { psi })
            }
        }
    }

    pub fn family(&self) -> MixtureFamily {
        match self {
            Mixture::Poisson => MixtureFamily::Poisson,
            Mixture::NegBinomial { .. } => MixtureFamily::NegBinomial,
            Mixture::ZeroInflatedPoisson { .. } => MixtureFamily::ZeroInflatedPoisson,
        }
    }

    /// `ln P(N = k)` under intensity `lambda`.
    #[inline]
    pub fn ln_pmf(&self, k: u32, lambda: f64) -> f64 {
        match *self {
            Mixture::Poisson => ln_poisson(k, lambda),
            Mixture::NegBinomial { alpha } => ln_neg_binomial_mu(k, alpha, lambda),
            Mixture::ZeroInflatedPoisson { psi } => ln_zero_inflated_poisson(k, lambda, psi),
        }
    }

    /// Write `P(N = k)` for `k = 0..out.len()` into `out`.
    pub fn fill_pmf(&self, lambda: f64, mut out: ArrayViewMut1<f64>) {
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = self.ln_pmf(k as u32, lambda).exp();
        }
    }
}

/// Truncated pmf vector of length `k_max + 1`.
pub fn mixture_pmf(mixture: &Mixture, lambda: f64, k_max: usize) -> Array1<f64> {
    let mut out = Array1::<f64>::zeros(k_max + 1);
    mixture.fill_pmf(lambda, out.view_mut());
    out
}
