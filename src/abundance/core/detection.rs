//! Distance-sampling detection: per-bin detection probabilities from a key
//! function and survey geometry.
//!
//! Purpose
//! -------
//! Given distance-bin breakpoints `b_0 < b_1 < … < b_J`, bin widths `w_j`
//! and per-bin areas `a_j`, compute the average detection probability
//! within each bin for the chosen key function:
//!
//! - line transects: `p_j = (1/w_j) ∫_{b_j}^{b_{j+1}} g(x) dx`;
//! - point counts:   `p_j = (2π/a_j) ∫_{b_j}^{b_{j+1}} x·g(x) dx`.
//!
//! Key behaviors
//! -------------
//! - `uniform`: every bin has probability 1.
//! - `halfnorm` (σ): closed forms through the normal CDF (line) and the
//!   Gaussian ring integral (point).
//! - `exp` (rate): closed form for lines, numerical integration for
//!   points.
//! - `hazard` (shape, scale), `g(x) = 1 − exp(−(x/shape)^(−scale))`:
//!   numerical integration for both geometries.
//!
//! Invariants & assumptions
//! ------------------------
//! - Breakpoints are finite, non-negative and strictly increasing; widths
//!   and areas are finite and strictly positive. [`SurveyGeometry::new`]
//!   enforces this once.
//! - Key parameters are finite and `> 0` (checked by
//!   [`detection_probabilities`] and by the distance model before the site
//!   loop); [`fill_detection_probabilities`] assumes them.
use crate::abundance::{
    core::{
        families::{KeyFunction, SurveyType},
        options::Quadrature,
        quadrature::integrate,
        validation::check_shape,
    },
    errors::{AbundanceError, AbundanceResult},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Zip};
use statrs::function::erf::erf;
use std::f64::consts::{PI, SQRT_2};

/// Distance-bin geometry shared by all sites.
///
/// - `breaks`: `J + 1` breakpoints.
/// - `widths`: `J` bin widths (line transects).
/// - `areas`: `M × J` per-site bin areas (point counts).
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyGeometry {
    pub survey: SurveyType,
    breaks: Array1<f64>,
    widths: Array1<f64>,
    areas: Array2<f64>,
}

impl SurveyGeometry {
    /// Validate breakpoints, widths and areas.
    ///
    /// # Errors
    /// - `InvalidDistanceBreaks` for fewer than two breakpoints, negative or
    ///   non-finite breakpoints, non-increasing breakpoints, or non-positive
    ///   widths/areas.
    /// - `ShapeMismatch` when `widths` is not length `J` or `areas` does not
    ///   have `J` columns.
    pub fn new(
        survey: SurveyType, breaks: Array1<f64>, widths: Array1<f64>, areas: Array2<f64>,
    ) -> AbundanceResult<Self> {
        if breaks.len() < 2 {
            return Err(AbundanceError::InvalidDistanceBreaks { reason: "need at least two breakpoints" });
        }
        if breaks.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(AbundanceError::InvalidDistanceBreaks {
                reason: "breakpoints must be finite and >= 0",
            });
        }
        if breaks.windows(2).into_iter().any(|pair| pair[1] <= pair[0]) {
            return Err(AbundanceError::InvalidDistanceBreaks {
                reason: "breakpoints must strictly increase",
            });
        }
        let j = breaks.len() - 1;
        check_shape("widths", &[j], widths.shape())?;
        check_shape("areas", &[areas.nrows(), j], areas.shape())?;
        if widths.iter().chain(areas.iter()).any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(AbundanceError::InvalidDistanceBreaks {
                reason: "bin widths and areas must be finite and > 0",
            });
        }
        Ok(SurveyGeometry { survey, breaks, widths, areas })
    }

    /// Geometry whose widths follow the breakpoints and whose areas are the
    /// annuli between them, identical for `m` sites.
    pub fn from_breaks(survey: SurveyType, breaks: Array1<f64>, m: usize) -> AbundanceResult<Self> {
        let widths = bin_widths(breaks.view());
        let rings = ring_areas(breaks.view());
        let areas = Array2::from_shape_fn((m, rings.len()), |(_, j)| rings[j]);
        SurveyGeometry::new(survey, breaks, widths, areas)
    }

    pub fn n_bins(&self) -> usize {
        self.widths.len()
    }

    pub fn n_sites(&self) -> usize {
        self.areas.nrows()
    }

    pub fn breaks(&self) -> ArrayView1<'_, f64> {
        self.breaks.view()
    }

    pub fn widths(&self) -> ArrayView1<'_, f64> {
        self.widths.view()
    }

    /// Bin areas of `site`.
    pub fn site_areas(&self, site: usize) -> ArrayView1<'_, f64> {
        self.areas.row(site)
    }
}

/// `w_j = b_{j+1} − b_j`.
pub fn bin_widths(breaks: ArrayView1<f64>) -> Array1<f64> {
    breaks.windows(2).into_iter().map(|pair| pair[1] - pair[0]).collect()
}

/// Annulus areas `π(b_{j+1}² − b_j²)`.
pub fn ring_areas(breaks: ArrayView1<f64>) -> Array1<f64> {
    breaks.windows(2).into_iter().map(|pair| PI * (pair[1] * pair[1] - pair[0] * pair[0])).collect()
}

/// Detection probabilities for one site/period.
///
/// `param1` is σ (halfnorm), the rate (exp) or the shape (hazard);
/// `param2` is the hazard scale and is ignored by the other keys.
///
/// # Errors
/// - `InvalidDetectionParam` when a parameter the key reads is not finite
///   and `> 0`.
/// - `ShapeMismatch` when `widths`/`areas` disagree with `breaks`.
#[allow(clippy::too_many_arguments)]
pub fn detection_probabilities(
    key: KeyFunction, param1: f64, param2: f64, survey: SurveyType, breaks: ArrayView1<f64>,
    widths: ArrayView1<f64>, areas: ArrayView1<f64>, rule: Quadrature,
) -> AbundanceResult<Array1<f64>> {
    let j = breaks.len().saturating_sub(1);
    check_shape("widths", &[j], widths.shape())?;
    check_shape("areas", &[j], areas.shape())?;
    check_key_params(key, param1, param2, Vec::new())?;
    let mut out = Array1::<f64>::zeros(j);
    fill_detection_probabilities(key, param1, param2, survey, breaks, widths, areas, rule, out.view_mut());
    Ok(out)
}

/// Require the parameters read by `key` to be finite and `> 0`.
pub(crate) fn check_key_params(
    key: KeyFunction, param1: f64, param2: f64, index: Vec<usize>,
) -> AbundanceResult<()> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    let (name, needs_param2) = match key {
        KeyFunction::Uniform => return Ok(()),
        KeyFunction::HalfNormal => ("sigma", false),
        KeyFunction::Exponential => ("rate", false),
        KeyFunction::Hazard => ("shape", true),
    };
    if !positive(param1) {
        return Err(AbundanceError::InvalidDetectionParam { param: name, index, value: param1 });
    }
    if needs_param2 && !positive(param2) {
        return Err(AbundanceError::InvalidDetectionParam { param: "scale", index, value: param2 });
    }
    Ok(())
}

/// Write the per-bin detection probabilities into `out` without validation.
#[allow(clippy::too_many_arguments)]
pub fn fill_detection_probabilities(
    key: KeyFunction, param1: f64, param2: f64, survey: SurveyType, breaks: ArrayView1<f64>,
    widths: ArrayView1<f64>, areas: ArrayView1<f64>, rule: Quadrature, mut out: ArrayViewMut1<f64>,
) {
    let bins = breaks.windows(2);
    match key {
        KeyFunction::Uniform => out.fill(1.0),
        KeyFunction::HalfNormal => {
            let sigma = param1;
            match survey {
                SurveyType::Line => {
                    let f0 = 2.0 * normal_pdf_at_zero(sigma);
                    Zip::from(&mut out).and(bins).and(&widths).for_each(|p, bin, &w| {
                        let mass = normal_cdf(bin[1], sigma) - normal_cdf(bin[0], sigma);
                        *p = 2.0 * mass / f0 / w;
                    });
                }
                SurveyType::Point => {
                    let s2 = sigma * sigma;
                    Zip::from(&mut out).and(bins).and(&areas).for_each(|p, bin, &a| {
                        let upper = -(-bin[1] * bin[1] / (2.0 * s2)).exp_m1();
                        let lower = -(-bin[0] * bin[0] / (2.0 * s2)).exp_m1();
                        *p = (s2 * upper - s2 * lower) * 2.0 * PI / a;
                    });
                }
            }
        }
        KeyFunction::Exponential => {
            let rate = param1;
            match survey {
                SurveyType::Line => {
                    Zip::from(&mut out).and(bins).and(&widths).for_each(|p, bin, &w| {
                        let upper = -rate * (-bin[1] / rate).exp_m1();
                        let lower = -rate * (-bin[0] / rate).exp_m1();
                        *p = (upper - lower) / w;
                    });
                }
                SurveyType::Point => {
                    let integrand = |x: f64| x * (-x / rate).exp();
                    Zip::from(&mut out).and(bins).and(&areas).for_each(|p, bin, &a| {
                        *p = integrate(integrand, bin[0], bin[1], rule) * 2.0 * PI / a;
                    });
                }
            }
        }
        KeyFunction::Hazard => {
            let (shape, scale) = (param1, param2);
            let g = move |x: f64| -(-(x / shape).powf(-scale)).exp_m1();
            match survey {
                SurveyType::Line => {
                    Zip::from(&mut out).and(bins).and(&widths).for_each(|p, bin, &w| {
                        *p = integrate(g, bin[0], bin[1], rule) / w;
                    });
                }
                SurveyType::Point => {
                    Zip::from(&mut out).and(bins).and(&areas).for_each(|p, bin, &a| {
                        *p = integrate(|x| x * g(x), bin[0], bin[1], rule) * 2.0 * PI / a;
                    });
                }
            }
        }
    }
}

#[inline]
fn normal_cdf(x: f64, sigma: f64) -> f64 {
    0.5 * (1.0 + erf(x / (sigma * SQRT_2)))
}

#[inline]
fn normal_pdf_at_zero(sigma: f64) -> f64 {
    1.0 / (sigma * (2.0 * PI).sqrt())
}
