//! Distance-sampling surveys: detections binned by distance, with detection
//! probability decaying according to a key function.
//!
//! - [`DistanceSurvey`] holds the `M × T × J` binned detections, the bin
//!   geometry, the key function and the survey schedule (which carries the
//!   all-missing period flags).
//! - [`DistanceParameters`] holds the per-evaluation values: dynamics rates,
//!   the mixture parameter, the `M × T` key scale `σ` (halfnorm σ, exp
//!   rate, hazard shape), the hazard scale, and an optional `M × J`
//!   availability multiplying each bin's detection probability.
//!
//! Per site and period, capture probabilities are
//! `cp_j = p_j(σ(i, t)) · u(i, j)` and the observation likelihood is the
//! multinomial form in [`fill_distance_likelihood`].
use crate::abundance::{
    core::{
        detection::{SurveyGeometry, check_key_params, fill_detection_probabilities},
        families::KeyFunction,
        observation::fill_distance_likelihood,
        options::Quadrature,
        rates::DemographicRates,
        schedule::SurveySchedule,
        tables::DistanceTables,
        validation::{check_probabilities, check_shape},
    },
    errors::{AbundanceError, AbundanceResult},
    models::{
        forward::ObservationModel,
        open_population::{NllEvaluation, OpenPopulationModel, SurveyLikelihood},
    },
};
use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut1, s};

/// Binned distance-sampling data, geometry and schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSurvey {
    schedule: SurveySchedule,
    counts: Array3<u32>,
    geometry: SurveyGeometry,
    key: KeyFunction,
}

/// Parameters of a distance-sampling likelihood evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceParameters {
    pub rates: DemographicRates,
    pub mixture_param: Option<f64>,
    /// `M × T`; required for every key except `uniform`.
    pub sigma: Option<Array2<f64>>,
    /// Required for the `hazard` key.
    pub hazard_scale: Option<f64>,
    /// `M × J`; all ones when absent.
    pub availability: Option<Array2<f64>>,
}

impl DistanceSurvey {
    /// # Errors
    /// `ShapeMismatch` if `counts` is not `M × T × J` for the schedule's `M`,
    /// `T` and the geometry's `J`, or the geometry covers a different number
    /// of sites.
    pub fn new(
        schedule: SurveySchedule, counts: Array3<u32>, geometry: SurveyGeometry, key: KeyFunction,
    ) -> AbundanceResult<Self> {
        let (m, t, j) = (schedule.n_sites(), schedule.n_periods(), geometry.n_bins());
        check_shape("counts", &[m, t, j], counts.shape())?;
        check_shape("areas", &[m, j], &[geometry.n_sites(), j])?;
        Ok(DistanceSurvey { schedule, counts, geometry, key })
    }

    pub fn schedule(&self) -> &SurveySchedule {
        &self.schedule
    }

    pub fn geometry(&self) -> &SurveyGeometry {
        &self.geometry
    }

    pub fn key(&self) -> KeyFunction {
        self.key
    }

    fn check_parameters(&self, params: &DistanceParameters) -> AbundanceResult<()> {
        let (m, t, j) = (self.schedule.n_sites(), self.schedule.n_periods(), self.geometry.n_bins());
        if let Some(availability) = &params.availability {
            check_shape("availability", &[m, j], availability.shape())?;
            check_probabilities("availability", availability.view().into_dyn())?;
        }
        if self.key == KeyFunction::Uniform {
            return Ok(());
        }
        let sigma = params.sigma.as_ref().ok_or(AbundanceError::ShapeMismatch {
            what: "sigma",
            expected: vec![m, t],
            actual: Vec::new(),
        })?;
        check_shape("sigma", &[m, t], sigma.shape())?;
        let scale = params.hazard_scale.unwrap_or(f64::NAN);
        for site in 0..m {
            for period in self.schedule.first(site)..=self.schedule.last(site) {
                if !self.schedule.is_missing(site, period) {
                    check_key_params(self.key, sigma[[site, period]], scale, vec![site, period])?;
                }
            }
        }
        Ok(())
    }
}

struct DistanceObservation<'a> {
    counts: ArrayView3<'a, u32>,
    geometry: &'a SurveyGeometry,
    key: KeyFunction,
    sigma: Option<ArrayView2<'a, f64>>,
    hazard_scale: f64,
    availability: Option<ArrayView2<'a, f64>>,
    tables: DistanceTables,
    quadrature: Quadrature,
    floor: f64,
}

impl ObservationModel for DistanceObservation<'_> {
    /// Capture probabilities of the current site/period.
    type Scratch = Array1<f64>;

    fn scratch(&self) -> Array1<f64> {
        Array1::zeros(self.geometry.n_bins())
    }

    fn fill_likelihood(&self, site: usize, period: usize, capture: &mut Array1<f64>, out: ArrayViewMut1<f64>) {
        let scale = self.sigma.map_or(1.0, |sigma| sigma[[site, period]]);
        fill_detection_probabilities(
            self.key,
            scale,
            self.hazard_scale,
            self.geometry.survey,
            self.geometry.breaks(),
            self.geometry.widths(),
            self.geometry.site_areas(site),
            self.quadrature,
            capture.view_mut(),
        );
        if let Some(availability) = &self.availability {
            *capture *= &availability.row(site);
        }
        fill_distance_likelihood(
            self.counts.slice(s![site, period, ..]),
            capture.view(),
            self.tables.total(site, period),
            &self.tables,
            self.key == KeyFunction::Uniform,
            self.floor,
            out,
        );
    }
}

impl SurveyLikelihood for DistanceSurvey {
    type Params = DistanceParameters;

    /// # Errors
    /// - `ShapeMismatch` for a missing or mis-shaped `sigma`/`availability`.
    /// - `InvalidDetectionParam` for non-positive key parameters in observed
    ///   periods.
    /// - `InvalidProbability` for availability outside `[0, 1]`.
    /// - Any rate, mixture or schedule error raised by the engine.
    fn evaluate(&self, model: &OpenPopulationModel, params: &DistanceParameters) -> AbundanceResult<NllEvaluation> {
        self.check_parameters(params)?;
        let observation = DistanceObservation {
            counts: self.counts.view(),
            geometry: &self.geometry,
            key: self.key,
            sigma: params.sigma.as_ref().map(Array2::view),
            hazard_scale: params.hazard_scale.unwrap_or(f64::NAN),
            availability: params.availability.as_ref().map(Array2::view),
            tables: DistanceTables::new(&self.counts, model.k),
            quadrature: model.options.quadrature,
            floor: model.options.underflow_floor,
        };
        model.evaluate_with(&self.schedule, &observation, &params.rates, params.mixture_param)
    }
}
