//! Repeated-count surveys: `J` secondary counts per site and primary
//! period, each a binomial draw from latent abundance.
//!
//! - [`CountSurvey`] holds the data (`M × T × J` counts, `None` for a
//!   missed occasion) together with its [`SurveySchedule`].
//! - [`CountParameters`] holds everything that changes between likelihood
//!   evaluations: dynamics rates, the mixture parameter and the `M × T × J`
//!   detection probabilities.
use crate::abundance::{
    core::{
        observation::fill_count_likelihood,
        rates::DemographicRates,
        schedule::SurveySchedule,
        validation::{check_probabilities, check_shape},
    },
    errors::AbundanceResult,
    models::{
        forward::ObservationModel,
        open_population::{NllEvaluation, OpenPopulationModel, SurveyLikelihood},
    },
};
use ndarray::{Array2, Array3, ArrayView3, ArrayViewMut1, Axis, s};

/// Repeated-count data and survey schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct CountSurvey {
    schedule: SurveySchedule,
    counts: Array3<Option<u32>>,
}

/// Parameters of a repeated-count likelihood evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CountParameters {
    pub rates: DemographicRates,
    pub mixture_param: Option<f64>,
    pub detection: Array3<f64>,
}

impl CountSurvey {
    /// Pair counts with an explicit schedule.
    ///
    /// # Errors
    /// `ShapeMismatch` if `counts` does not have `M` sites and `T` periods.
    pub fn new(schedule: SurveySchedule, counts: Array3<Option<u32>>) -> AbundanceResult<Self> {
        let (_, _, j) = counts.dim();
        check_shape("counts", &[schedule.n_sites(), schedule.n_periods(), j], counts.shape())?;
        Ok(CountSurvey { schedule, counts })
    }

    /// Derive the schedule from the counts: a period is all-missing when
    /// every secondary occasion is `None`. Dates default to period indices.
    ///
    /// # Errors
    /// - `InvalidSchedule` if a site has no observed count at all, or the
    ///   dates do not strictly increase over observed periods.
    /// - `ShapeMismatch` if `dates` is not `M × T`.
    pub fn from_counts(counts: Array3<Option<u32>>, dates: Option<&Array2<i64>>) -> AbundanceResult<Self> {
        let period_missing = counts.map_axis(Axis(2), |occasions| occasions.iter().all(Option::is_none));
        let schedule = match dates {
            Some(dates) => SurveySchedule::from_dates(dates, period_missing)?,
            None => SurveySchedule::regular(period_missing)?,
        };
        CountSurvey::new(schedule, counts)
    }

    pub fn schedule(&self) -> &SurveySchedule {
        &self.schedule
    }

    pub fn counts(&self) -> &Array3<Option<u32>> {
        &self.counts
    }

    pub fn n_occasions(&self) -> usize {
        self.counts.dim().2
    }
}

struct CountObservation<'a> {
    counts: ArrayView3<'a, Option<u32>>,
    detection: ArrayView3<'a, f64>,
}

impl ObservationModel for CountObservation<'_> {
    type Scratch = ();

    fn scratch(&self) -> Self::Scratch {}

    fn fill_likelihood(&self, site: usize, period: usize, _scratch: &mut (), out: ArrayViewMut1<f64>) {
        fill_count_likelihood(
            self.counts.slice(s![site, period, ..]),
            self.detection.slice(s![site, period, ..]),
            out,
        );
    }
}

impl SurveyLikelihood for CountSurvey {
    type Params = CountParameters;

    /// # Errors
    /// - `ShapeMismatch` if `detection` is not `M × T × J`.
    /// - `InvalidProbability` for detection probabilities outside `[0, 1]`.
    /// - Any rate, mixture or schedule error raised by the engine.
    fn evaluate(&self, model: &OpenPopulationModel, params: &CountParameters) -> AbundanceResult<NllEvaluation> {
        check_shape("detection", self.counts.shape(), params.detection.shape())?;
        check_probabilities("detection", params.detection.view().into_dyn())?;
        let observation = CountObservation { counts: self.counts.view(), detection: params.detection.view() };
        model.evaluate_with(&self.schedule, &observation, &params.rates, params.mixture_param)
    }
}
