//! Adapter that exposes an open-population likelihood as an `argmin`
//! problem.
//!
//! The engine evaluates a negative log-likelihood for natural-scale
//! parameters; solvers search over an unconstrained vector `θ`. An
//! [`NllObjective`] holds a model, a survey and a caller-supplied map
//! `θ ↦ parameters` (typically built from the links in
//! `numerical_stability::links`) and implements [`CostFunction`] with cost
//! `c(θ) = NLL(map(θ))`. No solver is configured here.
use crate::abundance::{
    errors::{AbundanceError, AbundanceResult},
    models::open_population::{OpenPopulationModel, SurveyLikelihood},
};
use argmin::core::{CostFunction, Error};
use ndarray::Array1;

/// Unconstrained optimizer parameters.
pub type Theta = Array1<f64>;

/// Bridges an [`OpenPopulationModel`] and a survey to `argmin`'s
/// [`CostFunction`].
pub struct NllObjective<'a, S, F>
where
    S: SurveyLikelihood,
    F: Fn(&Theta) -> AbundanceResult<S::Params>,
{
    model: &'a OpenPopulationModel,
    survey: &'a S,
    to_params: F,
}

impl<'a, S, F> NllObjective<'a, S, F>
where
    S: SurveyLikelihood,
    F: Fn(&Theta) -> AbundanceResult<S::Params>,
{
    pub fn new(model: &'a OpenPopulationModel, survey: &'a S, to_params: F) -> Self {
        NllObjective { model, survey, to_params }
    }

    /// Negative log-likelihood at `θ`, in the crate's own error type.
    ///
    /// # Errors
    /// - Whatever the parameter map or the evaluation returns.
    /// - `NonFiniteCost` if the value is NaN or infinite.
    pub fn value(&self, theta: &Theta) -> AbundanceResult<f64> {
        let params = (self.to_params)(theta)?;
        let value = self.model.negative_log_likelihood(self.survey, &params)?;
        if !value.is_finite() {
            return Err(AbundanceError::NonFiniteCost { value });
        }
        Ok(value)
    }
}

impl<S, F> CostFunction for NllObjective<'_, S, F>
where
    S: SurveyLikelihood,
    F: Fn(&Theta) -> AbundanceResult<S::Params>,
{
    type Param = Theta;
    type Output = f64;

    /// Evaluate the cost `c(θ) = NLL(map(θ))`.
    ///
    /// # Errors
    /// Propagates any `AbundanceError` from [`NllObjective::value`] via `?`.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.value(theta)?)
    }
}
