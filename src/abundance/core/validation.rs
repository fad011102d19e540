//! Shape and domain checks shared by the abundance inputs.
//!
//! All checks run once at the entry of an evaluation, before any table or
//! matrix is built. Each returns the first offending entry as a structured
//! [`AbundanceError`].
//!
//! # Errors
//! - [`AbundanceError::ShapeMismatch`] for dimension disagreements.
//! - [`AbundanceError::InvalidRate`] for negative or non-finite rates.
//! - [`AbundanceError::InvalidProbability`] for values outside `[0, 1]`.
use crate::abundance::errors::{AbundanceError, AbundanceResult};
use ndarray::{ArrayView2, ArrayViewD, Dimension};

/// Compare an array's dimensions against the expected ones.
pub fn check_shape(what: &'static str, expected: &[usize], actual: &[usize]) -> AbundanceResult<()> {
    if expected != actual {
        return Err(AbundanceError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

/// Require every entry of a site × column rate array to be finite and
/// `>= 0`.
pub fn check_non_negative(what: &'static str, values: ArrayView2<f64>) -> AbundanceResult<()> {
    for ((site, column), &value) in values.indexed_iter() {
        if !value.is_finite() || value < 0.0 {
            return Err(AbundanceError::InvalidRate {
                what,
                site,
                column,
                value,
                reason: "must be finite and >= 0",
            });
        }
    }
    Ok(())
}

/// Require every entry of a site × column rate array to be finite and
/// strictly positive.
pub fn check_positive(what: &'static str, values: ArrayView2<f64>) -> AbundanceResult<()> {
    for ((site, column), &value) in values.indexed_iter() {
        if !value.is_finite() || value <= 0.0 {
            return Err(AbundanceError::InvalidRate {
                what,
                site,
                column,
                value,
                reason: "must be finite and > 0",
            });
        }
    }
    Ok(())
}

/// Require every entry to be a probability in `[0, 1]`.
///
/// `NaN` is rejected.
pub fn check_probabilities(what: &'static str, values: ArrayViewD<f64>) -> AbundanceResult<()> {
    for (index, &value) in values.indexed_iter() {
        if !(0.0..=1.0).contains(&value) {
            return Err(AbundanceError::InvalidProbability {
                what,
                index: index.slice().to_vec(),
                value,
            });
        }
    }
    Ok(())
}
