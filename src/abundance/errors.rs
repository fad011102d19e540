//! Errors for open-population abundance likelihoods (family selection,
//! shape checks, parameter domains, survey schedules and engine options).
//!
//! A single error type, [`AbundanceError`], is shared by every layer of the
//! engine. Construction and validation paths return it eagerly; once a
//! likelihood evaluation has started, the only possible failures are ones
//! detected before the site loop, so evaluations never fail half-way.
//!
//! ## Conventions
//! - **Indices are 0-based**: `site ∈ [0, M)`, `period ∈ [0, T)`,
//!   `bin ∈ [0, J)`.
//! - Shapes are reported as the full expected and actual dimension lists.
//! - Numeric underflow of a site likelihood is *not* an error; it is floored
//!   and surfaced through the evaluation diagnostics instead.
use thiserror::Error;

/// Crate-wide result alias for abundance operations that may produce
/// [`AbundanceError`].
pub type AbundanceResult<T> = Result<T, AbundanceError>;

/// Unified error type for abundance modeling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbundanceError {
    // ---- Family / selector names ----
    /// A family selector (dynamics, mixture, key function, survey type) was
    /// not recognized.
    #[error("Invalid {kind} '{name}': expected one of {expected}.")]
    InvalidParameter { kind: &'static str, name: String, expected: &'static str },

    // ---- Shapes ----
    /// An input array does not have the dimensions implied by the model.
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}.")]
    ShapeMismatch { what: &'static str, expected: Vec<usize>, actual: Vec<usize> },

    // ---- Parameter domains ----
    /// A rate (intensity, recruitment, immigration, carrying capacity) is
    /// negative, non-finite or otherwise outside its domain.
    #[error("Invalid {what} at site {site}, column {column}: {value} ({reason}).")]
    InvalidRate { what: &'static str, site: usize, column: usize, value: f64, reason: &'static str },

    /// A probability (survival, detection, availability) lies outside `[0, 1]`.
    #[error("Invalid {what} probability {value} at index {index:?}: must lie in [0, 1].")]
    InvalidProbability { what: &'static str, index: Vec<usize>, value: f64 },

    /// The mixture requires a parameter that was not supplied.
    #[error("Mixture {mixture} requires a parameter ({param}).")]
    MissingMixtureParam { mixture: &'static str, param: &'static str },

    /// A mixture parameter is outside its domain.
    #[error("Invalid mixture parameter {param} = {value}: {reason}.")]
    InvalidMixtureParam { param: &'static str, value: f64, reason: &'static str },

    /// A detection-function parameter (scale, shape) is non-positive or
    /// non-finite. `index` is `[site, period]` when the value came from a
    /// per-site array and empty for scalars.
    #[error("Invalid detection parameter {param} = {value} at index {index:?}: must be finite and > 0.")]
    InvalidDetectionParam { param: &'static str, index: Vec<usize>, value: f64 },

    /// Distance-bin breakpoints are not finite, non-negative and strictly
    /// increasing, or the derived areas/widths are not positive.
    #[error("Invalid distance breaks: {reason}.")]
    InvalidDistanceBreaks { reason: &'static str },

    // ---- Survey schedule ----
    /// first/last/gap layout is inconsistent for a site.
    #[error("Invalid survey schedule at site {site}: {reason}.")]
    InvalidSchedule { site: usize, reason: &'static str },

    // ---- Engine options ----
    /// An engine option is outside its valid range.
    #[error("Invalid engine option {option} = {value}: {reason}.")]
    InvalidOption { option: &'static str, value: f64, reason: &'static str },

    /// The abundance truncation bound `K` is too large for the convolution
    /// laws, whose index tables grow like `K³/3` entries (about 340 MB at
    /// `K = 500`).
    #[error("Truncation bound K = {k} exceeds the supported maximum {max}.")]
    TruncationTooLarge { k: usize, max: usize },

    // ---- Optimizer objective ----
    /// The objective evaluated to NaN or ±∞.
    #[error("Objective returned a non-finite value: {value}.")]
    NonFiniteCost { value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Display strings carry the offending name and the accepted set so the
    // caller can fix a typo without reading the docs.
    fn invalid_parameter_display_names_the_choices() {
        let err = AbundanceError::InvalidParameter {
            kind: "dynamics",
            name: "logistic".to_string(),
            expected: "constant, autoreg",
        };
        let msg = err.to_string();
        assert!(msg.contains("logistic"));
        assert!(msg.contains("constant, autoreg"));
    }

    #[test]
    // Purpose
    // -------
    // Shape mismatches print both dimension lists.
    fn shape_mismatch_display_lists_dimensions() {
        let err = AbundanceError::ShapeMismatch {
            what: "gamma",
            expected: vec![3, 4],
            actual: vec![3, 5],
        };
        assert_eq!(err.to_string(), "Shape mismatch for gamma: expected [3, 4], got [3, 5].");
    }
}
