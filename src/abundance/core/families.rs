//! Family selectors: population dynamics, initial-abundance mixture,
//! detection key function and survey geometry.
//!
//! Every selector is a closed enum parsed once from a case-insensitive name
//! via `FromStr`. Unknown names return [`AbundanceError::InvalidParameter`]
//! listing the accepted spellings. Downstream code matches on the enums and
//! never re-inspects strings. Serde uses the same spellings as `FromStr`
//! and `Display`.
use crate::abundance::errors::AbundanceError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Population-dynamics law governing one-step transitions of latent
/// abundance.
///
/// Variants (`γ` = recruitment/growth, `ω` = survival or carrying capacity,
/// `ι` = immigration):
/// - `Constant`: survivors `Bin(n1, ω)` plus recruits `Pois(γ)`.
/// - `NoTrend`: as `Constant` with `γ = (1 − ω)·λ`, holding the expected
///   abundance at the initial intensity.
/// - `Autoreg`: survivors `Bin(n1, ω)` plus recruits `Pois(γ·n1 + ι)`.
/// - `Trend`: `Pois(γ·n1 + ι)`, geometric growth.
/// - `Ricker`: `Pois(n1·exp(γ(1 − n1/ω)) + ι)`.
/// - `Gompertz`: `Pois(n1·exp(γ(1 − ln(n1+1)/ln(ω+1))) + ι)`.
///
/// `Constant` and `NoTrend` have no immigration term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dynamics {
    Constant,
    NoTrend,
    Autoreg,
    Trend,
    Ricker,
    Gompertz,
}

/// How the second dynamics rate `ω` is interpreted by a [`Dynamics`] law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmegaRole {
    /// Apparent survival probability in `[0, 1]`.
    Survival,
    /// Carrying capacity, strictly positive.
    CarryingCapacity,
    /// Not used by the law.
    Unused,
}

impl Dynamics {
    pub const NAMES: &'static str = "'constant', 'notrend', 'autoreg', 'trend', 'ricker', 'gompertz'";

    /// Whether transitions are a survival/recruitment convolution (and so
    /// need the recruitment index).
    pub fn is_convolution(self) -> bool {
        matches!(self, Dynamics::Constant | Dynamics::NoTrend | Dynamics::Autoreg)
    }

    /// Whether the law has an immigration term `ι`.
    pub fn supports_immigration(self) -> bool {
        !matches!(self, Dynamics::Constant | Dynamics::NoTrend)
    }

    /// Whether the caller-supplied `γ` participates in the transition law.
    pub fn uses_gamma(self) -> bool {
        !matches!(self, Dynamics::NoTrend)
    }

    pub fn omega_role(self) -> OmegaRole {
        match self {
            Dynamics::Constant | Dynamics::NoTrend | Dynamics::Autoreg => OmegaRole::Survival,
            Dynamics::Ricker | Dynamics::Gompertz => OmegaRole::CarryingCapacity,
            Dynamics::Trend => OmegaRole::Unused,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dynamics::Constant => "constant",
            Dynamics::NoTrend => "notrend",
            Dynamics::Autoreg => "autoreg",
            Dynamics::Trend => "trend",
            Dynamics::Ricker => "ricker",
            Dynamics::Gompertz => "gompertz",
        }
    }
}

impl FromStr for Dynamics {
    type Err = AbundanceError;

    /// Parse a dynamics law from its name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "constant" => Ok(Dynamics::Constant),
            "notrend" => Ok(Dynamics::NoTrend),
            "autoreg" => Ok(Dynamics::Autoreg),
            "trend" => Ok(Dynamics::Trend),
            "ricker" => Ok(Dynamics::Ricker),
            "gompertz" => Ok(Dynamics::Gompertz),
            _ => Err(AbundanceError::InvalidParameter {
                kind: "dynamics",
                name: s.to_string(),
                expected: Dynamics::NAMES,
            }),
        }
    }
}

impl fmt::Display for Dynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initial-abundance mixture family.
///
/// Parsing accepts `"P"`, `"NB"` and `"ZIP"` in any case. The family's
/// numeric parameter (dispersion or zero-inflation weight) is attached later
/// when a [`Mixture`](crate::abundance::core::mixture::Mixture) is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixtureFamily {
    #[serde(rename = "P")]
    Poisson,
    #[serde(rename = "NB")]
    NegBinomial,
    #[serde(rename = "ZIP")]
    ZeroInflatedPoisson,
}

impl MixtureFamily {
    pub const NAMES: &'static str = "'P', 'NB', 'ZIP'";

    pub fn as_str(self) -> &'static str {
        match self {
            MixtureFamily::Poisson => "P",
            MixtureFamily::NegBinomial => "NB",
            MixtureFamily::ZeroInflatedPoisson => "ZIP",
        }
    }
}

impl FromStr for MixtureFamily {
    type Err = AbundanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "P" => Ok(MixtureFamily::Poisson),
            "NB" => Ok(MixtureFamily::NegBinomial),
            "ZIP" => Ok(MixtureFamily::ZeroInflatedPoisson),
            _ => Err(AbundanceError::InvalidParameter {
                kind: "mixture",
                name: s.to_string(),
                expected: MixtureFamily::NAMES,
            }),
        }
    }
}

impl fmt::Display for MixtureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distance-sampling detection key function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFunction {
    /// Perfect detection within the truncation distance.
    Uniform,
    /// `g(x) = exp(−x²/2σ²)`.
    #[serde(rename = "halfnorm")]
    HalfNormal,
    /// `g(x) = exp(−x/rate)`.
    #[serde(rename = "exp")]
    Exponential,
    /// `g(x) = 1 − exp(−(x/shape)^(−scale))`.
    Hazard,
}

impl KeyFunction {
    pub const NAMES: &'static str = "'uniform', 'halfnorm', 'exp', 'hazard'";

    pub fn as_str(self) -> &'static str {
        match self {
            KeyFunction::Uniform => "uniform",
            KeyFunction::HalfNormal => "halfnorm",
            KeyFunction::Exponential => "exp",
            KeyFunction::Hazard => "hazard",
        }
    }
}

impl FromStr for KeyFunction {
    type Err = AbundanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(KeyFunction::Uniform),
            "halfnorm" => Ok(KeyFunction::HalfNormal),
            "exp" => Ok(KeyFunction::Exponential),
            "hazard" => Ok(KeyFunction::Hazard),
            _ => Err(AbundanceError::InvalidParameter {
                kind: "key function",
                name: s.to_string(),
                expected: KeyFunction::NAMES,
            }),
        }
    }
}

impl fmt::Display for KeyFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distance-sampling survey geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyType {
    /// Perpendicular distances from a transect line.
    Line,
    /// Radial distances from a point.
    Point,
}

impl SurveyType {
    pub const NAMES: &'static str = "'line', 'point'";

    pub fn as_str(self) -> &'static str {
        match self {
            SurveyType::Line => "line",
            SurveyType::Point => "point",
        }
    }
}

impl FromStr for SurveyType {
    type Err = AbundanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line" => Ok(SurveyType::Line),
            "point" => Ok(SurveyType::Point),
            _ => Err(AbundanceError::InvalidParameter {
                kind: "survey type",
                name: s.to_string(),
                expected: SurveyType::NAMES,
            }),
        }
    }
}

impl fmt::Display for SurveyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Case-insensitive parsing of every selector, rejection of unknown names,
    // and Display/FromStr agreement.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Every dynamics name parses regardless of case and prints back to its
    // canonical spelling.
    fn dynamics_parse_round_trips_through_display() {
        for name in ["constant", "notrend", "autoreg", "trend", "ricker", "gompertz"] {
            let upper = name.to_uppercase();
            let parsed: Dynamics = upper.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    // Purpose
    // -------
    // Unknown selector names are rejected with `InvalidParameter`.
    //
    // Expect
    // ------
    // - The error carries the offending name and the selector kind.
    fn unknown_names_are_invalid_parameter() {
        match "logistic".parse::<Dynamics>() {
            Err(AbundanceError::InvalidParameter { kind, name, .. }) => {
                assert_eq!(kind, "dynamics");
                assert_eq!(name, "logistic");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            "poisson".parse::<MixtureFamily>(),
            Err(AbundanceError::InvalidParameter { kind: "mixture", .. })
        ));
        assert!(matches!(
            "gamma".parse::<KeyFunction>(),
            Err(AbundanceError::InvalidParameter { kind: "key function", .. })
        ));
        assert!(matches!(
            "transect".parse::<SurveyType>(),
            Err(AbundanceError::InvalidParameter { kind: "survey type", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Mixture and key names accept the short spellings in mixed case.
    fn mixture_and_key_accept_mixed_case() {
        assert_eq!("zip".parse::<MixtureFamily>().unwrap(), MixtureFamily::ZeroInflatedPoisson);
        assert_eq!("Nb".parse::<MixtureFamily>().unwrap(), MixtureFamily::NegBinomial);
        assert_eq!("HalfNorm".parse::<KeyFunction>().unwrap(), KeyFunction::HalfNormal);
        assert_eq!("POINT".parse::<SurveyType>().unwrap(), SurveyType::Point);
    }

    #[test]
    // Purpose
    // -------
    // Role of `ω` per law drives validation downstream.
    fn omega_roles_follow_the_law() {
        assert_eq!(Dynamics::Autoreg.omega_role(), OmegaRole::Survival);
        assert_eq!(Dynamics::Ricker.omega_role(), OmegaRole::CarryingCapacity);
        assert_eq!(Dynamics::Trend.omega_role(), OmegaRole::Unused);
        assert!(Dynamics::NoTrend.is_convolution());
        assert!(!Dynamics::NoTrend.uses_gamma());
        assert!(!Dynamics::Gompertz.is_convolution());
        assert!(!Dynamics::Constant.supports_immigration());
        assert!(Dynamics::Autoreg.supports_immigration());
    }

    #[test]
    // Purpose
    // -------
    // Serialized selectors use the same names `FromStr` accepts, so a config
    // written by serde can be read back by either path.
    //
    // Expect
    // ------
    // - JSON string equals `as_str()` for every variant.
    // - The JSON string parses back through `FromStr` and serde.
    fn serde_names_match_parse_names() {
        fn check<T>(value: T)
        where
            T: Serialize
                + serde::de::DeserializeOwned
                + FromStr<Err = AbundanceError>
                + fmt::Display
                + fmt::Debug
                + PartialEq
                + Copy,
        {
            let json = serde_json::to_string(&value).unwrap();
            assert_eq!(json, format!("\"{value}\""));
            let name: String = serde_json::from_str(&json).unwrap();
            assert_eq!(name.parse::<T>().unwrap(), value);
            assert_eq!(serde_json::from_str::<T>(&json).unwrap(), value);
        }

        for d in [
            Dynamics::Constant,
            Dynamics::NoTrend,
            Dynamics::Autoreg,
            Dynamics::Trend,
            Dynamics::Ricker,
            Dynamics::Gompertz,
        ] {
            check(d);
        }
        for m in [MixtureFamily::Poisson, MixtureFamily::NegBinomial, MixtureFamily::ZeroInflatedPoisson] {
            check(m);
        }
        for key in [KeyFunction::Uniform, KeyFunction::HalfNormal, KeyFunction::Exponential, KeyFunction::Hazard] {
            check(key);
        }
        check(SurveyType::Line);
        check(SurveyType::Point);
    }
}
