//! Boundary data model: the record returned by the external solver and the
//! validated physical system derived from it.

use crate::error::{EngineError, EngineResult};
use serde::de::{Error as _, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Damping regime of the second-order system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Classification {
    #[default]
    Undamped,
    Underdamped,
    UnderdampedForced,
    CriticallyDamped,
    Overdamped,
}

impl Classification {
    /// Tolerance on |ζ - 1| inside which a system counts as critically damped.
    pub const CRITICAL_TOLERANCE: f64 = 1e-9;

    /// Matches a solver tag by substring. The solver emits Spanish tags
    /// (`subamortiguado_forzado`, ...); English names are accepted too.
    /// Anything unrecognised is undamped.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        if tag.contains("subamortiguado_forzado")
            || (tag.contains("underdamped") && tag.contains("forced"))
        {
            Classification::UnderdampedForced
        } else if tag.contains("criticamente_amortiguado") || tag.contains("critically") {
            Classification::CriticallyDamped
        } else if tag.contains("sobreamortiguado") || tag.contains("overdamped") {
            Classification::Overdamped
        } else if tag.contains("subamortiguado") || tag.contains("underdamped") {
            Classification::Underdamped
        } else {
            Classification::Undamped
        }
    }

    /// Regime implied by a damping ratio. Forcing only changes the template
    /// while the free response oscillates (ζ < 1).
    pub fn from_damping_ratio(zeta: f64, forced: bool) -> Self {
        if (zeta - 1.0).abs() <= Self::CRITICAL_TOLERANCE {
            Classification::CriticallyDamped
        } else if zeta > 1.0 {
            Classification::Overdamped
        } else if forced {
            Classification::UnderdampedForced
        } else if zeta <= Self::CRITICAL_TOLERANCE {
            Classification::Undamped
        } else {
            Classification::Underdamped
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Classification::Undamped => "undamped",
            Classification::Underdamped => "underdamped",
            Classification::UnderdampedForced => "underdamped_forced",
            Classification::CriticallyDamped => "critically_damped",
            Classification::Overdamped => "overdamped",
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Classification::UnderdampedForced)
    }
}

impl From<String> for Classification {
    fn from(value: String) -> Self {
        Self::from_tag(&value)
    }
}

impl From<&str> for Classification {
    fn from(value: &str) -> Self {
        Self::from_tag(value)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A system property as it arrives from the solver: either a plain number or
/// a complex-number-shaped object `{real, imag}`.
///
/// The engine consumes only the real part; [`ComplexValue::real_part`] is the
/// single place where that reduction happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComplexValue {
    Real(f64),
    Complex {
        real: f64,
        #[serde(default)]
        imag: f64,
    },
}

impl ComplexValue {
    pub fn real_part(&self) -> f64 {
        match *self {
            ComplexValue::Real(value) => value,
            ComplexValue::Complex { real, .. } => real,
        }
    }
}

/// Raw parameters as submitted by the user and echoed back by the solver.
///
/// Numeric fields accept numbers, numeric strings, `""` and `null`; the
/// front-end form posts `""` for empty optional inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemParameters {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mass: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stiffness: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub damping: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub force: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub initial_position: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub initial_velocity: Option<f64>,
    /// Normalized form: x'' + 2βx' + ω²x = f(t).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub beta: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub omega_sq: Option<f64>,
}

impl SystemParameters {
    /// Validates the parameters and maps them onto a physical system.
    ///
    /// Returns `Ok(None)` when the record carries neither the physical pair
    /// (mass, stiffness) nor the normalized `omega_sq`, i.e. there is nothing
    /// the parametric path can use.
    pub fn to_physical(&self) -> EngineResult<Option<PhysicalSystem>> {
        let physical = self.mass.is_some() || self.stiffness.is_some();
        if !physical && self.omega_sq.is_none() {
            return Ok(None);
        }

        let (mass, stiffness, damping) = if physical {
            let mass = self
                .mass
                .ok_or_else(|| EngineError::invalid("mass is required"))?;
            let stiffness = self
                .stiffness
                .ok_or_else(|| EngineError::invalid("stiffness is required"))?;
            (mass, stiffness, self.damping.unwrap_or(0.0))
        } else {
            let omega_sq = self.omega_sq.unwrap_or_default();
            let beta = self.beta.unwrap_or(0.0);
            if !(beta >= 0.0) {
                return Err(EngineError::invalid(format!(
                    "beta must be non-negative (got {beta})"
                )));
            }
            (1.0, omega_sq, 2.0 * beta)
        };

        if !(mass.is_finite() && mass > 0.0) {
            return Err(EngineError::invalid(format!(
                "mass must be strictly positive (got {mass})"
            )));
        }
        if !(stiffness.is_finite() && stiffness > 0.0) {
            return Err(EngineError::invalid(format!(
                "stiffness must be strictly positive (got {stiffness})"
            )));
        }
        if !(damping.is_finite() && damping >= 0.0) {
            return Err(EngineError::invalid(format!(
                "damping must be non-negative (got {damping})"
            )));
        }

        Ok(Some(PhysicalSystem {
            mass,
            stiffness,
            damping,
            initial_position: self.initial_position.unwrap_or(0.0),
            initial_velocity: self.initial_velocity.unwrap_or(0.0),
            force: self.force.clone(),
        }))
    }
}

/// Validated m·x'' + c·x' + k·x = F(t) with initial conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalSystem {
    pub mass: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub initial_position: f64,
    pub initial_velocity: f64,
    pub force: Option<String>,
}

/// System properties computed by the solver; any of them may be complex.
///
/// These are display values, so an unreadable entry (a symbolic string, an
/// object without `real`) is treated as absent instead of rejecting the
/// whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemPropertiesInput {
    #[serde(default, alias = "omega_0", deserialize_with = "lenient_complex")]
    pub natural_frequency: Option<ComplexValue>,
    #[serde(default, alias = "alpha", deserialize_with = "lenient_complex")]
    pub damping_coefficient: Option<ComplexValue>,
    #[serde(default, alias = "omega_d", deserialize_with = "lenient_complex")]
    pub damped_frequency: Option<ComplexValue>,
    #[serde(default, alias = "zeta", deserialize_with = "lenient_complex")]
    pub damping_ratio: Option<ComplexValue>,
    #[serde(default, deserialize_with = "lenient_complex")]
    pub damped_period: Option<ComplexValue>,
    #[serde(default, deserialize_with = "lenient_complex")]
    pub logarithmic_decrement: Option<ComplexValue>,
}

/// Display-only coefficient arrays from the solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericalCoefficients {
    pub frequencies: Vec<f64>,
    pub decay_rates: Vec<f64>,
    pub amplitudes: Vec<f64>,
}

/// The record returned by the external solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverResponse {
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub solution: Option<String>,
    /// Rendered differential equation; display only.
    #[serde(default)]
    pub equation: Option<String>,
    #[serde(default)]
    pub parameters: Option<SystemParameters>,
    #[serde(default)]
    pub system_properties: Option<SystemPropertiesInput>,
    #[serde(default)]
    pub numerical_coefficients: Option<NumericalCoefficients>,
}

impl SolverResponse {
    /// The solution text, if it holds anything besides whitespace.
    pub fn solution_text(&self) -> Option<&str> {
        self.solution
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawField>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawField::Number(value)) => Ok(Some(value)),
        Some(RawField::Text(text)) => {
            let text = text.trim();
            if text.is_empty() || text == "null" {
                Ok(None)
            } else {
                text.parse::<f64>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("expected a number, got \"{text}\"")))
            }
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawField>::deserialize(deserializer)? {
        None => None,
        Some(RawField::Number(value)) => Some(value.to_string()),
        Some(RawField::Text(text)) => {
            let text = text.trim();
            if text.is_empty() || text == "undefined" {
                None
            } else {
                Some(text.to_string())
            }
        }
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProperty {
    Value(ComplexValue),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_complex<'de, D>(deserializer: D) -> Result<Option<ComplexValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawProperty>::deserialize(deserializer)? {
        Some(RawProperty::Value(value)) => Some(value),
        Some(RawProperty::Text(text)) => text.trim().parse::<f64>().ok().map(ComplexValue::Real),
        Some(RawProperty::Other(_)) | None => None,
    })
}
