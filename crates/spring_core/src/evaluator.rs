use crate::model::Classification;
use crate::resolver::ResolvedCoefficients;
use crate::traits::Signal;
use serde::Serialize;
use tracing::warn;

/// Signals plotted when no closed form can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSignal {
    /// cos(t)
    Cosine,
    /// e^{-0.2t}·cos(t)
    DecayingCosine,
}

impl ReferenceSignal {
    pub fn value(&self, t: f64) -> f64 {
        match self {
            ReferenceSignal::Cosine => t.cos(),
            ReferenceSignal::DecayingCosine => (-0.2 * t).exp() * t.cos(),
        }
    }
}

/// An evaluable closed-form solution x(t).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosedForm {
    Regime(ResolvedCoefficients),
    Reference(ReferenceSignal),
}

impl Signal for ClosedForm {
    fn value(&self, t: f64) -> f64 {
        match self {
            ClosedForm::Regime(coefficients) => evaluate(coefficients, t),
            ClosedForm::Reference(reference) => reference.value(t),
        }
    }
}

fn evaluate(coefficients: &ResolvedCoefficients, t: f64) -> f64 {
    match *coefficients {
        ResolvedCoefficients::Undamped { c1, c2, omega } => {
            c1 * (omega * t).cos() + c2 * (omega * t).sin()
        }
        ResolvedCoefficients::Underdamped {
            c1,
            c2,
            alpha,
            omega_d,
        } => (-alpha * t).exp() * (c1 * (omega_d * t).cos() + c2 * (omega_d * t).sin()),
        ResolvedCoefficients::UnderdampedForced {
            c1,
            c2,
            alpha,
            omega_d,
            steady,
        } => {
            (-alpha * t).exp() * (c1 * (omega_d * t).cos() + c2 * (omega_d * t).sin())
                + steady.value(t)
        }
        ResolvedCoefficients::CriticallyDamped { c1, c2, rate } => (c1 + c2 * t) * (-rate * t).exp(),
        ResolvedCoefficients::Overdamped { c1, c2, r1, r2 } => {
            c1 * (r1 * t).exp() + c2 * (r2 * t).exp()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub signal: ClosedForm,
    /// Why the reference signal replaced the closed form, if it did.
    pub failure: Option<String>,
}

impl Evaluation {
    pub fn fallback_used(&self) -> bool {
        self.failure.is_some()
    }
}

/// Builds x(t) for `classification`, falling back to cos(t).
pub fn build(classification: Classification, coefficients: &ResolvedCoefficients) -> Evaluation {
    build_with_reference(classification, coefficients, ReferenceSignal::Cosine)
}

/// Builds x(t), replacing it by `reference` when the coefficients do not fit
/// the classification or the closed form is not finite at t = 0.
pub fn build_with_reference(
    classification: Classification,
    coefficients: &ResolvedCoefficients,
    reference: ReferenceSignal,
) -> Evaluation {
    let failure = if coefficients.classification() != classification {
        Some(format!(
            "coefficients for {} cannot drive a {} template",
            coefficients.classification(),
            classification
        ))
    } else if !coefficients.is_finite() {
        Some(format!("non-finite {} coefficients", classification))
    } else if !evaluate(coefficients, 0.0).is_finite() {
        Some(format!("{} closed form is not finite at t = 0", classification))
    } else {
        None
    };

    match failure {
        None => Evaluation {
            signal: ClosedForm::Regime(*coefficients),
            failure: None,
        },
        Some(reason) => {
            warn!(%reason, ?reference, "closed form unavailable, plotting reference signal");
            Evaluation {
                signal: ClosedForm::Reference(reference),
                failure: Some(reason),
            }
        }
    }
}
