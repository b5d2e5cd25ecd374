use crate::model::{Classification, ComplexValue, PhysicalSystem, SystemPropertiesInput};
use num_complex::Complex;
use serde::Serialize;
use std::f64::consts::PI;

/// Derived scalars of m·x'' + c·x' + k·x = F(t).
///
/// `damped_frequency`, `damped_period` and `logarithmic_decrement` are only
/// defined for an oscillating free response (ζ < 1) and are `None` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Characteristics {
    /// ω₀ = √(k/m)
    pub natural_frequency: f64,
    /// α = c/(2m)
    pub decay_rate: f64,
    /// ζ = c/(2√(km))
    pub damping_ratio: f64,
    /// ω_d = √(ω₀² − α²)
    pub damped_frequency: Option<f64>,
    pub damped_period: Option<f64>,
    pub logarithmic_decrement: Option<f64>,
    /// Roots of r² + 2ζω₀r + ω₀² = 0, slower-decaying root last.
    pub roots: [Complex<f64>; 2],
}

impl Characteristics {
    pub fn from_system(system: &PhysicalSystem) -> Self {
        let natural_frequency = (system.stiffness / system.mass).sqrt();
        let decay_rate = system.damping / (2.0 * system.mass);
        let damping_ratio = system.damping / (2.0 * (system.stiffness * system.mass).sqrt());
        Self::from_parts(natural_frequency, decay_rate, damping_ratio, None)
    }

    /// Builds the characteristics from solver-supplied properties alone.
    /// Requires at least a usable natural frequency.
    pub fn from_input(input: &SystemPropertiesInput) -> Option<Self> {
        let natural_frequency = positive(input.natural_frequency)?;
        let decay_rate = non_negative(input.damping_coefficient);
        let damping_ratio = non_negative(input.damping_ratio);
        let (decay_rate, damping_ratio) = match (decay_rate, damping_ratio) {
            (Some(alpha), Some(zeta)) => (alpha, zeta),
            (Some(alpha), None) => (alpha, alpha / natural_frequency),
            (None, Some(zeta)) => (zeta * natural_frequency, zeta),
            (None, None) => (0.0, 0.0),
        };
        let mut characteristics = Self::from_parts(
            natural_frequency,
            decay_rate,
            damping_ratio,
            positive(input.damped_frequency),
        );
        characteristics.apply_display_overrides(input);
        Some(characteristics)
    }

    /// Prefers the solver's values over the local derivation wherever the
    /// solver supplied a usable real number, then re-derives everything that
    /// depends on them so the set stays consistent.
    pub fn merged_with(self, input: Option<&SystemPropertiesInput>) -> Self {
        let Some(input) = input else {
            return self;
        };
        let natural_frequency = positive(input.natural_frequency).unwrap_or(self.natural_frequency);
        let decay_rate = non_negative(input.damping_coefficient).unwrap_or(self.decay_rate);
        let damping_ratio = non_negative(input.damping_ratio).unwrap_or(self.damping_ratio);
        let mut merged = Self::from_parts(
            natural_frequency,
            decay_rate,
            damping_ratio,
            positive(input.damped_frequency),
        );
        merged.apply_display_overrides(input);
        merged
    }

    fn from_parts(
        natural_frequency: f64,
        decay_rate: f64,
        damping_ratio: f64,
        damped_frequency: Option<f64>,
    ) -> Self {
        let damped_frequency = damped_frequency.or_else(|| {
            let squared = natural_frequency * natural_frequency - decay_rate * decay_rate;
            (damping_ratio < 1.0 && squared > 0.0).then(|| squared.sqrt())
        });
        let damped_period = damped_frequency.map(|wd| 2.0 * PI / wd);
        let logarithmic_decrement = damped_period.map(|period| decay_rate * period);
        Self {
            natural_frequency,
            decay_rate,
            damping_ratio,
            damped_frequency,
            damped_period,
            logarithmic_decrement,
            roots: characteristic_roots(natural_frequency, damping_ratio),
        }
    }

    fn apply_display_overrides(&mut self, input: &SystemPropertiesInput) {
        if let Some(period) = positive(input.damped_period) {
            self.damped_period = Some(period);
        }
        if let Some(decrement) = non_negative(input.logarithmic_decrement) {
            self.logarithmic_decrement = Some(decrement);
        }
    }

    /// Regime implied by ζ, for checking against the solver's classification.
    pub fn regime(&self, forced: bool) -> Classification {
        Classification::from_damping_ratio(self.damping_ratio, forced)
    }
}

/// r = −ω₀(ζ ± √(ζ² − 1)), computed in the complex plane so the
/// oscillating case yields the conjugate pair −ζω₀ ± iω_d.
pub fn characteristic_roots(natural_frequency: f64, damping_ratio: f64) -> [Complex<f64>; 2] {
    let zeta = Complex::new(damping_ratio, 0.0);
    let discriminant = (zeta * zeta - 1.0).sqrt();
    [
        -(zeta + discriminant) * natural_frequency,
        -(zeta - discriminant) * natural_frequency,
    ]
}

fn positive(value: Option<ComplexValue>) -> Option<f64> {
    value
        .map(|v| v.real_part())
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn non_negative(value: Option<ComplexValue>) -> Option<f64> {
    value
        .map(|v| v.real_part())
        .filter(|v| v.is_finite() && *v >= 0.0)
}
