use crate::expression::{self, Oscillation};
use serde::{Deserialize, Serialize};

/// External forcing F(t) = offset + P·cos(Ωt) + Q·sin(Ωt).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingTerm {
    pub offset: f64,
    pub cos_amplitude: f64,
    pub sin_amplitude: f64,
    pub frequency: f64,
}

impl ForcingTerm {
    pub fn cosine(amplitude: f64, frequency: f64) -> Self {
        Self {
            cos_amplitude: amplitude,
            frequency,
            ..Self::default()
        }
    }

    /// Reads a forcing literal such as `2*cos(3*t)` or `1 + sin(2t)`.
    ///
    /// Only constants and a single forcing frequency are accepted; anything
    /// else (exponentials, powers of t, unresolved symbols, mixed
    /// frequencies) is rejected with a description of the offending part.
    pub fn parse(literal: &str) -> Result<Self, String> {
        let expr = expression::parse(literal)?;
        let terms = expression::expand(&expr)?;
        let mut forcing = ForcingTerm::default();
        for term in terms {
            if !term.symbols.is_empty() {
                let names: Vec<&str> = term.symbols.iter().map(String::as_str).collect();
                return Err(format!("Unresolved symbols in forcing: {}", names.join(", ")));
            }
            if term.rate != 0.0 || term.t_power != 0 {
                return Err("Forcing must be a constant plus a single harmonic".to_string());
            }
            let Some(oscillation) = term.oscillation else {
                forcing.offset += term.coefficient;
                continue;
            };
            let frequency = oscillation.frequency();
            if forcing.frequency == 0.0 {
                forcing.frequency = frequency;
            } else if (forcing.frequency - frequency).abs() > 1e-12 * frequency.max(1.0) {
                return Err(format!(
                    "Forcing mixes frequencies {} and {}",
                    forcing.frequency, frequency
                ));
            }
            match oscillation {
                Oscillation::Cos(_) => forcing.cos_amplitude += term.coefficient,
                Oscillation::Sin(_) => forcing.sin_amplitude += term.coefficient,
            }
        }
        Ok(forcing)
    }

    pub fn value(&self, t: f64) -> f64 {
        let phase = self.frequency * t;
        self.offset + self.cos_amplitude * phase.cos() + self.sin_amplitude * phase.sin()
    }

    /// Steady-state response of x'' + 2α·x' + ω₀²·x = F(t).
    ///
    /// The forcing literal is read per unit mass, the way the solver states
    /// the forced equation, so the mass does not enter the amplitudes.
    pub fn steady_state(&self, natural_frequency: f64, decay_rate: f64) -> SteadyState {
        let w = self.frequency;
        let detuning = natural_frequency * natural_frequency - w * w;
        let friction = 2.0 * decay_rate * w;
        let denominator = detuning * detuning + friction * friction;
        let (a, b) = if self.cos_amplitude == 0.0 && self.sin_amplitude == 0.0 {
            (0.0, 0.0)
        } else {
            (
                (self.cos_amplitude * detuning - self.sin_amplitude * friction) / denominator,
                (self.cos_amplitude * friction + self.sin_amplitude * detuning) / denominator,
            )
        };
        SteadyState {
            a,
            b,
            frequency: w,
            offset: self.offset / (natural_frequency * natural_frequency),
        }
    }
}

/// x_p(t) = offset + A·cos(Ωt) + B·sin(Ωt)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteadyState {
    pub a: f64,
    pub b: f64,
    pub frequency: f64,
    pub offset: f64,
}

impl SteadyState {
    pub fn value(&self, t: f64) -> f64 {
        let phase = self.frequency * t;
        self.offset + self.a * phase.cos() + self.b * phase.sin()
    }

    pub fn derivative(&self, t: f64) -> f64 {
        let phase = self.frequency * t;
        self.frequency * (self.b * phase.cos() - self.a * phase.sin())
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.frequency.is_finite() && self.offset.is_finite()
    }
}
