//! Coefficient resolution: turns solver output into concrete constants for
//! one of the closed-form templates.
//!
//! Two modes exist. The parametric mode computes every constant from the
//! physical parameters and initial conditions and is exact. The textual mode
//! reads the rendered solution string, extracts whatever components it can,
//! and substitutes configured defaults for the rest. The parametric mode is
//! always preferred when parameters are present.

use crate::config::{EngineConfig, TextDefaults};
use crate::error::{Degradation, EngineError, EngineResult};
use crate::expression::{self, Monomial, Oscillation};
use crate::forcing::{ForcingTerm, SteadyState};
use crate::model::{Classification, PhysicalSystem, SolverResponse, SystemPropertiesInput};
use crate::properties::Characteristics;
use serde::Serialize;
use tracing::{debug, warn};

/// Constants of a regime template, ready to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "regime", rename_all = "snake_case")]
pub enum ResolvedCoefficients {
    /// C1·cos(ωt) + C2·sin(ωt)
    Undamped { c1: f64, c2: f64, omega: f64 },
    /// e^{-αt}(C1·cos(ω_d t) + C2·sin(ω_d t))
    Underdamped {
        c1: f64,
        c2: f64,
        alpha: f64,
        omega_d: f64,
    },
    /// Underdamped transient plus the steady-state response to the forcing.
    UnderdampedForced {
        c1: f64,
        c2: f64,
        alpha: f64,
        omega_d: f64,
        steady: SteadyState,
    },
    /// (C1 + C2·t)·e^{-rate·t}
    CriticallyDamped { c1: f64, c2: f64, rate: f64 },
    /// C1·e^{r1·t} + C2·e^{r2·t}, with r1, r2 < 0.
    Overdamped { c1: f64, c2: f64, r1: f64, r2: f64 },
}

impl ResolvedCoefficients {
    pub fn classification(&self) -> Classification {
        match self {
            Self::Undamped { .. } => Classification::Undamped,
            Self::Underdamped { .. } => Classification::Underdamped,
            Self::UnderdampedForced { .. } => Classification::UnderdampedForced,
            Self::CriticallyDamped { .. } => Classification::CriticallyDamped,
            Self::Overdamped { .. } => Classification::Overdamped,
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Self::Undamped { c1, c2, omega } => all_finite(&[c1, c2, omega]),
            Self::Underdamped {
                c1,
                c2,
                alpha,
                omega_d,
            } => all_finite(&[c1, c2, alpha, omega_d]),
            Self::UnderdampedForced {
                c1,
                c2,
                alpha,
                omega_d,
                steady,
            } => all_finite(&[c1, c2, alpha, omega_d]) && steady.is_finite(),
            Self::CriticallyDamped { c1, c2, rate } => all_finite(&[c1, c2, rate]),
            Self::Overdamped { c1, c2, r1, r2 } => all_finite(&[c1, c2, r1, r2]),
        }
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    Parametric,
    Textual,
}

impl ResolutionMode {
    /// True when a result in this mode with these degradations is not exact.
    /// Dropped sample points alone do not make the curve approximate.
    pub fn is_approximate(self, degradations: &[Degradation]) -> bool {
        self == ResolutionMode::Textual
            || degradations
                .iter()
                .any(|d| !matches!(d, Degradation::NonFiniteSample { .. }))
    }
}

/// What the resolver works from.
#[derive(Debug, Clone, Copy)]
pub enum SolutionInput<'a> {
    Parametric {
        system: &'a PhysicalSystem,
        properties: Option<&'a SystemPropertiesInput>,
    },
    Textual {
        text: &'a str,
        properties: Option<&'a SystemPropertiesInput>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub classification: Classification,
    pub mode: ResolutionMode,
    pub coefficients: ResolvedCoefficients,
    /// The validated system, in parametric mode.
    pub system: Option<PhysicalSystem>,
    pub characteristics: Option<Characteristics>,
    pub degradations: Vec<Degradation>,
}

impl Resolution {
    /// True when symbolic constants were replaced by a default value.
    pub fn defaulted_constants(&self) -> bool {
        self.degradations.iter().any(Degradation::is_defaulted_constants)
    }
}

/// Picks the resolution mode for a solver response and resolves it.
///
/// Parameters win over the solution text. Invalid parameters are fatal even
/// when a solution text is present.
pub fn resolve_response(response: &SolverResponse, config: &EngineConfig) -> EngineResult<Resolution> {
    let system = match &response.parameters {
        Some(parameters) => parameters.to_physical()?,
        None => None,
    };
    let properties = response.system_properties.as_ref();
    let input = match (&system, response.solution_text()) {
        (Some(system), _) => SolutionInput::Parametric { system, properties },
        (None, Some(text)) => SolutionInput::Textual { text, properties },
        (None, None) => return Err(EngineError::NoInputData),
    };
    Ok(resolve(response.classification, input, config))
}

pub fn resolve(classification: Classification, input: SolutionInput<'_>, config: &EngineConfig) -> Resolution {
    let resolution = match input {
        SolutionInput::Parametric { system, properties } => {
            resolve_parametric(classification, system, properties, config)
        }
        SolutionInput::Textual { text, properties } => {
            resolve_textual(classification, text, properties, &config.text_defaults)
        }
    };
    debug!(
        regime = %resolution.classification,
        mode = ?resolution.mode,
        degradations = resolution.degradations.len(),
        "resolved coefficients"
    );
    resolution
}

// --- Parametric mode ---

fn resolve_parametric(
    classification: Classification,
    system: &PhysicalSystem,
    properties: Option<&SystemPropertiesInput>,
    config: &EngineConfig,
) -> Resolution {
    let ch = Characteristics::from_system(system).merged_with(properties);
    let implied = ch.regime(classification.is_forced());
    if implied != classification {
        warn!(
            solver = %classification,
            implied = %implied,
            zeta = ch.damping_ratio,
            "solver classification disagrees with the damping ratio"
        );
    }

    let (x0, v0) = (system.initial_position, system.initial_velocity);
    let omega0 = ch.natural_frequency;
    let alpha = ch.decay_rate;
    let omega_d = ch.damped_frequency.unwrap_or(f64::NAN);
    let mut degradations = Vec::new();

    let coefficients = match classification {
        Classification::Undamped => ResolvedCoefficients::Undamped {
            c1: x0,
            c2: v0 / omega0,
            omega: omega0,
        },
        Classification::Underdamped => ResolvedCoefficients::Underdamped {
            c1: x0,
            c2: (v0 + alpha * x0) / omega_d,
            alpha,
            omega_d,
        },
        Classification::UnderdampedForced => {
            let forcing = forcing_for(system, config, &mut degradations);
            let steady = forcing.steady_state(omega0, alpha);
            let c1 = x0 - steady.value(0.0);
            ResolvedCoefficients::UnderdampedForced {
                c1,
                c2: (v0 + alpha * c1 - steady.derivative(0.0)) / omega_d,
                alpha,
                omega_d,
                steady,
            }
        }
        Classification::CriticallyDamped => ResolvedCoefficients::CriticallyDamped {
            c1: x0,
            c2: v0 + omega0 * x0,
            rate: omega0,
        },
        Classification::Overdamped => {
            let (r1, r2) = (ch.roots[0].re, ch.roots[1].re);
            let c2 = (v0 - r1 * x0) / (r2 - r1);
            ResolvedCoefficients::Overdamped {
                c1: x0 - c2,
                c2,
                r1,
                r2,
            }
        }
    };

    Resolution {
        classification,
        mode: ResolutionMode::Parametric,
        coefficients,
        system: Some(system.clone()),
        characteristics: Some(ch),
        degradations,
    }
}

fn forcing_for(system: &PhysicalSystem, config: &EngineConfig, degradations: &mut Vec<Degradation>) -> ForcingTerm {
    let literal = system.force.as_deref().unwrap_or_default();
    match ForcingTerm::parse(literal) {
        Ok(forcing) => forcing,
        Err(reason) => {
            warn!(%literal, %reason, "unusable forcing literal, using the default forcing");
            degradations.push(Degradation::UnsupportedForcing {
                literal: literal.to_string(),
            });
            config.default_forcing
        }
    }
}

// --- Textual mode ---

fn resolve_textual(
    classification: Classification,
    text: &str,
    properties: Option<&SystemPropertiesInput>,
    defaults: &TextDefaults,
) -> Resolution {
    let mut degradations = Vec::new();
    // Only the right-hand side of `x(t) = ...` is the solution.
    let text = text.rsplit('=').next().unwrap_or(text);
    let mut unresolved = expression::find_placeholders(text);

    let terms = match expression::parse(text) {
        Ok(expr) => {
            let (terms, rejected) = expression::expand_lenient(&expr);
            if !rejected.is_empty() {
                warn!(?rejected, "ignoring solution terms that do not fit a template");
            }
            terms
        }
        Err(reason) => {
            warn!(%reason, "solution text not understood, using default components");
            Vec::new()
        }
    };
    let terms: Vec<Monomial> = terms
        .into_iter()
        .map(|mut term| {
            for symbol in std::mem::take(&mut term.symbols) {
                term.coefficient *= defaults.placeholder;
                unresolved.insert(normalize_symbol(&symbol));
            }
            term
        })
        .collect();

    if !unresolved.is_empty() {
        let symbols: Vec<String> = unresolved.into_iter().collect();
        warn!(?symbols, value = defaults.placeholder, "substituting unresolved constants");
        degradations.push(Degradation::UnresolvedConstants {
            symbols,
            value: defaults.placeholder,
        });
    }

    let mut reader = TextReader {
        terms: &terms,
        defaults,
        degradations,
    };
    let coefficients = match classification {
        Classification::Undamped => reader.undamped(),
        Classification::Underdamped => reader.underdamped(),
        Classification::UnderdampedForced => reader.underdamped_forced(),
        Classification::CriticallyDamped => reader.critically_damped(),
        Classification::Overdamped => reader.overdamped(),
    };

    Resolution {
        classification,
        mode: ResolutionMode::Textual,
        coefficients,
        system: None,
        characteristics: properties.and_then(Characteristics::from_input),
        degradations: reader.degradations,
    }
}

fn normalize_symbol(symbol: &str) -> String {
    if expression::is_placeholder(symbol) {
        symbol.to_uppercase()
    } else {
        symbol.to_string()
    }
}

/// Sums of cosine and sine coefficients at one frequency.
#[derive(Debug, Default)]
struct Harmonic {
    frequency: Option<f64>,
    cos: f64,
    sin: f64,
    found: bool,
}

impl Harmonic {
    fn collect<'a>(terms: impl Iterator<Item = &'a Monomial>) -> Self {
        let mut harmonic = Harmonic::default();
        for term in terms {
            let Some(oscillation) = term.oscillation else {
                continue;
            };
            let frequency = *harmonic.frequency.get_or_insert(oscillation.frequency());
            if !same_rate(frequency, oscillation.frequency()) {
                debug!(frequency = oscillation.frequency(), "ignoring second frequency");
                continue;
            }
            harmonic.found = true;
            match oscillation {
                Oscillation::Cos(_) => harmonic.cos += term.coefficient,
                Oscillation::Sin(_) => harmonic.sin += term.coefficient,
            }
        }
        harmonic
    }
}

fn same_rate(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(1.0)
}

/// Extracts regime components from expanded solution terms, recording a
/// degradation for every component that falls back to its default.
struct TextReader<'a> {
    terms: &'a [Monomial],
    defaults: &'a TextDefaults,
    degradations: Vec<Degradation>,
}

impl TextReader<'_> {
    fn fallback(&mut self, component: &'static str, value: f64) -> f64 {
        debug!(component, value, "component missing from solution text");
        self.degradations.push(Degradation::FallbackConstant { component, value });
        value
    }

    /// Both constants default to the placeholder value when no usable term
    /// of the template's shape is present.
    fn amplitudes(&mut self, found: bool, c1: f64, c2: f64) -> (f64, f64) {
        if found {
            (c1, c2)
        } else {
            let value = self.fallback("amplitudes", self.defaults.placeholder);
            (value, value)
        }
    }

    fn decay_rate(&mut self, oscillating: bool, default: f64) -> f64 {
        let rate = self
            .terms
            .iter()
            .find(|t| t.rate < 0.0 && t.t_power == 0 && t.oscillation.is_some() == oscillating)
            .map(|t| -t.rate);
        match rate {
            Some(rate) => rate,
            None => self.fallback("decay_rate", default),
        }
    }

    fn undamped(&mut self) -> ResolvedCoefficients {
        let harmonic = Harmonic::collect(
            self.terms
                .iter()
                .filter(|t| t.rate == 0.0 && t.t_power == 0),
        );
        let omega = match harmonic.frequency {
            Some(w) => w,
            None => self.fallback("angular_frequency", self.defaults.angular_frequency),
        };
        let (c1, c2) = self.amplitudes(harmonic.found, harmonic.cos, harmonic.sin);
        ResolvedCoefficients::Undamped { c1, c2, omega }
    }

    fn underdamped(&mut self) -> ResolvedCoefficients {
        let alpha = self.decay_rate(true, self.defaults.underdamped_decay);
        let harmonic = Harmonic::collect(
            self.terms
                .iter()
                .filter(|t| t.rate < 0.0 && t.t_power == 0 && same_rate(-t.rate, alpha)),
        );
        let omega_d = match harmonic.frequency {
            Some(w) => w,
            None => self.fallback("angular_frequency", self.defaults.angular_frequency),
        };
        let (c1, c2) = self.amplitudes(harmonic.found, harmonic.cos, harmonic.sin);
        ResolvedCoefficients::Underdamped {
            c1,
            c2,
            alpha,
            omega_d,
        }
    }

    /// Decaying oscillations form the transient, undecayed oscillations the
    /// steady state, and constants its offset.
    fn underdamped_forced(&mut self) -> ResolvedCoefficients {
        let alpha = self.decay_rate(true, self.defaults.forced_decay);
        let transient = Harmonic::collect(
            self.terms
                .iter()
                .filter(|t| t.rate < 0.0 && t.t_power == 0 && same_rate(-t.rate, alpha)),
        );
        let steady_part = Harmonic::collect(
            self.terms
                .iter()
                .filter(|t| t.rate == 0.0 && t.t_power == 0),
        );
        let offset: f64 = self
            .terms
            .iter()
            .filter(|t| t.is_constant())
            .map(|t| t.coefficient)
            .sum();

        let omega_d = match transient.frequency {
            Some(w) => w,
            None => self.fallback("angular_frequency", self.defaults.angular_frequency),
        };
        let forcing_frequency = match steady_part.frequency {
            Some(w) => w,
            None => self.fallback("forcing_frequency", self.defaults.forcing_frequency),
        };
        let (c1, c2) = self.amplitudes(
            transient.found || steady_part.found,
            transient.cos,
            transient.sin,
        );
        ResolvedCoefficients::UnderdampedForced {
            c1,
            c2,
            alpha,
            omega_d,
            steady: SteadyState {
                a: steady_part.cos,
                b: steady_part.sin,
                frequency: forcing_frequency,
                offset,
            },
        }
    }

    /// `C1` is the coefficient of t⁰·e^{-rt}, `C2` that of t¹·e^{-rt}.
    fn critically_damped(&mut self) -> ResolvedCoefficients {
        let rate = self
            .terms
            .iter()
            .find(|t| t.rate < 0.0 && t.oscillation.is_none())
            .map(|t| -t.rate);
        let rate = match rate {
            Some(rate) => rate,
            None => self.fallback("decay_rate", self.defaults.critical_rate),
        };
        let mut found = false;
        let (mut c1, mut c2) = (0.0, 0.0);
        for term in self
            .terms
            .iter()
            .filter(|t| t.oscillation.is_none() && same_rate(-t.rate, rate))
        {
            match term.t_power {
                0 => c1 += term.coefficient,
                1 => c2 += term.coefficient,
                _ => continue,
            }
            found = true;
        }
        let (c1, c2) = self.amplitudes(found, c1, c2);
        ResolvedCoefficients::CriticallyDamped { c1, c2, rate }
    }

    /// The first two distinct decaying exponentials in text order.
    fn overdamped(&mut self) -> ResolvedCoefficients {
        let mut groups: Vec<(f64, f64)> = Vec::new();
        for term in self
            .terms
            .iter()
            .filter(|t| t.rate < 0.0 && t.t_power == 0 && t.oscillation.is_none())
        {
            match groups.iter().position(|(rate, _)| same_rate(*rate, term.rate)) {
                Some(i) => groups[i].1 += term.coefficient,
                None if groups.len() < 2 => groups.push((term.rate, term.coefficient)),
                None => debug!(rate = term.rate, "ignoring third exponential"),
            }
        }
        let (default_r1, default_r2) = self.defaults.overdamped_rates;
        let found = !groups.is_empty();
        let (r1, c1) = match groups.first() {
            Some(&group) => group,
            None => (-self.fallback("overdamped_rate", default_r1), 0.0),
        };
        let (r2, c2) = match groups.get(1) {
            Some(&group) => group,
            None => {
                let rate = if same_rate(r1, -default_r2) { default_r1 } else { default_r2 };
                (-self.fallback("overdamped_rate", rate), 0.0)
            }
        };
        let (c1, c2) = self.amplitudes(found, c1, c2);
        ResolvedCoefficients::Overdamped { c1, c2, r1, r2 }
    }
}
