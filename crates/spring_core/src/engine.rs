use crate::animation::AnimationSession;
use crate::config::EngineConfig;
use crate::error::{Degradation, EngineResult};
use crate::evaluator::{self, ClosedForm, ReferenceSignal};
use crate::model::{Classification, SolverResponse};
use crate::properties::Characteristics;
use crate::resolver::{self, ResolutionMode, ResolvedCoefficients};
use crate::sampler::{self, Channel, Sample, Samples, TimeGrid};
use crate::traits::Signal;
use serde::Serialize;
use tracing::{debug, warn};

/// Single entry point: solver response in, evaluable signal and samples out.
#[derive(Debug, Clone, Default)]
pub struct SignalEngine {
    config: EngineConfig,
}

/// A closed form ready to sample or animate, with everything the caller
/// needs to caveat it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSignal {
    pub classification: Classification,
    pub mode: ResolutionMode,
    pub signal: ClosedForm,
    /// `None` when the reference signal replaced the closed form.
    pub coefficients: Option<ResolvedCoefficients>,
    pub characteristics: Option<Characteristics>,
    pub stiffness: Option<f64>,
    pub degradations: Vec<Degradation>,
}

impl PreparedSignal {
    pub fn approximate(&self) -> bool {
        self.mode.is_approximate(&self.degradations)
    }

    pub fn defaulted_constants(&self) -> bool {
        self.degradations.iter().any(Degradation::is_defaulted_constants)
    }
}

impl Signal for PreparedSignal {
    fn value(&self, t: f64) -> f64 {
        self.signal.value(t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    /// `None` for the preview signal.
    pub classification: Option<Classification>,
    pub positions: Vec<Sample>,
    pub velocities: Vec<Sample>,
    pub approximate: bool,
    pub defaulted_constants: bool,
    pub degradations: Vec<Degradation>,
    pub properties: Option<Characteristics>,
    pub coefficients: Option<ResolvedCoefficients>,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves the response and builds its closed form.
    ///
    /// Only invalid parameters and a response with neither parameters nor a
    /// solution text fail; every other problem degrades the result.
    pub fn prepare(&self, response: &SolverResponse) -> EngineResult<PreparedSignal> {
        let resolution = resolver::resolve_response(response, &self.config)?;
        let reference = match resolution.mode {
            ResolutionMode::Parametric => ReferenceSignal::Cosine,
            ResolutionMode::Textual => ReferenceSignal::DecayingCosine,
        };
        let evaluation =
            evaluator::build_with_reference(resolution.classification, &resolution.coefficients, reference);

        let mut degradations = resolution.degradations;
        let coefficients = match evaluation.failure {
            Some(reason) => {
                degradations.push(Degradation::EvaluationFailure { reason });
                None
            }
            None => Some(resolution.coefficients),
        };

        Ok(PreparedSignal {
            classification: resolution.classification,
            mode: resolution.mode,
            signal: evaluation.signal,
            coefficients,
            characteristics: resolution.characteristics,
            stiffness: resolution.system.map(|system| system.stiffness),
            degradations,
        })
    }

    /// Full-range position and velocity samples for a static plot.
    pub fn render(&self, response: &SolverResponse) -> EngineResult<RenderOutput> {
        let prepared = self.prepare(response)?;
        Ok(self.render_prepared(&prepared))
    }

    pub fn render_prepared(&self, prepared: &PreparedSignal) -> RenderOutput {
        let mut degradations = prepared.degradations.clone();
        let (positions, velocities) = self.sample_both(&prepared.signal, &mut degradations);
        debug!(
            regime = %prepared.classification,
            points = positions.len(),
            "rendered signal"
        );
        RenderOutput {
            classification: Some(prepared.classification),
            positions,
            velocities,
            approximate: prepared.approximate(),
            defaulted_constants: prepared.defaulted_constants(),
            degradations,
            properties: prepared.characteristics.clone(),
            coefficients: prepared.coefficients,
        }
    }

    /// Placeholder plot shown before any solution arrives: e^{-0.2t}·cos(t).
    pub fn preview(&self) -> RenderOutput {
        let signal = ClosedForm::Reference(ReferenceSignal::DecayingCosine);
        let mut degradations = Vec::new();
        let (positions, velocities) = self.sample_both(&signal, &mut degradations);
        RenderOutput {
            classification: None,
            positions,
            velocities,
            approximate: true,
            defaulted_constants: false,
            degradations,
            properties: None,
            coefficients: None,
        }
    }

    /// A fresh animation session for `prepared`, using the configured
    /// animation settings.
    pub fn session(&self, prepared: &PreparedSignal) -> AnimationSession {
        AnimationSession::new(self.config.animation, self.config.derivative_step)
            .with_stiffness(prepared.stiffness)
    }

    /// The growing-curve frames of the animated plot.
    pub fn keyframes<'a>(
        &self,
        prepared: &'a PreparedSignal,
        frames: usize,
        channel: Channel,
    ) -> sampler::Keyframes<'a, ClosedForm> {
        sampler::keyframes(
            &prepared.signal,
            self.config.animation.horizon,
            self.config.animation.step,
            self.config.animation.max_points,
            frames,
            channel,
            self.config.derivative_step,
        )
    }

    fn sample_both<S>(&self, signal: &S, degradations: &mut Vec<Degradation>) -> (Vec<Sample>, Vec<Sample>)
    where
        S: Signal + ?Sized,
    {
        let settings = &self.config.sampling;
        let grid = TimeGrid::capped(settings.horizon, settings.step, settings.max_points);
        let h = self.config.derivative_step;
        let (positions, dropped_positions) =
            Samples::new(signal, grid, Channel::Position, h).collect_counted();
        let (velocities, dropped_velocities) =
            Samples::new(signal, grid, Channel::Velocity, h).collect_counted();
        let count = dropped_positions + dropped_velocities;
        if count > 0 {
            warn!(count, "dropped non-finite samples");
            degradations.push(Degradation::NonFiniteSample { count });
        }
        (positions, velocities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differentiator;
    use crate::model::SystemParameters;
    use proptest::prelude::*;

    fn response(classification: &str, parameters: SystemParameters) -> SolverResponse {
        SolverResponse {
            classification: Classification::from_tag(classification),
            parameters: Some(parameters),
            ..Default::default()
        }
    }

    fn parameters(mass: f64, stiffness: f64, damping: f64, x0: f64, v0: f64) -> SystemParameters {
        SystemParameters {
            mass: Some(mass),
            stiffness: Some(stiffness),
            damping: Some(damping),
            initial_position: Some(x0),
            initial_velocity: Some(v0),
            ..Default::default()
        }
    }

    #[test]
    fn undamped_scenario_is_cos_2t() {
        let engine = SignalEngine::default();
        let output = engine
            .render(&response("sin_amortiguamiento", parameters(1.0, 4.0, 0.0, 1.0, 0.0)))
            .expect("render");
        assert_eq!(output.classification, Some(Classification::Undamped));
        assert_eq!(output.positions.len(), 201);
        assert_eq!(output.velocities.len(), 201);
        assert!(!output.approximate);
        assert!(!output.defaulted_constants);
        for s in &output.positions {
            assert!((s.value - (2.0 * s.t).cos()).abs() < 1e-9, "x({}) = {}", s.t, s.value);
        }
        for s in &output.velocities {
            assert!((s.value + 2.0 * (2.0 * s.t).sin()).abs() < 1e-3);
        }
        let properties = output.properties.expect("properties");
        assert!((properties.natural_frequency - 2.0).abs() < 1e-12);
    }

    #[test]
    fn critically_damped_scenario() {
        let engine = SignalEngine::default();
        let v0 = 0.5;
        let prepared = engine
            .prepare(&response(
                "criticamente_amortiguado",
                parameters(1.0, 1.0, 2.0, 1.0, v0),
            ))
            .expect("prepare");
        assert_eq!(prepared.classification, Classification::CriticallyDamped);
        for &t in &[0.0_f64, 0.5, 1.0, 3.0, 10.0] {
            let expected = (1.0 + (v0 + 1.0) * t) * (-t).exp();
            assert!((prepared.value(t) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn textual_solution_is_flagged() {
        let engine = SignalEngine::default();
        let response = SolverResponse {
            classification: Classification::from_tag("subamortiguado"),
            solution: Some(r"C_{1} e^{- 0.5 t} \cos{\left(2 t \right)}".to_string()),
            ..Default::default()
        };
        let output = engine.render(&response).expect("render");
        assert!(output.approximate);
        assert!(output.defaulted_constants);
        assert!((output.positions[0].value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn evaluation_failure_plots_reference_signal() {
        // Classified underdamped but ζ > 1: there is no real damped frequency.
        let engine = SignalEngine::default();
        let prepared = engine
            .prepare(&response("subamortiguado", parameters(1.0, 1.0, 5.0, 1.0, 0.0)))
            .expect("prepare");
        assert_eq!(prepared.signal, ClosedForm::Reference(ReferenceSignal::Cosine));
        assert!(prepared.coefficients.is_none());
        assert!(prepared.approximate());
        assert!(prepared
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::EvaluationFailure { .. })));
    }

    #[test]
    fn preview_is_approximate_decaying_cosine() {
        let output = SignalEngine::default().preview();
        assert!(output.approximate);
        assert_eq!(output.classification, None);
        assert_eq!(output.positions.len(), 201);
        let last = output.positions.last().expect("samples");
        assert!((last.value - (-0.2 * last.t).exp() * last.t.cos()).abs() < 1e-12);
    }

    #[test]
    fn tiny_configured_step_is_capped() {
        let mut config = EngineConfig::default();
        config.sampling.step = 1e-300;
        let output = SignalEngine::new(config).preview();
        assert_eq!(output.positions.len(), 300);
        assert_eq!(output.velocities.len(), 300);
    }

    #[test]
    fn session_carries_stiffness() {
        let engine = SignalEngine::default();
        let prepared = engine
            .prepare(&response("sin_amortiguamiento", parameters(1.0, 4.0, 0.0, 1.0, 0.0)))
            .expect("prepare");
        let session = engine.session(&prepared);
        let frame = session.frame(&prepared);
        assert_eq!(frame.spring_force, Some(-4.0));
    }

    #[test]
    fn keyframes_cover_the_animation_horizon() {
        let engine = SignalEngine::default();
        let prepared = engine
            .prepare(&response("sin_amortiguamiento", parameters(1.0, 4.0, 0.0, 1.0, 0.0)))
            .expect("prepare");
        let frames: Vec<Vec<Sample>> = engine.keyframes(&prepared, 10, Channel::Position).collect();
        assert_eq!(frames.len(), 11);
        assert_eq!(frames[10].len(), 201);
    }

    fn regime_case() -> impl Strategy<Value = (f64, f64, f64, f64, f64, bool)> {
        // (mass, stiffness, zeta, x0, v0, forced)
        prop_oneof![
            Just(0.0),
            0.05f64..0.95,
            Just(1.0),
            1.1f64..3.0,
        ]
        .prop_flat_map(|zeta| {
            (
                0.5f64..5.0,
                0.5f64..10.0,
                Just(zeta),
                -2.0f64..2.0,
                -2.0f64..2.0,
                any::<bool>(),
            )
        })
    }

    /// The prepared signal plus (α, ω₀², forced) of its equation
    /// x'' + 2αx' + ω₀²x = F(t), with F = 2cos(3t) when forced.
    fn prepared_for(case: (f64, f64, f64, f64, f64, bool)) -> (PreparedSignal, f64, f64, bool) {
        let (mass, stiffness, zeta, x0, v0, forced) = case;
        let damping = 2.0 * zeta * (stiffness * mass).sqrt();
        let forced = forced && zeta > 0.0 && zeta < 1.0;
        let classification = Classification::from_damping_ratio(
            damping / (2.0 * (stiffness * mass).sqrt()),
            forced,
        );
        let mut params = parameters(mass, stiffness, damping, x0, v0);
        if forced {
            params.force = Some("2*cos(3*t)".to_string());
        }
        let response = SolverResponse {
            classification,
            parameters: Some(params),
            ..Default::default()
        };
        let prepared = SignalEngine::default().prepare(&response).expect("prepare");
        (prepared, damping / (2.0 * mass), stiffness / mass, forced)
    }

    proptest! {
        #[test]
        fn position_at_zero_is_initial_position(case in regime_case()) {
            let x0 = case.3;
            let (prepared, ..) = prepared_for(case);
            prop_assert!(prepared.coefficients.is_some());
            prop_assert!((prepared.value(0.0) - x0).abs() < 1e-6);
        }

        #[test]
        fn velocity_at_zero_is_initial_velocity(case in regime_case()) {
            let (x0, v0) = (case.3, case.4);
            let (prepared, alpha, w0_sq, forced) = prepared_for(case);
            let h: f64 = 1e-4;
            let v = differentiator::velocity(&prepared, 0.0, h).expect("finite velocity");
            // The one-sided difference is v0 - h²/3·x'''(0) - h³/4·x''''(0) - O(h⁴);
            // the higher derivatives at 0 follow from the equation itself.
            let (f0, f2) = if forced { (2.0, -18.0) } else { (0.0, 0.0) };
            let acceleration = f0 - 2.0 * alpha * v0 - w0_sq * x0;
            let jerk = -2.0 * alpha * acceleration - w0_sq * v0;
            let snap = f2 - 2.0 * alpha * jerk - w0_sq * acceleration;
            let leading = h * h / 3.0 * jerk.abs() + h.powi(3) / 4.0 * snap.abs();
            let tolerance = 2.0 * leading + 1e-7;
            prop_assert!((v - v0).abs() < tolerance, "v = {}, v0 = {}, tol = {}", v, v0, tolerance);
        }
    }
}
