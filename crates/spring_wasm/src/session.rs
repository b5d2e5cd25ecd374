//! Animation session handle for the animated plot and the spring diagram.

use crate::{columns, decode, decode_or_default, encode};
use js_sys::Float64Array;
use spring_core::animation::AnimationSession;
use spring_core::{EngineConfig, PreparedSignal, SignalEngine, SolverResponse};
use wasm_bindgen::prelude::*;

/// One prepared solution plus the session animating it. A new solver
/// response means a new handle; nothing carries over between handles.
#[wasm_bindgen]
pub struct WasmAnimation {
    prepared: PreparedSignal,
    session: AnimationSession,
}

impl WasmAnimation {
    pub(crate) fn from_prepared(engine: &SignalEngine, prepared: PreparedSignal) -> Self {
        let session = engine.session(&prepared);
        Self { prepared, session }
    }
}

#[wasm_bindgen]
impl WasmAnimation {
    #[wasm_bindgen(constructor)]
    pub fn new(response_val: JsValue, config_val: JsValue) -> Result<WasmAnimation, JsValue> {
        console_error_panic_hook::set_once();

        let response: SolverResponse = decode(response_val, "solver response")?;
        let config: EngineConfig = decode_or_default(config_val, "engine config")?;
        let engine = SignalEngine::new(config);
        let prepared = engine
            .prepare(&response)
            .map_err(|e| JsValue::from_str(&format!("Failed to prepare signal: {}", e)))?;
        Ok(Self::from_prepared(&engine, prepared))
    }

    pub fn play(&mut self) {
        self.session.play();
    }

    pub fn pause(&mut self) {
        self.session.pause();
    }

    pub fn toggle(&mut self) {
        self.session.toggle();
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.session.set_speed(speed);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.session.set_looping(looping);
    }

    /// Advances to `now_ms` (a `requestAnimationFrame` timestamp) and returns
    /// the tick outcome with the frame readouts.
    pub fn tick(&mut self, now_ms: f64) -> Result<JsValue, JsValue> {
        let outcome = self.session.tick(&self.prepared, now_ms / 1000.0);
        encode(&outcome)
    }

    pub fn is_done(&self) -> bool {
        self.session.is_finished()
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn cursor(&self) -> f64 {
        self.session.cursor()
    }

    pub fn progress(&self) -> f64 {
        self.session.progress()
    }

    pub fn position_times(&self) -> Float64Array {
        Float64Array::from(columns(self.session.positions()).0.as_slice())
    }

    pub fn position_values(&self) -> Float64Array {
        Float64Array::from(columns(self.session.positions()).1.as_slice())
    }

    pub fn velocity_times(&self) -> Float64Array {
        Float64Array::from(columns(self.session.velocities()).0.as_slice())
    }

    pub fn velocity_values(&self) -> Float64Array {
        Float64Array::from(columns(self.session.velocities()).1.as_slice())
    }

    /// True when the plotted curve is not exact and the UI should say so.
    pub fn approximate(&self) -> bool {
        self.prepared.approximate()
    }

    pub fn defaulted_constants(&self) -> bool {
        self.prepared.defaulted_constants()
    }

    pub fn classification(&self) -> String {
        self.prepared.classification.tag().to_string()
    }

    pub fn degradations(&self) -> Result<JsValue, JsValue> {
        encode(&self.prepared.degradations)
    }

    pub fn properties(&self) -> Result<JsValue, JsValue> {
        encode(&self.prepared.characteristics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spring_core::animation::TickOutcome;
    use spring_core::model::SystemParameters;
    use spring_core::Classification;

    fn animation() -> WasmAnimation {
        let engine = SignalEngine::default();
        let response = SolverResponse {
            classification: Classification::Undamped,
            parameters: Some(SystemParameters {
                mass: Some(1.0),
                stiffness: Some(4.0),
                initial_position: Some(1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let prepared = engine.prepare(&response).expect("prepare");
        WasmAnimation::from_prepared(&engine, prepared)
    }

    #[test]
    fn handle_forwards_playback_controls() {
        let mut animation = animation();
        assert!(!animation.is_playing());
        animation.toggle();
        assert!(animation.is_playing());
        animation.set_speed(2.0);
        let outcome = animation.session.tick(&animation.prepared, 0.0);
        assert!(matches!(outcome, TickOutcome::Advanced(_)));
        animation.session.tick(&animation.prepared, 1.0);
        assert!((animation.cursor() - 2.0).abs() < 1e-12);
        assert!((animation.progress() - 0.1).abs() < 1e-12);
        animation.reset();
        assert_eq!(animation.cursor(), 0.0);
        assert!(!animation.is_done());
    }

    #[test]
    fn handle_reports_exact_parametric_signal() {
        let animation = animation();
        assert!(!animation.approximate());
        assert!(!animation.defaulted_constants());
        assert_eq!(animation.classification(), "undamped");
    }
}
