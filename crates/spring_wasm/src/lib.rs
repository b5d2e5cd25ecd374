//! WASM bridge exposing the signal engine to the JavaScript front-end.

mod session;

pub use session::WasmAnimation;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_wasm_bindgen::{from_value, to_value};
use spring_core::sampler::Sample;
use spring_core::{EngineConfig, SignalEngine, SolverResponse};
use wasm_bindgen::prelude::*;

/// Deserializes a JS value, treating `undefined` and `null` as "use the default".
pub(crate) fn decode_or_default<T>(value: JsValue, what: &str) -> Result<T, JsValue>
where
    T: DeserializeOwned + Default,
{
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    decode(value, what)
}

pub(crate) fn decode<T>(value: JsValue, what: &str) -> Result<T, JsValue>
where
    T: DeserializeOwned,
{
    from_value::<T>(value)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("Invalid {}", what))
        .map_err(|e| to_js_error(&e))
}

pub(crate) fn to_js_error(err: &anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Splits samples into parallel time and value columns for typed arrays.
pub(crate) fn columns(samples: &[Sample]) -> (Vec<f64>, Vec<f64>) {
    samples.iter().map(|s| (s.t, s.value)).unzip()
}

/// Resolves a solver response and samples its position and velocity over the
/// configured horizon. Returns the serialized render output.
#[wasm_bindgen]
pub fn render_solution(response_val: JsValue, config_val: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let response: SolverResponse = decode(response_val, "solver response")?;
    let config: EngineConfig = decode_or_default(config_val, "engine config")?;
    let output = SignalEngine::new(config)
        .render(&response)
        .map_err(|e| JsValue::from_str(&format!("Render failed: {}", e)))?;
    encode(&output)
}

/// The placeholder plot shown before any solution arrives.
#[wasm_bindgen]
pub fn preview_signal(config_val: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let config: EngineConfig = decode_or_default(config_val, "engine config")?;
    encode(&SignalEngine::new(config).preview())
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use spring_core::model::SystemParameters;
    use spring_core::Classification;
    use wasm_bindgen_test::wasm_bindgen_test;

    fn undamped_response() -> JsValue {
        let response = SolverResponse {
            classification: Classification::Undamped,
            parameters: Some(SystemParameters {
                mass: Some(1.0),
                stiffness: Some(4.0),
                damping: Some(0.0),
                initial_position: Some(1.0),
                initial_velocity: Some(0.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        to_value(&response).expect("response")
    }

    fn field(value: &JsValue, name: &str) -> JsValue {
        js_sys::Reflect::get(value, &JsValue::from_str(name)).expect("field")
    }

    #[wasm_bindgen_test]
    fn render_solution_samples_undamped_response() {
        let output = render_solution(undamped_response(), JsValue::UNDEFINED)
            .expect("render should succeed");
        let positions = js_sys::Array::from(&field(&output, "positions"));
        assert_eq!(positions.length(), 201);
        assert_eq!(field(&output, "approximate").as_bool(), Some(false));
    }

    #[wasm_bindgen_test]
    fn render_solution_reports_missing_input() {
        let empty = to_value(&SolverResponse::default()).expect("response");
        let message = render_solution(empty, JsValue::NULL)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("No input data"));
    }

    #[wasm_bindgen_test]
    fn render_solution_rejects_malformed_config() {
        let message = render_solution(undamped_response(), JsValue::from_str("fast"))
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.starts_with("Invalid engine config"));
    }

    #[wasm_bindgen_test]
    fn preview_signal_is_approximate() {
        let output = preview_signal(JsValue::UNDEFINED).expect("preview");
        assert_eq!(field(&output, "approximate").as_bool(), Some(true));
        assert!(field(&output, "classification").is_null() || field(&output, "classification").is_undefined());
    }
}
