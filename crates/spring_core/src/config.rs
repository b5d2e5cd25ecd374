use crate::forcing::ForcingTerm;
use serde::{Deserialize, Serialize};

/// Full-range sampling grid used for static plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub horizon: f64,
    pub step: f64,
    /// Upper bound on the number of points; the step is widened to respect it.
    pub max_points: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            horizon: 20.0,
            step: 0.1,
            max_points: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub horizon: f64,
    pub step: f64,
    /// Playback multiplier applied to elapsed wall-clock time.
    pub speed: f64,
    /// Wrap the cursor back to zero at the horizon instead of finishing.
    pub looping: bool,
    /// Upper bound on the points held in each animation buffer.
    pub max_points: usize,
}

impl AnimationSettings {
    pub const MIN_SPEED: f64 = 0.1;
    pub const MAX_SPEED: f64 = 3.0;

    pub fn clamp_speed(speed: f64) -> f64 {
        if speed.is_finite() {
            speed.clamp(Self::MIN_SPEED, Self::MAX_SPEED)
        } else {
            1.0
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            horizon: 20.0,
            step: 0.1,
            speed: 1.0,
            looping: false,
            max_points: 300,
        }
    }
}

/// Fallback values for the textual mode when a component cannot be read
/// from the rendered solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub placeholder: f64,
    pub underdamped_decay: f64,
    pub forced_decay: f64,
    pub angular_frequency: f64,
    pub forcing_frequency: f64,
    pub critical_rate: f64,
    pub overdamped_rates: (f64, f64),
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            placeholder: 1.0,
            underdamped_decay: 0.2,
            forced_decay: 0.5,
            angular_frequency: 1.0,
            forcing_frequency: 3.0,
            critical_rate: 1.0,
            overdamped_rates: (0.5, 2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sampling: SamplingSettings,
    pub animation: AnimationSettings,
    /// Step `h` of the central-difference differentiator.
    pub derivative_step: f64,
    pub text_defaults: TextDefaults,
    /// Forcing assumed for the forced regime when the literal is missing or unusable.
    pub default_forcing: ForcingTerm,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingSettings::default(),
            animation: AnimationSettings::default(),
            derivative_step: 0.01,
            text_defaults: TextDefaults::default(),
            default_forcing: ForcingTerm::cosine(2.0, 3.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"sampling": {"horizon": 10.0}, "derivative_step": 0.001}"#)
                .expect("config should parse");
        assert_eq!(config.sampling.horizon, 10.0);
        assert_eq!(config.sampling.step, 0.1);
        assert_eq!(config.sampling.max_points, 300);
        assert_eq!(config.derivative_step, 0.001);
        assert_eq!(config.text_defaults, TextDefaults::default());
    }

    #[test]
    fn speed_is_clamped_to_slider_range() {
        assert_eq!(AnimationSettings::clamp_speed(10.0), 3.0);
        assert_eq!(AnimationSettings::clamp_speed(0.0), 0.1);
        assert_eq!(AnimationSettings::clamp_speed(1.5), 1.5);
        assert_eq!(AnimationSettings::clamp_speed(f64::NAN), 1.0);
    }
}
