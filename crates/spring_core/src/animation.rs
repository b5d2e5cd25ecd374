//! Incremental, wall-clock paced sampling for animated plots.
//!
//! An [`AnimationSession`] is owned by the caller and holds all mutable
//! animation state. Each call to [`AnimationSession::tick`] advances the
//! cursor by the elapsed time since the previous tick (times the playback
//! speed) and recomputes the position and velocity buffers on [0, cursor].
//! Pausing stops the cursor; the next tick after resuming counts no elapsed
//! time, so a long pause never produces a jump.

use crate::config::AnimationSettings;
use crate::differentiator;
use crate::sampler::{Channel, Sample, Samples, TimeGrid};
use crate::traits::Signal;
use serde::Serialize;
use tracing::debug;

/// Readouts at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub time: f64,
    pub position: f64,
    pub velocity: Option<f64>,
    pub acceleration: Option<f64>,
    /// Fraction of the horizon covered, in [0, 1].
    pub progress: f64,
    /// Restoring force −k·x, when the stiffness is known.
    pub spring_force: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "frame", rename_all = "snake_case")]
pub enum TickOutcome {
    Paused,
    Advanced(Frame),
    Finished(Frame),
}

/// Readouts of `signal` at time `t`.
pub fn frame_at<S>(signal: &S, t: f64, h: f64, horizon: f64, stiffness: Option<f64>) -> Frame
where
    S: Signal + ?Sized,
{
    let position = signal.value(t);
    let derivatives = differentiator::derivatives(signal, t, h);
    let progress = if horizon > 0.0 {
        (t / horizon).clamp(0.0, 1.0)
    } else {
        1.0
    };
    Frame {
        time: t,
        position,
        velocity: derivatives.map(|d| d.velocity),
        acceleration: derivatives.map(|d| d.acceleration),
        progress,
        spring_force: stiffness
            .filter(|_| position.is_finite())
            .map(|k| -k * position),
    }
}

#[derive(Debug, Clone)]
pub struct AnimationSession {
    settings: AnimationSettings,
    derivative_step: f64,
    stiffness: Option<f64>,
    cursor: f64,
    playing: bool,
    finished: bool,
    last_tick: Option<f64>,
    positions: Vec<Sample>,
    velocities: Vec<Sample>,
    dropped: usize,
}

impl AnimationSession {
    pub fn new(settings: AnimationSettings, derivative_step: f64) -> Self {
        Self {
            settings: AnimationSettings {
                speed: AnimationSettings::clamp_speed(settings.speed),
                ..settings
            },
            derivative_step,
            stiffness: None,
            cursor: 0.0,
            playing: false,
            finished: false,
            last_tick: None,
            positions: Vec::new(),
            velocities: Vec::new(),
            dropped: 0,
        }
    }

    pub fn with_stiffness(mut self, stiffness: Option<f64>) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Starts or resumes playback. A finished session starts over.
    pub fn play(&mut self) {
        if self.finished {
            self.reset();
        }
        self.playing = true;
        self.last_tick = None;
    }

    /// Stops advancing; the cursor and buffers are kept.
    pub fn pause(&mut self) {
        self.playing = false;
        self.last_tick = None;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Cursor back to zero, buffers cleared, playback stopped.
    pub fn reset(&mut self) {
        self.cursor = 0.0;
        self.playing = false;
        self.finished = false;
        self.last_tick = None;
        self.positions.clear();
        self.velocities.clear();
        self.dropped = 0;
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.settings.speed = AnimationSettings::clamp_speed(speed);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.settings.looping = looping;
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn progress(&self) -> f64 {
        if self.settings.horizon > 0.0 {
            (self.cursor / self.settings.horizon).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn positions(&self) -> &[Sample] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Sample] {
        &self.velocities
    }

    /// Points dropped from the current buffers for being non-finite.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Advances the cursor to wall-clock time `now` (seconds).
    pub fn tick<S>(&mut self, signal: &S, now: f64) -> TickOutcome
    where
        S: Signal + ?Sized,
    {
        if !self.playing {
            return TickOutcome::Paused;
        }
        let elapsed = match self.last_tick {
            Some(last) if now.is_finite() => (now - last).max(0.0),
            _ => 0.0,
        };
        if now.is_finite() {
            self.last_tick = Some(now);
        }
        self.cursor += elapsed * self.settings.speed;

        let horizon = self.settings.horizon;
        if self.cursor >= horizon || horizon.is_nan() {
            if self.settings.looping && horizon > 0.0 {
                debug!(horizon, "animation wrapped");
                self.cursor = 0.0;
            } else {
                self.cursor = horizon.max(0.0);
                self.playing = false;
                self.finished = true;
                self.last_tick = None;
                self.refill(signal);
                return TickOutcome::Finished(self.frame(signal));
            }
        }
        self.refill(signal);
        TickOutcome::Advanced(self.frame(signal))
    }

    /// Readouts at the current cursor.
    pub fn frame<S>(&self, signal: &S) -> Frame
    where
        S: Signal + ?Sized,
    {
        frame_at(
            signal,
            self.cursor,
            self.derivative_step,
            self.settings.horizon,
            self.stiffness,
        )
    }

    fn refill<S>(&mut self, signal: &S)
    where
        S: Signal + ?Sized,
    {
        let grid = TimeGrid::capped(self.cursor, self.settings.step, self.settings.max_points);
        let (positions, dropped_positions) =
            Samples::new(signal, grid, Channel::Position, self.derivative_step).collect_counted();
        let (velocities, dropped_velocities) =
            Samples::new(signal, grid, Channel::Velocity, self.derivative_step).collect_counted();
        self.positions = positions;
        self.velocities = velocities;
        self.dropped = dropped_positions + dropped_velocities;
    }
}
