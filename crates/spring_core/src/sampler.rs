//! Full-range and key-frame sampling of a signal over a fixed horizon.
//!
//! Sampling is lazy and stateless: iterating the same grid over the same
//! signal twice yields identical samples. Points where the signal (or its
//! numeric derivative) is not finite are skipped and counted.

use crate::differentiator;
use crate::traits::Signal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    Position,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub t: f64,
    pub value: f64,
}

/// Times t_i = i·step for i in 0..count, clamped to `t_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeGrid {
    pub t_max: f64,
    pub step: f64,
    pub count: usize,
}

impl TimeGrid {
    /// Inclusive grid on [0, t_max]. Invalid bounds give an empty grid.
    pub fn new(t_max: f64, step: f64) -> Self {
        let count = match Self::intervals(t_max, step) {
            // Saturating: a huge count is never materialised, only iterated.
            Some(intervals) => (intervals as usize).saturating_add(1),
            None => 0,
        };
        Self { t_max, step, count }
    }

    /// Like [`TimeGrid::new`], widening the step so that at most
    /// `max_points` times are produced. A cap of zero disables capping.
    pub fn capped(t_max: f64, step: f64, max_points: usize) -> Self {
        let Some(intervals) = Self::intervals(t_max, step) else {
            return Self::new(t_max, step);
        };
        if max_points == 0 || intervals + 1.0 <= max_points as f64 {
            return Self::new(t_max, step);
        }
        if max_points == 1 {
            return Self {
                t_max,
                step,
                count: 1,
            };
        }
        Self::new(t_max, t_max / (max_points - 1) as f64)
    }

    /// Whole steps that fit in [0, t_max], computed in floating point.
    fn intervals(t_max: f64, step: f64) -> Option<f64> {
        let valid = t_max.is_finite() && t_max >= 0.0 && step.is_finite() && step > 0.0;
        valid.then(|| (t_max / step + 1e-9).floor())
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn time(&self, index: usize) -> f64 {
        (index as f64 * self.step).min(self.t_max)
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count).map(move |i| self.time(i))
    }
}

/// Lazy iterator of finite samples of one channel.
#[derive(Debug, Clone)]
pub struct Samples<'a, S: ?Sized> {
    signal: &'a S,
    grid: TimeGrid,
    channel: Channel,
    derivative_step: f64,
    index: usize,
    skipped: usize,
}

impl<'a, S: Signal + ?Sized> Samples<'a, S> {
    pub fn new(signal: &'a S, grid: TimeGrid, channel: Channel, derivative_step: f64) -> Self {
        Self {
            signal,
            grid,
            channel,
            derivative_step,
            index: 0,
            skipped: 0,
        }
    }

    /// Collects the remaining samples along with the number of dropped points.
    pub fn collect_counted(mut self) -> (Vec<Sample>, usize) {
        let samples: Vec<Sample> = self.by_ref().collect();
        (samples, self.skipped)
    }
}

impl<S: Signal + ?Sized> Iterator for Samples<'_, S> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        while self.index < self.grid.count {
            let t = self.grid.time(self.index);
            self.index += 1;
            let value = match self.channel {
                Channel::Position => self.signal.value(t),
                Channel::Velocity => {
                    differentiator::velocity(self.signal, t, self.derivative_step).unwrap_or(f64::NAN)
                }
            };
            if value.is_finite() {
                return Some(Sample { t, value });
            }
            self.skipped += 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.grid.count - self.index))
    }
}

/// Position samples on the inclusive grid [0, t_max] with spacing `step`.
pub fn sample<S>(signal: &S, t_max: f64, step: f64) -> Samples<'_, S>
where
    S: Signal + ?Sized,
{
    Samples::new(signal, TimeGrid::new(t_max, step), Channel::Position, 0.0)
}

/// Frame i of `frames` covers [0, i/frames · horizon] on the same step, so
/// the last frame is the full curve. Each frame holds at most `max_points`.
#[derive(Debug, Clone)]
pub struct Keyframes<'a, S: ?Sized> {
    signal: &'a S,
    horizon: f64,
    step: f64,
    max_points: usize,
    frames: usize,
    channel: Channel,
    derivative_step: f64,
    index: usize,
}

impl<S: Signal + ?Sized> Iterator for Keyframes<'_, S> {
    type Item = Vec<Sample>;

    fn next(&mut self) -> Option<Vec<Sample>> {
        if self.frames == 0 || self.index > self.frames {
            return None;
        }
        let end = self.horizon * self.index as f64 / self.frames as f64;
        self.index += 1;
        let grid = TimeGrid::capped(end, self.step, self.max_points);
        Some(Samples::new(self.signal, grid, self.channel, self.derivative_step).collect())
    }
}

pub fn keyframes<S>(
    signal: &S,
    horizon: f64,
    step: f64,
    max_points: usize,
    frames: usize,
    channel: Channel,
    derivative_step: f64,
) -> Keyframes<'_, S>
where
    S: Signal + ?Sized,
{
    Keyframes {
        signal,
        horizon,
        step,
        max_points,
        frames,
        channel,
        derivative_step,
        index: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_horizon_has_201_points() {
        let signal = |t: f64| t.cos();
        let samples: Vec<Sample> = sample(&signal, 20.0, 0.1).collect();
        assert_eq!(samples.len(), 201);
        assert_eq!(samples[0].t, 0.0);
        assert!((samples[200].t - 20.0).abs() < 1e-9);
        assert!(samples.iter().all(|s| s.t <= 20.0));
    }

    #[test]
    fn capped_grid_widens_the_step() {
        let grid = TimeGrid::capped(100.0, 0.1, 300);
        assert_eq!(grid.count, 300);
        assert!((grid.time(299) - 100.0).abs() < 1e-9);
        assert_eq!(TimeGrid::capped(20.0, 0.1, 300).count, 201);
    }

    #[test]
    fn tiny_steps_do_not_overflow() {
        let grid = TimeGrid::new(1.0, 1e-300);
        assert_eq!(grid.count, usize::MAX);
        assert!(grid.time(3) > 0.0 && grid.time(3) < 1e-299);

        let grid = TimeGrid::capped(20.0, 1e-300, 300);
        assert_eq!(grid.count, 300);
        assert!((grid.time(299) - 20.0).abs() < 1e-9);
        assert_eq!(TimeGrid::capped(f64::MAX, 1e-300, 50).count, 50);
    }

    #[test]
    fn keyframes_respect_the_point_cap() {
        let signal = |t: f64| t;
        let frames: Vec<Vec<Sample>> =
            keyframes(&signal, 10.0, 1e-300, 20, 2, Channel::Position, 0.01).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].len(), 20);
        assert_eq!(frames[2].len(), 20);
        let end = frames[2].last().map(|s| s.t).unwrap_or_default();
        assert!((end - 10.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_bounds_give_an_empty_sequence() {
        let signal = |t: f64| t;
        assert_eq!(sample(&signal, -1.0, 0.1).count(), 0);
        assert_eq!(sample(&signal, 1.0, 0.0).count(), 0);
        assert_eq!(sample(&signal, f64::NAN, 0.1).count(), 0);
        assert!(TimeGrid::new(f64::INFINITY, 0.1).is_empty());
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let signal = |t: f64| if t > 0.45 && t < 0.75 { f64::NAN } else { t };
        let (samples, skipped) = sample(&signal, 1.0, 0.1).collect_counted();
        assert_eq!(samples.len() + skipped, 11);
        assert_eq!(skipped, 3);
        assert!(samples.iter().all(|s| s.value.is_finite()));

        let (all_bad, skipped) = sample(&|_t: f64| f64::INFINITY, 1.0, 0.1).collect_counted();
        assert!(all_bad.is_empty());
        assert_eq!(skipped, 11);
    }

    #[test]
    fn velocity_channel_differentiates() {
        let signal = |t: f64| (2.0 * t).sin();
        let grid = TimeGrid::new(2.0, 0.5);
        for s in Samples::new(&signal, grid, Channel::Velocity, 0.01) {
            assert!((s.value - 2.0 * (2.0 * s.t).cos()).abs() < 1e-3);
        }
    }

    #[test]
    fn keyframes_grow_to_the_full_curve() {
        let signal = |t: f64| t;
        let frames: Vec<Vec<Sample>> =
            keyframes(&signal, 2.0, 0.5, 300, 4, Channel::Position, 0.01).collect();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].len(), 1);
        assert_eq!(frames[2].len(), 3);
        assert_eq!(frames[4].len(), 5);
        assert_eq!(frames[4].last().map(|s| s.t), Some(2.0));
    }

    proptest! {
        #[test]
        fn sampling_is_restartable(t_max in 0.0f64..50.0, step in 0.01f64..2.0, w in 0.1f64..5.0) {
            let signal = move |t: f64| (-0.1 * t).exp() * (w * t).cos();
            let first: Vec<Sample> = sample(&signal, t_max, step).collect();
            let second: Vec<Sample> = sample(&signal, t_max, step).collect();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn grid_stays_inside_bounds(t_max in 0.0f64..100.0, step in 0.001f64..5.0, cap in 2usize..500) {
            let grid = TimeGrid::capped(t_max, step, cap);
            prop_assert!(grid.count >= 1);
            prop_assert!(grid.count <= cap);
            for t in grid.times() {
                prop_assert!((0.0..=t_max).contains(&t));
            }
        }
    }
}
