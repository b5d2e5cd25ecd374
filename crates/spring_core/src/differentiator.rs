use crate::traits::Signal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Derivatives {
    pub velocity: f64,
    pub acceleration: f64,
}

/// Numerical first and second derivatives of `signal` at `t`.
///
/// Uses central differences when `t - h` is still inside the domain and
/// second-order forward differences at the left edge, so the signal is never
/// evaluated at negative time. Returns `None` for a non-positive step or a
/// non-finite result.
pub fn derivatives<S>(signal: &S, t: f64, h: f64) -> Option<Derivatives>
where
    S: Signal + ?Sized,
{
    if h.is_nan() || h <= 0.0 || !t.is_finite() {
        return None;
    }
    let (velocity, acceleration) = if t - h >= 0.0 {
        let ahead = signal.value(t + h);
        let here = signal.value(t);
        let behind = signal.value(t - h);
        (
            (ahead - behind) / (2.0 * h),
            (ahead - 2.0 * here + behind) / (h * h),
        )
    } else {
        let f0 = signal.value(t);
        let f1 = signal.value(t + h);
        let f2 = signal.value(t + 2.0 * h);
        let f3 = signal.value(t + 3.0 * h);
        (
            (-3.0 * f0 + 4.0 * f1 - f2) / (2.0 * h),
            (2.0 * f0 - 5.0 * f1 + 4.0 * f2 - f3) / (h * h),
        )
    };
    (velocity.is_finite() && acceleration.is_finite()).then_some(Derivatives {
        velocity,
        acceleration,
    })
}

pub fn velocity<S>(signal: &S, t: f64, h: f64) -> Option<f64>
where
    S: Signal + ?Sized,
{
    derivatives(signal, t, h).map(|d| d.velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_difference_of_cosine() {
        let d = derivatives(&|t: f64| t.cos(), 1.0, 0.01).expect("finite");
        assert!((d.velocity + 1.0_f64.sin()).abs() < 1e-4);
        assert!((d.acceleration + 1.0_f64.cos()).abs() < 1e-4);
    }

    #[test]
    fn one_sided_at_origin() {
        let signal = |t: f64| {
            assert!(t >= 0.0, "evaluated at negative time {}", t);
            (2.0 * t).sin()
        };
        let d = derivatives(&signal, 0.0, 0.01).expect("finite");
        assert!((d.velocity - 2.0).abs() < 1e-3);
        assert!(d.acceleration.abs() < 1e-2);
    }

    #[test]
    fn quadratic_is_exact_enough() {
        let d = derivatives(&|t: f64| 3.0 * t * t, 0.005, 0.01).expect("finite");
        assert!((d.velocity - 0.03).abs() < 1e-9);
        assert!((d.acceleration - 6.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_bad_step_and_non_finite_values() {
        assert_eq!(derivatives(&|t: f64| t, 1.0, 0.0), None);
        assert_eq!(derivatives(&|t: f64| t, 1.0, -0.1), None);
        assert_eq!(derivatives(&|t: f64| 1.0 / (t - 1.0), 1.0, 0.01), None);
    }
}
