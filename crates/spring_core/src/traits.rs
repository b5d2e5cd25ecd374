/// A scalar time-domain signal x(t).
///
/// Implementations must be pure: evaluating the same `t` twice gives the same
/// value, and evaluation never mutates shared state. Non-finite results are
/// allowed and are filtered by the sampler and differentiator.
pub trait Signal {
    fn value(&self, t: f64) -> f64;
}

impl<F> Signal for F
where
    F: Fn(f64) -> f64,
{
    fn value(&self, t: f64) -> f64 {
        self(t)
    }
}
