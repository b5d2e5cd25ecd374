//! The `spring_core` crate turns the output of a mass-spring-damper solver into
//! a sampled time-domain signal for plotting and animation.
//!
//! Key components:
//! - **Model**: `SolverResponse` and friends, the boundary record from the solver.
//! - **Resolver**: regime constants from parameters (exact) or from the rendered solution text (approximate).
//! - **Evaluator**: closed-form x(t) per damping regime, with a reference fallback.
//! - **Differentiator / Sampler**: numeric velocity and acceleration, lazy full-range and key-frame sampling.
//! - **Animation**: an externally owned, wall-clock paced `AnimationSession`.
//! - **Engine**: `SignalEngine`, the single entry point chaining the above.
pub mod animation;
pub mod config;
pub mod differentiator;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod forcing;
pub mod model;
pub mod properties;
pub mod resolver;
pub mod sampler;
pub mod traits;

pub use config::EngineConfig;
pub use engine::{PreparedSignal, RenderOutput, SignalEngine};
pub use error::{Degradation, EngineError, EngineResult};
pub use model::{Classification, SolverResponse};
pub use traits::Signal;
