//! Fatal errors and non-fatal degradations of the signal engine.

use serde::Serialize;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Conditions that abort coefficient resolution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid parameters: {what}")]
    InvalidParameters { what: String },

    #[error("No input data: neither system parameters nor a solution string were supplied")]
    NoInputData,
}

impl EngineError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidParameters { what: what.into() }
    }
}

/// Recoverable conditions. The engine keeps rendering and reports these
/// alongside the result so the caller can caveat the plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Symbolic constants (C1, C2, ...) in the solution text were replaced by a default.
    UnresolvedConstants { symbols: Vec<String>, value: f64 },
    /// Sample points dropped because the signal was not finite there.
    NonFiniteSample { count: usize },
    /// The closed form could not be built; a reference signal is plotted instead.
    EvaluationFailure { reason: String },
    /// A component could not be read from the solution text.
    FallbackConstant { component: &'static str, value: f64 },
    /// The forcing literal is not a single harmonic; the default forcing was used.
    UnsupportedForcing { literal: String },
}

impl Degradation {
    pub fn is_defaulted_constants(&self) -> bool {
        matches!(self, Degradation::UnresolvedConstants { .. })
    }
}
