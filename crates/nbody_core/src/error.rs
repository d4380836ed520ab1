//! Error taxonomy for the N-body core.
//!
//! Every fallible operation returns [`NBodyError`]. Numerical degeneracies (coincident bodies
//! with zero softening) are not represented here: they surface as non-finite
//! values in the output arrays.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NBodyError {
    /// Rejected at ingestion; never reaches the numeric core.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The adaptive integrator was requested but no solver backend is compiled in.
    #[error("Adaptive solver unavailable: {0}. Use the euler or rk4 method instead.")]
    DependencyUnavailable(String),

    /// The adaptive solver ran but reported failure. The message is the solver's own.
    #[error("Adaptive solver failed: {0}")]
    SolverDivergence(String),

    #[error("Body index {index} out of range for a system of {len} bodies.")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NBodyError>;
