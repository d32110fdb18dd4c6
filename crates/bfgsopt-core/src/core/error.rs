//! Error types for quasi-Newton optimization.
//!
//! Only configuration problems are reported as errors. A run that stops
//! without converging is a terminal optimizer state, not an `Err`, so the
//! caller can still inspect the final parameters.

use thiserror::Error;

/// Errors that can occur while configuring or driving an optimizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    /// Invalid optimizer configuration.
    ///
    /// This error occurs when the optimizer is configured with invalid
    /// parameters (e.g., a negative tolerance, a curvature coefficient
    /// outside `(0, 1]`).
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Dimension mismatch between a caller supplied buffer and the problem.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Line search failed to find an acceptable step.
    ///
    /// Produced by the caller-side driver when it converts a terminal
    /// optimizer state into a `Result`.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of outer iterations completed
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
    },

    /// The optimizer stopped without converging for a reason other than a
    /// line search failure.
    #[error("Optimization failed: {reason}")]
    OptimizationFailed {
        /// Diagnostic reported by the optimizer
        reason: String,
        /// Number of outer iterations completed
        iterations: usize,
    },
}

impl OptimizerError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a LineSearchFailed error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
        }
    }

    /// Create an OptimizationFailed error.
    pub fn optimization_failed<S: Into<String>>(reason: S, iterations: usize) -> Self {
        Self::OptimizationFailed {
            reason: reason.into(),
            iterations,
        }
    }
}

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;
