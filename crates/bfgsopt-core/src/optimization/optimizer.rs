//! Optimizer traits and result types.
//!
//! Optimizers in this workspace are resumable: they expose a single
//! [`IterativeOptimizer::step`] that performs a bounded amount of work and
//! reports whether the run has terminated. Iteration budgets and wall-clock
//! limits are not part of an optimizer; they are layered on top by a driver
//! using a [`StoppingCriterion`], which produces an [`OptimizationResult`].
//!
//! # Termination Analysis
//!
//! - **Converged**: the optimizer's own convergence test passed
//! - **LineSearchFailed**: the line search gave up; its message is kept
//! - **Failed**: the optimizer stopped on its own for another reason, such
//!   as finding no descent direction
//! - **MaxIterations** / **MaxTime** / **MaxFunctionEvaluations**: the
//!   caller's budget ran out first
//! - **TargetReached**: the objective dropped to the caller's target
//!
//! # Example
//!
//! ```rust
//! # use bfgsopt_core::prelude::*;
//! # use std::time::Duration;
//! let criterion = StoppingCriterion::<f64>::new()
//!     .with_max_iterations(200)
//!     .with_max_time(Duration::from_secs(5));
//! assert_eq!(criterion.max_iterations, Some(200));
//! ```

use crate::{
    error::{OptimizerError, OptimizerResult},
    types::{DVector, Scalar},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// An optimizer that can be driven one bounded step at a time.
pub trait IterativeOptimizer<T>: Debug
where
    T: Scalar,
{
    /// Returns a human-readable name identifying the optimization algorithm.
    fn name(&self) -> &str;

    /// Performs one unit of work.
    ///
    /// Returns `true` once the optimization has stopped, converged or not.
    /// Further calls after that keep returning `true` without doing work.
    fn step(&mut self) -> bool;

    /// True if the optimization stopped because it converged.
    fn is_converged(&self) -> bool;

    /// Diagnostic for a run that stopped without converging.
    fn failure_message(&self) -> Option<&str>;

    /// How the optimizer stopped by itself, `None` while it can still make
    /// progress.
    fn termination_reason(&self) -> Option<TerminationReason>;

    /// Best parameters found so far.
    fn parameters(&self) -> &DVector<T>;

    /// Objective value at [`parameters`](IterativeOptimizer::parameters).
    fn function_value(&self) -> T;

    /// Number of outer iterations whose line search has finished.
    fn completed_iterations(&self) -> usize;

    /// Function and gradient evaluations performed so far, if tracked.
    fn evaluation_counts(&self) -> Option<(usize, usize)> {
        None
    }
}

/// Reasons for the end of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// The optimizer's convergence test passed
    Converged,
    /// Maximum iteration count exhausted without convergence
    MaxIterations,
    /// Wall-clock time limit exceeded
    MaxTime,
    /// Maximum number of function evaluations exceeded
    MaxFunctionEvaluations,
    /// The objective reached the caller's target value
    TargetReached,
    /// Line search failed to find a step satisfying its conditions
    LineSearchFailed,
    /// The optimizer stopped without converging for any other reason
    Failed,
}

/// Outcome of a driven optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T>
where
    T: Scalar,
{
    /// The final parameters
    pub point: DVector<T>,

    /// The objective function value at the final parameters
    pub value: T,

    /// Total number of outer iterations performed
    pub iterations: usize,

    /// Total number of objective function evaluations, when known
    pub function_evaluations: Option<usize>,

    /// Total number of gradient evaluations, when known
    pub gradient_evaluations: Option<usize>,

    /// Wall-clock time spent stepping the optimizer
    pub duration: Duration,

    /// Why the run ended
    pub termination_reason: TerminationReason,

    /// Diagnostic carried over from the optimizer on failure
    pub message: Option<String>,

    /// True if the optimizer's convergence test passed
    pub converged: bool,
}

impl<T> OptimizationResult<T>
where
    T: Scalar,
{
    /// Creates a new optimization result.
    pub fn new(
        point: DVector<T>,
        value: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            point,
            value,
            iterations,
            function_evaluations: None,
            gradient_evaluations: None,
            duration,
            termination_reason,
            message: None,
            converged: termination_reason == TerminationReason::Converged,
        }
    }

    /// Sets the diagnostic message.
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    /// Sets the function evaluation count.
    pub fn with_function_evaluations(mut self, count: usize) -> Self {
        self.function_evaluations = Some(count);
        self
    }

    /// Sets the gradient evaluation count.
    pub fn with_gradient_evaluations(mut self, count: usize) -> Self {
        self.gradient_evaluations = Some(count);
        self
    }

    /// Turns an optimizer failure into an error, keeping every other
    /// outcome (including exhausted budgets) as `Ok`.
    pub fn into_result(self) -> OptimizerResult<Self> {
        match self.termination_reason {
            TerminationReason::LineSearchFailed => Err(OptimizerError::line_search_failed(
                self.message.unwrap_or_else(|| "line search failed".to_string()),
                self.iterations,
                f64::NAN,
            )),
            TerminationReason::Failed => Err(OptimizerError::optimization_failed(
                self.message.unwrap_or_else(|| "optimizer failed".to_string()),
                self.iterations,
            )),
            _ => Ok(self),
        }
    }
}

/// Caller-side limits for driving an [`IterativeOptimizer`].
///
/// Convergence itself is decided by the optimizer; these limits only cap
/// how long the caller is willing to keep stepping it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoppingCriterion<T>
where
    T: Scalar,
{
    /// Maximum number of outer optimization iterations
    pub max_iterations: Option<usize>,

    /// Maximum wall-clock time for the optimization process
    pub max_time: Option<Duration>,

    /// Maximum number of objective function evaluations
    pub max_function_evaluations: Option<usize>,

    /// Stop as soon as the objective drops to this value
    pub target_value: Option<T>,
}

impl<T> Default for StoppingCriterion<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            max_iterations: Some(1000),
            max_time: None,
            max_function_evaluations: None,
            target_value: None,
        }
    }
}

impl<T> StoppingCriterion<T>
where
    T: Scalar,
{
    /// Creates a new stopping criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A criterion with no limits at all.
    pub fn unbounded() -> Self {
        Self {
            max_iterations: None,
            ..Self::default()
        }
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = Some(max_iter);
        self
    }

    /// Sets the maximum optimization time.
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Sets the maximum number of function evaluations.
    pub fn with_max_function_evaluations(mut self, max_evals: usize) -> Self {
        self.max_function_evaluations = Some(max_evals);
        self
    }

    /// Sets the target objective value.
    pub fn with_target_value(mut self, target: T) -> Self {
        self.target_value = Some(target);
        self
    }

    /// Checks the limits against the progress so far.
    ///
    /// `function_evaluations` is only compared when the optimizer tracks it.
    pub fn check(
        &self,
        iterations: usize,
        elapsed: Duration,
        value: T,
        function_evaluations: Option<usize>,
    ) -> Option<TerminationReason> {
        if self.target_value.is_some_and(|target| value <= target) {
            return Some(TerminationReason::TargetReached);
        }
        if self.max_iterations.is_some_and(|max| iterations >= max) {
            return Some(TerminationReason::MaxIterations);
        }
        if let (Some(max), Some(count)) = (self.max_function_evaluations, function_evaluations) {
            if count >= max {
                return Some(TerminationReason::MaxFunctionEvaluations);
            }
        }
        if self.max_time.is_some_and(|max| elapsed >= max) {
            return Some(TerminationReason::MaxTime);
        }
        None
    }
}
