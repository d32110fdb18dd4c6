//! Blocking driver for resumable optimizers.
//!
//! [`QuasiNewtonBfgs`](crate::QuasiNewtonBfgs) never bounds its own work.
//! [`Minimizer`] steps any [`IterativeOptimizer`] until it terminates or a
//! [`StoppingCriterion`] limit is hit, and packages the outcome as an
//! [`OptimizationResult`].

use bfgsopt_core::{
    optimizer::{IterativeOptimizer, OptimizationResult, StoppingCriterion, TerminationReason},
    types::Scalar,
};
use std::time::Instant;

/// Runs an optimizer to completion under caller-side limits.
///
/// # Example
///
/// ```rust
/// use bfgsopt_core::prelude::*;
/// use bfgsopt_optim::{Minimizer, QuasiNewtonBfgs, QuasiNewtonConfig};
///
/// let cost = QuadraticCost::new(
///     DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]),
///     DVector::from_vec(vec![-1.0, 4.0]),
///     0.0,
/// );
/// let mut optimizer = QuasiNewtonBfgs::with_config(
///     CostLineFunction::new(cost),
///     StrongWolfeLineSearch::new(),
///     QuasiNewtonConfig::new(),
/// )?;
/// optimizer.initialize(&DVector::from_vec(vec![5.0, 5.0]))?;
///
/// let minimizer = Minimizer::new(StoppingCriterion::new().with_max_iterations(100));
/// let result = minimizer.run(&mut optimizer);
///
/// assert!(result.converged);
/// assert!(result.function_evaluations.is_some());
/// # Ok::<(), OptimizerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Minimizer<T>
where
    T: Scalar,
{
    criterion: StoppingCriterion<T>,
}

impl<T> Minimizer<T>
where
    T: Scalar,
{
    /// Creates a driver enforcing `criterion`.
    pub fn new(criterion: StoppingCriterion<T>) -> Self {
        Self { criterion }
    }

    /// The limits in use.
    pub fn criterion(&self) -> &StoppingCriterion<T> {
        &self.criterion
    }

    /// Steps `optimizer` until it stops or a limit is reached.
    ///
    /// The optimizer must already be initialized. Running out of budget is
    /// reported through [`OptimizationResult::termination_reason`], not as an
    /// error, and the optimizer can be stepped further afterwards.
    pub fn run<O>(&self, optimizer: &mut O) -> OptimizationResult<T>
    where
        O: IterativeOptimizer<T> + ?Sized,
    {
        let start = Instant::now();

        let reason = loop {
            if optimizer.step() {
                break optimizer.termination_reason().unwrap_or(if optimizer.is_converged() {
                    TerminationReason::Converged
                } else {
                    TerminationReason::Failed
                });
            }

            let function_evaluations = optimizer.evaluation_counts().map(|(f, _)| f);
            if let Some(reason) = self.criterion.check(
                optimizer.completed_iterations(),
                start.elapsed(),
                optimizer.function_value(),
                function_evaluations,
            ) {
                log::info!(
                    "[{}] stopped by the caller's limits: {:?} after {} iterations",
                    optimizer.name(),
                    reason,
                    optimizer.completed_iterations()
                );
                break reason;
            }
        };

        let mut result = OptimizationResult::new(
            optimizer.parameters().clone(),
            optimizer.function_value(),
            optimizer.completed_iterations(),
            start.elapsed(),
            reason,
        );
        if matches!(
            reason,
            TerminationReason::LineSearchFailed | TerminationReason::Failed
        ) {
            result = result.with_message(optimizer.failure_message().map(str::to_string));
        }
        if let Some((function_evaluations, gradient_evaluations)) = optimizer.evaluation_counts() {
            result = result
                .with_function_evaluations(function_evaluations)
                .with_gradient_evaluations(gradient_evaluations);
        }
        result
    }
}

impl<T> Default for Minimizer<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self::new(StoppingCriterion::default())
    }
}
