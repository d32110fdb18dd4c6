//! Resumable BFGS quasi-Newton optimizer.
//!
//! BFGS keeps a dense approximation `B` of the inverse Hessian and refines it
//! after every line search with the rank-2 update in [`crate::equations`].
//! Each outer iteration searches along `d = -B g` with a line search that
//! should satisfy the strong Wolfe conditions, since those keep `B` positive
//! definite.
//!
//! # Algorithm Overview
//!
//! The optimizer is an explicit two-phase state machine, advanced one phase
//! at a time by [`QuasiNewtonBfgs::step`]:
//!
//! ```text
//! ComputingDirection:
//!     g_new = ∇f(x);  y = g_new - g;  g = g_new
//!     if k > 0: update B with (s, y)
//!     d = -B g
//!     if gᵀd >= 0: B = max|B_ii| I;  d = -B g
//!     seed the line search on [0, (f_min - f) / (gtol gᵀd)]
//!     k += 1
//!
//! LineSearching:
//!     one line search iteration
//!     on success: s = α d;  x += s;  test convergence
//! ```
//!
//! ## Convergence
//!
//! The run stops successfully when either test passes for the step just
//! taken:
//! - **Absolute**: `|f_new - f| <= abs_tol` and `α |gᵀd| <= abs_tol`
//! - **Relative**: `|f_new - f| <= rel_tol |f|` and `α |gᵀd| <= rel_tol |f|`
//!
//! A line search that gives up ends the run without convergence and its
//! message becomes [`QuasiNewtonBfgs::failure_message`].
//!
//! # References
//!
//! - Nocedal & Wright, "Numerical Optimization" (2006), chapter 6

use crate::equations;
use bfgsopt_core::{
    error::{OptimizerError, OptimizerResult},
    line_function::GradientLineFunction,
    line_search::LineSearch,
    optimizer::{IterativeOptimizer, TerminationReason},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Configuration for the BFGS optimizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuasiNewtonConfig<T>
where
    T: Scalar,
{
    /// Lower bound on the objective, used to cap the line search interval
    pub func_min_value: T,

    /// Slope coefficient of the Wolfe bound on the step, in (0, 1]
    pub gtol: T,

    /// Relative convergence tolerance (non-negative)
    pub relative_error_tol: T,

    /// Absolute convergence tolerance (non-negative)
    pub absolute_error_tol: T,

    /// First trial step of every line search
    pub initial_step: T,

    /// Rescale the identity start by `yᵀs / yᵀy` before the first update
    pub initial_hessian_scaling: bool,
}

impl<T> Default for QuasiNewtonConfig<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            func_min_value: <T as Float>::neg_infinity(),
            gtol: <T as Scalar>::from_f64(0.9),
            relative_error_tol: T::DEFAULT_TOLERANCE,
            absolute_error_tol: T::DEFAULT_TOLERANCE,
            initial_step: T::one(),
            initial_hessian_scaling: false,
        }
    }
}

impl<T> QuasiNewtonConfig<T>
where
    T: Scalar,
{
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the known lower bound of the objective.
    pub fn with_func_min_value(mut self, value: T) -> Self {
        self.func_min_value = value;
        self
    }

    /// Sets the Wolfe slope coefficient.
    pub fn with_gtol(mut self, gtol: T) -> Self {
        self.gtol = gtol;
        self
    }

    /// Sets the relative convergence tolerance.
    pub fn with_relative_tolerance(mut self, tol: T) -> Self {
        self.relative_error_tol = tol;
        self
    }

    /// Sets the absolute convergence tolerance.
    pub fn with_absolute_tolerance(mut self, tol: T) -> Self {
        self.absolute_error_tol = tol;
        self
    }

    /// Sets the first trial step of each line search.
    pub fn with_initial_step(mut self, step: T) -> Self {
        self.initial_step = step;
        self
    }

    /// Enables or disables rescaling of the identity start.
    pub fn with_initial_hessian_scaling(mut self, enabled: bool) -> Self {
        self.initial_hessian_scaling = enabled;
        self
    }

    /// Checks every parameter.
    ///
    /// # Errors
    ///
    /// Returns `OptimizerError::InvalidConfiguration` if:
    /// - a tolerance is negative or NaN
    /// - `gtol` is outside (0, 1]
    /// - the initial step is not positive and finite
    /// - `func_min_value` is NaN
    pub fn validate(&self) -> OptimizerResult<()> {
        if !(self.relative_error_tol >= T::zero()) {
            return Err(invalid(
                "relative error tolerance must be non-negative",
                "relative_error_tol",
                self.relative_error_tol,
            ));
        }
        if !(self.absolute_error_tol >= T::zero()) {
            return Err(invalid(
                "absolute error tolerance must be non-negative",
                "absolute_error_tol",
                self.absolute_error_tol,
            ));
        }
        if !(self.gtol > T::zero() && self.gtol <= T::one()) {
            return Err(invalid("gtol must be in (0, 1]", "gtol", self.gtol));
        }
        if !(self.initial_step > T::zero() && Float::is_finite(self.initial_step)) {
            return Err(invalid(
                "initial step must be positive and finite",
                "initial_step",
                self.initial_step,
            ));
        }
        if Float::is_nan(self.func_min_value) {
            return Err(invalid(
                "minimum function value must not be NaN",
                "func_min_value",
                self.func_min_value,
            ));
        }
        Ok(())
    }
}

fn invalid<T: Scalar>(reason: &str, parameter: &str, value: T) -> OptimizerError {
    OptimizerError::invalid_configuration(reason, parameter, value.to_string())
}

/// The two phases of an outer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    /// Next step computes a search direction and seeds the line search
    ComputingDirection,
    /// Next step advances the line search
    LineSearching,
}

/// BFGS quasi-Newton optimizer driven one phase per [`step`](Self::step).
///
/// The optimizer owns the objective `F` and the line search `L`, and
/// pre-allocates every vector and matrix it needs at construction, so
/// stepping never allocates.
///
/// # Example
///
/// ```rust
/// use bfgsopt_core::prelude::*;
/// use bfgsopt_optim::QuasiNewtonBfgs;
///
/// let cost = FnCost::new(
///     2,
///     |x: &DVector<f64>| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2),
///     |x: &DVector<f64>, g: &mut DVector<f64>| {
///         g[0] = 2.0 * (x[0] - 3.0);
///         g[1] = 2.0 * (x[1] + 1.0);
///     },
/// );
/// let mut optimizer = QuasiNewtonBfgs::new(
///     CostLineFunction::new(cost),
///     StrongWolfeLineSearch::new(),
///     f64::NEG_INFINITY,
///     0.9,
///     1e-10,
///     1e-10,
/// )?;
///
/// optimizer.initialize(&DVector::zeros(2))?;
/// while !optimizer.step() {}
///
/// assert!(optimizer.is_converged());
/// assert!((optimizer.parameters()[0] - 3.0).abs() < 1e-6);
/// assert!((optimizer.parameters()[1] + 1.0).abs() < 1e-6);
/// # Ok::<(), OptimizerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct QuasiNewtonBfgs<T, F, L>
where
    T: Scalar,
    F: GradientLineFunction<T>,
    L: LineSearch<T>,
{
    function: F,
    line_search: L,
    config: QuasiNewtonConfig<T>,

    /// Inverse Hessian approximation
    inverse_hessian: DMatrix<T>,
    /// Supplied start for the next `initialize`
    initial_inverse_hessian: Option<DMatrix<T>>,
    scale_on_first_update: bool,

    x: DVector<T>,
    gradient: DVector<T>,
    direction: DVector<T>,
    /// x_{k+1} - x_k
    s: DVector<T>,
    /// g_{k+1} - g_k
    y: DVector<T>,
    scratch_gradient: DVector<T>,
    scratch_update: DVector<T>,

    fx: T,
    deriv_at_zero: T,
    phase: Phase,
    iterations: usize,
    /// Set once the run has stopped
    outcome: Option<TerminationReason>,
    message: Option<String>,
}

impl<T, F, L> QuasiNewtonBfgs<T, F, L>
where
    T: Scalar,
    F: GradientLineFunction<T>,
    L: LineSearch<T>,
{
    /// Creates an optimizer from the individual settings.
    ///
    /// # Arguments
    ///
    /// * `function` - Objective being minimized
    /// * `line_search` - Line search that selects steps meeting the Wolfe conditions
    /// * `func_min_value` - Minimum possible function value, `-inf` if unknown
    /// * `gtol` - Slope coefficient for the Wolfe bound, 0 < gtol <= 1
    /// * `relative_error_tol` - Relative error termination condition, >= 0
    /// * `absolute_error_tol` - Absolute error termination condition, >= 0
    pub fn new(
        function: F,
        line_search: L,
        func_min_value: T,
        gtol: T,
        relative_error_tol: T,
        absolute_error_tol: T,
    ) -> OptimizerResult<Self> {
        let config = QuasiNewtonConfig::new()
            .with_func_min_value(func_min_value)
            .with_gtol(gtol)
            .with_relative_tolerance(relative_error_tol)
            .with_absolute_tolerance(absolute_error_tol);
        Self::with_config(function, line_search, config)
    }

    /// Creates an optimizer from a validated configuration.
    pub fn with_config(
        function: F,
        line_search: L,
        config: QuasiNewtonConfig<T>,
    ) -> OptimizerResult<Self> {
        config.validate()?;
        let n = function.dimension();

        Ok(Self {
            function,
            line_search,
            config,
            inverse_hessian: DMatrix::identity(n, n),
            initial_inverse_hessian: None,
            scale_on_first_update: false,
            x: DVector::zeros(n),
            gradient: DVector::zeros(n),
            direction: DVector::zeros(n),
            s: DVector::zeros(n),
            y: DVector::zeros(n),
            scratch_gradient: DVector::zeros(n),
            scratch_update: DVector::zeros(n),
            fx: <T as Float>::nan(),
            deriv_at_zero: T::zero(),
            phase: Phase::ComputingDirection,
            iterations: 0,
            outcome: Some(TerminationReason::Failed),
            message: Some("optimizer has not been initialized".to_string()),
        })
    }

    /// Number of parameters N.
    pub fn dimension(&self) -> usize {
        self.x.len()
    }

    /// Supplies the inverse Hessian approximation used by the next
    /// [`initialize`](Self::initialize) instead of the identity.
    pub fn set_initial_inverse_hessian(&mut self, matrix: DMatrix<T>) -> OptimizerResult<()> {
        let n = self.dimension();
        if matrix.shape() != (n, n) {
            return Err(OptimizerError::dimension_mismatch(
                format!("{n}x{n}"),
                format!("{}x{}", matrix.nrows(), matrix.ncols()),
            ));
        }
        self.initial_inverse_hessian = Some(matrix);
        Ok(())
    }

    /// Starts a new run from `starting_point`, discarding all previous state.
    ///
    /// Evaluates the objective at the starting point; the gradient is only
    /// computed by the first [`step`](Self::step).
    pub fn initialize(&mut self, starting_point: &DVector<T>) -> OptimizerResult<()> {
        if starting_point.len() != self.dimension() {
            return Err(OptimizerError::dimension_mismatch(
                self.dimension(),
                starting_point.len(),
            ));
        }

        self.phase = Phase::ComputingDirection;
        self.outcome = None;
        self.message = None;
        self.iterations = 0;
        self.deriv_at_zero = T::zero();

        self.s.fill(T::zero());
        self.y.fill(T::zero());
        self.gradient.fill(T::zero());
        self.direction.fill(T::zero());

        match self.initial_inverse_hessian.take() {
            Some(matrix) => {
                self.inverse_hessian = matrix;
                self.scale_on_first_update = false;
            }
            None => {
                self.inverse_hessian.fill_with_identity();
                self.scale_on_first_update = self.config.initial_hessian_scaling;
            }
        }

        self.x.copy_from(starting_point);
        self.function.set_input(&self.x);
        self.fx = self.function.compute_function();
        Ok(())
    }

    /// Performs one phase of work.
    ///
    /// Returns `true` if the optimization has stopped, converged or not.
    /// Once stopped, further calls return `true` without doing anything.
    pub fn step(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        match self.phase {
            Phase::ComputingDirection => self.compute_search_direction(),
            Phase::LineSearching => self.perform_line_search(),
        }
    }

    fn compute_search_direction(&mut self) -> bool {
        if self.fx <= self.config.func_min_value {
            log::info!("[BFGS] reached the minimum function value {}", self.config.func_min_value);
            return self.terminate(TerminationReason::Converged, None);
        }

        self.function.set_input(&self.x);
        self.function.compute_gradient(&mut self.scratch_gradient);

        self.y.copy_from(&self.scratch_gradient);
        self.y -= &self.gradient;
        std::mem::swap(&mut self.gradient, &mut self.scratch_gradient);

        if self.iterations != 0 {
            self.update_inverse_hessian();
        }

        self.update_direction();
        if !self.setup_line_search() {
            if self.gradient.iter().all(|g| *g == T::zero()) {
                log::info!("[BFGS] gradient vanished after {} iterations", self.iterations);
                return self.terminate(TerminationReason::Converged, None);
            }

            // B is no longer positive definite
            let scale = equations::reset_to_diagonal(&mut self.inverse_hessian);
            log::warn!(
                "[BFGS] search direction is not a descent direction (derivative {}), \
                 resetting inverse Hessian to {} * I",
                self.deriv_at_zero,
                scale
            );
            self.update_direction();
            if !self.setup_line_search() {
                let message = format!(
                    "no descent direction after reset, directional derivative is {}",
                    self.deriv_at_zero
                );
                return self.terminate(TerminationReason::Failed, Some(message));
            }
        }

        self.phase = Phase::LineSearching;
        self.iterations += 1;
        false
    }

    fn update_inverse_hessian(&mut self) {
        if self.scale_on_first_update {
            self.scale_on_first_update = false;
            if let Some(scale) = equations::scale_to_curvature(&mut self.inverse_hessian, &self.s, &self.y) {
                log::debug!("[BFGS] scaled initial inverse Hessian by {}", scale);
            }
        }

        if !equations::inverse_update(
            &mut self.inverse_hessian,
            &self.s,
            &self.y,
            &mut self.scratch_update,
        ) {
            log::debug!(
                "[BFGS] skipped inverse Hessian update at iteration {}, curvature yᵀs = {}",
                self.iterations,
                self.y.dot(&self.s)
            );
        }
    }

    fn update_direction(&mut self) {
        self.direction
            .gemv(-T::one(), &self.inverse_hessian, &self.gradient, T::zero());
    }

    /// Seeds the line search along the current direction.
    ///
    /// Returns `false` without touching the line search if the direction is
    /// not a descent direction.
    fn setup_line_search(&mut self) -> bool {
        self.deriv_at_zero = self.gradient.dot(&self.direction);
        if !(self.deriv_at_zero < T::zero()) {
            return false;
        }

        self.function.set_line(&self.x, &self.direction);

        let max_step = (self.config.func_min_value - self.fx) / (self.config.gtol * self.deriv_at_zero);
        let initial_step = Float::min(self.config.initial_step, max_step);
        self.function.set_step(initial_step);
        let f_init = self.function.compute_function();

        self.line_search.init(
            self.fx,
            self.deriv_at_zero,
            f_init,
            initial_step,
            T::zero(),
            max_step,
        );
        true
    }

    fn perform_line_search(&mut self) -> bool {
        if !self.line_search.iterate(&mut self.function) {
            return false;
        }

        if !self.line_search.is_converged() {
            let message = self
                .line_search
                .failure_message()
                .unwrap_or("line search terminated without converging")
                .to_string();
            return self.terminate(TerminationReason::LineSearchFailed, Some(message));
        }

        let step = self.line_search.step();
        self.s.copy_from(&self.direction);
        self.s *= step;
        self.x += &self.s;

        let f_new = self.line_search.function_value();
        let actual = Float::abs(f_new - self.fx);
        let predicted = step * Float::abs(self.deriv_at_zero);
        let previous = self.fx;
        self.fx = f_new;

        log::debug!(
            "[BFGS] iteration {}: f = {}, step = {}, predicted decrease = {}",
            self.iterations,
            f_new,
            step,
            predicted
        );

        let absolute_tol = self.config.absolute_error_tol;
        if actual <= absolute_tol && predicted <= absolute_tol {
            return self.terminate(TerminationReason::Converged, None);
        }

        let relative_tol = self.config.relative_error_tol * Float::abs(previous);
        if actual <= relative_tol && predicted <= relative_tol {
            return self.terminate(TerminationReason::Converged, None);
        }

        self.phase = Phase::ComputingDirection;
        false
    }

    fn terminate(&mut self, reason: TerminationReason, message: Option<String>) -> bool {
        match &message {
            None => log::info!(
                "[BFGS] converged after {} iterations, f = {}",
                self.iterations,
                self.fx
            ),
            Some(text) => log::info!(
                "[BFGS] stopped after {} iterations without converging: {}",
                self.iterations,
                text
            ),
        }
        self.outcome = Some(reason);
        self.message = message;
        true
    }

    /// The current parameters, a live view of the optimizer's iterate.
    pub fn parameters(&self) -> &DVector<T> {
        &self.x
    }

    /// Mutable access to the current iterate.
    ///
    /// Changing it between steps does not refresh the cached function value.
    pub fn parameters_mut(&mut self) -> &mut DVector<T> {
        &mut self.x
    }

    /// True if the run stopped because a convergence test passed.
    pub fn is_converged(&self) -> bool {
        self.outcome == Some(TerminationReason::Converged)
    }

    /// Why the run stopped without converging, `None` otherwise.
    pub fn failure_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// True once [`step`](Self::step) has returned `true`.
    pub fn is_terminated(&self) -> bool {
        self.outcome.is_some()
    }

    /// How the run ended, `None` while it is still going.
    ///
    /// [`TerminationReason::LineSearchFailed`] is reserved for runs the line
    /// search gave up on; every other failure, including stepping an
    /// uninitialized optimizer, is [`TerminationReason::Failed`].
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.outcome
    }

    /// Objective value at the current parameters.
    pub fn function_value(&self) -> T {
        self.fx
    }

    /// Gradient from the most recent direction computation.
    pub fn gradient(&self) -> &DVector<T> {
        &self.gradient
    }

    /// Current inverse Hessian approximation `B`.
    pub fn inverse_hessian(&self) -> &DMatrix<T> {
        &self.inverse_hessian
    }

    /// Last search direction, `-B g`.
    pub fn search_direction(&self) -> &DVector<T> {
        &self.direction
    }

    /// Derivative along the search direction at step zero.
    pub fn directional_derivative(&self) -> T {
        self.deriv_at_zero
    }

    /// Outer iterations started since [`initialize`](Self::initialize).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Phase the next [`step`](Self::step) will run.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The configuration in use.
    pub fn config(&self) -> &QuasiNewtonConfig<T> {
        &self.config
    }

    /// The line search delegate.
    pub fn line_search(&self) -> &L {
        &self.line_search
    }

    /// The objective.
    pub fn function(&self) -> &F {
        &self.function
    }

    /// Releases the objective and the line search.
    pub fn into_parts(self) -> (F, L) {
        (self.function, self.line_search)
    }
}

impl<T, F, L> IterativeOptimizer<T> for QuasiNewtonBfgs<T, F, L>
where
    T: Scalar,
    F: GradientLineFunction<T> + Debug,
    L: LineSearch<T>,
{
    fn name(&self) -> &str {
        "BFGS"
    }

    fn step(&mut self) -> bool {
        QuasiNewtonBfgs::step(self)
    }

    fn is_converged(&self) -> bool {
        QuasiNewtonBfgs::is_converged(self)
    }

    fn failure_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn termination_reason(&self) -> Option<TerminationReason> {
        self.outcome
    }

    fn parameters(&self) -> &DVector<T> {
        &self.x
    }

    fn function_value(&self) -> T {
        self.fx
    }

    fn completed_iterations(&self) -> usize {
        if self.phase == Phase::LineSearching && !self.is_converged() {
            self.iterations - 1
        } else {
            self.iterations
        }
    }

    fn evaluation_counts(&self) -> Option<(usize, usize)> {
        self.function.evaluation_counts()
    }
}
