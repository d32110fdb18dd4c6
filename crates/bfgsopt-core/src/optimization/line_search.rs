//! Line search algorithms for quasi-Newton optimization.
//!
//! A line search minimizes, approximately, the 1-D function
//! φ(α) = f(x + α d) along a descent direction d. The optimizer seeds it
//! once per outer iteration with [`LineSearch::init`] and then drives it
//! with repeated [`LineSearch::iterate`] calls, each of which evaluates at
//! most one trial step. This keeps the whole optimization resumable.
//!
//! # Conditions
//!
//! **Armijo (sufficient decrease)**: φ(α) ≤ φ(0) + c₁ α φ'(0)
//!
//! **Strong curvature**: |φ'(α)| ≤ c₂ |φ'(0)|
//!
//! with 0 < c₁ < c₂ < 1. The strong Wolfe conditions (both together) keep
//! the BFGS inverse Hessian approximation positive definite, which is why
//! [`StrongWolfeLineSearch`] is the natural partner of the BFGS optimizer.
//! [`BacktrackingLineSearch`] only enforces the Armijo condition.
//!
//! # Example
//!
//! ```rust
//! use bfgsopt_core::prelude::*;
//!
//! // φ(α) = (α - 2)^2 along the first axis, starting at the origin
//! let mut function = CostLineFunction::new(QuadraticCost::<f64>::new(
//!     DMatrix::from_element(1, 1, 2.0),
//!     DVector::from_element(1, -4.0),
//!     4.0,
//! ));
//! function.set_line(&DVector::zeros(1), &DVector::from_element(1, 1.0));
//! function.set_step(1.0);
//! let f_init = function.compute_function();
//!
//! // a small c₂ asks for a nearly exact minimizer of φ
//! let params = LineSearchParams { c2: 0.1, ..LineSearchParams::<f64>::default() };
//! let mut search = StrongWolfeLineSearch::with_params(params)?;
//! search.init(4.0, -4.0, f_init, 1.0, 0.0, 10.0);
//! while !search.iterate(&mut function) {}
//!
//! assert!(search.is_converged());
//! assert!((search.step() - 2.0).abs() < 1e-6);
//! # Ok::<(), bfgsopt_core::error::OptimizerError>(())
//! ```

use crate::{
    error::{OptimizerError, OptimizerResult},
    line_function::LineFunction,
    types::Scalar,
};
use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Tuning parameters shared by the line search implementations.
///
/// # Parameter Guidelines
///
/// ```rust
/// # use bfgsopt_core::prelude::*;
/// let params = LineSearchParams::<f64>::strong_wolfe(); // c₁ = 10⁻⁴, c₂ = 0.9
/// assert!(params.validate().is_ok());
///
/// let custom = LineSearchParams {
///     c2: 0.1,            // tighter curvature, closer to an exact search
///     max_iterations: 30,
///     ..LineSearchParams::<f64>::default()
/// };
/// assert!(custom.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSearchParams<T>
where
    T: Scalar,
{
    /// Armijo parameter c₁ ∈ (0,1) for the sufficient decrease condition
    pub c1: T,

    /// Wolfe parameter c₂ ∈ (c₁,1) for the strong curvature condition
    pub c2: T,

    /// Bracketing expansion: the next trial is α + expansion (α - α_prev)
    pub expansion: T,

    /// Fraction of the bracket width kept clear of its ends when interpolating
    pub safeguard: T,

    /// Relative bracket width below which the zoom phase stops
    pub step_tolerance: T,

    /// Minimum step size threshold before declaring line search failure
    pub min_step_size: T,

    /// Backtracking reduction factor ρ ∈ (0,1)
    pub rho: T,

    /// Maximum number of trial evaluations per search
    pub max_iterations: usize,
}

impl<T> Default for LineSearchParams<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            c1: <T as Scalar>::from_f64(1e-4),
            c2: <T as Scalar>::from_f64(0.9),
            expansion: <T as Scalar>::from_f64(9.0),
            safeguard: <T as Scalar>::from_f64(0.1),
            step_tolerance: <T as Scalar>::from_f64(1e-12),
            min_step_size: T::MIN_STEP_SIZE,
            rho: <T as Scalar>::from_f64(0.5),
            max_iterations: 50,
        }
    }
}

impl<T> LineSearchParams<T>
where
    T: Scalar,
{
    /// Validates line search parameters.
    ///
    /// # Errors
    ///
    /// Returns `OptimizerError::InvalidConfiguration` if:
    /// - Wolfe constants don't satisfy 0 < c₁ < c₂ < 1
    /// - Backtracking factor ρ ∉ (0, 1)
    /// - the expansion factor is not positive, or the safeguard ∉ [0, 0.5)
    /// - a step limit is not positive
    /// - Maximum iterations is zero
    pub fn validate(&self) -> OptimizerResult<()> {
        let zero = T::zero();
        let one = T::one();

        if !(self.c1 > zero && self.c1 < one) {
            return Err(invalid("Armijo constant c1 must be in (0, 1)", "c1", self.c1));
        }

        if !(self.c2 > self.c1 && self.c2 < one) {
            return Err(invalid("Wolfe constant c2 must satisfy c1 < c2 < 1", "c2", self.c2));
        }

        if !(self.rho > zero && self.rho < one) {
            return Err(invalid("Backtracking factor rho must be in (0, 1)", "rho", self.rho));
        }

        if !(self.expansion > zero) {
            return Err(invalid(
                "Expansion factor must be positive",
                "expansion",
                self.expansion,
            ));
        }

        if !(self.safeguard >= zero && self.safeguard < <T as Scalar>::from_f64(0.5)) {
            return Err(invalid(
                "Safeguard must be in [0, 0.5)",
                "safeguard",
                self.safeguard,
            ));
        }

        if !(self.step_tolerance > zero) {
            return Err(invalid(
                "Step tolerance must be positive",
                "step_tolerance",
                self.step_tolerance,
            ));
        }

        if !(self.min_step_size > zero) {
            return Err(invalid(
                "Minimum step size must be positive",
                "min_step_size",
                self.min_step_size,
            ));
        }

        if self.max_iterations == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Maximum iterations must be at least 1",
                "max_iterations",
                "0",
            ));
        }

        Ok(())
    }

    /// Parameters for strong Wolfe line search (c₁ = 10⁻⁴, c₂ = 0.9).
    ///
    /// The loose curvature constant suits quasi-Newton methods, whose unit
    /// step is usually acceptable close to the solution.
    pub fn strong_wolfe() -> Self {
        Self::default()
    }

    /// Parameters for backtracking line search.
    ///
    /// - c₁ = 10⁻⁴ (sufficient decrease)
    /// - ρ = 0.5 (halve step size each iteration)
    /// - max_iterations = 40
    pub fn backtracking() -> Self {
        Self {
            rho: <T as Scalar>::from_f64(0.5),
            max_iterations: 40,
            ..Self::default()
        }
    }
}

fn invalid<T: Scalar>(reason: &str, parameter: &str, value: T) -> OptimizerError {
    OptimizerError::invalid_configuration(reason, parameter, value.to_string())
}

/// Interface for resumable line searches.
///
/// # Protocol
///
/// 1. [`init`](LineSearch::init) with the value and derivative at step zero,
///    the value at the initial trial step, and the admissible step interval.
/// 2. [`iterate`](LineSearch::iterate) until it returns `true`. The function
///    passed in must already be parameterized along the search line.
/// 3. Inspect [`is_converged`](LineSearch::is_converged); on success read
///    [`step`](LineSearch::step) and [`function_value`](LineSearch::function_value),
///    otherwise [`failure_message`](LineSearch::failure_message).
pub trait LineSearch<T>: Debug
where
    T: Scalar,
{
    /// Starts a new search.
    ///
    /// # Arguments
    ///
    /// * `f_zero` - φ(0)
    /// * `deriv_zero` - φ'(0), negative for a descent direction
    /// * `f_init` - φ(`init_step`)
    /// * `init_step` - first trial step
    /// * `step_min` - smallest admissible step
    /// * `step_max` - largest admissible step
    fn init(&mut self, f_zero: T, deriv_zero: T, f_init: T, init_step: T, step_min: T, step_max: T);

    /// Performs one trial evaluation.
    ///
    /// Returns `true` once the search has terminated, successfully or not.
    fn iterate<F>(&mut self, function: &mut F) -> bool
    where
        F: LineFunction<T> + ?Sized;

    /// True if the search terminated on an acceptable step.
    fn is_converged(&self) -> bool;

    /// The accepted step.
    fn step(&self) -> T;

    /// φ at the accepted step.
    fn function_value(&self) -> T;

    /// Reason for failure, or None if there is none.
    fn failure_message(&self) -> Option<&str>;

    /// Returns a human-readable name identifying the line search algorithm.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample<T> {
    step: T,
    value: T,
    deriv: T,
}

impl<T: Scalar> Sample<T> {
    fn origin(value: T, deriv: T) -> Self {
        Self {
            step: T::zero(),
            value,
            deriv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WolfeStage {
    Bracketing,
    Zoom,
}

/// Line search satisfying the strong Wolfe conditions.
///
/// The implementation uses a bracketing and zoom approach (Nocedal & Wright,
/// Algorithms 3.5 and 3.6):
/// 1. **Bracketing**: expand the trial step until an interval containing an
///    acceptable step is found, or an acceptable step is hit directly.
/// 2. **Zoom**: shrink the interval with safeguarded cubic interpolation.
///
/// If the trial step reaches `step_max` while still satisfying sufficient
/// decrease and descending, `step_max` is accepted.
#[derive(Debug, Clone)]
pub struct StrongWolfeLineSearch<T>
where
    T: Scalar,
{
    params: LineSearchParams<T>,
    stage: WolfeStage,
    origin: Sample<T>,
    step_min: T,
    step_max: T,
    previous: Sample<T>,
    lo: Sample<T>,
    hi: Sample<T>,
    trial_step: T,
    trial_value: Option<T>,
    accepted: Sample<T>,
    iterations: usize,
    terminated: bool,
    converged: bool,
    message: Option<String>,
}

impl<T> StrongWolfeLineSearch<T>
where
    T: Scalar,
{
    /// Creates a strong Wolfe line search with default parameters.
    pub fn new() -> Self {
        Self::build(LineSearchParams::strong_wolfe())
    }

    /// Creates a strong Wolfe line search with custom parameters.
    pub fn with_params(params: LineSearchParams<T>) -> OptimizerResult<Self> {
        params.validate()?;
        Ok(Self::build(params))
    }

    fn build(params: LineSearchParams<T>) -> Self {
        let origin = Sample::origin(T::zero(), T::zero());
        Self {
            params,
            stage: WolfeStage::Bracketing,
            origin,
            step_min: T::zero(),
            step_max: T::zero(),
            previous: origin,
            lo: origin,
            hi: origin,
            trial_step: T::zero(),
            trial_value: None,
            accepted: origin,
            iterations: 0,
            terminated: true,
            converged: false,
            message: None,
        }
    }

    /// The parameters in use.
    pub fn params(&self) -> &LineSearchParams<T> {
        &self.params
    }

    /// Number of trial evaluations performed by the current search.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn armijo_bound(&self, step: T) -> T {
        self.origin.value + self.params.c1 * step * self.origin.deriv
    }

    fn curvature_met(&self, deriv: T) -> bool {
        Float::abs(deriv) <= -self.params.c2 * self.origin.deriv
    }

    fn accept(&mut self, sample: Sample<T>) -> bool {
        self.accepted = sample;
        self.converged = true;
        self.terminated = true;
        true
    }

    fn fail(&mut self, message: String) -> bool {
        log::debug!("[{}] {}", LineSearch::<T>::name(self), message);
        self.converged = false;
        self.terminated = true;
        self.message = Some(message);
        true
    }

    fn begin_zoom(&mut self, lo: Sample<T>, hi: Sample<T>) {
        self.stage = WolfeStage::Zoom;
        self.lo = lo;
        self.hi = hi;
        self.trial_step = self.interpolate();
    }

    /// Safeguarded minimizer of the cubic through both bracket ends.
    fn interpolate(&self) -> T {
        let (a, b) = if self.lo.step <= self.hi.step {
            (self.lo, self.hi)
        } else {
            (self.hi, self.lo)
        };
        let two = <T as Scalar>::from_f64(2.0);
        let width = b.step - a.step;
        let midpoint = a.step + width / two;

        let all_finite = [a.value, a.deriv, b.value, b.deriv]
            .iter()
            .all(|v| Float::is_finite(*v));
        if !all_finite || width <= T::zero() {
            return midpoint;
        }

        let three = <T as Scalar>::from_f64(3.0);
        let d1 = a.deriv + b.deriv - three * (b.value - a.value) / width;
        let d2_sq = d1 * d1 - a.deriv * b.deriv;
        if !(d2_sq >= T::zero()) {
            return midpoint;
        }
        let d2 = Float::sqrt(d2_sq);
        let candidate = b.step - width * (b.deriv + d2 - d1) / (b.deriv - a.deriv + two * d2);

        if !Float::is_finite(candidate) {
            return midpoint;
        }
        let margin = self.params.safeguard * width;
        Float::min(Float::max(candidate, a.step + margin), b.step - margin)
    }

    fn bracket_collapsed(&self) -> bool {
        let width = Float::abs(self.hi.step - self.lo.step);
        let scale = Float::max(Float::max(self.lo.step, self.hi.step), T::one());
        width <= self.params.step_tolerance * scale
    }

    fn iterate_bracketing<F>(&mut self, trial: Sample<T>, sufficient: bool, function: &mut F) -> bool
    where
        F: LineFunction<T> + ?Sized,
    {
        if !sufficient || (self.iterations > 1 && trial.value >= self.previous.value) {
            let hi = self.with_derivative(trial, function);
            self.begin_zoom(self.previous, hi);
            return false;
        }

        let trial = self.with_derivative(trial, function);
        if self.curvature_met(trial.deriv) {
            return self.accept(trial);
        }
        if trial.deriv >= T::zero() {
            self.begin_zoom(trial, self.previous);
            return false;
        }
        if trial.step >= self.step_max {
            log::debug!(
                "[{}] accepting upper step bound {}",
                LineSearch::<T>::name(self),
                trial.step
            );
            return self.accept(trial);
        }

        let next = trial.step + self.params.expansion * (trial.step - self.previous.step);
        self.previous = trial;
        self.trial_step = Float::min(next, self.step_max);
        false
    }

    fn iterate_zoom<F>(&mut self, trial: Sample<T>, sufficient: bool, function: &mut F) -> bool
    where
        F: LineFunction<T> + ?Sized,
    {
        if !sufficient || trial.value >= self.lo.value {
            self.hi = self.with_derivative(trial, function);
        } else {
            let trial = self.with_derivative(trial, function);
            if self.curvature_met(trial.deriv) {
                return self.accept(trial);
            }
            if trial.deriv * (self.hi.step - self.lo.step) >= T::zero() {
                self.hi = self.lo;
            }
            self.lo = trial;
        }

        if self.bracket_collapsed() {
            // lo always satisfies sufficient decrease; it only lacks curvature.
            if self.lo.step > self.step_min && self.lo.value < self.origin.value {
                return self.accept(self.lo);
            }
            return self.fail(format!(
                "bracket collapsed around step {} without decreasing the function",
                self.lo.step
            ));
        }

        self.trial_step = self.interpolate();
        false
    }

    fn with_derivative<F>(&self, mut sample: Sample<T>, function: &mut F) -> Sample<T>
    where
        F: LineFunction<T> + ?Sized,
    {
        sample.deriv = if Float::is_finite(sample.value) {
            function.compute_derivative()
        } else {
            <T as Float>::nan()
        };
        sample
    }
}

impl<T> Default for StrongWolfeLineSearch<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LineSearch<T> for StrongWolfeLineSearch<T>
where
    T: Scalar,
{
    fn init(&mut self, f_zero: T, deriv_zero: T, f_init: T, init_step: T, step_min: T, step_max: T) {
        self.origin = Sample::origin(f_zero, deriv_zero);
        self.previous = self.origin;
        self.lo = self.origin;
        self.hi = self.origin;
        self.accepted = self.origin;
        self.step_min = step_min;
        self.step_max = step_max;
        self.stage = WolfeStage::Bracketing;
        self.iterations = 0;
        self.terminated = false;
        self.converged = false;
        self.message = None;

        if init_step <= step_max {
            self.trial_step = init_step;
            self.trial_value = Some(f_init);
        } else {
            self.trial_step = step_max;
            self.trial_value = None;
        }

        if !(deriv_zero < T::zero()) {
            self.fail(format!("not a descent direction, derivative at zero is {deriv_zero}"));
        } else if !Float::is_finite(f_zero) {
            self.fail(format!("function value at zero is not finite: {f_zero}"));
        }
    }

    fn iterate<F>(&mut self, function: &mut F) -> bool
    where
        F: LineFunction<T> + ?Sized,
    {
        if self.terminated {
            return true;
        }
        if self.iterations >= self.params.max_iterations {
            return self.fail(format!(
                "no acceptable step after {} iterations",
                self.params.max_iterations
            ));
        }
        self.iterations += 1;

        let step = self.trial_step;
        function.set_step(step);
        let value = match self.trial_value.take() {
            Some(value) => value,
            None => function.compute_function(),
        };
        let sufficient = Float::is_finite(value) && value <= self.armijo_bound(step);
        let trial = Sample {
            step,
            value,
            deriv: <T as Float>::nan(),
        };

        match self.stage {
            WolfeStage::Bracketing => self.iterate_bracketing(trial, sufficient, function),
            WolfeStage::Zoom => self.iterate_zoom(trial, sufficient, function),
        }
    }

    fn is_converged(&self) -> bool {
        self.converged
    }

    fn step(&self) -> T {
        self.accepted.step
    }

    fn function_value(&self) -> T {
        self.accepted.value
    }

    fn failure_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn name(&self) -> &str {
        "StrongWolfe"
    }
}

/// Backtracking line search with the Armijo sufficient decrease condition.
///
/// Starting with the initial step α₀:
/// 1. **Test condition**: φ(α) ≤ φ(0) + c₁ α φ'(0)
/// 2. **If satisfied**: accept α
/// 3. **If not**: α ← ρα and repeat, failing once α < α_min
///
/// Cheaper than [`StrongWolfeLineSearch`] (no derivative evaluations) but it
/// does not enforce the curvature condition, so a BFGS optimizer driven by it
/// may need to reset its inverse Hessian more often.
#[derive(Debug, Clone)]
pub struct BacktrackingLineSearch<T>
where
    T: Scalar,
{
    params: LineSearchParams<T>,
    f_zero: T,
    deriv_zero: T,
    step_min: T,
    trial_step: T,
    trial_value: Option<T>,
    step: T,
    value: T,
    iterations: usize,
    terminated: bool,
    converged: bool,
    message: Option<String>,
}

impl<T> BacktrackingLineSearch<T>
where
    T: Scalar,
{
    /// Creates a new backtracking line search with default parameters.
    pub fn new() -> Self {
        Self::build(LineSearchParams::backtracking())
    }

    /// Creates a backtracking line search with custom parameters.
    pub fn with_params(params: LineSearchParams<T>) -> OptimizerResult<Self> {
        params.validate()?;
        Ok(Self::build(params))
    }

    fn build(params: LineSearchParams<T>) -> Self {
        Self {
            params,
            f_zero: T::zero(),
            deriv_zero: T::zero(),
            step_min: T::zero(),
            trial_step: T::zero(),
            trial_value: None,
            step: T::zero(),
            value: T::zero(),
            iterations: 0,
            terminated: true,
            converged: false,
            message: None,
        }
    }

    fn fail(&mut self, message: String) -> bool {
        log::debug!("[Backtracking] {}", message);
        self.terminated = true;
        self.converged = false;
        self.message = Some(message);
        true
    }
}

impl<T> Default for BacktrackingLineSearch<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LineSearch<T> for BacktrackingLineSearch<T>
where
    T: Scalar,
{
    fn init(&mut self, f_zero: T, deriv_zero: T, f_init: T, init_step: T, step_min: T, step_max: T) {
        self.f_zero = f_zero;
        self.deriv_zero = deriv_zero;
        self.step_min = Float::max(step_min, self.params.min_step_size);
        self.step = T::zero();
        self.value = f_zero;
        self.iterations = 0;
        self.terminated = false;
        self.converged = false;
        self.message = None;

        if init_step <= step_max {
            self.trial_step = init_step;
            self.trial_value = Some(f_init);
        } else {
            self.trial_step = step_max;
            self.trial_value = None;
        }

        if !(deriv_zero < T::zero()) {
            self.fail(format!("not a descent direction, derivative at zero is {deriv_zero}"));
        }
    }

    fn iterate<F>(&mut self, function: &mut F) -> bool
    where
        F: LineFunction<T> + ?Sized,
    {
        if self.terminated {
            return true;
        }
        if self.iterations >= self.params.max_iterations {
            return self.fail(format!(
                "Armijo condition not met after {} iterations",
                self.params.max_iterations
            ));
        }
        self.iterations += 1;

        let step = self.trial_step;
        function.set_step(step);
        let value = match self.trial_value.take() {
            Some(value) => value,
            None => function.compute_function(),
        };

        if Float::is_finite(value) && value <= self.f_zero + self.params.c1 * step * self.deriv_zero {
            self.step = step;
            self.value = value;
            self.converged = true;
            self.terminated = true;
            return true;
        }

        self.trial_step = step * self.params.rho;
        if self.trial_step < self.step_min {
            return self.fail(format!(
                "step size {} fell below the minimum {}",
                self.trial_step, self.step_min
            ));
        }
        false
    }

    fn is_converged(&self) -> bool {
        self.converged
    }

    fn step(&self) -> T {
        self.step
    }

    fn function_value(&self) -> T {
        self.value
    }

    fn failure_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn name(&self) -> &str {
        "Backtracking"
    }
}
