//! Evaluator contract consumed by the optimizer and its line search.
//!
//! The optimizer talks to the objective through [`GradientLineFunction`]:
//! it sets an N-dimensional input, asks for the value and gradient, and
//! reparameterizes the function along a ray `x(t) = start + t * direction`
//! so that the line search only ever sees the 1-D view [`LineFunction`].
//!
//! [`CostLineFunction`] implements the contract on top of any
//! [`CostFunction`], caching the value and gradient of the last point it was
//! positioned at and counting evaluations.

use crate::{
    cost_function::CostFunction,
    types::{DVector, Scalar},
};

/// A scalar function of a single step length along a line.
pub trait LineFunction<T>
where
    T: Scalar,
{
    /// Moves the current point to `start + step * direction`.
    fn set_step(&mut self, step: T);

    /// Function value at the current point.
    fn compute_function(&mut self) -> T;

    /// Derivative with respect to the step at the current point, i.e. the
    /// gradient dotted with the line direction.
    fn compute_derivative(&mut self) -> T;
}

/// An objective with a gradient that can also be viewed along a line.
///
/// `compute_function` and `compute_gradient` always refer to the point set
/// last, through either [`set_input`](GradientLineFunction::set_input) or
/// [`LineFunction::set_step`].
pub trait GradientLineFunction<T>: LineFunction<T>
where
    T: Scalar,
{
    /// Number of parameters N.
    fn dimension(&self) -> usize;

    /// Moves the current point to `point`.
    fn set_input(&mut self, point: &DVector<T>);

    /// Writes the gradient at the current point into `gradient`.
    fn compute_gradient(&mut self, gradient: &mut DVector<T>);

    /// Defines the line used by subsequent [`LineFunction::set_step`] calls.
    /// The current point is left unchanged.
    fn set_line(&mut self, start: &DVector<T>, direction: &DVector<T>);

    /// Function and gradient evaluations performed so far, if tracked.
    fn evaluation_counts(&self) -> Option<(usize, usize)> {
        None
    }
}

impl<T, F> LineFunction<T> for &mut F
where
    T: Scalar,
    F: LineFunction<T> + ?Sized,
{
    fn set_step(&mut self, step: T) {
        (**self).set_step(step);
    }

    fn compute_function(&mut self) -> T {
        (**self).compute_function()
    }

    fn compute_derivative(&mut self) -> T {
        (**self).compute_derivative()
    }
}

impl<T, F> GradientLineFunction<T> for &mut F
where
    T: Scalar,
    F: GradientLineFunction<T> + ?Sized,
{
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn set_input(&mut self, point: &DVector<T>) {
        (**self).set_input(point);
    }

    fn compute_gradient(&mut self, gradient: &mut DVector<T>) {
        (**self).compute_gradient(gradient);
    }

    fn set_line(&mut self, start: &DVector<T>, direction: &DVector<T>) {
        (**self).set_line(start, direction);
    }

    fn evaluation_counts(&self) -> Option<(usize, usize)> {
        (**self).evaluation_counts()
    }
}

/// Adapts a [`CostFunction`] to the [`GradientLineFunction`] contract.
///
/// A line search usually finishes on the step it accepts, so the gradient
/// the optimizer requests at the new iterate is normally already cached.
///
/// # Example
///
/// ```rust
/// use bfgsopt_core::prelude::*;
///
/// let mut function = CostLineFunction::new(QuadraticCost::<f64>::simple(2));
/// function.set_input(&DVector::from_vec(vec![1.0, 2.0]));
/// assert_eq!(function.compute_function(), 2.5);
///
/// function.set_line(
///     &DVector::from_vec(vec![1.0, 2.0]),
///     &DVector::from_vec(vec![-1.0, -2.0]),
/// );
/// function.set_step(1.0);
/// assert_eq!(function.compute_function(), 0.0);
/// assert_eq!(function.function_evaluations(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CostLineFunction<T, C>
where
    T: Scalar,
    C: CostFunction<T>,
{
    cost: C,
    point: DVector<T>,
    start: DVector<T>,
    direction: DVector<T>,
    candidate: DVector<T>,
    gradient: DVector<T>,
    value: Option<T>,
    gradient_valid: bool,
    function_evaluations: usize,
    gradient_evaluations: usize,
}

impl<T, C> CostLineFunction<T, C>
where
    T: Scalar,
    C: CostFunction<T>,
{
    /// Wraps `cost`, allocating buffers for its number of parameters.
    pub fn new(cost: C) -> Self {
        let n = cost.num_parameters();
        Self {
            cost,
            point: DVector::zeros(n),
            start: DVector::zeros(n),
            direction: DVector::zeros(n),
            candidate: DVector::zeros(n),
            gradient: DVector::zeros(n),
            value: None,
            gradient_valid: false,
            function_evaluations: 0,
            gradient_evaluations: 0,
        }
    }

    /// The wrapped cost function.
    pub fn cost(&self) -> &C {
        &self.cost
    }

    /// Unwraps the cost function.
    pub fn into_inner(self) -> C {
        self.cost
    }

    /// The point the function is currently positioned at.
    pub fn point(&self) -> &DVector<T> {
        &self.point
    }

    /// Number of calls made to [`CostFunction::cost`].
    pub fn function_evaluations(&self) -> usize {
        self.function_evaluations
    }

    /// Number of calls made to [`CostFunction::gradient`].
    pub fn gradient_evaluations(&self) -> usize {
        self.gradient_evaluations
    }

    /// Resets both evaluation counters to zero.
    pub fn reset_counters(&mut self) {
        self.function_evaluations = 0;
        self.gradient_evaluations = 0;
    }

    fn invalidate(&mut self) {
        self.value = None;
        self.gradient_valid = false;
    }

    fn ensure_gradient(&mut self) {
        if !self.gradient_valid {
            self.cost.gradient(&self.point, &mut self.gradient);
            self.gradient_evaluations += 1;
            self.gradient_valid = true;
        }
    }
}

impl<T, C> LineFunction<T> for CostLineFunction<T, C>
where
    T: Scalar,
    C: CostFunction<T>,
{
    fn set_step(&mut self, step: T) {
        self.candidate.copy_from(&self.start);
        self.candidate.axpy(step, &self.direction, T::one());

        if self.candidate != self.point {
            std::mem::swap(&mut self.point, &mut self.candidate);
            self.invalidate();
        }
    }

    fn compute_function(&mut self) -> T {
        if let Some(value) = self.value {
            return value;
        }
        let value = self.cost.cost(&self.point);
        self.function_evaluations += 1;
        self.value = Some(value);
        value
    }

    fn compute_derivative(&mut self) -> T {
        self.ensure_gradient();
        self.gradient.dot(&self.direction)
    }
}

impl<T, C> GradientLineFunction<T> for CostLineFunction<T, C>
where
    T: Scalar,
    C: CostFunction<T>,
{
    fn dimension(&self) -> usize {
        self.point.len()
    }

    fn set_input(&mut self, point: &DVector<T>) {
        if *point != self.point {
            self.point.copy_from(point);
            self.invalidate();
        }
    }

    fn compute_gradient(&mut self, gradient: &mut DVector<T>) {
        self.ensure_gradient();
        gradient.copy_from(&self.gradient);
    }

    fn set_line(&mut self, start: &DVector<T>, direction: &DVector<T>) {
        self.start.copy_from(start);
        self.direction.copy_from(direction);
    }

    fn evaluation_counts(&self) -> Option<(usize, usize)> {
        Some((self.function_evaluations, self.gradient_evaluations))
    }
}
