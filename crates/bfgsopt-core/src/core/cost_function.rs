//! Cost function interface for optimization algorithms.
//!
//! A [`CostFunction`] maps a parameter vector to a scalar. The gradient is
//! optional: when an implementation does not override
//! [`CostFunction::gradient`], a central finite-difference approximation is
//! used instead.
//!
//! Closures can be used directly through [`FnCost`] (value and gradient) or
//! [`NumericalCost`] (value only).

use crate::types::{constants, DMatrix, DVector, Scalar};
use num_traits::Float;
use std::fmt::{self, Debug};

/// Trait for scalar objective functions of N real parameters.
pub trait CostFunction<T>: Debug
where
    T: Scalar,
{
    /// Number of parameters N the function expects.
    fn num_parameters(&self) -> usize;

    /// Evaluates the cost function at a point.
    fn cost(&self, point: &DVector<T>) -> T;

    /// Writes the gradient at `point` into `gradient`.
    ///
    /// # Default Implementation
    ///
    /// Uses central finite differences, see [`CostFunction::gradient_fd`].
    fn gradient(&self, point: &DVector<T>, gradient: &mut DVector<T>) {
        self.gradient_fd(point, gradient);
    }

    /// Computes the gradient using central finite differences.
    ///
    /// The step for coordinate `i` is `cbrt(eps) * max(1, |x_i|)`, which
    /// balances truncation and round-off error for a central scheme.
    fn gradient_fd(&self, point: &DVector<T>, gradient: &mut DVector<T>) {
        let base = constants::finite_difference_step::<T>();
        let mut shifted = point.clone();

        for i in 0..point.len() {
            let xi = point[i];
            let h = base * Float::max(T::one(), Float::abs(xi));

            shifted[i] = xi + h;
            let f_plus = self.cost(&shifted);
            shifted[i] = xi - h;
            let f_minus = self.cost(&shifted);
            shifted[i] = xi;

            gradient[i] = (f_plus - f_minus) / (h + h);
        }
    }
}

/// A cost function built from a value closure and a gradient closure.
///
/// # Example
///
/// ```rust
/// use bfgsopt_core::prelude::*;
///
/// let cost = FnCost::new(
///     2,
///     |x: &DVector<f64>| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2),
///     |x: &DVector<f64>, g: &mut DVector<f64>| {
///         g[0] = 2.0 * (x[0] - 3.0);
///         g[1] = 2.0 * (x[1] + 1.0);
///     },
/// );
/// assert_eq!(cost.cost(&DVector::from_vec(vec![3.0, -1.0])), 0.0);
/// ```
pub struct FnCost<F, G> {
    n: usize,
    cost: F,
    gradient: G,
}

impl<F, G> FnCost<F, G> {
    /// Creates a cost function of `n` parameters from two closures.
    pub fn new(n: usize, cost: F, gradient: G) -> Self {
        Self { n, cost, gradient }
    }
}

impl<F, G> Debug for FnCost<F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCost").field("n", &self.n).finish_non_exhaustive()
    }
}

impl<T, F, G> CostFunction<T> for FnCost<F, G>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
    G: Fn(&DVector<T>, &mut DVector<T>),
{
    fn num_parameters(&self) -> usize {
        self.n
    }

    fn cost(&self, point: &DVector<T>) -> T {
        (self.cost)(point)
    }

    fn gradient(&self, point: &DVector<T>, gradient: &mut DVector<T>) {
        (self.gradient)(point, gradient);
    }
}

/// A cost function with no analytic gradient.
///
/// Gradients are approximated with [`CostFunction::gradient_fd`].
pub struct NumericalCost<F> {
    n: usize,
    cost: F,
}

impl<F> NumericalCost<F> {
    /// Creates a value-only cost function of `n` parameters.
    pub fn new(n: usize, cost: F) -> Self {
        Self { n, cost }
    }
}

impl<F> Debug for NumericalCost<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericalCost")
            .field("n", &self.n)
            .finish_non_exhaustive()
    }
}

impl<T, F> CostFunction<T> for NumericalCost<F>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
{
    fn num_parameters(&self) -> usize {
        self.n
    }

    fn cost(&self, point: &DVector<T>) -> T {
        (self.cost)(point)
    }
}

/// A quadratic cost function.
///
/// Computes f(x) = 0.5 * x^T * A * x + b^T * x + c. `A` is assumed
/// symmetric; when it is also positive definite the unique minimizer is
/// `-A^{-1} b`.
#[derive(Debug, Clone)]
pub struct QuadraticCost<T>
where
    T: Scalar,
{
    /// The quadratic form matrix (should be symmetric)
    pub a: DMatrix<T>,
    /// The linear term
    pub b: DVector<T>,
    /// The constant term
    pub c: T,
}

impl<T> QuadraticCost<T>
where
    T: Scalar,
{
    /// Creates a new quadratic cost function.
    pub fn new(a: DMatrix<T>, b: DVector<T>, c: T) -> Self {
        Self { a, b, c }
    }

    /// Creates a simple quadratic with identity matrix: f(x) = 0.5 * ||x||^2
    pub fn simple(n: usize) -> Self {
        Self {
            a: DMatrix::identity(n, n),
            b: DVector::zeros(n),
            c: T::zero(),
        }
    }
}

impl<T> CostFunction<T> for QuadraticCost<T>
where
    T: Scalar,
{
    fn num_parameters(&self) -> usize {
        self.b.len()
    }

    fn cost(&self, point: &DVector<T>) -> T {
        let ax = &self.a * point;
        <T as Scalar>::from_f64(0.5) * point.dot(&ax) + self.b.dot(point) + self.c
    }

    fn gradient(&self, point: &DVector<T>, gradient: &mut DVector<T>) {
        gradient.gemv(T::one(), &self.a, point, T::zero());
        *gradient += &self.b;
    }
}
