//! Standard objectives for unit tests, integration tests and benchmarks.

use crate::{
    cost_function::CostFunction,
    types::{DVector, Scalar},
};

/// The Rosenbrock function in N dimensions.
///
/// f(x) = sum_{i<N-1} [ a (x_{i+1} - x_i^2)^2 + (1 - x_i)^2 ], minimized at
/// the all-ones vector with value zero.
#[derive(Debug, Clone)]
pub struct Rosenbrock {
    dim: usize,
    a: f64,
}

impl Rosenbrock {
    /// The classic Rosenbrock valley with curvature factor 100.
    pub fn new(dim: usize) -> Self {
        Self { dim, a: 100.0 }
    }

    /// A Rosenbrock valley with a custom curvature factor.
    pub fn with_curvature(dim: usize, a: f64) -> Self {
        Self { dim, a }
    }

    /// The usual starting point (-1.2, 1, -1.2, 1, ...).
    pub fn standard_start<T: Scalar>(&self) -> DVector<T> {
        DVector::from_fn(self.dim, |i, _| {
            if i % 2 == 0 {
                <T as Scalar>::from_f64(-1.2)
            } else {
                T::one()
            }
        })
    }
}

impl<T: Scalar> CostFunction<T> for Rosenbrock {
    fn num_parameters(&self) -> usize {
        self.dim
    }

    fn cost(&self, x: &DVector<T>) -> T {
        let a = <T as Scalar>::from_f64(self.a);
        let mut total = T::zero();
        for i in 0..self.dim.saturating_sub(1) {
            let t1 = x[i + 1] - x[i] * x[i];
            let t2 = T::one() - x[i];
            total += a * t1 * t1 + t2 * t2;
        }
        total
    }

    fn gradient(&self, x: &DVector<T>, gradient: &mut DVector<T>) {
        let a = <T as Scalar>::from_f64(self.a);
        let two = <T as Scalar>::from_f64(2.0);
        gradient.fill(T::zero());
        for i in 0..self.dim.saturating_sub(1) {
            let t1 = x[i + 1] - x[i] * x[i];
            gradient[i] -= two * (T::one() - x[i]) + two * two * a * x[i] * t1;
            gradient[i + 1] += two * a * t1;
        }
    }
}

/// Sum of squared offsets, f(x) = sum_i w_i (x_i - c_i)^2.
#[derive(Debug, Clone)]
pub struct ShiftedQuadratic<T: Scalar> {
    /// Location of the minimum
    pub center: DVector<T>,
    /// Per-coordinate weights, all positive
    pub weights: DVector<T>,
}

impl<T: Scalar> ShiftedQuadratic<T> {
    /// Unit weights around `center`.
    pub fn new(center: DVector<T>) -> Self {
        let weights = DVector::from_element(center.len(), T::one());
        Self { center, weights }
    }

    /// Weighted bowl around `center`.
    pub fn with_weights(center: DVector<T>, weights: DVector<T>) -> Self {
        assert_eq!(center.len(), weights.len(), "center and weights differ in length");
        Self { center, weights }
    }
}

impl<T: Scalar> CostFunction<T> for ShiftedQuadratic<T> {
    fn num_parameters(&self) -> usize {
        self.center.len()
    }

    fn cost(&self, x: &DVector<T>) -> T {
        let mut total = T::zero();
        for i in 0..self.center.len() {
            let d = x[i] - self.center[i];
            total += self.weights[i] * d * d;
        }
        total
    }

    fn gradient(&self, x: &DVector<T>, gradient: &mut DVector<T>) {
        let two = <T as Scalar>::from_f64(2.0);
        for i in 0..self.center.len() {
            gradient[i] = two * self.weights[i] * (x[i] - self.center[i]);
        }
    }
}

/// A linear function, unbounded below along `-coefficients`.
#[derive(Debug, Clone)]
pub struct Linear<T: Scalar> {
    /// The gradient of the function everywhere
    pub coefficients: DVector<T>,
}

impl<T: Scalar> Linear<T> {
    /// f(x) = coefficients . x
    pub fn new(coefficients: DVector<T>) -> Self {
        Self { coefficients }
    }
}

impl<T: Scalar> CostFunction<T> for Linear<T> {
    fn num_parameters(&self) -> usize {
        self.coefficients.len()
    }

    fn cost(&self, x: &DVector<T>) -> T {
        self.coefficients.dot(x)
    }

    fn gradient(&self, _x: &DVector<T>, gradient: &mut DVector<T>) {
        gradient.copy_from(&self.coefficients);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rosenbrock_minimum() {
        let f = Rosenbrock::new(4);
        let ones = DVector::<f64>::from_element(4, 1.0);
        assert_eq!(f.cost(&ones), 0.0);

        let mut g = DVector::zeros(4);
        f.gradient(&ones, &mut g);
        assert_relative_eq!(g.norm(), 0.0);
    }

    #[test]
    fn test_rosenbrock_gradient_matches_finite_differences() {
        let f = Rosenbrock::new(3);
        let x: DVector<f64> = f.standard_start();
        assert_relative_eq!(x[0], -1.2);
        assert_relative_eq!(x[1], 1.0);

        let mut analytic = DVector::zeros(3);
        let mut numeric = DVector::zeros(3);
        f.gradient(&x, &mut analytic);
        f.gradient_fd(&x, &mut numeric);
        assert_relative_eq!(analytic, numeric, epsilon = 1e-5);
    }

    #[test]
    fn test_shifted_quadratic() {
        let f = ShiftedQuadratic::with_weights(
            DVector::from_vec(vec![3.0, -1.0]),
            DVector::from_vec(vec![1.0, 4.0]),
        );
        let origin = DVector::zeros(2);
        assert_relative_eq!(f.cost(&origin), 9.0 + 4.0);

        let mut g = DVector::zeros(2);
        f.gradient(&origin, &mut g);
        assert_relative_eq!(g, DVector::from_vec(vec![-6.0, 8.0]));
    }
}
