//! Update equations for the BFGS inverse Hessian approximation.
//!
//! With `s = x_{k+1} - x_k`, `y = g_{k+1} - g_k` and `ρ = 1 / (yᵀs)`, the
//! inverse Hessian approximation `B` is updated as
//!
//! ```text
//! B⁺ = (I - ρ s yᵀ) B (I - ρ y sᵀ) + ρ s sᵀ
//!    = B - ρ (B y sᵀ + s yᵀ B) + ρ (1 + ρ yᵀ B y) s sᵀ
//! ```
//!
//! The second form only needs the product `B y` and three rank-1 updates, so
//! it runs in O(N²) without allocating. `B⁺` satisfies the secant condition
//! `B⁺ y = s` and stays symmetric positive definite whenever `B` is and
//! `yᵀs > 0`, which the strong Wolfe conditions guarantee.

use bfgsopt_core::types::{DMatrix, DVector, Scalar};
use num_traits::Float;

/// Applies the BFGS inverse update to `b` in place.
///
/// `scratch` must have the same length as `s` and receives `B y`.
/// Returns `false` and leaves `b` untouched when the curvature `yᵀs` is zero
/// or not finite.
pub fn inverse_update<T: Scalar>(
    b: &mut DMatrix<T>,
    s: &DVector<T>,
    y: &DVector<T>,
    scratch: &mut DVector<T>,
) -> bool {
    let ys = y.dot(s);
    if ys == T::zero() || !Float::is_finite(ys) {
        return false;
    }
    let rho = T::one() / ys;

    scratch.gemv(T::one(), b, y, T::zero());
    let yby = y.dot(scratch);
    if !Float::is_finite(yby) {
        return false;
    }

    b.ger(-rho, scratch, s, T::one());
    b.ger(-rho, s, scratch, T::one());
    b.ger(rho * (T::one() + rho * yby), s, s, T::one());
    true
}

/// Replaces `b` with `(yᵀs / yᵀy) I`.
///
/// This rescales an identity start so that its size matches the curvature
/// seen along the first step (Nocedal & Wright, eq. 6.20). Returns the scale,
/// or `None` (leaving `b` untouched) if it is not positive and finite.
pub fn scale_to_curvature<T: Scalar>(b: &mut DMatrix<T>, s: &DVector<T>, y: &DVector<T>) -> Option<T> {
    let scale = y.dot(s) / y.dot(y);
    if !(scale > T::zero() && Float::is_finite(scale)) {
        return None;
    }
    b.fill_with_identity();
    *b *= scale;
    Some(scale)
}

/// Resets `b` to a multiple of the identity.
///
/// The multiple is the largest absolute diagonal entry of `b`, or one if
/// that is zero or not finite. Returns the multiple used.
pub fn reset_to_diagonal<T: Scalar>(b: &mut DMatrix<T>) -> T {
    let largest = b
        .diagonal()
        .iter()
        .fold(T::zero(), |acc, &d| Float::max(acc, Float::abs(d)));

    let scale = if largest > T::zero() && Float::is_finite(largest) {
        largest
    } else {
        T::one()
    };
    b.fill_with_identity();
    *b *= scale;
    scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn spd_3x3() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[2.0, 0.3, 0.1, 0.3, 1.5, -0.2, 0.1, -0.2, 1.0])
    }

    #[test]
    fn test_secant_condition() {
        let mut b = spd_3x3();
        let s = DVector::from_vec(vec![0.5, -0.2, 0.1]);
        let y = DVector::from_vec(vec![1.0, -0.3, 0.4]);
        let mut scratch = DVector::zeros(3);

        assert!(inverse_update(&mut b, &s, &y, &mut scratch));
        assert_relative_eq!(&b * &y, s, epsilon = 1e-12);
        assert_relative_eq!(b.clone(), b.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_matches_product_form() {
        let b0 = spd_3x3();
        let s = DVector::from_vec(vec![0.2, 0.7, -0.1]);
        let y = DVector::from_vec(vec![0.4, 1.1, 0.3]);
        let rho = 1.0 / y.dot(&s);

        let identity = DMatrix::<f64>::identity(3, 3);
        let left = &identity - (&s * y.transpose()) * rho;
        let right = &identity - (&y * s.transpose()) * rho;
        let expected = &left * &b0 * &right + (&s * s.transpose()) * rho;

        let mut b = b0;
        let mut scratch = DVector::zeros(3);
        assert!(inverse_update(&mut b, &s, &y, &mut scratch));
        assert_relative_eq!(b, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_curvature_skips_update() {
        let mut b = spd_3x3();
        let before = b.clone();
        let s = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        let y = DVector::from_vec(vec![0.0, 1.0, 0.0]);
        let mut scratch = DVector::zeros(3);

        assert!(!inverse_update(&mut b, &s, &y, &mut scratch));
        assert_eq!(b, before);

        let y = DVector::from_vec(vec![f64::NAN, 0.0, 0.0]);
        assert!(!inverse_update(&mut b, &s, &y, &mut scratch));
        assert_eq!(b, before);
    }

    #[test]
    fn test_scale_to_curvature() {
        let mut b = DMatrix::<f64>::identity(2, 2);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        let y = DVector::from_vec(vec![4.0, 0.0]);

        assert_eq!(scale_to_curvature(&mut b, &s, &y), Some(0.25));
        assert_relative_eq!(b, DMatrix::identity(2, 2) * 0.25);

        // negative curvature leaves b alone
        let y = DVector::from_vec(vec![-4.0, 0.0]);
        assert_eq!(scale_to_curvature(&mut b, &s, &y), None);
        assert_relative_eq!(b[(0, 0)], 0.25);
    }

    #[test]
    fn test_reset_to_diagonal() {
        let mut b = DMatrix::from_row_slice(2, 2, &[-3.0, 5.0, 5.0, 1.0]);
        assert_eq!(reset_to_diagonal(&mut b), 3.0);
        assert_eq!(b, DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 3.0]));

        let mut degenerate = DMatrix::<f64>::zeros(2, 2);
        assert_eq!(reset_to_diagonal(&mut degenerate), 1.0);
        assert_eq!(degenerate, DMatrix::identity(2, 2));
    }

    proptest! {
        #[test]
        fn prop_update_preserves_positive_definiteness(
            s in prop::collection::vec(-10.0f64..10.0, 4),
            y in prop::collection::vec(-10.0f64..10.0, 4),
        ) {
            let s = DVector::from_vec(s);
            let y = DVector::from_vec(y);
            // positive curvature, as guaranteed after a Wolfe step
            prop_assume!(y.dot(&s) > 1e-3 * s.norm() * y.norm());

            let mut b = DMatrix::<f64>::identity(4, 4);
            let mut scratch = DVector::zeros(4);
            prop_assert!(inverse_update(&mut b, &s, &y, &mut scratch));
            prop_assert!(b.clone().cholesky().is_some());
            prop_assert!((&b * &y - &s).norm() <= 1e-8 * (1.0 + s.norm()) * (1.0 + b.norm()));
        }
    }
}
