//! # bfgsopt
//!
//! Resumable BFGS quasi-Newton optimization in Rust.
//!
//! The optimizer is a state machine: every call to `step()` performs one
//! phase of an outer iteration, either computing a search direction or
//! advancing the line search along it. Callers can inspect the state
//! between steps, stop at any point, and resume later. [`Minimizer`] wraps
//! the loop for callers that only want the final result.
//!
//! ## Features
//!
//! - **Inverse Hessian BFGS** with an optional curvature-scaled start and
//!   automatic recovery when the approximation stops producing descent
//! - **Line searches**: strong Wolfe (bracketing and zoom) and Armijo
//!   backtracking, both driven step by step
//! - **Gradients**: analytic, or central finite differences via
//!   [`NumericalCost`]
//! - **Generic scalars**: works with `f32` and `f64`
//!
//! ## Quick Start
//!
//! ```rust
//! use bfgsopt::prelude::*;
//!
//! // f(x, y) = (x - 3)² + (y + 1)²
//! let cost = FnCost::new(
//!     2,
//!     |x: &DVector<f64>| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2),
//!     |x: &DVector<f64>, g: &mut DVector<f64>| {
//!         g[0] = 2.0 * (x[0] - 3.0);
//!         g[1] = 2.0 * (x[1] + 1.0);
//!     },
//! );
//!
//! let mut optimizer = QuasiNewtonBfgs::new(
//!     CostLineFunction::new(cost),
//!     StrongWolfeLineSearch::new(),
//!     f64::NEG_INFINITY,
//!     0.9,
//!     1e-10,
//!     1e-10,
//! )?;
//! optimizer.initialize(&DVector::zeros(2))?;
//!
//! while !optimizer.step() {}
//!
//! assert!(optimizer.is_converged());
//! assert!((optimizer.parameters()[0] - 3.0).abs() < 1e-4);
//! # Ok::<(), OptimizerError>(())
//! ```
//!
//! ## Crate Organization
//!
//! - [`bfgsopt_core`]: scalar types, cost functions, evaluators and line
//!   searches
//! - [`bfgsopt_optim`]: the BFGS optimizer, its update equations and the
//!   [`Minimizer`] driver

pub use bfgsopt_core;
pub use bfgsopt_optim;

pub use bfgsopt_core::{OptimizerError, OptimizerResult};
pub use bfgsopt_optim::{Minimizer, Phase, QuasiNewtonBfgs, QuasiNewtonConfig};

/// Everything needed to set up and run an optimization.
pub mod prelude {
    pub use bfgsopt_core::prelude::*;
    pub use bfgsopt_optim::{Minimizer, Phase, QuasiNewtonBfgs, QuasiNewtonConfig};
}

// Re-export nalgebra for convenience
pub use nalgebra;
