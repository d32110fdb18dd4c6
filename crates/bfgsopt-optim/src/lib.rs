//! BFGS quasi-Newton optimization.
//!
//! This crate provides the resumable BFGS optimizer, the update equations it
//! is built on, and a blocking driver for callers that just want a result.
//!
//! # Available Components
//!
//! - **QuasiNewtonBfgs**: two-phase BFGS state machine, one phase per `step()`
//! - **equations**: in-place inverse Hessian update, scaling and reset
//! - **Minimizer**: steps any optimizer under iteration, time and
//!   evaluation limits
//!
//! # Examples
//!
//! ```rust
//! use bfgsopt_core::prelude::*;
//! use bfgsopt_optim::{Minimizer, QuasiNewtonBfgs, QuasiNewtonConfig};
//!
//! let cost = NumericalCost::new(2, |x: &DVector<f64>| {
//!     (x[0] - 1.0).powi(2) + 10.0 * (x[1] - x[0]).powi(2)
//! });
//! let mut optimizer = QuasiNewtonBfgs::with_config(
//!     CostLineFunction::new(cost),
//!     StrongWolfeLineSearch::new(),
//!     QuasiNewtonConfig::new().with_relative_tolerance(1e-12),
//! )?;
//! optimizer.initialize(&DVector::zeros(2))?;
//!
//! let result = Minimizer::new(StoppingCriterion::new()).run(&mut optimizer);
//! assert!(result.converged);
//! assert!((result.point[0] - 1.0).abs() < 1e-4);
//! # Ok::<(), OptimizerError>(())
//! ```

pub mod equations;
pub mod minimizer;
pub mod quasi_newton;

// Re-export main types for convenience
pub use minimizer::Minimizer;
pub use quasi_newton::{Phase, QuasiNewtonBfgs, QuasiNewtonConfig};
