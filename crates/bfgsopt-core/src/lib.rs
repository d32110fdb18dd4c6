//! Core traits and types for quasi-Newton optimization.
//!
//! This crate provides the building blocks shared by the optimizers in
//! `bfgsopt-optim`: the numeric [`Scalar`](types::Scalar) trait, the
//! evaluator contract an optimizer drives, and the one-dimensional line
//! searches that pick step lengths along a search direction.
//!
//! # Key Concepts
//!
//! - **Cost functions**: scalar objectives of N parameters, with an analytic
//!   or finite-difference gradient
//! - **Line functions**: an objective restricted to a ray
//!   `x(t) = start + t * direction`
//! - **Line searches**: resumable procedures that select `t` satisfying the
//!   Wolfe or Armijo conditions
//!
//! # Modules
//!
//! - [`cost_function`]: Cost function interface and closure adapters
//! - [`error`]: Error types for configuration problems
//! - [`line_function`]: Evaluator contract driven by optimizers
//! - [`line_search`]: Line search algorithms
//! - [`optimizer`]: Optimizer trait, stopping criteria and results
//! - [`test_functions`]: Standard problems for tests and benchmarks
//! - [`types`]: Type aliases and numerical constants

pub mod core;
pub mod optimization;
pub mod utils;

pub use crate::core::{cost_function, error, line_function, types};
pub use optimization::{line_search, optimizer};

pub use utils::test_functions;

// Re-export commonly used items at the crate root
pub use error::{OptimizerError, OptimizerResult};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use bfgsopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cost_function::{CostFunction, FnCost, NumericalCost, QuadraticCost};
    pub use crate::error::{OptimizerError, OptimizerResult};
    pub use crate::line_function::{CostLineFunction, GradientLineFunction, LineFunction};
    pub use crate::line_search::{
        BacktrackingLineSearch, LineSearch, LineSearchParams, StrongWolfeLineSearch,
    };
    pub use crate::optimizer::{
        IterativeOptimizer, OptimizationResult, StoppingCriterion, TerminationReason,
    };
    pub use crate::types::{constants, DMatrix, DVector, Scalar};
}
