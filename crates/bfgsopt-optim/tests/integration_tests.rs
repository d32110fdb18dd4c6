//! Integration tests for bfgsopt-optim
//!
//! These tests drive the BFGS optimizer through the public API only, with
//! the evaluators and line searches from bfgsopt-core.

use approx::assert_relative_eq;
use bfgsopt_core::prelude::*;
use bfgsopt_core::test_functions::{Rosenbrock, ShiftedQuadratic};
use bfgsopt_optim::{Minimizer, Phase, QuasiNewtonBfgs, QuasiNewtonConfig};
use pretty_assertions::assert_eq;
use std::time::Duration;

/// f(x, y) = (x - 3)^2 + (y + 1)^2
fn scenario_cost() -> impl CostFunction<f64> {
    FnCost::new(
        2,
        |x: &DVector<f64>| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2),
        |x: &DVector<f64>, g: &mut DVector<f64>| {
            g[0] = 2.0 * (x[0] - 3.0);
            g[1] = 2.0 * (x[1] + 1.0);
        },
    )
}

fn run_to_end<T, F, L>(optimizer: &mut QuasiNewtonBfgs<T, F, L>, max_steps: usize) -> usize
where
    T: Scalar,
    F: GradientLineFunction<T>,
    L: LineSearch<T>,
{
    let mut steps = 1;
    while !optimizer.step() {
        steps += 1;
        assert!(steps <= max_steps, "optimizer did not stop within {max_steps} steps");
    }
    steps
}

/// A line search that gives up immediately.
#[derive(Debug)]
struct GivingUp {
    message: Option<String>,
    inits: usize,
}

impl LineSearch<f64> for GivingUp {
    fn init(&mut self, _: f64, _: f64, _: f64, _: f64, _: f64, _: f64) {
        self.inits += 1;
    }

    fn iterate<F>(&mut self, _function: &mut F) -> bool
    where
        F: LineFunction<f64> + ?Sized,
    {
        true
    }

    fn is_converged(&self) -> bool {
        false
    }

    fn step(&self) -> f64 {
        0.0
    }

    fn function_value(&self) -> f64 {
        f64::NAN
    }

    fn failure_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn name(&self) -> &str {
        "GivingUp"
    }
}

#[test]
fn test_shifted_bowl_scenario() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer.initialize(&DVector::zeros(2)).unwrap();
    run_to_end(&mut optimizer, 100);

    assert!(optimizer.is_converged());
    assert_eq!(optimizer.failure_message(), None);
    assert_relative_eq!(optimizer.parameters()[0], 3.0, epsilon = 1e-8);
    assert_relative_eq!(optimizer.parameters()[1], -1.0, epsilon = 1e-8);
    assert_relative_eq!(optimizer.function_value(), 0.0, epsilon = 1e-14);
    // N + 1 outer iterations at most
    assert!(optimizer.iterations() <= 3, "took {} iterations", optimizer.iterations());
}

#[test]
fn test_negative_relative_tolerance_is_rejected() {
    let result = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        -1.0,
        1e-10,
    );

    match result {
        Err(OptimizerError::InvalidConfiguration { parameter, value, .. }) => {
            assert_eq!(parameter, "relative_error_tol");
            assert_eq!(value, "-1");
        }
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }
}

#[test]
fn test_line_search_failure_is_propagated() {
    let line_search = GivingUp {
        message: Some("no step satisfies the Wolfe conditions".to_string()),
        inits: 0,
    };
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        line_search,
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer.initialize(&DVector::zeros(2)).unwrap();

    assert!(!optimizer.step());
    assert!(optimizer.step());
    assert!(!optimizer.is_converged());
    assert_eq!(
        optimizer.failure_message(),
        Some("no step satisfies the Wolfe conditions")
    );
    // parameters stay inspectable and untouched
    assert_eq!(optimizer.parameters(), &DVector::zeros(2));
    assert_eq!(optimizer.line_search().inits, 1);
    assert_eq!(
        optimizer.termination_reason(),
        Some(TerminationReason::LineSearchFailed)
    );
    assert_eq!(optimizer.completed_iterations(), 0);
}

#[test]
fn test_line_search_failure_without_message() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        GivingUp {
            message: None,
            inits: 0,
        },
        f64::NEG_INFINITY,
        0.9,
        0.0,
        0.0,
    )
    .unwrap();
    optimizer.initialize(&DVector::zeros(2)).unwrap();
    run_to_end(&mut optimizer, 10);

    assert!(!optimizer.is_converged());
    assert!(optimizer.failure_message().is_some());
}

#[test]
fn test_reinitialize_resets_state() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();

    optimizer.initialize(&DVector::zeros(2)).unwrap();
    run_to_end(&mut optimizer, 100);
    assert!(optimizer.is_converged());
    assert!(optimizer.iterations() > 0);

    optimizer
        .initialize(&DVector::from_vec(vec![-4.0, 7.0]))
        .unwrap();
    assert_eq!(optimizer.iterations(), 0);
    assert!(!optimizer.is_converged());
    assert!(!optimizer.is_terminated());
    assert_eq!(optimizer.failure_message(), None);
    assert_eq!(optimizer.phase(), Phase::ComputingDirection);
    assert_eq!(optimizer.inverse_hessian(), &DMatrix::identity(2, 2));
    assert_relative_eq!(optimizer.function_value(), 49.0 + 64.0);

    run_to_end(&mut optimizer, 100);
    assert!(optimizer.is_converged());
    assert_relative_eq!(optimizer.parameters()[0], 3.0, epsilon = 1e-8);
}

#[test]
fn test_parameters_are_idempotent() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(Rosenbrock::new(2)),
        StrongWolfeLineSearch::new(),
        0.0,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer
        .initialize(&DVector::from_vec(vec![-1.2, 1.0]))
        .unwrap();

    for _ in 0..5 {
        optimizer.step();
        let first = optimizer.parameters().clone();
        let second = optimizer.parameters().clone();
        assert_eq!(first, second);
    }
}

#[test]
fn test_parameters_are_a_live_view() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer.initialize(&DVector::zeros(2)).unwrap();

    optimizer.parameters_mut()[0] = 3.0;
    assert_eq!(optimizer.parameters()[0], 3.0);
}

#[test]
fn test_reset_produces_scaled_identity_and_descent() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer
        .set_initial_inverse_hessian(DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 0.0, -3.0]))
        .unwrap();
    optimizer.initialize(&DVector::zeros(2)).unwrap();

    assert!(!optimizer.step());
    assert_eq!(optimizer.inverse_hessian(), &(DMatrix::identity(2, 2) * 3.0));
    assert!(optimizer.directional_derivative() < 0.0);

    let direction = optimizer.search_direction().clone();
    let gradient = optimizer.gradient().clone();
    assert_relative_eq!(direction, gradient * -3.0);

    run_to_end(&mut optimizer, 100);
    assert!(optimizer.is_converged());
}

#[test]
fn test_zero_inverse_hessian_resets_to_identity() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer
        .set_initial_inverse_hessian(DMatrix::zeros(2, 2))
        .unwrap();
    optimizer.initialize(&DVector::zeros(2)).unwrap();

    // d = 0 is not a descent direction and max|B_ii| = 0, so B falls back to I
    assert!(!optimizer.step());
    assert_eq!(optimizer.inverse_hessian(), &DMatrix::identity(2, 2));
    assert_relative_eq!(optimizer.directional_derivative(), -40.0);

    run_to_end(&mut optimizer, 100);
    assert!(optimizer.is_converged());
    assert_relative_eq!(optimizer.parameters()[0], 3.0, epsilon = 1e-8);
    assert_relative_eq!(optimizer.parameters()[1], -1.0, epsilon = 1e-8);
}

/// Finite values but a gradient with a NaN component.
fn nan_gradient_cost() -> impl CostFunction<f64> {
    FnCost::new(
        2,
        |x: &DVector<f64>| x[0] * x[0] + x[1] * x[1],
        |x: &DVector<f64>, g: &mut DVector<f64>| {
            g[0] = f64::NAN;
            g[1] = 2.0 * x[1];
        },
    )
}

#[test]
fn test_no_descent_direction_after_reset_fails() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(nan_gradient_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    let start = DVector::from_vec(vec![1.0, 1.0]);
    optimizer.initialize(&start).unwrap();

    assert!(optimizer.step());
    assert!(!optimizer.is_converged());
    assert!(optimizer.is_terminated());
    assert_eq!(optimizer.termination_reason(), Some(TerminationReason::Failed));
    let message = optimizer.failure_message().unwrap_or_default();
    assert!(
        message.starts_with("no descent direction after reset"),
        "unexpected message: {message}"
    );
    assert_eq!(optimizer.parameters(), &start);
    assert_eq!(optimizer.iterations(), 0);

    // the driver keeps this apart from a line search failure
    optimizer.initialize(&start).unwrap();
    let result = Minimizer::default().run(&mut optimizer);
    assert_eq!(result.termination_reason, TerminationReason::Failed);
    assert_eq!(result.iterations, 0);
    assert!(result
        .message
        .as_deref()
        .is_some_and(|m| m.starts_with("no descent direction after reset")));
    assert!(matches!(
        result.into_result(),
        Err(OptimizerError::OptimizationFailed { .. })
    ));
}

#[test]
fn test_objective_never_increases() {
    let rosenbrock = Rosenbrock::new(2);
    let start = rosenbrock.standard_start();
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(rosenbrock),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer.initialize(&start).unwrap();

    let mut previous = optimizer.function_value();
    let mut steps = 0;
    while !optimizer.step() {
        let current = optimizer.function_value();
        assert!(current <= previous, "f went from {previous} to {current}");
        previous = current;
        steps += 1;
        assert!(steps < 2000);
    }
    assert!(optimizer.function_value() <= previous);
}

#[test]
fn test_rosenbrock_converges() {
    let rosenbrock = Rosenbrock::new(2);
    let start = rosenbrock.standard_start();
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(rosenbrock),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer.initialize(&start).unwrap();

    let result = Minimizer::new(StoppingCriterion::new().with_max_iterations(500)).run(&mut optimizer);

    assert_eq!(result.termination_reason, TerminationReason::Converged);
    assert!(result.converged);
    assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(result.point[1], 1.0, epsilon = 1e-4);
    assert!(result.function_evaluations.unwrap() >= result.iterations);
    assert!(result.gradient_evaluations.unwrap() >= result.iterations);
}

#[test]
fn test_higher_dimensional_rosenbrock() {
    let rosenbrock = Rosenbrock::new(6);
    // the chained valley has a second, local minimum near x_0 = -1
    let start = DVector::zeros(6);
    let config = QuasiNewtonConfig::new()
        .with_relative_tolerance(1e-12)
        .with_absolute_tolerance(1e-12)
        .with_initial_hessian_scaling(true);
    let mut optimizer =
        QuasiNewtonBfgs::with_config(CostLineFunction::new(rosenbrock), StrongWolfeLineSearch::new(), config)
            .unwrap();
    optimizer.initialize(&start).unwrap();

    let result = Minimizer::new(StoppingCriterion::new().with_max_iterations(1000)).run(&mut optimizer);

    assert!(result.converged, "{:?}", result.message);
    for i in 0..6 {
        assert_relative_eq!(result.point[i], 1.0, epsilon = 1e-3);
    }
}

#[test]
fn test_numerical_gradient_matches_analytic() {
    let numerical = NumericalCost::new(2, |x: &DVector<f64>| {
        (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2)
    });

    let mut analytic_opt = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    let mut numerical_opt = QuasiNewtonBfgs::new(
        CostLineFunction::new(numerical),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();

    let start = DVector::from_vec(vec![0.5, 2.0]);
    analytic_opt.initialize(&start).unwrap();
    numerical_opt.initialize(&start).unwrap();
    run_to_end(&mut analytic_opt, 100);
    run_to_end(&mut numerical_opt, 100);

    assert!(numerical_opt.is_converged());
    assert_relative_eq!(
        analytic_opt.parameters().clone(),
        numerical_opt.parameters().clone(),
        epsilon = 1e-6
    );
}

#[test]
fn test_backtracking_line_search_on_convex_quadratic() {
    let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]);
    let b = DVector::from_vec(vec![1.0, -2.0, 0.5]);
    let expected = a.clone().cholesky().unwrap().solve(&(-&b));

    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(QuadraticCost::new(a, b, 0.0)),
        BacktrackingLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        0.0,
        1e-14,
    )
    .unwrap();
    optimizer.initialize(&DVector::zeros(3)).unwrap();
    let result = Minimizer::new(StoppingCriterion::new().with_max_iterations(500)).run(&mut optimizer);

    assert!(result.converged, "{:?}", result.message);
    assert_relative_eq!(result.point, expected, epsilon = 1e-5);
}

#[test]
fn test_single_precision() {
    let bowl = ShiftedQuadratic::<f32>::new(DVector::from_vec(vec![1.5, -0.5, 2.0]));
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(bowl),
        StrongWolfeLineSearch::new(),
        f32::NEG_INFINITY,
        0.9,
        1e-5,
        1e-6,
    )
    .unwrap();
    optimizer.initialize(&DVector::zeros(3)).unwrap();
    run_to_end(&mut optimizer, 200);

    assert!(optimizer.is_converged());
    assert_relative_eq!(optimizer.parameters()[0], 1.5, epsilon = 1e-3);
    assert_relative_eq!(optimizer.parameters()[2], 2.0, epsilon = 1e-3);
}

#[test]
fn test_minimizer_time_limit_and_failure() {
    let mut optimizer = QuasiNewtonBfgs::new(
        CostLineFunction::new(Rosenbrock::new(2)),
        StrongWolfeLineSearch::new(),
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    optimizer
        .initialize(&DVector::from_vec(vec![-1.2, 1.0]))
        .unwrap();
    let result = Minimizer::new(StoppingCriterion::unbounded().with_max_time(Duration::ZERO))
        .run(&mut optimizer);
    assert_eq!(result.termination_reason, TerminationReason::MaxTime);
    assert!(result.clone().into_result().is_ok());

    let mut failing = QuasiNewtonBfgs::new(
        CostLineFunction::new(scenario_cost()),
        GivingUp {
            message: Some("gave up".to_string()),
            inits: 0,
        },
        f64::NEG_INFINITY,
        0.9,
        1e-10,
        1e-10,
    )
    .unwrap();
    failing.initialize(&DVector::zeros(2)).unwrap();
    let result = Minimizer::default().run(&mut failing);

    assert_eq!(result.termination_reason, TerminationReason::LineSearchFailed);
    assert_eq!(result.message.as_deref(), Some("gave up"));
    assert!(matches!(
        result.into_result(),
        Err(OptimizerError::LineSearchFailed { .. })
    ));
}

#[test]
fn test_optimizer_is_send() {
    fn assert_send<S: Send>() {}
    assert_send::<
        QuasiNewtonBfgs<f64, CostLineFunction<f64, QuadraticCost<f64>>, StrongWolfeLineSearch<f64>>,
    >();
}
