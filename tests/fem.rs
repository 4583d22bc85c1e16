//! Verify the linear FEM for the Helmholtz impedance problem
//! against the analytical solution on $[-1, 1]$ with $f = 10$, $g_a = g_b = 0$.

use helmvar::{
  basis::Basis,
  exact::ExactSolution,
  problem::{Domain, HelmholtzProblem, Source},
  problems::helmholtz::{solve_helmholtz, Assembly, FemConfig, FemError},
  quadrature::{QuadratureError, QuadratureKind},
  util::algebraic_convergence_rate,
  Complex64,
};

use approx::assert_relative_eq;

fn problem(k: f64) -> HelmholtzProblem {
  HelmholtzProblem::new(Domain::reference(), k, Source::constant(10.0), 0.0, 0.0).unwrap()
}

fn h1_error(problem: &HelmholtzProblem, ncells: usize) -> f64 {
  let exact = ExactSolution::new(problem).unwrap();
  let sol = solve_helmholtz(problem, &FemConfig::new(ncells)).unwrap();
  sol.h1_error(&exact).unwrap().total()
}

#[test]
fn homogeneous_data_gives_zero_solution() {
  for k in [0.5, 1.0, 7.0] {
    let problem =
      HelmholtzProblem::new(Domain::new(0.0, 2.0).unwrap(), k, Source::constant(0.0), 0.0, 0.0)
        .unwrap();
    for ncells in [1, 5, 32] {
      let sol = solve_helmholtz(&problem, &FemConfig::new(ncells)).unwrap();
      assert_eq!(sol.coeffs().len(), ncells + 1);
      assert!(sol.coeffs().iter().all(|c| c.norm() == 0.0));
    }
  }
}

#[test]
fn fine_mesh_beats_coarse_mesh() {
  let problem = problem(1.0);
  let coarse = h1_error(&problem, 10);
  let fine = h1_error(&problem, 50);
  assert!(fine < 0.2, "H1 error {fine} for N=50");
  assert!(fine < coarse, "N=50: {fine}, N=10: {coarse}");
}

#[test]
fn first_order_convergence() {
  let problem = problem(1.0);
  let prev = h1_error(&problem, 40);
  let next = h1_error(&problem, 80);
  let rate = algebraic_convergence_rate(next, prev);
  assert!((0.9..1.1).contains(&rate), "observed rate {rate}");
}

#[test]
fn preasymptotic_plateau() {
  // Three full oscillations on $[-1, 1]$ need $k >= 3 pi$.
  let problem = problem(10.0);
  let e4 = h1_error(&problem, 4);
  let e8 = h1_error(&problem, 8);
  assert!(e8 >= e4, "N=8: {e8}, N=4: {e4}");

  let e16 = h1_error(&problem, 16);
  let e64 = h1_error(&problem, 64);
  assert!(e64 < e16 && e16 < e8);
}

#[test]
fn assembly_strategies_agree() {
  let problem = HelmholtzProblem::new(
    Domain::new(0.0, 1.0).unwrap(),
    3.0,
    Source::function(|x| Complex64::new(x.sin(), x * x)),
    Complex64::new(1.0, -0.5),
    2.0,
  )
  .unwrap();

  let exact = solve_helmholtz(&problem, &FemConfig::new(17)).unwrap();
  let config = FemConfig {
    assembly: Assembly::Quadrature,
    ..FemConfig::new(17)
  };
  let quadrature = solve_helmholtz(&problem, &config).unwrap();
  for (a, b) in exact.coeffs().iter().zip(quadrature.coeffs().iter()) {
    assert_relative_eq!(a.re, b.re, epsilon = 1e-10);
    assert_relative_eq!(a.im, b.im, epsilon = 1e-10);
  }
  assert_relative_eq!(exact.condition(), quadrature.condition(), max_relative = 1e-8);
}

#[test]
fn quadrature_assembly_needs_two_points() {
  let problem =
    HelmholtzProblem::new(Domain::reference(), 3.0, Source::constant(1.0), 0.0, 0.0).unwrap();
  let exact = solve_helmholtz(&problem, &FemConfig::new(8)).unwrap();

  // one point misses the quadratic mass term
  let config = FemConfig {
    assembly: Assembly::Quadrature,
    quadrature_order: 1,
    ..FemConfig::new(8)
  };
  assert!(matches!(
    solve_helmholtz(&problem, &config),
    Err(FemError::Quadrature(QuadratureError::InvalidOrder {
      kind: QuadratureKind::GaussLegendre,
      order: 1,
      min: 2,
    }))
  ));

  let config = FemConfig {
    quadrature_order: 2,
    ..config
  };
  let quadrature = solve_helmholtz(&problem, &config).unwrap();
  for (a, b) in exact.coeffs().iter().zip(quadrature.coeffs().iter()) {
    assert_relative_eq!(a.re, b.re, epsilon = 1e-10);
    assert_relative_eq!(a.im, b.im, epsilon = 1e-10);
  }

  // the closed-form matrix does not depend on the rule
  let config = FemConfig {
    assembly: Assembly::Exact,
    quadrature_order: 1,
    ..FemConfig::new(8)
  };
  assert!(solve_helmholtz(&problem, &config).is_ok());
}

#[test]
fn boundary_data_is_picked_up() {
  let problem = HelmholtzProblem::new(
    Domain::reference(),
    2.0,
    Source::constant(1.0),
    Complex64::new(0.0, 1.0),
    -1.0,
  )
  .unwrap();
  let exact = ExactSolution::new(&problem).unwrap();

  let mut prev = f64::INFINITY;
  for ncells in [16, 32, 64, 128] {
    let sol = solve_helmholtz(&problem, &FemConfig::new(ncells)).unwrap();
    let error = sol.h1_error(&exact).unwrap().total();
    assert!(error < prev);
    prev = error;

    for x in [-1.0, 1.0] {
      let diff = (sol.evaluate(x) - exact.evaluate(x)).norm();
      assert!(diff < 5.0 / ncells as f64, "N={ncells}, x={x}: {diff}");
    }
  }
}

#[test]
fn zero_wavenumber_is_singular() {
  let problem = problem(0.0);
  let err = solve_helmholtz(&problem, &FemConfig::new(10)).unwrap_err();
  match err {
    FemError::SingularSystem {
      ncells,
      wavenumber,
      condition,
    } => {
      assert_eq!(ncells, 10);
      assert_eq!(wavenumber, 0.0);
      assert!(condition > 1e12);
    }
    other => panic!("expected singular system, got {other}"),
  }
}

#[test]
fn condition_limit_is_configurable() {
  let problem = problem(1.0);
  let config = FemConfig {
    condition_limit: 1.0,
    ..FemConfig::new(10)
  };
  assert!(matches!(
    solve_helmholtz(&problem, &config),
    Err(FemError::SingularSystem { ncells: 10, .. })
  ));
}
