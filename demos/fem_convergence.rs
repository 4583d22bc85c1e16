//! H1 error of the linear FEM under uniform refinement, for a small and a large wavenumber.

use helmvar::{
  exact::ExactSolution,
  problem::{Domain, HelmholtzProblem, Source},
  problems::helmholtz::{solve_helmholtz, FemConfig, FemError},
  util::{algebraic_convergence_rate, linspace},
};

fn main() {
  tracing_subscriber::fmt::init();

  let domain = Domain::reference();
  std::fs::create_dir_all("out").unwrap();

  for k in [1.0, 10.0] {
    let problem = HelmholtzProblem::new(domain, k, Source::constant(10.0), 0.0, 0.0).unwrap();
    let exact = ExactSolution::new(&problem).unwrap();
    println!("k = {k}");

    let mut prev_error: Option<f64> = None;
    for refinement in 1..=9 {
      let ncells = 2usize.pow(refinement);
      let sol = match solve_helmholtz(&problem, &FemConfig::new(ncells)) {
        Ok(sol) => sol,
        Err(err @ FemError::SingularSystem { .. }) => {
          println!("{err}");
          prev_error = None;
          continue;
        }
        Err(err) => panic!("{err}"),
      };
      let error = sol.h1_error(&exact).unwrap();

      let conv_rate = prev_error
        .map(|prev| algebraic_convergence_rate(error.total(), prev))
        .unwrap_or(f64::NAN);
      prev_error = Some(error.total());

      println!(
        "\
        ncells: {ncells:4}, \
        h: {h:.2e}, \
        cond: {cond:.2e}, \
        l2: {l2:.3e}, \
        h1: {h1:.3e}, \
        conv_rate: {conv_rate:>5.2}",
        h = sol.mesh().h(),
        cond = sol.condition(),
        l2 = error.l2,
        h1 = error.total(),
      );

      let grid = linspace(domain.a(), domain.b(), 201);
      helmvar::io::save_samples_to_file(&sol.sample(&grid), format!("out/fem_k{k}_n{ncells}.txt"))
        .unwrap();
    }

    let grid = linspace(domain.a(), domain.b(), 201);
    helmvar::io::save_samples_to_file(
      &helmvar::io::sample(&exact, &grid),
      format!("out/exact_k{k}.txt"),
    )
    .unwrap();
  }
}
