//! Trains a VPINN for each test family and compares it to the FEM solution.

use helmvar::{
  basis::{TestFamily, TestSpace},
  exact::ExactSolution,
  io,
  problem::{Domain, HelmholtzProblem, Source},
  problems::helmholtz::{solve_helmholtz, FemConfig},
  util::linspace,
  vpinn::{train, Network, NetworkConfig, OptimizerConfig, VpinnConfig},
};

fn main() {
  tracing_subscriber::fmt::init();

  let domain = Domain::reference();
  let problem = HelmholtzProblem::new(domain, 1.0, Source::constant(10.0), 0.0, 0.0).unwrap();
  let exact = ExactSolution::new(&problem).unwrap();
  let grid = linspace(domain.a(), domain.b(), 201);
  std::fs::create_dir_all("out").unwrap();

  let fem = solve_helmholtz(&problem, &FemConfig::new(50)).unwrap();
  println!("FEM N=50: H1 error {:.3e}", fem.h1_error(&exact).unwrap().total());

  let network_config = NetworkConfig {
    depth: 1,
    width: 20,
    ..Default::default()
  };
  let config = VpinnConfig {
    optimizer: OptimizerConfig::adam(1e-2),
    max_iterations: 5000,
    penalty: 1.0,
    ..Default::default()
  };

  for (family, count) in [
    (TestFamily::Legendre, 10),
    (TestFamily::Trigonometric, 11),
    (TestFamily::Hat, 21),
  ] {
    let tests = TestSpace::new(family, count, domain).unwrap();
    let network = Network::new(&network_config, &domain).unwrap();
    let report = train(network, &tests, &problem, &config, Some(&exact)).unwrap();

    let error = report.errors.last().map(|(_, e)| e.total()).unwrap_or(f64::NAN);
    println!(
      "{family:?} K={count}: {:?} after {} iterations, loss {:.3e}, best {:.3e}, H1 error {error:.3e}",
      report.state, report.iterations, report.final_loss, report.best_loss,
    );

    let name = format!("{family:?}").to_lowercase();
    io::save_loss_trace_to_file(&report.losses, format!("out/vpinn_{name}_loss.txt")).unwrap();
    io::save_samples_to_file(
      &io::sample(&report.network, &grid),
      format!("out/vpinn_{name}.txt"),
    )
    .unwrap();
  }
}
