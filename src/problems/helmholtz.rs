//! Module for the Helmholtz Equation with impedance boundary conditions, solved with linear FEM.

use crate::{
  assemble,
  basis::Basis,
  exact::ExactSolution,
  fe::{hat_basis, FeFunction, HelmholtzElmat, SourceElvec},
  form::VariationalForm,
  io::{self, Sample},
  linalg::LuSolver,
  mesh::UniformMesh,
  norms::{self, H1Error},
  problem::{ConfigError, HelmholtzProblem},
  quadrature::{CompositeRule, QuadRule, QuadratureError, QuadratureKind},
  Complex64,
};

use tracing::{info, warn};

/// Gauss-Legendre points per cell used for error evaluation.
pub const ERROR_QUAD_ORDER: usize = 8;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FemError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Quadrature(#[from] QuadratureError),
  #[error(
    "singular system for N={ncells}, k={wavenumber}: condition number {condition:e} exceeds the limit"
  )]
  SingularSystem {
    ncells: usize,
    wavenumber: f64,
    condition: f64,
  },
}

/// How the Galerkin system is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assembly {
  /// Closed-form element matrices, assembled cell by cell.
  #[default]
  Exact,
  /// Entry-wise evaluation of the variational form by quadrature.
  Quadrature,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FemConfig {
  pub ncells: usize,
  pub assembly: Assembly,
  /// Gauss-Legendre points per cell, used for non-constant sources and quadrature assembly.
  pub quadrature_order: usize,
  /// Systems with a larger condition number are reported as singular.
  pub condition_limit: f64,
}
impl Default for FemConfig {
  fn default() -> Self {
    Self {
      ncells: 50,
      assembly: Assembly::Exact,
      quadrature_order: 4,
      condition_limit: 1e12,
    }
  }
}
impl FemConfig {
  pub fn new(ncells: usize) -> Self {
    Self {
      ncells,
      ..Default::default()
    }
  }

  pub fn validate(&self) -> Result<(), FemError> {
    if self.ncells == 0 {
      return Err(ConfigError::InvalidMeshSize(self.ncells).into());
    }
    QuadRule::gauss_legendre(self.quadrature_order)?;
    // hat products are quadratic
    if self.assembly == Assembly::Quadrature && self.quadrature_order < 2 {
      return Err(
        QuadratureError::InvalidOrder {
          kind: QuadratureKind::GaussLegendre,
          order: self.quadrature_order,
          min: 2,
        }
        .into(),
      );
    }
    Ok(())
  }
}

/// Solves $A c = F$ with $A_(i j) = a(phi_j, phi_i)$ and $F_i = b(phi_i)$ on a uniform mesh.
pub fn solve_helmholtz(
  problem: &HelmholtzProblem,
  config: &FemConfig,
) -> Result<FemSolution, FemError> {
  config.validate()?;
  let mesh = UniformMesh::new(*problem.domain(), config.ncells);
  let rule = QuadRule::gauss_legendre(config.quadrature_order)?;
  let k = problem.wavenumber();

  info!(
    "solving Helmholtz FEM with N={}, k={k}, assembly={:?}",
    mesh.ncells(),
    config.assembly
  );

  let (galmat, galvec) = match config.assembly {
    Assembly::Exact => {
      let mut galmat = assemble::assemble_galmat(&mesh, HelmholtzElmat::new(k));
      let mut galvec = assemble::assemble_galvec(&mesh, SourceElvec::new(problem.source(), &rule));
      assemble::enforce_impedance_bc(problem, &mut galmat, &mut galvec);
      (galmat, galvec)
    }
    Assembly::Quadrature => {
      let form = VariationalForm::new(problem, rule, mesh.nodes())?;
      let hats = hat_basis(mesh);
      let galmat = assemble::assemble_galmat_form(&form, &hats)?;
      let galvec = assemble::assemble_galvec_form(&form, &hats);
      (galmat, galvec)
    }
  };

  let galmat = assemble::galmat_to_dense(&galmat);
  let lu = LuSolver::new(galmat);
  let condition = lu.condition_number();
  info!("condition number {condition:e}");

  let singular = FemError::SingularSystem {
    ncells: mesh.ncells(),
    wavenumber: k,
    condition,
  };
  if !(condition <= config.condition_limit) {
    warn!("{singular}");
    return Err(singular);
  }
  if condition > 1e-2 * config.condition_limit {
    warn!(
      "nearly singular system for N={}, k={k}: condition number {condition:e}",
      mesh.ncells()
    );
  }

  let Some(coeffs) = lu.solve(&galvec) else {
    warn!("{singular}");
    return Err(singular);
  };

  info!("solved for {} coefficients", coeffs.len());
  Ok(FemSolution {
    fe: FeFunction::new(mesh, coeffs),
    condition,
  })
}

/// The finite element solution $u_N = sum_j c_j phi_j$.
#[derive(Debug, Clone)]
pub struct FemSolution {
  fe: FeFunction,
  condition: f64,
}
impl FemSolution {
  pub fn fe(&self) -> &FeFunction {
    &self.fe
  }
  pub fn mesh(&self) -> &UniformMesh {
    self.fe.mesh()
  }
  pub fn coeffs(&self) -> &na::DVector<Complex64> {
    self.fe.coeffs()
  }
  /// Frobenius condition number of the Galerkin matrix.
  pub fn condition(&self) -> f64 {
    self.condition
  }

  pub fn sample(&self, grid: &[f64]) -> Vec<Sample> {
    io::sample(&self.fe, grid)
  }

  /// H1 error against the analytical solution, integrated cell by cell.
  pub fn h1_error(&self, exact: &ExactSolution) -> Result<H1Error, FemError> {
    let rule = QuadRule::gauss_legendre(ERROR_QUAD_ORDER)?;
    let rule = CompositeRule::new(&rule, &self.mesh().nodes())?;
    Ok(norms::h1_error_between(exact, &self.fe, &rule))
  }
}
impl Basis for FemSolution {
  fn evaluate(&self, x: f64) -> Complex64 {
    self.fe.evaluate(x)
  }
  fn derivative(&self, x: f64) -> Complex64 {
    self.fe.derivative(x)
  }
  fn derivative_on(&self, x: f64, piece: [f64; 2]) -> Complex64 {
    self.fe.derivative_on(x, piece)
  }
  fn kinks(&self) -> Vec<f64> {
    self.fe.kinks()
  }
}
