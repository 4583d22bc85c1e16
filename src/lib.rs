//! Variational solvers for the one-dimensional Helmholtz impedance problem
//!
//! $-u'' - k^2 u = f$ in $(a,b)$,
//! $-u'(a) - i k u(a) = g_a$, $u'(b) - i k u(b) = g_b$.
//!
//! Two schemes share the same quadrature, basis and variational form machinery:
//! a piecewise-linear Galerkin FEM solved directly, and a variational PINN
//! trained by minimizing the residual against a fixed test space.

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod assemble;
pub mod basis;
pub mod exact;
pub mod fe;
pub mod form;
pub mod io;
pub mod linalg;
pub mod mesh;
pub mod norms;
pub mod problem;
pub mod problems;
pub mod quadrature;
pub mod util;
pub mod vpinn;

pub type Complex64 = na::Complex<f64>;
pub type DofIdx = usize;
pub type CellIdx = usize;

/// Imaginary unit.
pub const I: Complex64 = Complex64::new(0.0, 1.0);

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Quadrature(#[from] quadrature::QuadratureError),
  #[error(transparent)]
  Config(#[from] problem::ConfigError),
  #[error(transparent)]
  Fem(#[from] problems::helmholtz::FemError),
  #[error(transparent)]
  Train(#[from] vpinn::train::TrainError),
}
