//! Verify the Helmholtz Galerkin Matrix on a uniform mesh against the hand-computed
//! tridiagonal matrix, for both assembly strategies.
//!
//! Interior rows are $1/h [-1, 2, -1] - k^2 h/6 [1, 4, 1]$,
//! the two boundary rows pick up $-i k$ on the diagonal.

extern crate nalgebra as na;

use helmvar::{
  assemble,
  fe::{hat_basis, HelmholtzElmat},
  form::VariationalForm,
  linalg::matrix_from_const_diagonals,
  mesh::UniformMesh,
  problem::{Domain, HelmholtzProblem, Source},
  quadrature::{QuadRule, QuadratureKind},
  Complex64,
};

fn expected_galmat(ncells: usize, h: f64, k: f64) -> na::DMatrix<Complex64> {
  let diag = Complex64::from(2.0 / h - k * k * 2.0 * h / 3.0);
  let off = Complex64::from(-1.0 / h - k * k * h / 6.0);
  let n = ncells + 1;
  let mut galmat = matrix_from_const_diagonals(&[diag, off, off], &[0, 1, -1], n, n);
  let boundary = Complex64::new(1.0 / h - k * k * h / 3.0, -k);
  galmat[(0, 0)] = boundary;
  galmat[(n - 1, n - 1)] = boundary;
  galmat
}

#[test]
fn hand_computed_small_galmat() {
  // h = 1/2, k = 2
  #[rustfmt::skip]
  let expected = na::DMatrix::from_row_slice(5, 5, &[
    Complex64::new(4.0 / 3.0, -2.0), Complex64::from(-7.0 / 3.0), 0.0.into(), 0.0.into(), 0.0.into(),
    Complex64::from(-7.0 / 3.0), Complex64::from(8.0 / 3.0), Complex64::from(-7.0 / 3.0), 0.0.into(), 0.0.into(),
    0.0.into(), Complex64::from(-7.0 / 3.0), Complex64::from(8.0 / 3.0), Complex64::from(-7.0 / 3.0), 0.0.into(),
    0.0.into(), 0.0.into(), Complex64::from(-7.0 / 3.0), Complex64::from(8.0 / 3.0), Complex64::from(-7.0 / 3.0),
    0.0.into(), 0.0.into(), 0.0.into(), Complex64::from(-7.0 / 3.0), Complex64::new(4.0 / 3.0, -2.0),
  ]);
  assert!((expected_galmat(4, 0.5, 2.0) - &expected).norm() < 1e-14);
}

#[test]
fn element_assembly_matches_tridiagonal() {
  for (ncells, k) in [(1, 0.5), (4, 2.0), (13, 7.5), (40, 20.0)] {
    let domain = Domain::new(-1.0, 1.0).unwrap();
    let problem = HelmholtzProblem::new(domain, k, Source::constant(1.0), 0.0, 0.0).unwrap();
    let mesh = UniformMesh::new(domain, ncells);

    let mut galmat = assemble::assemble_galmat(&mesh, HelmholtzElmat::new(k));
    let mut galvec = assemble::GalVec::zeros(mesh.nnodes());
    assemble::enforce_impedance_bc(&problem, &mut galmat, &mut galvec);
    let galmat = assemble::galmat_to_dense(&galmat);

    let diff = galmat - expected_galmat(ncells, mesh.h(), k);
    assert!(diff.norm() < 1e-10, "N={ncells}, k={k}: {}", diff.norm());
  }
}

#[test]
fn quadrature_assembly_matches_tridiagonal() {
  // Products of hats are quadratic, exact for two Gauss-Legendre or three Gauss-Lobatto points.
  for kind in [QuadratureKind::GaussLegendre, QuadratureKind::GaussLobatto] {
    for (ncells, k) in [(3, 1.0), (10, 4.0)] {
      let domain = Domain::new(0.0, 3.0).unwrap();
      let problem = HelmholtzProblem::new(domain, k, Source::constant(0.0), 0.0, 0.0).unwrap();
      let mesh = UniformMesh::new(domain, ncells);
      let rule = QuadRule::new(kind, 3).unwrap();
      let form = VariationalForm::new(&problem, rule, mesh.nodes()).unwrap();

      let galmat = assemble::assemble_galmat_form(&form, &hat_basis(mesh)).unwrap();
      let galmat = assemble::galmat_to_dense(&galmat);

      let diff = galmat - expected_galmat(ncells, mesh.h(), k);
      assert!(diff.norm() < 1e-10, "{kind:?} N={ncells}, k={k}: {}", diff.norm());
    }
  }
}

#[test]
fn load_vector_of_constant_source() {
  let domain = Domain::new(0.0, 2.0).unwrap();
  let problem = HelmholtzProblem::new(
    domain,
    1.0,
    Source::constant(Complex64::new(3.0, -1.0)),
    Complex64::new(0.0, 2.0),
    -1.0,
  )
  .unwrap();
  let mesh = UniformMesh::new(domain, 8);
  let form = VariationalForm::new(&problem, QuadRule::gauss_legendre(1).unwrap(), mesh.nodes())
    .unwrap();
  let galvec = assemble::assemble_galvec_form(&form, &hat_basis(mesh));

  let h = mesh.h();
  let f = Complex64::new(3.0, -1.0);
  assert!((galvec[0] - (f * (h / 2.0) + Complex64::new(0.0, 2.0))).norm() < 1e-14);
  assert!((galvec[8] - (f * (h / 2.0) - 1.0)).norm() < 1e-14);
  for i in 1..8 {
    assert!((galvec[i] - f * h).norm() < 1e-14);
  }
}
