use crate::{
  basis::{support_overlap, Basis},
  fe::{ElMatProvider, ElVecProvider},
  form::VariationalForm,
  mesh::UniformMesh,
  problem::HelmholtzProblem,
  quadrature::QuadratureError,
  Complex64, DofIdx, I,
};

use itertools::Itertools;
use rayon::prelude::*;

pub type GalMat = nas::CooMatrix<Complex64>;
pub type GalVec = na::DVector<Complex64>;

fn galmat_from_triplets(
  nrows: usize,
  ncols: usize,
  triplets: Vec<(DofIdx, DofIdx, Complex64)>,
) -> GalMat {
  let mut galmat = GalMat::new(nrows, ncols);
  for (r, c, v) in triplets {
    galmat.push(r, c, v);
  }
  galmat
}

/// Assembly algorithm for the Galerkin Matrix.
///
/// Element matrices are computed per cell in parallel, duplicate triplets sum up.
pub fn assemble_galmat(mesh: &UniformMesh, elmat: impl ElMatProvider) -> GalMat {
  let ndofs = mesh.nnodes();

  let triplets: Vec<(DofIdx, DofIdx, Complex64)> = (0..mesh.ncells())
    .into_par_iter()
    .flat_map_iter(|icell| {
      let elmat = elmat.eval(mesh.cell(icell));
      let dofs = mesh.cell_vertices(icell);

      let mut local_triplets = Vec::new();
      for (ilocal, &iglobal) in dofs.iter().enumerate() {
        for (jlocal, &jglobal) in dofs.iter().enumerate() {
          let val = elmat[(ilocal, jlocal)];
          if val != Complex64::from(0.0) {
            local_triplets.push((iglobal, jglobal, val));
          }
        }
      }
      local_triplets
    })
    .collect();

  galmat_from_triplets(ndofs, ndofs, triplets)
}

/// Assembly algorithm for the Galerkin Vector.
pub fn assemble_galvec(mesh: &UniformMesh, elvec: impl ElVecProvider) -> GalVec {
  let entries: Vec<(DofIdx, Complex64)> = (0..mesh.ncells())
    .into_par_iter()
    .flat_map_iter(|icell| {
      let elvec = elvec.eval(mesh.cell(icell));
      mesh
        .cell_vertices(icell)
        .into_iter()
        .zip(elvec.iter().copied().collect_vec())
    })
    .collect();

  let mut galvec = GalVec::zeros(mesh.nnodes());
  for (irow, val) in entries {
    galvec[irow] += val;
  }
  galvec
}

/// Adds the impedance boundary terms.
///
/// $-i k phi_j (a) phi_i (a)$ and $-i k phi_j (b) phi_i (b)$ only survive on the two
/// boundary nodes, the boundary data enters the load as $g_a phi_i (a) + g_b phi_i (b)$.
pub fn enforce_impedance_bc(problem: &HelmholtzProblem, galmat: &mut GalMat, galvec: &mut GalVec) {
  assert!(galmat.nrows() == galmat.ncols() && galmat.nrows() == galvec.len());
  let last = galvec.len() - 1;
  let impedance = -I * problem.wavenumber();
  galmat.push(0, 0, impedance);
  galmat.push(last, last, impedance);
  galvec[0] += problem.ga();
  galvec[last] += problem.gb();
}

/// Galerkin Matrix $A_(i j) = a(phi_j, phi_i)$ evaluated entry by entry through the
/// variational form.
///
/// Entries are independent and computed in parallel. Pairs with disjoint supports are skipped.
/// Fails if a basis function has a kink that is not a breakpoint of `form`.
pub fn assemble_galmat_form<B: Basis>(
  form: &VariationalForm,
  basis: &[B],
) -> Result<GalMat, QuadratureError> {
  for phi in basis {
    form.check_resolved(phi)?;
  }
  let ndofs = basis.len();
  let domain = form.problem().domain();

  let triplets: Vec<(DofIdx, DofIdx, Complex64)> = (0..ndofs)
    .into_par_iter()
    .flat_map_iter(|i| {
      let test = &basis[i];
      (0..ndofs)
        .filter(|&j| support_overlap(basis[j].support(), test.support(), domain).is_some())
        .map(|j| (i, j, form.bilinear(&basis[j], test)))
        .filter(|&(_, _, v)| v != Complex64::from(0.0))
        .collect_vec()
    })
    .collect();

  Ok(galmat_from_triplets(ndofs, ndofs, triplets))
}

/// Galerkin Vector $F_i = b(phi_i)$ evaluated through the variational form.
pub fn assemble_galvec_form<B: Basis>(form: &VariationalForm, basis: &[B]) -> GalVec {
  let entries: Vec<Complex64> = basis.par_iter().map(|v| form.linear(v)).collect();
  GalVec::from_vec(entries)
}

pub fn galmat_to_dense(galmat: &GalMat) -> na::DMatrix<Complex64> {
  na::DMatrix::from(galmat)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    fe::{hat_basis, HelmholtzElmat, SourceElvec},
    linalg::matrix_from_const_diagonals,
    problem::{Domain, Source},
    quadrature::QuadRule,
  };

  #[test]
  fn laplacian_galmat_1d() {
    let mesh = UniformMesh::new(Domain::new(0.0, 1.0).unwrap(), 4);
    let galmat = assemble_galmat(&mesh, crate::fe::StiffnessElmat);
    let galmat = galmat_to_dense(&galmat).map(|v| v.re);
    let mut expected = matrix_from_const_diagonals(&[8.0, -4.0, -4.0], &[0, 1, -1], 5, 5);
    expected[(0, 0)] = 4.0;
    expected[(4, 4)] = 4.0;
    assert!((galmat - expected).norm() < 1e-12);
  }

  #[test]
  fn element_and_form_assembly_agree() {
    let problem = HelmholtzProblem::new(
      Domain::new(-1.0, 1.0).unwrap(),
      3.0,
      Source::function(|x| Complex64::new(x.cos(), x)),
      Complex64::new(0.5, -1.0),
      Complex64::new(2.0, 0.25),
    )
    .unwrap();
    let mesh = UniformMesh::new(*problem.domain(), 7);
    let rule = QuadRule::gauss_legendre(4).unwrap();

    let mut galmat = assemble_galmat(&mesh, HelmholtzElmat::new(problem.wavenumber()));
    let mut galvec = assemble_galvec(&mesh, SourceElvec::new(problem.source(), &rule));
    enforce_impedance_bc(&problem, &mut galmat, &mut galvec);

    let form = VariationalForm::new(&problem, rule.clone(), mesh.nodes()).unwrap();
    let hats = hat_basis(mesh);
    let galmat_form = assemble_galmat_form(&form, &hats).unwrap();
    let galvec_form = assemble_galvec_form(&form, &hats);

    let diff = galmat_to_dense(&galmat) - galmat_to_dense(&galmat_form);
    assert!(diff.norm() < 1e-12, "galmat mismatch {}", diff.norm());
    assert!((galvec - galvec_form).norm() < 1e-12);
  }

  #[test]
  fn form_assembly_needs_mesh_breakpoints() {
    let problem =
      HelmholtzProblem::new(Domain::new(0.0, 1.0).unwrap(), 2.0, Source::constant(1.0), 0.0, 0.0)
        .unwrap();
    let hats = hat_basis(UniformMesh::new(*problem.domain(), 4));
    let rule = QuadRule::gauss_legendre(2).unwrap();
    let form = VariationalForm::uniform(&problem, rule, 3).unwrap();
    assert!(matches!(
      assemble_galmat_form(&form, &hats),
      Err(QuadratureError::UnresolvedKink(_))
    ));
  }
}
