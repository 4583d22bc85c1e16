//! Piecewise-linear Lagrangian finite elements on a uniform mesh.

use crate::{
  basis::Basis,
  mesh::UniformMesh,
  problem::Source,
  quadrature::QuadRule,
  Complex64, DofIdx,
};

/// Global hat basis function $phi_j$, the piecewise-linear nodal function of node $j$.
///
/// Boundary hats are truncated to the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HatFunction {
  mesh: UniformMesh,
  index: DofIdx,
}
impl HatFunction {
  pub fn new(mesh: UniformMesh, index: DofIdx) -> Self {
    assert!(index < mesh.nnodes(), "hat index out of range");
    Self { mesh, index }
  }

  pub fn index(&self) -> DofIdx {
    self.index
  }
  pub fn node(&self) -> f64 {
    self.mesh.node(self.index)
  }
  pub fn mesh(&self) -> &UniformMesh {
    &self.mesh
  }

  pub fn value_on_cell(&self, icell: usize, x: f64) -> f64 {
    let [xl, xr] = self.mesh.cell(icell);
    if icell + 1 == self.index {
      (x - xl) / self.mesh.h()
    } else if icell == self.index {
      (xr - x) / self.mesh.h()
    } else {
      0.0
    }
  }

  pub fn slope_on_cell(&self, icell: usize) -> f64 {
    if icell + 1 == self.index {
      self.mesh.h().recip()
    } else if icell == self.index {
      -self.mesh.h().recip()
    } else {
      0.0
    }
  }

  /// $1 - |x - x_j| / h$ inside the support, zero outside.
  pub fn value(&self, x: f64) -> f64 {
    if !self.mesh.domain().contains(x) {
      return 0.0;
    }
    self.value_on_cell(self.mesh.cell_of(x), x).max(0.0)
  }

  /// Slope $plus.minus 1/h$ inside the support, zero outside.
  ///
  /// On nodes the left-derivative is taken, on the left end of the domain the right-derivative.
  pub fn slope_at(&self, x: f64) -> f64 {
    if !self.mesh.domain().contains(x) {
      return 0.0;
    }
    self.slope_on_cell(self.mesh.cell_of(x))
  }
}
impl Basis for HatFunction {
  fn evaluate(&self, x: f64) -> Complex64 {
    Complex64::from(self.value(x))
  }
  fn derivative(&self, x: f64) -> Complex64 {
    Complex64::from(self.slope_at(x))
  }
  fn derivative_on(&self, x: f64, piece: [f64; 2]) -> Complex64 {
    if !self.mesh.domain().contains(x) {
      return Complex64::from(0.0);
    }
    Complex64::from(self.slope_on_cell(self.mesh.cell_of_piece(piece)))
  }
  fn support(&self) -> Option<[f64; 2]> {
    let last = self.mesh.ncells();
    Some([
      self.mesh.node(self.index.saturating_sub(1)),
      self.mesh.node((self.index + 1).min(last)),
    ])
  }
  /// The node and the ends of the support.
  fn kinks(&self) -> Vec<f64> {
    let first = self.index.saturating_sub(1);
    let last = (self.index + 1).min(self.mesh.ncells());
    (first..=last).map(|i| self.mesh.node(i)).collect()
  }
}

/// All hat functions of the mesh, ordered by node.
pub fn hat_basis(mesh: UniformMesh) -> Vec<HatFunction> {
  (0..mesh.nnodes()).map(|i| HatFunction::new(mesh, i)).collect()
}

/// Coefficients of a finite element function with respect to the hat basis.
#[derive(Debug, Clone)]
pub struct FeFunction {
  mesh: UniformMesh,
  coeffs: na::DVector<Complex64>,
}
impl FeFunction {
  pub fn new(mesh: UniformMesh, coeffs: na::DVector<Complex64>) -> Self {
    assert_eq!(coeffs.len(), mesh.nnodes());
    Self { mesh, coeffs }
  }
  pub fn mesh(&self) -> &UniformMesh {
    &self.mesh
  }
  pub fn coeffs(&self) -> &na::DVector<Complex64> {
    &self.coeffs
  }

  fn value_on_cell(&self, icell: usize, x: f64) -> Complex64 {
    let [xl, xr] = self.mesh.cell(icell);
    let h = self.mesh.h();
    self.coeffs[icell] * ((xr - x) / h) + self.coeffs[icell + 1] * ((x - xl) / h)
  }
  fn slope_on_cell(&self, icell: usize) -> Complex64 {
    (self.coeffs[icell + 1] - self.coeffs[icell]) / self.mesh.h()
  }
}
impl Basis for FeFunction {
  fn evaluate(&self, x: f64) -> Complex64 {
    if !self.mesh.domain().contains(x) {
      return Complex64::from(0.0);
    }
    self.value_on_cell(self.mesh.cell_of(x), x)
  }
  fn derivative(&self, x: f64) -> Complex64 {
    if !self.mesh.domain().contains(x) {
      return Complex64::from(0.0);
    }
    self.slope_on_cell(self.mesh.cell_of(x))
  }
  fn derivative_on(&self, x: f64, piece: [f64; 2]) -> Complex64 {
    if !self.mesh.domain().contains(x) {
      return Complex64::from(0.0);
    }
    self.slope_on_cell(self.mesh.cell_of_piece(piece))
  }
  fn kinks(&self) -> Vec<f64> {
    self.mesh.nodes()
  }
}

pub type ElMat = na::DMatrix<Complex64>;
pub trait ElMatProvider: Sync {
  fn eval(&self, cell: [f64; 2]) -> ElMat;
}
impl<F> ElMatProvider for F
where
  F: Fn([f64; 2]) -> ElMat + Sync,
{
  fn eval(&self, cell: [f64; 2]) -> ElMat {
    self(cell)
  }
}

pub type ElVec = na::DVector<Complex64>;
pub trait ElVecProvider: Sync {
  fn eval(&self, cell: [f64; 2]) -> ElVec;
}
impl<F> ElVecProvider for F
where
  F: Fn([f64; 2]) -> ElVec + Sync,
{
  fn eval(&self, cell: [f64; 2]) -> ElVec {
    self(cell)
  }
}

fn cell_length([xl, xr]: [f64; 2]) -> f64 {
  xr - xl
}

/// Exact element matrix of $integral phi'_j phi'_i$.
pub struct StiffnessElmat;
impl ElMatProvider for StiffnessElmat {
  fn eval(&self, cell: [f64; 2]) -> ElMat {
    let v = Complex64::from(cell_length(cell).recip());
    ElMat::from_row_slice(2, 2, &[v, -v, -v, v])
  }
}

/// Exact element matrix of the consistent mass $integral phi_j phi_i$.
pub struct MassElmat;
impl ElMatProvider for MassElmat {
  fn eval(&self, cell: [f64; 2]) -> ElMat {
    let dim = 1;
    let v = Complex64::from(cell_length(cell) / ((dim + 1) * (dim + 2)) as f64);
    let mut elmat = ElMat::from_element(2, 2, v);
    elmat.fill_diagonal(v * 2.0);
    elmat
  }
}

/// Exact element matrix of the interior part $integral phi'_j phi'_i - k^2 integral phi_j phi_i$.
pub struct HelmholtzElmat {
  wavenumber: f64,
}
impl HelmholtzElmat {
  pub fn new(wavenumber: f64) -> Self {
    Self { wavenumber }
  }
}
impl ElMatProvider for HelmholtzElmat {
  fn eval(&self, cell: [f64; 2]) -> ElMat {
    StiffnessElmat.eval(cell) - MassElmat.eval(cell) * Complex64::from(self.wavenumber.powi(2))
  }
}

/// Element vector of $integral f phi_i$.
///
/// Constant sources are integrated in closed form,
/// general sources with the supplied quadrature rule.
pub struct SourceElvec<'a> {
  source: &'a Source,
  rule: &'a QuadRule,
}
impl<'a> SourceElvec<'a> {
  pub fn new(source: &'a Source, rule: &'a QuadRule) -> Self {
    Self { source, rule }
  }
}
impl ElVecProvider for SourceElvec<'_> {
  fn eval(&self, cell: [f64; 2]) -> ElVec {
    let [xl, xr] = cell;
    let h = cell_length(cell);
    match self.source.as_constant() {
      Some(f) => ElVec::from_element(2, f * (0.5 * h)),
      None => {
        let mut elvec = ElVec::zeros(2);
        for p in self.rule.map_to(cell) {
          let fx = self.source.eval(p.x) * p.weight;
          elvec[0] += fx * ((xr - p.x) / h);
          elvec[1] += fx * ((p.x - xl) / h);
        }
        elvec
      }
    }
  }
}
