//! Uniform partition of an interval into cells.
//!
//! Nodes are numbered left to right, `0..=ncells`, cell `i` is $[x_i, x_(i+1)]$.

use crate::{problem::Domain, CellIdx, DofIdx};

/// Relative tolerance for snapping a coordinate onto a node.
const NODE_SNAP_TOL: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformMesh {
  domain: Domain,
  ncells: usize,
}
impl UniformMesh {
  pub fn new(domain: Domain, ncells: usize) -> Self {
    assert!(ncells > 0, "mesh needs at least one cell");
    Self { domain, ncells }
  }

  pub fn domain(&self) -> &Domain {
    &self.domain
  }
  pub fn ncells(&self) -> usize {
    self.ncells
  }
  pub fn nnodes(&self) -> usize {
    self.ncells + 1
  }
  pub fn h(&self) -> f64 {
    self.domain.length() / self.ncells as f64
  }

  pub fn node(&self, inode: DofIdx) -> f64 {
    if inode == self.ncells {
      self.domain.b()
    } else {
      self.domain.a() + inode as f64 * self.h()
    }
  }
  pub fn nodes(&self) -> Vec<f64> {
    (0..self.nnodes()).map(|i| self.node(i)).collect()
  }
  pub fn cell(&self, icell: CellIdx) -> [f64; 2] {
    [self.node(icell), self.node(icell + 1)]
  }
  pub fn cell_vertices(&self, icell: CellIdx) -> [DofIdx; 2] {
    [icell, icell + 1]
  }

  /// Cell containing `x`, with points on interior nodes assigned to the cell on their left.
  ///
  /// The left end of the domain belongs to the first cell.
  /// Points outside of the domain are clamped to the boundary cells.
  pub fn cell_of(&self, x: f64) -> CellIdx {
    let t = (x - self.domain.a()) / self.h();
    let nearest = t.round();
    let icell = if (t - nearest).abs() <= NODE_SNAP_TOL * nearest.abs().max(1.0) {
      nearest - 1.0
    } else {
      t.floor()
    };
    icell.clamp(0.0, (self.ncells - 1) as f64) as CellIdx
  }

  /// Cell that contains the sub-interval `piece`.
  pub fn cell_of_piece(&self, [xl, xr]: [f64; 2]) -> CellIdx {
    let t = (0.5 * (xl + xr) - self.domain.a()) / self.h();
    t.floor().clamp(0.0, (self.ncells - 1) as f64) as CellIdx
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cell_lookup_uses_left_cell_on_nodes() {
    let mesh = UniformMesh::new(Domain::new(-1.0, 1.0).unwrap(), 4);
    assert_eq!(mesh.h(), 0.5);
    assert_eq!(mesh.nodes(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    assert_eq!(mesh.cell_of(-1.0), 0);
    assert_eq!(mesh.cell_of(-0.75), 0);
    assert_eq!(mesh.cell_of(-0.5), 0);
    assert_eq!(mesh.cell_of(-0.49), 1);
    assert_eq!(mesh.cell_of(0.0), 1);
    assert_eq!(mesh.cell_of(1.0), 3);
    assert_eq!(mesh.cell_of(7.0), 3);
    assert_eq!(mesh.cell_of(-7.0), 0);
    assert_eq!(mesh.cell_of_piece([0.0, 0.5]), 2);
  }

  #[test]
  fn cell_lookup_snaps_rounded_nodes() {
    let mesh = UniformMesh::new(Domain::new(0.0, 1.0).unwrap(), 10);
    for inode in 1..10 {
      let x = inode as f64 * 0.1;
      assert_eq!(mesh.cell_of(x), inode - 1);
    }
  }
}
