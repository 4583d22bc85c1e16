use crate::Complex64;

/// Dense LU factorization with partial pivoting.
pub struct LuSolver {
  norm: f64,
  raw: na::LU<Complex64, na::Dyn, na::Dyn>,
}
impl LuSolver {
  pub fn new(a: na::DMatrix<Complex64>) -> Self {
    assert!(a.is_square());
    let norm = a.norm();
    let raw = a.lu();
    Self { norm, raw }
  }

  /// Frobenius-norm condition number $norm(A) norm(A^(-1))$.
  ///
  /// Infinite if the matrix cannot be inverted.
  pub fn condition_number(&self) -> f64 {
    match self.raw.try_inverse() {
      Some(inverse) => {
        let cond = self.norm * inverse.norm();
        if cond.is_finite() {
          cond
        } else {
          f64::INFINITY
        }
      }
      None => f64::INFINITY,
    }
  }

  pub fn solve(&self, b: &na::DVector<Complex64>) -> Option<na::DVector<Complex64>> {
    self
      .raw
      .solve(b)
      .filter(|x| x.iter().all(|v| v.re.is_finite() && v.im.is_finite()))
  }
}

/// Dense $n times n$ matrix from constant diagonals at the given offsets.
pub fn matrix_from_const_diagonals<T>(
  values: &[T],
  offsets: &[isize],
  nrows: usize,
  ncols: usize,
) -> na::DMatrix<T>
where
  T: num_traits::Zero + na::Scalar + Copy,
{
  let mut matrix = na::DMatrix::zeros(nrows, ncols);

  for (idiag, &offset) in offsets.iter().enumerate() {
    let [start_row, start_col] = if offset >= 0 {
      [0, offset as usize]
    } else {
      [(-offset) as usize, 0]
    };

    let mut r = start_row;
    let mut c = start_col;
    while r < nrows && c < ncols {
      matrix[(r, c)] = values[idiag];
      r += 1;
      c += 1;
    }
  }

  matrix
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn lu_solves_complex_system() {
    let a = na::DMatrix::from_row_slice(
      2,
      2,
      &[
        Complex64::new(0.0, 1.0),
        Complex64::new(2.0, 0.0),
        Complex64::new(1.0, 0.0),
        Complex64::new(1.0, -1.0),
      ],
    );
    let x = na::DVector::from_vec(vec![Complex64::new(1.0, 2.0), Complex64::new(-3.0, 0.5)]);
    let b = &a * &x;
    let lu = LuSolver::new(a);
    let solved = lu.solve(&b).unwrap();
    assert!((solved - x).norm() < 1e-12);
    assert!(lu.condition_number().is_finite());
  }

  #[test]
  fn singular_matrix_has_infinite_condition() {
    let one = Complex64::from(1.0);
    let a = na::DMatrix::from_element(3, 3, one);
    assert!(LuSolver::new(a).condition_number() > 1e15);
  }

  #[test]
  fn identity_condition() {
    let id = na::DMatrix::<Complex64>::identity(4, 4);
    // Frobenius norm of the identity is sqrt(n)
    assert_relative_eq!(LuSolver::new(id).condition_number(), 4.0, max_relative = 1e-14);
  }

  #[test]
  fn const_diagonals() {
    let m = matrix_from_const_diagonals(&[2, -1, -1], &[0, 1, -1], 3, 3);
    assert_eq!(m, na::DMatrix::from_row_slice(3, 3, &[2, -1, 0, -1, 2, -1, 0, -1, 2]));
  }
}
