/// Observed order $-log_2 ("next" / "prev")$ between two successive halvings of the mesh width.
pub fn algebraic_convergence_rate(next: f64, prev: f64) -> f64 {
  let quot: f64 = next / prev;
  -quot.log2()
}

/// `n` equispaced points covering `[a, b]`, both ends included.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
  match n {
    0 => Vec::new(),
    1 => vec![a],
    _ => {
      let h = (b - a) / (n - 1) as f64;
      (0..n)
        .map(|i| if i + 1 == n { b } else { a + i as f64 * h })
        .collect()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn rates() {
    assert_relative_eq!(algebraic_convergence_rate(0.25, 1.0), 2.0);
    assert_relative_eq!(algebraic_convergence_rate(0.5, 0.125), -2.0);
  }

  #[test]
  fn linspace_includes_ends() {
    assert_eq!(linspace(-1.0, 1.0, 5), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
    assert!(linspace(0.0, 1.0, 0).is_empty());
  }
}
