//! Error norms between an analytical and a numerical solution.

use crate::{basis::Basis, quadrature::CompositeRule, Complex64};

/// $norm(u - u_h)_(L^2) + norm(u' - u'_h)_(L^2)$ and its two parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct H1Error {
  pub l2: f64,
  pub l2_derivative: f64,
}
impl H1Error {
  pub fn total(&self) -> f64 {
    self.l2 + self.l2_derivative
  }
}

/// H1 error of closures over the nodes of `rule`.
///
/// Derivatives receive the sub-interval of the node, so piecewise-smooth approximations
/// can be evaluated on the correct side of a kink.
/// Vanishes iff the functions agree on every quadrature node.
pub fn h1_error<U, DU, V, DV>(u: U, du: DU, uh: V, duh: DV, rule: &CompositeRule) -> H1Error
where
  U: Fn(f64) -> Complex64,
  DU: Fn(f64) -> Complex64,
  V: Fn(f64) -> Complex64,
  DV: Fn(f64, [f64; 2]) -> Complex64,
{
  let l2_sq = rule.integrate_real(|x, _| (u(x) - uh(x)).norm_sqr());
  let l2_derivative_sq = rule.integrate_real(|x, piece| (du(x) - duh(x, piece)).norm_sqr());
  H1Error {
    l2: l2_sq.sqrt(),
    l2_derivative: l2_derivative_sq.sqrt(),
  }
}

pub fn h1_error_between<U, V>(exact: &U, numerical: &V, rule: &CompositeRule) -> H1Error
where
  U: Basis + ?Sized,
  V: Basis + ?Sized,
{
  h1_error(
    |x| exact.evaluate(x),
    |x| exact.derivative(x),
    |x| numerical.evaluate(x),
    |x, piece| numerical.derivative_on(x, piece),
    rule,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::quadrature::QuadRule;
  use approx::assert_relative_eq;

  #[test]
  fn identical_functions_have_zero_error() {
    let rule = QuadRule::gauss_legendre(3).unwrap();
    let rule = CompositeRule::uniform(&rule, [0.0, 1.0], 4).unwrap();
    let f = |x: f64| Complex64::new(x.sin(), x);
    let df = |x: f64| Complex64::new(x.cos(), 1.0);
    let err = h1_error(f, df, f, |x, _| df(x), &rule);
    assert_eq!(err.total(), 0.0);
  }

  #[test]
  fn known_difference() {
    // u - u_h = i x on [0, 1]: L2 = 1/sqrt(3), derivative L2 = 1
    let rule = QuadRule::gauss_legendre(2).unwrap();
    let rule = CompositeRule::uniform(&rule, [0.0, 1.0], 2).unwrap();
    let err = h1_error(
      |x| Complex64::new(1.0, x),
      |_| Complex64::new(0.0, 1.0),
      |_| Complex64::new(1.0, 0.0),
      |_, _| Complex64::new(0.0, 0.0),
      &rule,
    );
    assert_relative_eq!(err.l2, 3f64.sqrt().recip(), max_relative = 1e-14);
    assert_relative_eq!(err.l2_derivative, 1.0, max_relative = 1e-14);
    assert_relative_eq!(err.total(), 1.0 + 3f64.sqrt().recip(), max_relative = 1e-14);
  }
}
