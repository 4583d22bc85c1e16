//! Analytical solution of the Helmholtz impedance problem for $k > 0$.
//!
//! $u = u_G + w$ with the outgoing Green's function $G(x,t) = i/(2k) e^(i k |x - t|)$,
//! $u_G (x) = integral_a^b G(x,t) f(t) dt$ solving the homogeneous impedance problem,
//! and $w = A e^(i k x) + B e^(-i k x)$ picking up the boundary data.

use crate::{
  basis::Basis,
  problem::{ConfigError, HelmholtzProblem, Source},
  quadrature::{uniform_breakpoints, QuadRule},
  Complex64, I,
};

/// Gauss-Legendre points per sub-interval of the Green's integral.
pub const GREEN_QUAD_ORDER: usize = 16;
/// Sub-intervals on each side of the kink $t = x$ of the Green's integral.
pub const GREEN_QUAD_NSUB: usize = 16;

#[derive(Debug, Clone)]
pub struct ExactSolution {
  problem: HelmholtzProblem,
  amp_right: Complex64,
  amp_left: Complex64,
  rule: QuadRule,
}

impl ExactSolution {
  pub fn new(problem: &HelmholtzProblem) -> Result<Self, crate::Error> {
    let k = problem.wavenumber();
    if k <= 0.0 {
      return Err(ConfigError::ZeroWavenumber(k).into());
    }
    let [a, b] = problem.domain().bounds();
    let ik2 = 2.0 * I * k;
    let amp_right = -problem.ga() * (-I * k * a).exp() / ik2;
    let amp_left = -problem.gb() * (I * k * b).exp() / ik2;
    let rule = QuadRule::gauss_legendre(GREEN_QUAD_ORDER)?;
    Ok(Self {
      problem: problem.clone(),
      amp_right,
      amp_left,
      rule,
    })
  }

  pub fn problem(&self) -> &HelmholtzProblem {
    &self.problem
  }

  fn wavenumber(&self) -> f64 {
    self.problem.wavenumber()
  }

  /// $w(x)$ and $w'(x)$
  fn boundary_part(&self, x: f64) -> [Complex64; 2] {
    let k = self.wavenumber();
    let right = self.amp_right * (I * k * x).exp();
    let left = self.amp_left * (-I * k * x).exp();
    [right + left, I * k * (right - left)]
  }

  /// $u_G (x)$ and $u'_G (x)$
  fn source_part(&self, x: f64) -> [Complex64; 2] {
    let k = self.wavenumber();
    let [a, b] = self.problem.domain().bounds();
    let el = (I * k * (x - a)).exp();
    let er = (I * k * (b - x)).exp();
    match self.problem.source() {
      Source::Constant(f) => {
        let value = *f / (2.0 * k * k) * (el + er - 2.0);
        let deriv = I * *f / (2.0 * k) * (el - er);
        [value, deriv]
      }
      Source::Function(f) => {
        // $G_x (x,t) = -1/2 sign(x - t) e^(i k |x - t|)$
        let mut value = Complex64::from(0.0);
        let mut deriv = Complex64::from(0.0);
        for (side, interval) in [(1.0, [a, x]), (-1.0, [x, b])] {
          if interval[0] >= interval[1] {
            continue;
          }
          for piece in uniform_breakpoints(interval, GREEN_QUAD_NSUB).windows(2) {
            for p in self.rule.map_to([piece[0], piece[1]]) {
              let kernel = (I * k * (x - p.x).abs()).exp() * f(p.x) * p.weight;
              value += kernel;
              deriv += kernel * side;
            }
          }
        }
        [value * I / (2.0 * k), deriv * -0.5]
      }
    }
  }

  /// Residuals $-u'(a) - i k u(a) - g_a$ and $u'(b) - i k u(b) - g_b$ of the impedance conditions.
  pub fn boundary_residuals(&self) -> [Complex64; 2] {
    let k = self.wavenumber();
    let [a, b] = self.problem.domain().bounds();
    let ra = -self.derivative(a) - I * k * self.evaluate(a) - self.problem.ga();
    let rb = self.derivative(b) - I * k * self.evaluate(b) - self.problem.gb();
    [ra, rb]
  }
}

impl Basis for ExactSolution {
  fn evaluate(&self, x: f64) -> Complex64 {
    self.source_part(x)[0] + self.boundary_part(x)[0]
  }
  fn derivative(&self, x: f64) -> Complex64 {
    self.source_part(x)[1] + self.boundary_part(x)[1]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::problem::Domain;
  use approx::assert_relative_eq;

  fn problem(source: Source) -> HelmholtzProblem {
    HelmholtzProblem::new(
      Domain::new(-1.0, 2.0).unwrap(),
      2.5,
      source,
      Complex64::new(0.3, -1.0),
      Complex64::new(-2.0, 0.5),
    )
    .unwrap()
  }

  #[test]
  fn impedance_conditions_hold() {
    for source in [
      Source::constant(Complex64::new(4.0, 1.0)),
      Source::function(|x| Complex64::new(x * x, (3.0 * x).sin())),
    ] {
      let exact = ExactSolution::new(&problem(source)).unwrap();
      for r in exact.boundary_residuals() {
        assert!(r.norm() < 1e-10, "residual {r}");
      }
    }
  }

  #[test]
  fn constant_source_matches_quadrature_of_green() {
    let f = Complex64::new(4.0, 1.0);
    let closed = ExactSolution::new(&problem(Source::constant(f))).unwrap();
    let quad = ExactSolution::new(&problem(Source::function(move |_| f))).unwrap();
    for x in [-1.0, -0.3, 0.5, 1.7, 2.0] {
      let (u0, u1) = (closed.evaluate(x), quad.evaluate(x));
      assert_relative_eq!(u0.re, u1.re, epsilon = 1e-11);
      assert_relative_eq!(u0.im, u1.im, epsilon = 1e-11);
      let (d0, d1) = (closed.derivative(x), quad.derivative(x));
      assert_relative_eq!(d0.re, d1.re, epsilon = 1e-11);
      assert_relative_eq!(d0.im, d1.im, epsilon = 1e-11);
    }
  }

  #[test]
  fn satisfies_the_pde() {
    // $-u'' - k^2 u = f$ checked with a central difference of $u'$
    let f = Complex64::new(4.0, 1.0);
    let exact = ExactSolution::new(&problem(Source::constant(f))).unwrap();
    let k = 2.5;
    let eps = 1e-5;
    for x in [-0.5, 0.2, 1.3] {
      let upp = (exact.derivative(x + eps) - exact.derivative(x - eps)) / (2.0 * eps);
      let lhs = -upp - exact.evaluate(x) * (k * k);
      assert!((lhs - f).norm() < 1e-5, "pde residual {}", (lhs - f).norm());
    }
  }

  #[test]
  fn zero_wavenumber_is_rejected() {
    let problem = problem(Source::constant(1.0)).with_wavenumber(0.0).unwrap();
    assert!(matches!(
      ExactSolution::new(&problem),
      Err(crate::Error::Config(ConfigError::ZeroWavenumber(_)))
    ));
  }
}
