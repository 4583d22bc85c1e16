//! The variational form of the Helmholtz impedance problem
//!
//! $a(u,v) = integral u' v' - k^2 integral u v - i k (u(a) v(a) + u(b) v(b))$,
//! $b(v) = integral f v + g_a v(a) + g_b v(b)$.
//!
//! Integrals are evaluated with a composite rule on a breakpoint partition of the domain,
//! restricted to the overlap of the supports involved.

use crate::{
  basis::{support_overlap, Basis},
  problem::HelmholtzProblem,
  quadrature::{QuadRule, QuadratureError},
  Complex64, I,
};

/// Relative distance below which two breakpoints coincide.
pub(crate) const BREAKPOINT_TOL: f64 = 1e-12;

pub struct VariationalForm<'a> {
  problem: &'a HelmholtzProblem,
  rule: QuadRule,
  breakpoints: Vec<f64>,
}
impl<'a> VariationalForm<'a> {
  /// `breakpoints` partitions the domain. Integrands are assumed smooth between breakpoints.
  pub fn new(
    problem: &'a HelmholtzProblem,
    rule: QuadRule,
    breakpoints: Vec<f64>,
  ) -> Result<Self, QuadratureError> {
    let [a, b] = problem.domain().bounds();
    let valid = breakpoints.len() >= 2
      && breakpoints.first() == Some(&a)
      && breakpoints.last() == Some(&b)
      && breakpoints.windows(2).all(|w| w[0] < w[1]);
    if !valid {
      return Err(QuadratureError::InvalidInterval(
        breakpoints.first().copied().unwrap_or(f64::NAN),
        breakpoints.last().copied().unwrap_or(f64::NAN),
      ));
    }
    Ok(Self {
      problem,
      rule,
      breakpoints,
    })
  }

  /// Partition into `nsub` equal sub-intervals.
  pub fn uniform(
    problem: &'a HelmholtzProblem,
    rule: QuadRule,
    nsub: usize,
  ) -> Result<Self, QuadratureError> {
    if nsub == 0 {
      let [a, b] = problem.domain().bounds();
      return Err(QuadratureError::InvalidInterval(a, b));
    }
    let breakpoints = crate::quadrature::uniform_breakpoints(problem.domain().bounds(), nsub);
    Self::new(problem, rule, breakpoints)
  }

  pub fn problem(&self) -> &HelmholtzProblem {
    self.problem
  }
  pub fn rule(&self) -> &QuadRule {
    &self.rule
  }
  pub fn breakpoints(&self) -> &[f64] {
    &self.breakpoints
  }

  pub fn has_breakpoint(&self, x: f64) -> bool {
    let tol = BREAKPOINT_TOL * self.problem.domain().length();
    self.breakpoints.iter().any(|&b| (b - x).abs() <= tol)
  }

  /// Checks that `v` is smooth on every piece of the partition.
  pub fn check_resolved<V>(&self, v: &V) -> Result<(), QuadratureError>
  where
    V: Basis + ?Sized,
  {
    match v.kinks().into_iter().find(|&x| !self.has_breakpoint(x)) {
      Some(x) => Err(QuadratureError::UnresolvedKink(x)),
      None => Ok(()),
    }
  }

  /// Sub-intervals of the partition clipped to `[l, r]`.
  pub fn pieces(&self, [l, r]: [f64; 2]) -> Vec<[f64; 2]> {
    let mut cuts = vec![l];
    cuts.extend(self.breakpoints.iter().copied().filter(|&x| l < x && x < r));
    cuts.push(r);
    cuts
      .windows(2)
      .filter(|w| w[0] < w[1])
      .map(|w| [w[0], w[1]])
      .collect()
  }

  /// Integrates `f(x, piece)` over `[l, r]`, respecting the partition.
  pub fn integrate<F>(&self, interval: [f64; 2], f: F) -> Complex64
  where
    F: Fn(f64, [f64; 2]) -> Complex64,
  {
    self
      .pieces(interval)
      .into_iter()
      .flat_map(|piece| self.rule.map_to(piece).map(move |p| (p, piece)))
      .map(|(p, piece)| p.weight * f(p.x, piece))
      .sum()
  }

  /// $a(u, v)$
  pub fn bilinear<U, V>(&self, u: &U, v: &V) -> Complex64
  where
    U: Basis + ?Sized,
    V: Basis + ?Sized,
  {
    let domain = self.problem.domain();
    let Some(overlap) = support_overlap(u.support(), v.support(), domain) else {
      return Complex64::from(0.0);
    };
    let k = self.problem.wavenumber();
    let k2 = k * k;

    let interior = if overlap[0] < overlap[1] {
      self.integrate(overlap, |x, piece| {
        u.derivative_on(x, piece) * v.derivative_on(x, piece) - u.evaluate(x) * v.evaluate(x) * k2
      })
    } else {
      Complex64::from(0.0)
    };

    let [a, b] = domain.bounds();
    let boundary = u.evaluate(a) * v.evaluate(a) + u.evaluate(b) * v.evaluate(b);
    interior - I * k * boundary
  }

  /// $b(v)$
  pub fn linear<V>(&self, v: &V) -> Complex64
  where
    V: Basis + ?Sized,
  {
    let domain = self.problem.domain();
    let support = v.support().unwrap_or(domain.bounds());
    let source = self.problem.source();
    let interior = match support_overlap(Some(support), None, domain) {
      Some(interval) if interval[0] < interval[1] => {
        self.integrate(interval, |x, _| source.eval(x) * v.evaluate(x))
      }
      _ => Complex64::from(0.0),
    };
    let [a, b] = domain.bounds();
    interior + self.problem.ga() * v.evaluate(a) + self.problem.gb() * v.evaluate(b)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    basis::FnBasis,
    fe::{hat_basis, ElMatProvider, MassElmat, StiffnessElmat},
    mesh::UniformMesh,
    problem::{Domain, Source},
  };
  use approx::assert_relative_eq;

  fn problem(k: f64) -> HelmholtzProblem {
    HelmholtzProblem::new(
      Domain::new(-1.0, 1.0).unwrap(),
      k,
      Source::constant(2.0),
      Complex64::new(1.0, 0.5),
      Complex64::new(0.0, -1.0),
    )
    .unwrap()
  }

  #[test]
  fn hat_pairs_match_element_matrices() {
    let problem = problem(1.5);
    let mesh = UniformMesh::new(*problem.domain(), 4);
    let form = VariationalForm::new(&problem, QuadRule::gauss_legendre(2).unwrap(), mesh.nodes())
      .unwrap();
    let hats = hat_basis(mesh);
    let cell = mesh.cell(1);
    let expected = StiffnessElmat.eval(cell) - MassElmat.eval(cell) * Complex64::from(1.5 * 1.5);

    // Interior neighbor pair lives on a single cell.
    let computed = form.bilinear(&hats[1], &hats[2]);
    assert_relative_eq!(computed.re, expected[(0, 1)].re, max_relative = 1e-12);
    assert_relative_eq!(computed.im, 0.0);

    // Interior diagonal gets two cell contributions.
    let computed = form.bilinear(&hats[2], &hats[2]);
    assert_relative_eq!(computed.re, 2.0 * expected[(0, 0)].re, max_relative = 1e-12);

    // Boundary diagonal picks up the impedance term.
    let computed = form.bilinear(&hats[0], &hats[0]);
    assert_relative_eq!(computed.re, expected[(0, 0)].re, max_relative = 1e-12);
    assert_relative_eq!(computed.im, -1.5, max_relative = 1e-12);

    // Disjoint supports.
    assert_eq!(form.bilinear(&hats[0], &hats[3]), Complex64::from(0.0));
  }

  #[test]
  fn linear_form_with_boundary_data() {
    let problem = problem(1.0);
    let mesh = UniformMesh::new(*problem.domain(), 4);
    let form = VariationalForm::new(&problem, QuadRule::gauss_legendre(2).unwrap(), mesh.nodes())
      .unwrap();
    let hats = hat_basis(mesh);
    let h = mesh.h();
    assert_relative_eq!(form.linear(&hats[2]).re, 2.0 * h, max_relative = 1e-12);
    let first = form.linear(&hats[0]);
    assert_relative_eq!(first.re, h + 1.0, max_relative = 1e-12);
    assert_relative_eq!(first.im, 0.5, max_relative = 1e-12);
    let last = form.linear(&hats[4]);
    assert_relative_eq!(last.im, -1.0, max_relative = 1e-12);
  }

  #[test]
  fn smooth_functions_integrate_globally() {
    let problem = problem(2.0);
    let form = VariationalForm::uniform(&problem, QuadRule::gauss_legendre(8).unwrap(), 4).unwrap();
    // u = x, v = x^2: int u'v' = int 2x = 0, int u v = int x^3 = 0
    let u = FnBasis::new(Complex64::from, |_| Complex64::from(1.0));
    let v = FnBasis::new(|x: f64| Complex64::from(x * x), |x: f64| Complex64::from(2.0 * x));
    let value = form.bilinear(&u, &v);
    // boundary: u(-1)v(-1) + u(1)v(1) = -1 + 1 = 0
    assert!(value.norm() < 1e-13);

    // u = v = 1: a = -k^2 |I| - 2ik
    let one = FnBasis::new(|_| Complex64::from(1.0), |_| Complex64::from(0.0));
    let value = form.bilinear(&one, &one);
    assert_relative_eq!(value.re, -8.0, max_relative = 1e-12);
    assert_relative_eq!(value.im, -4.0, max_relative = 1e-12);
  }

  #[test]
  fn pieces_follow_breakpoints() {
    let problem = problem(1.0);
    let form = VariationalForm::uniform(&problem, QuadRule::gauss_legendre(1).unwrap(), 4).unwrap();
    assert_eq!(
      form.pieces([-0.75, 0.25]),
      vec![[-0.75, -0.5], [-0.5, 0.0], [0.0, 0.25]]
    );
    assert_eq!(form.pieces([0.0, 0.5]), vec![[0.0, 0.5]]);
  }

  #[test]
  fn hat_kinks_must_be_breakpoints() {
    let problem = problem(1.0);
    let rule = QuadRule::gauss_legendre(2).unwrap();
    let hats = hat_basis(UniformMesh::new(*problem.domain(), 4));

    // pieces of width 2/3 straddle the hat nodes at -1/2, 0 and 1/2
    let coarse = VariationalForm::uniform(&problem, rule.clone(), 3).unwrap();
    assert!(!coarse.has_breakpoint(0.0));
    assert_eq!(
      coarse.check_resolved(&hats[2]),
      Err(QuadratureError::UnresolvedKink(-0.5))
    );
    assert!(hats.iter().all(|hat| coarse.check_resolved(hat).is_err()));

    let fine = VariationalForm::uniform(&problem, rule, 8).unwrap();
    assert!(hats.iter().all(|hat| fine.check_resolved(hat).is_ok()));
    let smooth = FnBasis::new(Complex64::from, |_| Complex64::from(1.0));
    assert!(coarse.check_resolved(&smooth).is_ok());
  }

  #[test]
  fn invalid_partitions() {
    let problem = problem(1.0);
    let rule = QuadRule::gauss_legendre(2).unwrap();
    assert!(VariationalForm::new(&problem, rule.clone(), vec![-1.0, 0.0]).is_err());
    assert!(VariationalForm::new(&problem, rule.clone(), vec![-1.0, 0.5, 0.0, 1.0]).is_err());
    assert!(VariationalForm::uniform(&problem, rule, 0).is_err());
  }
}
