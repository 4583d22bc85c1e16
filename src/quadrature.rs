//! Gauss-type quadrature on intervals.
//!
//! A [`QuadRule`] lives on the reference interval $[-1,1]$ and is mapped
//! affinely onto sub-intervals. A [`CompositeRule`] is the union of such local
//! rules over a partition.

use crate::Complex64;

use itertools::Itertools;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuadratureError {
  #[error("invalid interval [{0}, {1}]: need finite bounds with x_l < x_r")]
  InvalidInterval(f64, f64),
  #[error("invalid quadrature order {order}: {kind:?} needs at least {min} points")]
  InvalidOrder {
    kind: QuadratureKind,
    order: usize,
    min: usize,
  },
  #[error("derivative jumps at {0}, which is not a breakpoint of the partition")]
  UnresolvedKink(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuadratureKind {
  /// Interior nodes, exact up to degree $2n-1$.
  #[default]
  GaussLegendre,
  /// Includes both endpoints, exact up to degree $2n-3$.
  GaussLobatto,
}
impl QuadratureKind {
  pub fn min_order(&self) -> usize {
    match self {
      Self::GaussLegendre => 1,
      Self::GaussLobatto => 2,
    }
  }
  /// Highest polynomial degree integrated exactly by `order` points.
  pub fn exactness(&self, order: usize) -> usize {
    match self {
      Self::GaussLegendre => 2 * order - 1,
      Self::GaussLobatto => 2 * order - 3,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadPoint {
  pub x: f64,
  pub weight: f64,
}

const NEWTON_TOL: f64 = 1e-15;
const NEWTON_MAX_ITER: usize = 100;

/// A quadrature rule defined on the reference interval $[-1,1]$.
#[derive(Debug, Clone)]
pub struct QuadRule {
  kind: QuadratureKind,
  nodes: Vec<f64>,
  weights: Vec<f64>,
}
impl QuadRule {
  pub fn new(kind: QuadratureKind, order: usize) -> Result<Self, QuadratureError> {
    if order < kind.min_order() {
      return Err(QuadratureError::InvalidOrder {
        kind,
        order,
        min: kind.min_order(),
      });
    }
    let (nodes, weights) = match kind {
      QuadratureKind::GaussLegendre => gauss_legendre_ref(order),
      QuadratureKind::GaussLobatto => gauss_lobatto_ref(order),
    };
    Ok(Self {
      kind,
      nodes,
      weights,
    })
  }
  pub fn gauss_legendre(order: usize) -> Result<Self, QuadratureError> {
    Self::new(QuadratureKind::GaussLegendre, order)
  }

  pub fn kind(&self) -> QuadratureKind {
    self.kind
  }
  pub fn order(&self) -> usize {
    self.nodes.len()
  }
  pub fn ref_nodes(&self) -> &[f64] {
    &self.nodes
  }
  pub fn ref_weights(&self) -> &[f64] {
    &self.weights
  }

  /// Nodes and weights mapped onto $[x_l, x_r]$.
  pub fn points_on(&self, interval: [f64; 2]) -> Result<Vec<QuadPoint>, QuadratureError> {
    check_interval(interval)?;
    Ok(self.map_to(interval).collect())
  }

  /// Integrates `f` over `interval`.
  pub fn integrate<F>(&self, f: F, interval: [f64; 2]) -> Result<Complex64, QuadratureError>
  where
    F: Fn(f64) -> Complex64,
  {
    check_interval(interval)?;
    Ok(self.map_to(interval).map(|p| p.weight * f(p.x)).sum())
  }

  /// Affine transform from the reference interval. Caller guarantees a valid interval.
  pub(crate) fn map_to(&self, [xl, xr]: [f64; 2]) -> impl Iterator<Item = QuadPoint> + '_ {
    let mid = 0.5 * (xl + xr);
    let half = 0.5 * (xr - xl);
    self
      .nodes
      .iter()
      .zip(&self.weights)
      .map(move |(&t, &w)| QuadPoint {
        // pin the endpoints of Lobatto rules exactly
        x: if t == -1.0 {
          xl
        } else if t == 1.0 {
          xr
        } else {
          mid + half * t
        },
        weight: half * w,
      })
  }
}

/// Gauss-Legendre points and weights for `order` points on `interval`.
///
/// Exact for polynomials up to degree $2 dot "order" - 1$.
pub fn integrate(interval: [f64; 2], order: usize) -> Result<Vec<QuadPoint>, QuadratureError> {
  QuadRule::gauss_legendre(order)?.points_on(interval)
}

fn check_interval([xl, xr]: [f64; 2]) -> Result<(), QuadratureError> {
  if xl.is_finite() && xr.is_finite() && xl < xr {
    Ok(())
  } else {
    Err(QuadratureError::InvalidInterval(xl, xr))
  }
}

/// Legendre polynomial $P_n$ together with its first and second derivative.
///
/// Uses the three-term recurrence and the derivative recurrence
/// $P'_n = P'_(n-2) + (2n-1) P_(n-1)$, which stays well-defined at $x = plus.minus 1$.
pub fn legendre(n: usize, x: f64) -> [f64; 3] {
  if n == 0 {
    return [1.0, 0.0, 0.0];
  }
  let (mut p0, mut p1) = (1.0, x);
  let (mut d0, mut d1) = (0.0, 1.0);
  let (mut s0, mut s1) = (0.0, 0.0);
  for m in 2..=n {
    let mf = m as f64;
    let p2 = ((2.0 * mf - 1.0) * x * p1 - (mf - 1.0) * p0) / mf;
    let d2 = d0 + (2.0 * mf - 1.0) * p1;
    let s2 = s0 + (2.0 * mf - 1.0) * d1;
    (p0, p1) = (p1, p2);
    (d0, d1) = (d1, d2);
    (s0, s1) = (s1, s2);
  }
  [p1, d1, s1]
}

/// Newton iteration on the roots of $P_n$.
fn gauss_legendre_ref(n: usize) -> (Vec<f64>, Vec<f64>) {
  (0..n)
    .map(|i| {
      let mut x = -(std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
      for _ in 0..NEWTON_MAX_ITER {
        let [p, dp, _] = legendre(n, x);
        let dx = p / dp;
        x -= dx;
        if dx.abs() <= NEWTON_TOL * x.abs().max(1.0) {
          break;
        }
      }
      let [_, dp, _] = legendre(n, x);
      (x, 2.0 / ((1.0 - x * x) * dp * dp))
    })
    .unzip()
}

/// Endpoints plus Newton iteration on the roots of $P'_(n-1)$.
fn gauss_lobatto_ref(n: usize) -> (Vec<f64>, Vec<f64>) {
  let m = n - 1;
  let end_weight = 2.0 / (n * m) as f64;
  let interior = (1..m).map(|i| {
    let mut x = -(std::f64::consts::PI * i as f64 / m as f64).cos();
    for _ in 0..NEWTON_MAX_ITER {
      let [_, dp, ddp] = legendre(m, x);
      let dx = dp / ddp;
      x -= dx;
      if dx.abs() <= NEWTON_TOL * x.abs().max(1.0) {
        break;
      }
    }
    let [p, _, _] = legendre(m, x);
    (x, end_weight / (p * p))
  });
  std::iter::once((-1.0, end_weight))
    .chain(interior)
    .chain(std::iter::once((1.0, end_weight)))
    .unzip()
}

/// A node of a composite rule together with the sub-interval it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadNode {
  pub x: f64,
  pub weight: f64,
  pub piece: [f64; 2],
}

/// Union of local rules over a partition of an interval.
#[derive(Debug, Clone)]
pub struct CompositeRule {
  nodes: Vec<QuadNode>,
}
impl CompositeRule {
  /// `breakpoints` must be strictly increasing.
  pub fn new(rule: &QuadRule, breakpoints: &[f64]) -> Result<Self, QuadratureError> {
    if breakpoints.len() < 2 {
      let x = breakpoints.first().copied().unwrap_or(f64::NAN);
      return Err(QuadratureError::InvalidInterval(x, x));
    }
    let mut nodes = Vec::with_capacity(rule.order() * (breakpoints.len() - 1));
    for (&xl, &xr) in breakpoints.iter().tuple_windows() {
      let piece = [xl, xr];
      check_interval(piece)?;
      nodes.extend(rule.map_to(piece).map(|p| QuadNode {
        x: p.x,
        weight: p.weight,
        piece,
      }));
    }
    Ok(Self { nodes })
  }

  /// `nsub` equally sized sub-intervals of `interval`.
  pub fn uniform(
    rule: &QuadRule,
    interval: [f64; 2],
    nsub: usize,
  ) -> Result<Self, QuadratureError> {
    check_interval(interval)?;
    Self::new(rule, &uniform_breakpoints(interval, nsub))
  }

  pub fn nodes(&self) -> &[QuadNode] {
    &self.nodes
  }
  pub fn len(&self) -> usize {
    self.nodes.len()
  }
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Integrates `f(x, piece)` over the whole partition.
  pub fn integrate<F>(&self, f: F) -> Complex64
  where
    F: Fn(f64, [f64; 2]) -> Complex64,
  {
    self.nodes.iter().map(|n| n.weight * f(n.x, n.piece)).sum()
  }

  pub fn integrate_real<F>(&self, f: F) -> f64
  where
    F: Fn(f64, [f64; 2]) -> f64,
  {
    self.nodes.iter().map(|n| n.weight * f(n.x, n.piece)).sum()
  }
}

/// Choice of the local rule and of the number of sub-intervals of a composite rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureConfig {
  pub kind: QuadratureKind,
  /// Points per sub-interval.
  pub order: usize,
  pub nsub: usize,
}
impl Default for QuadratureConfig {
  fn default() -> Self {
    Self {
      kind: QuadratureKind::GaussLegendre,
      order: 8,
      nsub: 16,
    }
  }
}
impl QuadratureConfig {
  pub fn validate(&self) -> Result<(), QuadratureError> {
    if self.order < self.kind.min_order() {
      return Err(QuadratureError::InvalidOrder {
        kind: self.kind,
        order: self.order,
        min: self.kind.min_order(),
      });
    }
    if self.nsub == 0 {
      return Err(QuadratureError::InvalidInterval(0.0, 0.0));
    }
    Ok(())
  }

  pub fn rule(&self) -> Result<QuadRule, QuadratureError> {
    QuadRule::new(self.kind, self.order)
  }

  pub fn composite(&self, interval: [f64; 2]) -> Result<CompositeRule, QuadratureError> {
    self.validate()?;
    CompositeRule::uniform(&self.rule()?, interval, self.nsub)
  }
}

pub fn uniform_breakpoints([xl, xr]: [f64; 2], nsub: usize) -> Vec<f64> {
  let h = (xr - xl) / nsub as f64;
  (0..=nsub)
    .map(|i| if i == nsub { xr } else { xl + i as f64 * h })
    .collect()
}
