//! Variational residuals $R_k - F_k = a(u_"NN", w v_k) - b(w v_k)$ of a network
//! against a test space.
//!
//! The quadrature nodes and test function samples are fixed, so they are tabulated once.
//! Each evaluation then needs one forward trace of the network per distinct node.

use super::network::{add_gradients, flatten, Network, Trace};
use crate::{
  basis::{Basis, TestFunction, TestSpace},
  form::{VariationalForm, BREAKPOINT_TOL},
  problem::Domain,
  quadrature::{uniform_breakpoints, QuadratureError},
  Complex64, I,
};

use rayon::prelude::*;

/// Uniform partition of the domain, refined by the kinks of locally supported test functions.
pub fn test_breakpoints(domain: &Domain, tests: &TestSpace, nsub: usize) -> Vec<f64> {
  let mut breakpoints = uniform_breakpoints(domain.bounds(), nsub);
  breakpoints.extend(tests.functions().iter().filter_map(|v| match v {
    TestFunction::Hat(hat) => Some(hat.node()),
    _ => None,
  }));
  breakpoints.sort_by(f64::total_cmp);
  let tol = BREAKPOINT_TOL * domain.length();
  breakpoints.dedup_by(|next, prev| (*next - *prev).abs() <= tol);
  breakpoints
}

/// Contribution of a network sample to one test.
#[derive(Debug, Clone, Copy)]
struct Entry {
  point: usize,
  /// quadrature weight times $w v_k (x)$
  value: f64,
  /// quadrature weight times $w v'_k (x)$
  derivative: f64,
}

/// The residual of a single test function.
#[derive(Debug, Clone)]
struct TestRow {
  entries: Vec<Entry>,
  /// $w v_k (a)$ and $w v_k (b)$
  boundary: [f64; 2],
  /// $F_k = b(w v_k)$
  target: Complex64,
}

/// Loss value together with its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
  pub loss: f64,
  /// $R_k - F_k$
  pub residuals: Vec<Complex64>,
  /// Boundary penalty part of the loss.
  pub penalty: f64,
}

/// Tabulated residual evaluation of a network against a fixed test space.
#[derive(Debug, Clone)]
pub struct ResidualPlan {
  wavenumber: f64,
  ga: Complex64,
  gb: Complex64,
  penalty: f64,
  /// $a$, $b$ and then all quadrature nodes.
  points: Vec<f64>,
  rows: Vec<TestRow>,
}

const POINT_A: usize = 0;
const POINT_B: usize = 1;

impl ResidualPlan {
  /// Tabulates the tests on the partition and rule of `form`.
  ///
  /// Test functions with local support only use the sub-intervals inside their support.
  /// Every kink of a test function must be a breakpoint of `form`, see [`test_breakpoints`].
  /// `penalty` weights the impedance boundary residuals, zero disables them.
  pub fn new(
    form: &VariationalForm,
    tests: &TestSpace,
    penalty: f64,
  ) -> Result<Self, QuadratureError> {
    let problem = form.problem();
    let [a, b] = problem.domain().bounds();
    let source = problem.source();
    let weight = tests.weight();
    for v in tests.functions() {
      form.check_resolved(v)?;
    }

    let pieces = form.pieces([a, b]);
    let mut points = vec![a, b];
    let mut nodes = Vec::new();
    for piece in pieces {
      for p in form.rule().map_to(piece) {
        nodes.push((points.len(), p.x, p.weight, piece));
        points.push(p.x);
      }
    }
    if nodes.is_empty() {
      return Err(QuadratureError::InvalidInterval(a, b));
    }

    let rows = tests
      .functions()
      .par_iter()
      .map(|v| {
        let support = v.support().unwrap_or([a, b]);
        let mut entries = Vec::new();
        let mut target = Complex64::from(0.0);
        for &(point, x, qweight, [xl, xr]) in &nodes {
          let mid = 0.5 * (xl + xr);
          if mid < support[0] || mid > support[1] {
            continue;
          }
          let value = qweight * weight * v.evaluate(x).re;
          let derivative = qweight * weight * v.derivative_on(x, [xl, xr]).re;
          target += source.eval(x) * value;
          if value != 0.0 || derivative != 0.0 {
            entries.push(Entry {
              point,
              value,
              derivative,
            });
          }
        }
        let boundary = [weight * v.evaluate(a).re, weight * v.evaluate(b).re];
        target += problem.ga() * boundary[0] + problem.gb() * boundary[1];
        TestRow {
          entries,
          boundary,
          target,
        }
      })
      .collect();

    Ok(Self {
      wavenumber: problem.wavenumber(),
      ga: problem.ga(),
      gb: problem.gb(),
      penalty,
      points,
      rows,
    })
  }

  pub fn ntests(&self) -> usize {
    self.rows.len()
  }
  pub fn npoints(&self) -> usize {
    self.points.len()
  }

  /// Forward traces at all points, evaluated in parallel.
  fn traces(&self, network: &Network) -> Vec<Trace> {
    self.points.par_iter().map(|&x| network.trace(x)).collect()
  }

  /// $R_k$ for all tests, from the sampled values and derivatives.
  fn residuals(&self, traces: &[Trace]) -> Vec<Complex64> {
    let k = self.wavenumber;
    self
      .rows
      .par_iter()
      .map(|row| {
        let interior: Complex64 = row
          .entries
          .iter()
          .map(|e| {
            let t = &traces[e.point];
            t.derivative * e.derivative - t.value * (k * k * e.value)
          })
          .sum();
        let boundary =
          traces[POINT_A].value * row.boundary[0] + traces[POINT_B].value * row.boundary[1];
        interior - I * k * boundary - row.target
      })
      .collect()
  }

  /// $g_a + u'(a) + i k u(a)$ and $u'(b) - i k u(b) - g_b$
  fn boundary_errors(&self, traces: &[Trace]) -> [Complex64; 2] {
    let k = self.wavenumber;
    let (ta, tb) = (&traces[POINT_A], &traces[POINT_B]);
    [
      self.ga + ta.derivative + I * k * ta.value,
      tb.derivative - I * k * tb.value - self.gb,
    ]
  }

  fn evaluate_traces(&self, traces: &[Trace]) -> Evaluation {
    let residuals = self.residuals(traces);
    let mean = residuals.iter().map(|r| r.norm_sqr()).sum::<f64>() / residuals.len() as f64;
    let penalty = if self.penalty != 0.0 {
      let [ea, eb] = self.boundary_errors(traces);
      0.5 * self.penalty * (ea.norm_sqr() + eb.norm_sqr())
    } else {
      0.0
    };
    Evaluation {
      loss: mean + penalty,
      residuals,
      penalty,
    }
  }

  /// $1/K sum_k |R_k - F_k|^2$ plus the optional boundary penalty.
  pub fn evaluate(&self, network: &Network) -> Evaluation {
    self.evaluate_traces(&self.traces(network))
  }

  pub fn loss(&self, network: &Network) -> f64 {
    self.evaluate(network).loss
  }

  /// Loss and its gradient with respect to [`Network::params`].
  pub fn loss_and_gradient(&self, network: &Network) -> (Evaluation, na::DVector<f64>) {
    let traces = self.traces(network);
    let evaluation = self.evaluate_traces(&traces);
    let k = self.wavenumber;
    let scale = 2.0 / self.rows.len() as f64;

    // adjoints of (Re, Im) of the sampled values and derivatives
    let mut adj_value = vec![[0.0; 2]; self.points.len()];
    let mut adj_derivative = vec![[0.0; 2]; self.points.len()];
    for (row, r) in self.rows.iter().zip(&evaluation.residuals) {
      let (re, im) = (scale * r.re, scale * r.im);
      for e in &row.entries {
        adj_derivative[e.point][0] += e.derivative * re;
        adj_derivative[e.point][1] += e.derivative * im;
        adj_value[e.point][0] -= k * k * e.value * re;
        adj_value[e.point][1] -= k * k * e.value * im;
      }
      for (point, bv) in [(POINT_A, row.boundary[0]), (POINT_B, row.boundary[1])] {
        adj_value[point][0] -= k * bv * im;
        adj_value[point][1] += k * bv * re;
      }
    }
    if self.penalty != 0.0 {
      let p = self.penalty;
      let [ea, eb] = self.boundary_errors(&traces);
      adj_derivative[POINT_A][0] += p * ea.re;
      adj_derivative[POINT_A][1] += p * ea.im;
      adj_value[POINT_A][0] += p * k * ea.im;
      adj_value[POINT_A][1] -= p * k * ea.re;
      adj_derivative[POINT_B][0] += p * eb.re;
      adj_derivative[POINT_B][1] += p * eb.im;
      adj_value[POINT_B][0] -= p * k * eb.im;
      adj_value[POINT_B][1] += p * k * eb.re;
    }

    let grad = traces
      .par_iter()
      .zip(adj_value.par_iter().zip(&adj_derivative))
      .fold(
        || network.zero_gradient(),
        |mut grad, (trace, (&av, &ad))| {
          if av != [0.0; 2] || ad != [0.0; 2] {
            network.backprop(trace, av, ad, &mut grad);
          }
          grad
        },
      )
      .reduce(|| network.zero_gradient(), add_gradients);

    (evaluation, flatten(&grad))
  }

  /// Points at which the network is sampled, $a$ and $b$ first.
  pub fn points(&self) -> &[f64] {
    &self.points
  }
}
