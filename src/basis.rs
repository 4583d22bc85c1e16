//! Scalar functions on the domain that can be evaluated and differentiated,
//! and the fixed test spaces of the Petrov-Galerkin (VPINN) scheme.

use crate::{
  fe::HatFunction,
  mesh::UniformMesh,
  problem::{ConfigError, Domain},
  quadrature::legendre,
  Complex64,
};

use std::f64::consts::PI;

/// Evaluation and spatial differentiation of a trial or test function.
pub trait Basis: Sync {
  fn evaluate(&self, x: f64) -> Complex64;

  /// Derivative at `x`.
  ///
  /// For piecewise-smooth functions, the left-derivative is returned on interior breakpoints
  /// and the right-derivative on the left end of the domain.
  fn derivative(&self, x: f64) -> Complex64;

  /// Derivative at `x`, taken from the smooth piece `piece` that `x` was sampled on.
  fn derivative_on(&self, x: f64, piece: [f64; 2]) -> Complex64 {
    let _ = piece;
    self.derivative(x)
  }

  /// Closed interval outside of which the function vanishes.
  /// `None` if the function is supported on the whole domain.
  fn support(&self) -> Option<[f64; 2]> {
    None
  }

  /// Points where the derivative may jump. Empty for smooth functions.
  fn kinks(&self) -> Vec<f64> {
    Vec::new()
  }
}

impl<B: Basis + ?Sized> Basis for &B {
  fn evaluate(&self, x: f64) -> Complex64 {
    (**self).evaluate(x)
  }
  fn derivative(&self, x: f64) -> Complex64 {
    (**self).derivative(x)
  }
  fn derivative_on(&self, x: f64, piece: [f64; 2]) -> Complex64 {
    (**self).derivative_on(x, piece)
  }
  fn support(&self) -> Option<[f64; 2]> {
    (**self).support()
  }
  fn kinks(&self) -> Vec<f64> {
    (**self).kinks()
  }
}

/// A function given by closures for its value and derivative.
pub struct FnBasis<F, D> {
  f: F,
  df: D,
}
impl<F, D> FnBasis<F, D>
where
  F: Fn(f64) -> Complex64 + Sync,
  D: Fn(f64) -> Complex64 + Sync,
{
  pub fn new(f: F, df: D) -> Self {
    Self { f, df }
  }
}
impl<F, D> Basis for FnBasis<F, D>
where
  F: Fn(f64) -> Complex64 + Sync,
  D: Fn(f64) -> Complex64 + Sync,
{
  fn evaluate(&self, x: f64) -> Complex64 {
    (self.f)(x)
  }
  fn derivative(&self, x: f64) -> Complex64 {
    (self.df)(x)
  }
}

/// Intersection of two supports, `None` if they do not overlap at all.
pub fn support_overlap(
  u: Option<[f64; 2]>,
  v: Option<[f64; 2]>,
  domain: &Domain,
) -> Option<[f64; 2]> {
  let [ul, ur] = u.unwrap_or(domain.bounds());
  let [vl, vr] = v.unwrap_or(domain.bounds());
  let l = ul.max(vl).max(domain.a());
  let r = ur.min(vr).min(domain.b());
  (l <= r).then_some([l, r])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestFamily {
  /// $P_n(xi)$, $n = 0..K-1$, of the reference coordinate.
  #[default]
  Legendre,
  /// $1, sin(pi xi), cos(pi xi), sin(2 pi xi), ...$
  Trigonometric,
  /// Piecewise-linear hats on a uniform mesh with $K-1$ cells.
  Hat,
}

/// A fixed real-valued test function.
#[derive(Debug, Clone, Copy)]
pub enum TestFunction {
  Legendre { degree: usize, domain: Domain },
  Sine { mode: usize, domain: Domain },
  Cosine { mode: usize, domain: Domain },
  Hat(HatFunction),
}
impl TestFunction {
  fn eval_real(&self, x: f64) -> f64 {
    match *self {
      Self::Legendre { degree, domain } => legendre(degree, domain.to_reference(x))[0],
      Self::Sine { mode, domain } => (mode as f64 * PI * domain.to_reference(x)).sin(),
      Self::Cosine { mode, domain } => (mode as f64 * PI * domain.to_reference(x)).cos(),
      Self::Hat(hat) => hat.value(x),
    }
  }

  fn deriv_real(&self, x: f64) -> f64 {
    match *self {
      Self::Legendre { degree, domain } => {
        legendre(degree, domain.to_reference(x))[1] * 2.0 / domain.length()
      }
      Self::Sine { mode, domain } => {
        let w = mode as f64 * PI;
        w * (w * domain.to_reference(x)).cos() * 2.0 / domain.length()
      }
      Self::Cosine { mode, domain } => {
        let w = mode as f64 * PI;
        -w * (w * domain.to_reference(x)).sin() * 2.0 / domain.length()
      }
      Self::Hat(hat) => hat.slope_at(x),
    }
  }
}
impl Basis for TestFunction {
  fn evaluate(&self, x: f64) -> Complex64 {
    Complex64::from(self.eval_real(x))
  }
  fn derivative(&self, x: f64) -> Complex64 {
    Complex64::from(self.deriv_real(x))
  }
  fn derivative_on(&self, x: f64, piece: [f64; 2]) -> Complex64 {
    match self {
      Self::Hat(hat) => hat.derivative_on(x, piece),
      _ => self.derivative(x),
    }
  }
  fn support(&self) -> Option<[f64; 2]> {
    match self {
      Self::Hat(hat) => hat.support(),
      _ => None,
    }
  }
  fn kinks(&self) -> Vec<f64> {
    match self {
      Self::Hat(hat) => hat.kinks(),
      _ => Vec::new(),
    }
  }
}

/// Ordered sequence of test functions $v_1, ..., v_K$ with a common fixed scaling.
#[derive(Debug, Clone)]
pub struct TestSpace {
  family: TestFamily,
  functions: Vec<TestFunction>,
  weight: f64,
}
impl TestSpace {
  pub fn new(family: TestFamily, count: usize, domain: Domain) -> Result<Self, ConfigError> {
    let functions = match family {
      TestFamily::Legendre => {
        if count == 0 {
          return Err(ConfigError::InvalidTestSpace(
            "need at least one test function".into(),
          ));
        }
        (0..count)
          .map(|degree| TestFunction::Legendre { degree, domain })
          .collect()
      }
      TestFamily::Trigonometric => {
        if count == 0 {
          return Err(ConfigError::InvalidTestSpace(
            "need at least one test function".into(),
          ));
        }
        (0..count)
          .map(|i| match i {
            0 => TestFunction::Cosine { mode: 0, domain },
            i if i % 2 == 1 => TestFunction::Sine {
              mode: i.div_ceil(2),
              domain,
            },
            i => TestFunction::Cosine { mode: i / 2, domain },
          })
          .collect()
      }
      TestFamily::Hat => {
        if count < 2 {
          return Err(ConfigError::InvalidTestSpace(format!(
            "hat test space needs at least two functions, got {count}"
          )));
        }
        let mesh = UniformMesh::new(domain, count - 1);
        (0..count)
          .map(|i| TestFunction::Hat(HatFunction::new(mesh, i)))
          .collect()
      }
    };
    Ok(Self {
      family,
      functions,
      weight: 1.0,
    })
  }

  /// Scales every test function by `weight`.
  pub fn with_weight(mut self, weight: f64) -> Result<Self, ConfigError> {
    if !(weight.is_finite() && weight != 0.0) {
      return Err(ConfigError::InvalidTestSpace(format!(
        "test function weight must be finite and non-zero, got {weight}"
      )));
    }
    self.weight = weight;
    Ok(self)
  }

  pub fn family(&self) -> TestFamily {
    self.family
  }
  pub fn functions(&self) -> &[TestFunction] {
    &self.functions
  }
  pub fn weight(&self) -> f64 {
    self.weight
  }
  pub fn len(&self) -> usize {
    self.functions.len()
  }
  pub fn is_empty(&self) -> bool {
    self.functions.is_empty()
  }
}
