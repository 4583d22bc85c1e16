//! Immutable problem data of the Helmholtz impedance problem.

use crate::Complex64;

use std::{fmt, sync::Arc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
  #[error("invalid domain [{a}, {b}]: bounds must be finite with a < b")]
  InvalidDomain { a: f64, b: f64 },
  #[error("invalid wavenumber k={0}: must be finite and non-negative")]
  InvalidWavenumber(f64),
  #[error("invalid wavenumber k={0}: the analytical solution requires k > 0")]
  ZeroWavenumber(f64),
  #[error("invalid mesh size: need at least one cell, got {0}")]
  InvalidMeshSize(usize),
  #[error("invalid test space: {0}")]
  InvalidTestSpace(String),
  #[error("invalid network: {0}")]
  InvalidNetwork(String),
  #[error("invalid optimizer: {0}")]
  InvalidOptimizer(String),
}

/// The interval $[a,b]$ with $a < b$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
  a: f64,
  b: f64,
}
impl Domain {
  pub fn new(a: f64, b: f64) -> Result<Self, ConfigError> {
    if !(a.is_finite() && b.is_finite() && a < b) {
      return Err(ConfigError::InvalidDomain { a, b });
    }
    Ok(Self { a, b })
  }

  /// The symmetric reference interval $[-1,1]$.
  pub fn reference() -> Self {
    Self { a: -1.0, b: 1.0 }
  }

  pub fn a(&self) -> f64 {
    self.a
  }
  pub fn b(&self) -> f64 {
    self.b
  }
  pub fn bounds(&self) -> [f64; 2] {
    [self.a, self.b]
  }
  pub fn length(&self) -> f64 {
    self.b - self.a
  }
  pub fn contains(&self, x: f64) -> bool {
    self.a <= x && x <= self.b
  }

  /// Affine map onto the reference coordinate $xi in [-1,1]$.
  pub fn to_reference(&self, x: f64) -> f64 {
    (2.0 * x - self.a - self.b) / self.length()
  }
}

pub type SourceFn = Arc<dyn Fn(f64) -> Complex64 + Send + Sync>;

/// Right-hand side $f$ of the PDE.
#[derive(Clone)]
pub enum Source {
  Constant(Complex64),
  Function(SourceFn),
}
impl Source {
  pub fn constant(value: impl Into<Complex64>) -> Self {
    Self::Constant(value.into())
  }
  pub fn function<F>(f: F) -> Self
  where
    F: Fn(f64) -> Complex64 + Send + Sync + 'static,
  {
    Self::Function(Arc::new(f))
  }

  pub fn eval(&self, x: f64) -> Complex64 {
    match self {
      Self::Constant(c) => *c,
      Self::Function(f) => f(x),
    }
  }

  pub fn as_constant(&self) -> Option<Complex64> {
    match self {
      Self::Constant(c) => Some(*c),
      Self::Function(_) => None,
    }
  }
}
impl fmt::Debug for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Constant(c) => f.debug_tuple("Constant").field(c).finish(),
      Self::Function(_) => f.write_str("Function(..)"),
    }
  }
}

/// PDE coefficients and boundary data, fixed at solver construction.
#[derive(Debug, Clone)]
pub struct HelmholtzProblem {
  domain: Domain,
  wavenumber: f64,
  ga: Complex64,
  gb: Complex64,
  source: Source,
}
impl HelmholtzProblem {
  pub fn new(
    domain: Domain,
    wavenumber: f64,
    source: Source,
    ga: impl Into<Complex64>,
    gb: impl Into<Complex64>,
  ) -> Result<Self, ConfigError> {
    if !(wavenumber.is_finite() && wavenumber >= 0.0) {
      return Err(ConfigError::InvalidWavenumber(wavenumber));
    }
    Ok(Self {
      domain,
      wavenumber,
      ga: ga.into(),
      gb: gb.into(),
      source,
    })
  }

  pub fn domain(&self) -> &Domain {
    &self.domain
  }
  pub fn wavenumber(&self) -> f64 {
    self.wavenumber
  }
  pub fn ga(&self) -> Complex64 {
    self.ga
  }
  pub fn gb(&self) -> Complex64 {
    self.gb
  }
  pub fn source(&self) -> &Source {
    &self.source
  }

  /// Same problem with a different wavenumber.
  pub fn with_wavenumber(&self, wavenumber: f64) -> Result<Self, ConfigError> {
    Self::new(
      self.domain,
      wavenumber,
      self.source.clone(),
      self.ga,
      self.gb,
    )
  }
}
