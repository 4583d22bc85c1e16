//! First-order update rules for the network parameters.

use crate::problem::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
  /// $v <- mu v - eta g$, $theta <- theta + v$
  GradientDescent { momentum: f64 },
  /// Adaptive moment estimation with bias correction.
  Adam { beta1: f64, beta2: f64, epsilon: f64 },
}
impl Default for Method {
  fn default() -> Self {
    Self::Adam {
      beta1: 0.9,
      beta2: 0.999,
      epsilon: 1e-8,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerConfig {
  pub method: Method,
  pub step_size: f64,
  /// The step size is multiplied by this factor after every update.
  pub decay: f64,
}
impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      method: Method::default(),
      step_size: 1e-2,
      decay: 1.0,
    }
  }
}
impl OptimizerConfig {
  pub fn gradient_descent(step_size: f64, momentum: f64) -> Self {
    Self {
      method: Method::GradientDescent { momentum },
      step_size,
      decay: 1.0,
    }
  }
  pub fn adam(step_size: f64) -> Self {
    Self {
      step_size,
      ..Default::default()
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::InvalidOptimizer(msg));
    if !(self.step_size.is_finite() && self.step_size > 0.0) {
      return invalid(format!("step size must be positive, got {}", self.step_size));
    }
    if !(self.decay > 0.0 && self.decay <= 1.0) {
      return invalid(format!("decay must lie in (0, 1], got {}", self.decay));
    }
    match self.method {
      Method::GradientDescent { momentum } => {
        if !(0.0..1.0).contains(&momentum) {
          return invalid(format!("momentum must lie in [0, 1), got {momentum}"));
        }
      }
      Method::Adam {
        beta1,
        beta2,
        epsilon,
      } => {
        if !((0.0..1.0).contains(&beta1) && (0.0..1.0).contains(&beta2)) {
          return invalid(format!("Adam betas must lie in [0, 1), got {beta1}, {beta2}"));
        }
        if !(epsilon > 0.0) {
          return invalid(format!("Adam epsilon must be positive, got {epsilon}"));
        }
      }
    }
    Ok(())
  }
}

/// Optimizer state, owned by the training loop.
#[derive(Debug, Clone)]
pub struct Optimizer {
  config: OptimizerConfig,
  step_size: f64,
  first_moment: na::DVector<f64>,
  second_moment: na::DVector<f64>,
  nsteps: usize,
}
impl Optimizer {
  pub fn new(config: OptimizerConfig, nparams: usize) -> Self {
    Self {
      config,
      step_size: config.step_size,
      first_moment: na::DVector::zeros(nparams),
      second_moment: na::DVector::zeros(nparams),
      nsteps: 0,
    }
  }

  pub fn step_size(&self) -> f64 {
    self.step_size
  }
  pub fn nsteps(&self) -> usize {
    self.nsteps
  }

  pub fn step(&mut self, params: &mut na::DVector<f64>, grad: &na::DVector<f64>) {
    assert_eq!(params.len(), grad.len());
    self.nsteps += 1;
    let eta = self.step_size;
    match self.config.method {
      Method::GradientDescent { momentum } => {
        let velocity = &mut self.first_moment;
        *velocity *= momentum;
        velocity.axpy(-eta, grad, 1.0);
        *params += &*velocity;
      }
      Method::Adam {
        beta1,
        beta2,
        epsilon,
      } => {
        let t = self.nsteps as i32;
        let bc1 = 1.0 - beta1.powi(t);
        let bc2 = 1.0 - beta2.powi(t);
        for i in 0..params.len() {
          let g = grad[i];
          self.first_moment[i] = beta1 * self.first_moment[i] + (1.0 - beta1) * g;
          self.second_moment[i] = beta2 * self.second_moment[i] + (1.0 - beta2) * g * g;
          let m_hat = self.first_moment[i] / bc1;
          let v_hat = self.second_moment[i] / bc2;
          params[i] -= eta * m_hat / (v_hat.sqrt() + epsilon);
        }
      }
    }
    self.step_size *= self.config.decay;
  }
}
