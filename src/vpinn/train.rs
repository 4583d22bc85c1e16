//! Training loop of the VPINN.
//!
//! Every iteration evaluates all residuals from one fixed parameter snapshot,
//! reduces them to the loss, and only then updates the parameters.

use super::{
  network::Network,
  optimizer::{Optimizer, OptimizerConfig},
  residual::{test_breakpoints, ResidualPlan},
};
use crate::{
  basis::TestSpace,
  exact::ExactSolution,
  form::VariationalForm,
  norms::{self, H1Error},
  problem::{ConfigError, HelmholtzProblem},
  quadrature::{QuadratureConfig, QuadratureError},
};

use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrainError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Quadrature(#[from] QuadratureError),
  #[error(
    "training diverged at iteration {iteration}: non-finite loss \
     (last stable iteration {last_stable_iteration:?} with loss {last_stable_loss:?})"
  )]
  Diverged {
    iteration: usize,
    last_stable_iteration: Option<usize>,
    last_stable_loss: Option<f64>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
  Initialized,
  Iterating,
  Converged,
  MaxIterationsReached,
  Diverged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VpinnConfig {
  pub quadrature: QuadratureConfig,
  pub optimizer: OptimizerConfig,
  pub max_iterations: usize,
  /// Training stops once the loss drops below.
  pub tolerance: f64,
  /// Weight of the impedance boundary residuals in the loss, zero disables them.
  pub penalty: f64,
  /// Iterations between progress logs and error evaluations, zero disables both.
  pub log_interval: usize,
}
impl Default for VpinnConfig {
  fn default() -> Self {
    Self {
      quadrature: QuadratureConfig::default(),
      optimizer: OptimizerConfig::default(),
      max_iterations: 1000,
      tolerance: 1e-8,
      penalty: 0.0,
      log_interval: 100,
    }
  }
}
impl VpinnConfig {
  pub fn validate(&self) -> Result<(), TrainError> {
    self.quadrature.validate()?;
    self.optimizer.validate()?;
    if !(self.tolerance >= 0.0) {
      return Err(
        ConfigError::InvalidOptimizer(format!(
          "tolerance must be non-negative, got {}",
          self.tolerance
        ))
        .into(),
      );
    }
    if !(self.penalty.is_finite() && self.penalty >= 0.0) {
      return Err(
        ConfigError::InvalidOptimizer(format!("penalty must be non-negative, got {}", self.penalty))
          .into(),
      );
    }
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
  pub network: Network,
  /// `Converged` or `MaxIterationsReached`.
  pub state: TrainingState,
  /// Loss of the returned network.
  pub final_loss: f64,
  pub best_loss: f64,
  /// Number of parameter updates.
  pub iterations: usize,
  /// Loss before every update and of the returned network.
  pub losses: Vec<f64>,
  /// H1 error against the analytical solution every `log_interval` iterations.
  pub errors: Vec<(usize, H1Error)>,
}

/// Minimizes the mean squared variational residual of `network` against `tests`.
///
/// Non-convergence within the iteration budget is reported in the returned state,
/// a non-finite loss aborts with [`TrainError::Diverged`].
pub fn train(
  mut network: Network,
  tests: &TestSpace,
  problem: &HelmholtzProblem,
  config: &VpinnConfig,
  exact: Option<&ExactSolution>,
) -> Result<TrainingReport, TrainError> {
  config.validate()?;
  let domain = problem.domain();
  let breakpoints = test_breakpoints(domain, tests, config.quadrature.nsub);
  let form = VariationalForm::new(problem, config.quadrature.rule()?, breakpoints)?;
  let plan = ResidualPlan::new(&form, tests, config.penalty)?;
  let error_rule = config.quadrature.composite(domain.bounds())?;

  let mut optimizer = Optimizer::new(config.optimizer, network.nparams());
  let mut params = network.params();
  let mut state = TrainingState::Initialized;
  debug!("training state {state:?}");
  info!(
    "training VPINN with {} hidden layers and {} parameters against {} tests on {} points, k={}",
    network.depth(),
    network.nparams(),
    plan.ntests(),
    plan.npoints(),
    problem.wavenumber()
  );

  let mut losses = Vec::with_capacity(config.max_iterations + 1);
  let mut errors = Vec::new();
  let mut best_loss = f64::INFINITY;
  let mut last_stable: Option<(usize, f64)> = None;

  state = TrainingState::Iterating;
  debug!("training state {state:?}");
  let mut iteration = 0;
  let final_loss = loop {
    let (evaluation, grad) = plan.loss_and_gradient(&network);
    let loss = evaluation.loss;
    losses.push(loss);

    if !loss.is_finite() || grad.iter().any(|g| !g.is_finite()) {
      let err = TrainError::Diverged {
        iteration,
        last_stable_iteration: last_stable.map(|(i, _)| i),
        last_stable_loss: last_stable.map(|(_, l)| l),
      };
      state = TrainingState::Diverged;
      warn!("training state {state:?}: {err}");
      return Err(err);
    }
    last_stable = Some((iteration, loss));
    best_loss = best_loss.min(loss);

    if config.log_interval > 0 && iteration % config.log_interval == 0 {
      debug!(
        "iteration {iteration}: loss={loss:e}, step size={:e}",
        optimizer.step_size()
      );
      if let Some(exact) = exact {
        errors.push((iteration, norms::h1_error_between(exact, &network, &error_rule)));
      }
    }

    if loss < config.tolerance {
      state = TrainingState::Converged;
      break loss;
    }
    if iteration == config.max_iterations {
      state = TrainingState::MaxIterationsReached;
      break loss;
    }

    optimizer.step(&mut params, &grad);
    network.set_params(&params);
    iteration += 1;
  };

  match state {
    TrainingState::Converged => {
      info!("converged after {iteration} iterations with loss {final_loss:e}")
    }
    _ => warn!(
      "no convergence within {} iterations: loss {final_loss:e}, best loss {best_loss:e}",
      config.max_iterations
    ),
  }

  Ok(TrainingReport {
    network,
    state,
    final_loss,
    best_loss,
    iterations: iteration,
    losses,
    errors,
  })
}
