//! Variational physics-informed neural network.
//!
//! A network $u_"NN"$ is trained such that $a(u_"NN", v_k) approx b(v_k)$
//! for a fixed test space $v_1, ..., v_K$ (Petrov-Galerkin).

pub mod network;
pub mod optimizer;
pub mod residual;
pub mod train;

pub use network::{Activation, Network, NetworkConfig, SpatialDerivative};
pub use optimizer::{Method, Optimizer, OptimizerConfig};
pub use residual::ResidualPlan;
pub use train::{train, TrainError, TrainingReport, TrainingState, VpinnConfig};
