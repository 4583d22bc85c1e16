//! Discrete solvers built on top of the assembly machinery.

pub mod helmholtz;
