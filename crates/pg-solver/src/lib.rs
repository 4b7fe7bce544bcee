//! Residual formulations and a least-squares driver for pipe networks.
//!
//! `SteadyResidual` and `TransientResidual` turn a `PortHamiltonian` system
//! into a function from a flat state guess to a flat residual, generic over
//! the scalar type so Jacobians can be taken with dual numbers. The
//! Levenberg-Marquardt driver minimizes the residual norm; convergence is
//! reported as data, not as an error.

pub mod error;
pub mod jacobian;
pub mod levenberg;
pub mod residual;
pub mod steady;
pub mod transient;

pub use error::{SolverError, SolverResult};
pub use jacobian::{JacobianMethod, dual_jacobian, finite_difference_jacobian};
pub use levenberg::{LmConfig, LmReport, Termination, least_squares};
pub use residual::Residual;
pub use steady::{SteadyResidual, solve_steady};
pub use transient::{TransientResidual, midpoint_inputs, step_transient};
