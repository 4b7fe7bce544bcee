//! pg-core: stable foundation for the port-Hamiltonian gas network engine.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real, the Scalar capability set, float checks)
//! - gas (validated specific gas constant)
//! - timing (wall-clock stopwatch reported through tracing)
//! - error (shared error types)

pub mod error;
pub mod gas;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use gas::GasConstant;
pub use numeric::*;
pub use units::*;
