//! Scenario driver for transient gas network runs.
//!
//! Provides:
//! - boundary-condition profiles for inlet pressure and outlet momentum
//! - compilation of a validated configuration into a pipe or compressor chain
//! - the steady initialization followed by the implicit-midpoint time loop,
//!   emitting state snapshots at the configured I/O frequency

pub mod boundary;
pub mod error;
pub mod scenario;
pub mod sim;

pub use boundary::{BoundaryCondition, BoundarySet, ConstantBoundary, DiurnalProfile};
pub use error::{SimError, SimResult};
pub use scenario::{Scenario, ScenarioSystem, TimeGrid};
pub use sim::{
    SimOptions, SimRecord, StepRecord, run_scenario, run_transient, run_transient_with_progress,
    solve_initial_state,
};
