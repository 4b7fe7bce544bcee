//! pg-operators: discrete operators of the port-Hamiltonian pipe model.
//!
//! Provides:
//! - `SparseOperator<T>`: an immutable, shareable sparsity pattern plus a
//!   value buffer of any `Scalar` type
//! - Taylor-table finite-difference weights and the first-derivative operator
//! - mesh-only operators {E, J, K, Y, G} of one pipe
//! - state-dependent friction operator R and the effort map
//!
//! Every state-dependent evaluation returns fresh values on top of a shared
//! pattern, so concurrent evaluations never write to common storage.

pub mod derivative;
pub mod error;
pub mod sparse;
pub mod state;
pub mod structure;

pub use derivative::{derivative_operator, taylor_table};
pub use error::{OperatorError, OperatorResult};
pub use sparse::{SparseOperator, SparsityPattern, Triplet};
pub use state::{EffortMap, FrictionOperator};
pub use structure::PipeStructure;
