//! pg-network: pipes, compressor and their composition into one system.
//!
//! Provides:
//! - `DiscretePipe`: a meshed pipe owning its operators and (rho, m) state
//! - `Compressor`: operating mode, control law and ratio-derived scales
//! - `Network`: two pipes joined by a compressor, assembled block-diagonally
//!   with the compressor coupling patched into the input operator
//!
//! Both pipes and networks implement `PortHamiltonian`, the contract the
//! residual evaluators are written against.

pub mod compressor;
pub mod error;
pub mod network;
pub mod pipe;
pub mod snapshot;
pub mod traits;

pub use compressor::{Compressor, CompressorKind, CompressorScales, ControlLaw, MassFlowCoupling};
pub use error::{NetworkError, NetworkResult};
pub use network::Network;
pub use pipe::{DiscretePipe, PipeGeometry};
pub use snapshot::{NetworkSnapshot, PipeSnapshot, SummaryRow};
pub use traits::{PortHamiltonian, SystemTerms};
