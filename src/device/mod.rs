//! Device module - quantum execution backends consumed by the estimators.

mod traits;
mod statevector;

pub use traits::QuantumDevice;
pub use statevector::{ShotDevice, StateVector, StatevectorDevice};
