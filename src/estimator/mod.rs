//! Estimator module - overlaps and Hamiltonian expectation values from
//! quantum-circuit measurement statistics.

mod amplitude;
mod one_body;
mod local_energy;

pub use amplitude::{amplitude_estimate, pauli_estimate, AmplitudeEstimator, PauliCache};
pub use one_body::q_expect_one_body;
pub use local_energy::local_energy_quantum;

/// Decimal places used when testing whether a matrix is diagonal.
pub const DIAGONAL_DECIMALS: u32 = 7;
